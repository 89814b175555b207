use std::collections::HashMap;

use qualia_hir::{ExprId, FieldId, LocalId, MethodId};
use qualia_types::AnnotatedType;

/// Read-only declared types of one routine, detached from the run cache so
/// routines can be refined in parallel.
///
/// `None` entries are sites the host could not resolve.
#[derive(Debug, Clone)]
pub struct RoutineTypes {
    method: MethodId,
    locals: Vec<Option<AnnotatedType>>,
    exprs: Vec<Option<AnnotatedType>>,
    fields: HashMap<FieldId, AnnotatedType>,
}

impl RoutineTypes {
    pub(crate) fn new(method: MethodId) -> Self {
        Self {
            method,
            locals: Vec::new(),
            exprs: Vec::new(),
            fields: HashMap::new(),
        }
    }

    pub(crate) fn set_local(&mut self, local: LocalId, ty: Option<AnnotatedType>) {
        if self.locals.len() <= local.idx() {
            self.locals.resize(local.idx() + 1, None);
        }
        self.locals[local.idx()] = ty;
    }

    pub(crate) fn set_expr(&mut self, expr: ExprId, ty: Option<AnnotatedType>) {
        if self.exprs.len() <= expr.idx() {
            self.exprs.resize(expr.idx() + 1, None);
        }
        self.exprs[expr.idx()] = ty;
    }

    pub(crate) fn set_field(&mut self, field: FieldId, ty: AnnotatedType) {
        self.fields.insert(field, ty);
    }

    #[must_use]
    pub fn method(&self) -> MethodId {
        self.method
    }

    /// Declared type of a local or parameter.
    #[must_use]
    pub fn local(&self, local: LocalId) -> Option<&AnnotatedType> {
        self.locals.get(local.idx())?.as_ref()
    }

    /// Unrefined type of an expression.
    #[must_use]
    pub fn expr(&self, expr: ExprId) -> Option<&AnnotatedType> {
        self.exprs.get(expr.idx())?.as_ref()
    }

    /// Declared type of a field read somewhere in the routine.
    #[must_use]
    pub fn field(&self, field: FieldId) -> Option<&AnnotatedType> {
        self.fields.get(&field)
    }
}
