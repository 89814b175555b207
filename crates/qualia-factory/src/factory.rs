use qualia_hir::{
    BinaryOp, ExprKind, LocalKind, MethodDecl, MethodId, Owner, Program, SiteNode, TypeRef,
    UnaryOp, UseSite,
};
use qualia_types::{
    AnnotatedType, DeclKind, LiteralKind, PrimitiveType, TypeId, TypeNode, TypeStore,
};
use thiserror::Error;

use crate::cache::RunCache;
use crate::checker::CheckerSet;
use crate::snapshot::RoutineTypes;

/// The host could not supply a type for a use site. The site is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnresolvedSite {
    #[error("use site {0:?} refers to a missing declaration")]
    Dangling(UseSite),
    #[error("host type at {0:?} did not resolve")]
    MissingType(UseSite),
    #[error("invalid expression at {0:?}")]
    InvalidExpr(UseSite),
    #[error("{0:?} has no value")]
    NoValue(UseSite),
}

impl UnresolvedSite {
    #[must_use]
    pub fn site(&self) -> UseSite {
        match *self {
            UnresolvedSite::Dangling(site)
            | UnresolvedSite::MissingType(site)
            | UnresolvedSite::InvalidExpr(site)
            | UnresolvedSite::NoValue(site) => site,
        }
    }
}

/// Produces fully annotated types for use sites of one program.
///
/// The factory itself is stateless; memoization lives in the [`RunCache`]
/// passed to every query.
#[derive(Debug, Clone, Copy)]
pub struct AnnotatedTypeFactory<'a> {
    store: &'a TypeStore,
    program: &'a Program,
    checkers: &'a CheckerSet,
}

impl<'a> AnnotatedTypeFactory<'a> {
    #[must_use]
    pub fn new(store: &'a TypeStore, program: &'a Program, checkers: &'a CheckerSet) -> Self {
        Self {
            store,
            program,
            checkers,
        }
    }

    #[must_use]
    pub fn store(&self) -> &'a TypeStore {
        self.store
    }

    #[must_use]
    pub fn program(&self) -> &'a Program {
        self.program
    }

    #[must_use]
    pub fn checkers(&self) -> &'a CheckerSet {
        self.checkers
    }

    /// Fully annotated type at `site`.
    ///
    /// Equal sites within one cache return the same allocation.
    pub fn get_annotated_type(
        &self,
        cache: &mut RunCache,
        site: &UseSite,
    ) -> Result<AnnotatedType, UnresolvedSite> {
        if let Some(ty) = cache.get(site) {
            return Ok(ty);
        }
        let ty = self.compute(cache, site)?;
        debug_assert!(ty.is_fully_annotated(self.checkers.hierarchies()));
        cache.insert(*site, ty.clone());
        Ok(ty)
    }

    /// Declared parameter types of `method`, in order.
    pub fn param_types(
        &self,
        cache: &mut RunCache,
        method: MethodId,
    ) -> Result<Vec<AnnotatedType>, UnresolvedSite> {
        let decl = self
            .program
            .method(method)
            .ok_or(UnresolvedSite::Dangling(UseSite::ret(method)))?;
        decl.body
            .params()
            .map(|local| self.get_annotated_type(cache, &UseSite::local(method, local)))
            .collect()
    }

    /// Snapshot every type the refinement pass needs for `method`.
    pub fn routine_types(
        &self,
        cache: &mut RunCache,
        method: MethodId,
    ) -> Result<RoutineTypes, UnresolvedSite> {
        let decl = self
            .program
            .method(method)
            .ok_or(UnresolvedSite::Dangling(UseSite::ret(method)))?;
        let mut snapshot = RoutineTypes::new(method);
        for local in decl.body.local_ids() {
            snapshot.set_local(local, self.resolved(cache, &UseSite::local(method, local)));
        }
        for (id, expr) in decl.body.exprs() {
            snapshot.set_expr(id, self.resolved(cache, &UseSite::expr(method, id)));
            if let ExprKind::Field { field, .. } = expr.kind {
                if let Ok(ty) = self.get_annotated_type(cache, &UseSite::field(field)) {
                    snapshot.set_field(field, ty);
                }
            }
        }
        Ok(snapshot)
    }

    fn resolved(&self, cache: &mut RunCache, site: &UseSite) -> Option<AnnotatedType> {
        match self.get_annotated_type(cache, site) {
            Ok(ty) => Some(ty),
            Err(err) => {
                tracing::debug!(target: "qualia.factory", %err, "unresolved use site");
                None
            }
        }
    }

    fn compute(&self, cache: &mut RunCache, site: &UseSite) -> Result<AnnotatedType, UnresolvedSite> {
        let dangling = UnresolvedSite::Dangling(*site);
        match (site.owner, site.node) {
            (Owner::Field(id), SiteNode::Declared) => {
                let field = self.program.field(id).ok_or(dangling)?;
                self.declared(&field.ty, DeclKind::Field, site)
            }
            (Owner::Class(id), SiteNode::Declared) => {
                let class = self.program.class(id).ok_or(dangling)?;
                self.declared(&class.self_type, DeclKind::ClassHeader, site)
            }
            (Owner::Class(id), SiteNode::Supertype(index)) => {
                let class = self.program.class(id).ok_or(dangling)?;
                let supertype = class.supertypes().nth(index as usize).ok_or(dangling)?;
                self.declared(supertype, DeclKind::ClassHeader, site)
            }
            (Owner::Method(id), node) => {
                let method = self.program.method(id).ok_or(dangling)?;
                match node {
                    SiteNode::Declared => {
                        let ret = method.ret.as_ref().ok_or(UnresolvedSite::NoValue(*site))?;
                        self.declared(ret, DeclKind::Return, site)
                    }
                    SiteNode::Receiver => self.receiver(method, site),
                    SiteNode::Local(local) => {
                        let local = method.body.get_local(local).ok_or(dangling)?;
                        let kind = match local.kind {
                            LocalKind::Param => DeclKind::Parameter,
                            LocalKind::Local => DeclKind::Local,
                        };
                        self.declared(&local.ty, kind, site)
                    }
                    SiteNode::Expr(expr) => self.expr_type(cache, id, method, expr, site),
                    SiteNode::Supertype(_) => Err(dangling),
                }
            }
            (Owner::Field(_) | Owner::Class(_), _) => Err(dangling),
        }
    }

    fn receiver(&self, method: &MethodDecl, site: &UseSite) -> Result<AnnotatedType, UnresolvedSite> {
        if method.is_static {
            return Err(UnresolvedSite::NoValue(*site));
        }
        match &method.receiver {
            Some(receiver) => self.declared(receiver, DeclKind::Receiver, site),
            None => {
                let class = self
                    .program
                    .class(method.owner)
                    .ok_or(UnresolvedSite::Dangling(*site))?;
                self.declared(&class.self_type, DeclKind::Receiver, site)
            }
        }
    }

    fn expr_type(
        &self,
        cache: &mut RunCache,
        method_id: MethodId,
        method: &MethodDecl,
        expr: qualia_hir::ExprId,
        site: &UseSite,
    ) -> Result<AnnotatedType, UnresolvedSite> {
        let expr = method
            .body
            .get_expr(expr)
            .ok_or(UnresolvedSite::Dangling(*site))?;
        let annotator = self.checkers.annotator();
        match &expr.kind {
            ExprKind::Local(local) => {
                self.get_annotated_type(cache, &UseSite::local(method_id, *local))
            }
            ExprKind::Field { field, .. } => self.get_annotated_type(cache, &UseSite::field(*field)),
            ExprKind::Call { method: callee, .. } => {
                self.get_annotated_type(cache, &UseSite::ret(*callee))
            }
            ExprKind::This => self.get_annotated_type(cache, &UseSite::receiver(method_id)),
            ExprKind::New { ty, .. } => self.declared(ty, DeclKind::Instantiation, site),
            ExprKind::Literal(kind) => {
                let ty = self
                    .literal_type(*kind)
                    .ok_or(UnresolvedSite::MissingType(*site))?;
                let mut partial = AnnotatedType::unannotated(self.store, ty);
                for hierarchy in self.checkers.hierarchies().iter() {
                    if let Some(q) = self.checkers.literal_qualifier(hierarchy, *kind) {
                        partial = partial.with_qualifier(q);
                    }
                }
                Ok(annotator.annotate(self.store, &partial, DeclKind::Literal(*kind)))
            }
            ExprKind::Cast { ty, expr: operand } => {
                let mut partial = self.lower(ty, site)?;
                // Hierarchies the cast leaves unqualified keep the operand's qualifier.
                if let Ok(operand) = self.get_annotated_type(cache, &UseSite::expr(method_id, *operand)) {
                    for id in self.checkers.hierarchies().ids() {
                        if partial.qualifier(id).is_none() {
                            if let Some(q) = operand.qualifier(id) {
                                partial = partial.with_qualifier(q);
                            }
                        }
                    }
                }
                Ok(annotator.annotate(self.store, &partial, DeclKind::Cast))
            }
            ExprKind::ArrayAccess { array, .. } => {
                let array = self.get_annotated_type(cache, &UseSite::expr(method_id, *array))?;
                array
                    .component(self.store)
                    .cloned()
                    .ok_or(UnresolvedSite::MissingType(*site))
            }
            ExprKind::Binary { op, lhs, .. } => {
                let ty = match op {
                    BinaryOp::EqEq
                    | BinaryOp::NotEq
                    | BinaryOp::And
                    | BinaryOp::Or
                    | BinaryOp::Lt
                    | BinaryOp::Le
                    | BinaryOp::Gt
                    | BinaryOp::Ge => self.boolean(),
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                        self.operand_type(method, *lhs)
                    }
                };
                self.operator_result(ty, site)
            }
            ExprKind::Unary { op, expr: operand } => {
                let ty = match op {
                    UnaryOp::Not => self.boolean(),
                    UnaryOp::Neg => self.operand_type(method, *operand),
                };
                self.operator_result(ty, site)
            }
            ExprKind::Invalid => Err(UnresolvedSite::InvalidExpr(*site)),
        }
    }

    fn operator_result(&self, ty: Option<TypeId>, site: &UseSite) -> Result<AnnotatedType, UnresolvedSite> {
        let ty = ty.ok_or(UnresolvedSite::MissingType(*site))?;
        let mirror = AnnotatedType::unannotated(self.store, ty);
        Ok(self
            .checkers
            .annotator()
            .annotate(self.store, &mirror, DeclKind::Operator))
    }

    /// Host type of an operand, without qualifiers.
    fn operand_type(&self, method: &MethodDecl, expr: qualia_hir::ExprId) -> Option<TypeId> {
        let body = &method.body;
        match &body.get_expr(expr)?.kind {
            ExprKind::Local(local) => body.get_local(*local)?.ty.ty,
            ExprKind::Field { field, .. } => self.program.field(*field)?.ty.ty,
            ExprKind::Call { method: callee, .. } => self.program.method(*callee)?.ret.as_ref()?.ty,
            ExprKind::New { ty, .. } | ExprKind::Cast { ty, .. } => ty.ty,
            ExprKind::Literal(kind) => self.literal_type(*kind),
            ExprKind::Binary { op, lhs, .. } => match op {
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                    self.operand_type(method, *lhs)
                }
                _ => self.boolean(),
            },
            ExprKind::Unary { op: UnaryOp::Neg, expr } => self.operand_type(method, *expr),
            ExprKind::Unary { op: UnaryOp::Not, .. } => self.boolean(),
            ExprKind::ArrayAccess { array, .. } => match self.store.get(self.operand_type(method, *array)?)? {
                TypeNode::Array(component) => Some(*component),
                _ => None,
            },
            ExprKind::This | ExprKind::Invalid => None,
        }
    }

    fn boolean(&self) -> Option<TypeId> {
        self.store
            .find(&TypeNode::Primitive(PrimitiveType::Boolean))
    }

    fn literal_type(&self, kind: LiteralKind) -> Option<TypeId> {
        let primitive = |p| self.store.find(&TypeNode::Primitive(p));
        match kind {
            LiteralKind::Null => self.store.find(&TypeNode::Null),
            LiteralKind::Boolean => primitive(PrimitiveType::Boolean),
            LiteralKind::Int => primitive(PrimitiveType::Int),
            LiteralKind::Long => primitive(PrimitiveType::Long),
            LiteralKind::Float => primitive(PrimitiveType::Float),
            LiteralKind::Double => primitive(PrimitiveType::Double),
            LiteralKind::Char => primitive(PrimitiveType::Char),
            LiteralKind::String => {
                let class = self.store.lookup_class("java.lang.String")?;
                self.store.find(&TypeNode::Declared {
                    class,
                    args: Vec::new(),
                })
            }
        }
    }

    fn declared(
        &self,
        written: &TypeRef,
        kind: DeclKind,
        site: &UseSite,
    ) -> Result<AnnotatedType, UnresolvedSite> {
        let partial = self.lower(written, site)?;
        Ok(self
            .checkers
            .annotator()
            .annotate(self.store, &partial, kind))
    }

    /// Mirror the written type and place its explicit qualifiers.
    fn lower(&self, written: &TypeRef, site: &UseSite) -> Result<AnnotatedType, UnresolvedSite> {
        let ty = written
            .ty
            .filter(|ty| self.store.get(*ty).is_some())
            .ok_or(UnresolvedSite::MissingType(*site))?;
        Ok(self.place_explicit(AnnotatedType::unannotated(self.store, ty), written))
    }

    fn place_explicit(&self, ty: AnnotatedType, written: &TypeRef) -> AnnotatedType {
        let set = self.checkers.hierarchies();
        let mut ty = ty;
        for q in &written.qualifiers {
            if set.get(q.hierarchy()).is_some_and(|h| h.contains(*q)) {
                ty = ty.with_qualifier(*q);
            } else {
                tracing::debug!(
                    target: "qualia.factory",
                    qualifier = ?q,
                    "ignoring qualifier of an inactive hierarchy"
                );
            }
        }
        if written.nested.is_empty() {
            return ty;
        }
        let children = ty
            .children()
            .iter()
            .enumerate()
            .map(|(idx, child)| match written.nested.get(idx) {
                Some(nested) => self.place_explicit(child.clone(), nested),
                None => child.clone(),
            })
            .collect();
        ty.with_children(children)
    }
}
