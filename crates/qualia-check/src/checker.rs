use std::collections::HashSet;

use qualia_core::Span;
use qualia_factory::{AnnotatedTypeFactory, RunCache, UnresolvedSite};
use qualia_flow::{Refinement, Terminator};
use qualia_hierarchy::HierarchyId;
use qualia_hir::{Body, ExprId, ExprKind, MethodId, StmtId, StmtKind, UseSite};
use qualia_types::{is_subtype, AnnotatedType};

use crate::violation::{Violation, ViolationCode};

/// Reports every place where a value flows into a location whose qualifiers
/// it does not satisfy.
///
/// Assignments, arguments, returns, casts and array stores are checked
/// against the flow-refined type of the value; overrides are checked on
/// declared signatures. Unresolved sites and unreachable code are skipped.
#[derive(Debug, Clone, Copy)]
pub struct SubtypeChecker<'a> {
    factory: &'a AnnotatedTypeFactory<'a>,
    report_unsafe_casts: bool,
}

impl<'a> SubtypeChecker<'a> {
    #[must_use]
    pub fn new(factory: &'a AnnotatedTypeFactory<'a>) -> Self {
        Self {
            factory,
            report_unsafe_casts: true,
        }
    }

    #[must_use]
    pub fn report_unsafe_casts(mut self, report: bool) -> Self {
        self.report_unsafe_casts = report;
        self
    }

    /// Check the reachable statements of one refined routine, in source order.
    pub fn check_routine(&self, cache: &mut RunCache, refinement: &Refinement) -> Vec<Violation> {
        let method = refinement.method;
        let Some(decl) = self.factory.program().method(method) else {
            return Vec::new();
        };
        let mut walk = RoutineWalk {
            checker: self,
            cache,
            method,
            body: &decl.body,
            refinement,
            out: Collected::default(),
        };
        for (_, block) in refinement.reachable_blocks() {
            for stmt in &block.stmts {
                walk.stmt(*stmt);
            }
            walk.terminator(&block.terminator);
        }
        walk.out.violations
    }

    /// Check `method`'s signature against every method it overrides:
    /// parameters contravariant, return covariant.
    pub fn check_overrides(&self, cache: &mut RunCache, method: MethodId) -> Vec<Violation> {
        let factory = self.factory;
        let Some(decl) = factory.program().method(method) else {
            return Vec::new();
        };
        let mut out = Collected::default();
        for &parent in &decl.overrides {
            match (factory.param_types(cache, method), factory.param_types(cache, parent)) {
                (Ok(own), Ok(inherited)) => {
                    for ((local, own), inherited) in decl.body.params().zip(own).zip(inherited) {
                        let span = decl.body.local(local).span;
                        self.compare(
                            &mut out,
                            ViolationCode::OverrideParam,
                            UseSite::local(method, local),
                            span,
                            &inherited,
                            &own,
                        );
                    }
                }
                (Err(err), _) | (_, Err(err)) => skipped(&err),
            }

            let own = factory.get_annotated_type(cache, &UseSite::ret(method));
            let inherited = factory.get_annotated_type(cache, &UseSite::ret(parent));
            if let (Ok(own), Ok(inherited)) = (own, inherited) {
                self.compare(
                    &mut out,
                    ViolationCode::OverrideReturn,
                    UseSite::ret(method),
                    decl.span,
                    &own,
                    &inherited,
                );
            }
        }
        out.violations
    }

    /// One violation per hierarchy in which `found` is not a subtype of
    /// `expected`.
    fn compare(
        &self,
        out: &mut Collected,
        code: ViolationCode,
        site: UseSite,
        span: Span,
        found: &AnnotatedType,
        expected: &AnnotatedType,
    ) {
        let checkers = self.factory.checkers();
        for hierarchy in checkers.hierarchies().iter() {
            let covariance = checkers.options_for(hierarchy.id()).array_covariance;
            if is_subtype(self.factory.store(), hierarchy, covariance, found, expected) {
                continue;
            }
            out.push(Violation {
                site,
                code,
                span,
                expected: expected.clone(),
                found: found.clone(),
                hierarchy: hierarchy.id(),
            });
        }
    }
}

fn skipped(err: &UnresolvedSite) {
    tracing::debug!(target: "qualia.check", site = ?err.site(), %err, "skipping unresolved site");
}

#[derive(Default)]
struct Collected {
    seen: HashSet<(UseSite, HierarchyId)>,
    violations: Vec<Violation>,
}

impl Collected {
    fn push(&mut self, violation: Violation) {
        if self.seen.insert((violation.site, violation.hierarchy)) {
            self.violations.push(violation);
        }
    }
}

struct RoutineWalk<'c, 'a> {
    checker: &'c SubtypeChecker<'a>,
    cache: &'c mut RunCache,
    method: MethodId,
    body: &'c Body,
    refinement: &'c Refinement,
    out: Collected,
}

impl RoutineWalk<'_, '_> {
    fn stmt(&mut self, stmt: StmtId) {
        let body = self.body;
        let span = body.stmt(stmt).span;
        match &body.stmt(stmt).kind {
            StmtKind::Let {
                local,
                initializer: Some(init),
            } => {
                self.expr(*init);
                let expected = self.declared(UseSite::local(self.method, *local));
                self.flow_into(ViolationCode::Assignment, *init, span, expected);
            }
            StmtKind::Assign { target, value } => {
                match &body.expr(*target).kind {
                    ExprKind::Field {
                        receiver: Some(receiver),
                        ..
                    } => self.expr(*receiver),
                    ExprKind::ArrayAccess { array, index } => {
                        self.expr(*array);
                        self.expr(*index);
                    }
                    _ => {}
                }
                self.expr(*value);
                match &body.expr(*target).kind {
                    ExprKind::ArrayAccess { array, .. } => {
                        let store = self.checker.factory.store();
                        let component = self
                            .refined(*array)
                            .and_then(|array| array.component(store).cloned());
                        self.flow_into(ViolationCode::ArrayStore, *value, span, component);
                    }
                    _ => {
                        let expected = self.declared(UseSite::expr(self.method, *target));
                        self.flow_into(ViolationCode::Assignment, *value, span, expected);
                    }
                }
            }
            StmtKind::Expr(expr) => self.expr(*expr),
            _ => {}
        }
    }

    fn terminator(&mut self, terminator: &Terminator) {
        match *terminator {
            Terminator::If { condition, .. } => self.expr(condition),
            Terminator::Return {
                value: Some(value),
                from,
            } => {
                self.expr(value);
                let span = self.body.stmt(from).span;
                let expected = self.declared(UseSite::ret(self.method));
                self.flow_into(ViolationCode::Return, value, span, expected);
            }
            Terminator::Throw { exception, .. } => self.expr(exception),
            Terminator::Return { value: None, .. } | Terminator::Goto { .. } | Terminator::Exit => {}
        }
    }

    /// Visit `expr` and its operands, checking calls and casts.
    fn expr(&mut self, expr: ExprId) {
        let body = self.body;
        let node = body.expr(expr);
        match &node.kind {
            ExprKind::Call {
                receiver,
                method,
                args,
            } => {
                if let Some(receiver) = receiver {
                    self.expr(*receiver);
                }
                for arg in args {
                    self.expr(*arg);
                }
                self.arguments(*method, args);
            }
            ExprKind::New {
                constructor, args, ..
            } => {
                for arg in args {
                    self.expr(*arg);
                }
                if let Some(constructor) = constructor {
                    self.arguments(*constructor, args);
                }
            }
            ExprKind::Cast { expr: operand, .. } => {
                self.expr(*operand);
                if self.checker.report_unsafe_casts {
                    let cast = self.refined(expr);
                    self.flow_into(ViolationCode::CastUnsafe, *operand, node.span, cast);
                }
            }
            ExprKind::Field {
                receiver: Some(receiver),
                ..
            } => self.expr(*receiver),
            ExprKind::ArrayAccess { array, index } => {
                self.expr(*array);
                self.expr(*index);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(*lhs);
                self.expr(*rhs);
            }
            ExprKind::Unary { expr: operand, .. } => self.expr(*operand),
            ExprKind::Field { receiver: None, .. }
            | ExprKind::Local(_)
            | ExprKind::Literal(_)
            | ExprKind::This
            | ExprKind::Invalid => {}
        }
    }

    fn arguments(&mut self, callee: MethodId, args: &[ExprId]) {
        let params = match self.checker.factory.param_types(self.cache, callee) {
            Ok(params) => params,
            Err(err) => {
                skipped(&err);
                return;
            }
        };
        for (arg, param) in args.iter().zip(params) {
            let span = self.body.expr(*arg).span;
            self.flow_into(ViolationCode::Argument, *arg, span, Some(param));
        }
    }

    /// Check that the refined type of `value` fits `expected`.
    fn flow_into(&mut self, code: ViolationCode, value: ExprId, span: Span, expected: Option<AnnotatedType>) {
        let (Some(expected), Some(found)) = (expected, self.refined(value)) else {
            return;
        };
        let site = UseSite::expr(self.method, value);
        self.checker
            .compare(&mut self.out, code, site, span, &found, &expected);
    }

    fn declared(&mut self, site: UseSite) -> Option<AnnotatedType> {
        match self.checker.factory.get_annotated_type(self.cache, &site) {
            Ok(ty) => Some(ty),
            Err(err) => {
                skipped(&err);
                None
            }
        }
    }

    fn refined(&self, expr: ExprId) -> Option<AnnotatedType> {
        let ty = self.refinement.expr_type(expr).cloned();
        if ty.is_none() {
            tracing::debug!(
                target: "qualia.check",
                method = ?self.method,
                expr = ?expr,
                "no refined type; skipping"
            );
        }
        ty
    }
}
