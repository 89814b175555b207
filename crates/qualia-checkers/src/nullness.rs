use std::sync::Arc;

use qualia_factory::{ConditionContext, Narrowing, QualifierChecker, RefinementHooks};
use qualia_hierarchy::{HierarchyBuilder, MalformedHierarchy, Qualifier, QualifierHierarchy};
use qualia_hir::{BinaryOp, Body, ExprId, ExprKind, UnaryOp};
use qualia_types::{DeclKind, DefaultContext, DefaultingRules, LiteralKind, TypePosition};

use crate::NULLNESS;

/// `NonNull <: Nullable`.
///
/// Declarations are non-null except locals, which start nullable and are
/// refined by flow, and type-variable bounds. `x != null` and `x == null`
/// guards narrow `x` on both edges.
#[derive(Debug)]
pub struct NullnessChecker {
    hierarchy: Arc<QualifierHierarchy>,
    non_null: Qualifier,
    nullable: Qualifier,
}

impl NullnessChecker {
    pub fn new() -> Result<Self, MalformedHierarchy> {
        let hierarchy = HierarchyBuilder::new(NULLNESS, "nullness")
            .chain(["NonNull", "Nullable"])
            .build()?;
        Ok(Self {
            non_null: hierarchy.bottom(),
            nullable: hierarchy.top(),
            hierarchy: Arc::new(hierarchy),
        })
    }

    fn narrow(&self, body: &Body, expr: ExprId) -> Vec<Narrowing> {
        match &body.expr(expr).kind {
            ExprKind::Binary {
                op: op @ (BinaryOp::NotEq | BinaryOp::EqEq),
                lhs,
                rhs,
            } => {
                let target = if is_null(body, *rhs) {
                    *lhs
                } else if is_null(body, *lhs) {
                    *rhs
                } else {
                    return Vec::new();
                };
                let not_null = Narrowing {
                    target,
                    when_true: Some(self.non_null),
                    when_false: Some(self.nullable),
                };
                vec![if *op == BinaryOp::NotEq {
                    not_null
                } else {
                    not_null.negate()
                }]
            }
            // `a && b` proves both operands only when true.
            ExprKind::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } => self
                .narrow(body, *lhs)
                .into_iter()
                .chain(self.narrow(body, *rhs))
                .map(|n| Narrowing {
                    when_false: None,
                    ..n
                })
                .collect(),
            ExprKind::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs,
            } => self
                .narrow(body, *lhs)
                .into_iter()
                .chain(self.narrow(body, *rhs))
                .map(|n| Narrowing {
                    when_true: None,
                    ..n
                })
                .collect(),
            ExprKind::Unary {
                op: UnaryOp::Not,
                expr,
            } => self
                .narrow(body, *expr)
                .into_iter()
                .map(Narrowing::negate)
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn is_null(body: &Body, expr: ExprId) -> bool {
    matches!(body.expr(expr).kind, ExprKind::Literal(LiteralKind::Null))
}

impl DefaultingRules for NullnessChecker {
    fn declaration_default(&self, _: &QualifierHierarchy, ctx: &DefaultContext<'_>) -> Option<Qualifier> {
        match ctx.position {
            TypePosition::Declaration(DeclKind::Local) | TypePosition::TypeVariableBound => {
                Some(self.nullable)
            }
            TypePosition::Declaration(DeclKind::Literal(_) | DeclKind::Operator | DeclKind::Cast) => None,
            TypePosition::Declaration(_) => Some(self.non_null),
            _ => None,
        }
    }

    fn use_site_default(&self, _: &QualifierHierarchy, ctx: &DefaultContext<'_>) -> Option<Qualifier> {
        match ctx.position {
            TypePosition::TypeArgument
            | TypePosition::RawTypeArgument
            | TypePosition::ArrayComponent => Some(self.non_null),
            _ => None,
        }
    }
}

impl RefinementHooks for NullnessChecker {
    fn narrow_condition(&self, ctx: &ConditionContext<'_>) -> Vec<Narrowing> {
        self.narrow(ctx.body, ctx.condition)
    }
}

impl QualifierChecker for NullnessChecker {
    fn name(&self) -> &str {
        "nullness"
    }

    fn hierarchies(&self) -> Vec<Arc<QualifierHierarchy>> {
        vec![self.hierarchy.clone()]
    }

    fn literal_qualifier(&self, _: &QualifierHierarchy, literal: LiteralKind) -> Option<Qualifier> {
        Some(match literal {
            LiteralKind::Null => self.nullable,
            _ => self.non_null,
        })
    }
}
