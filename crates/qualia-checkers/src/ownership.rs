use std::sync::Arc;

use qualia_factory::{QualifierChecker, RefinementHooks};
use qualia_hierarchy::{HierarchyBuilder, MalformedHierarchy, Qualifier, QualifierHierarchy};
use qualia_types::{DeclKind, DefaultContext, DefaultingRules, TypePosition};

use crate::OWNERSHIP;

const OWNERS: [&str; 4] = ["This", "Dominator", "Modifier", "O"];

/// OIGJ ownership: `OwnershipBottom <: {This, Dominator, Modifier, O} <: World`.
///
/// An unannotated `Object` in a class header (`extends Object`, or the
/// implicit root) is owned by `World`; every other declaration defaults to
/// `This`.
#[derive(Debug)]
pub struct OwnershipChecker {
    hierarchy: Arc<QualifierHierarchy>,
    this: Qualifier,
    world: Qualifier,
}

impl OwnershipChecker {
    pub fn new() -> Result<Self, MalformedHierarchy> {
        let mut builder = HierarchyBuilder::new(OWNERSHIP, "ownership")
            .qualifiers(["OwnershipBottom", "World"])
            .qualifiers(OWNERS)
            .bottom("OwnershipBottom")
            .top("World");
        for owner in OWNERS {
            builder = builder
                .subtype("OwnershipBottom", owner)
                .subtype(owner, "World");
        }
        let hierarchy = builder.build()?;
        Ok(Self {
            this: hierarchy
                .qualifier("This")
                .unwrap_or_else(|| hierarchy.top()),
            world: hierarchy.top(),
            hierarchy: Arc::new(hierarchy),
        })
    }
}

impl DefaultingRules for OwnershipChecker {
    fn declaration_default(&self, _: &QualifierHierarchy, ctx: &DefaultContext<'_>) -> Option<Qualifier> {
        if ctx.declaration == DeclKind::ClassHeader && ctx.store.is_object(ctx.ty) {
            return Some(self.world);
        }
        match ctx.position {
            TypePosition::Declaration(DeclKind::Literal(_) | DeclKind::Operator | DeclKind::Cast) => None,
            TypePosition::Declaration(_) | TypePosition::TypeArgument | TypePosition::RawTypeArgument => {
                Some(self.this)
            }
            _ => None,
        }
    }
}

impl RefinementHooks for OwnershipChecker {}

impl QualifierChecker for OwnershipChecker {
    fn name(&self) -> &str {
        "ownership"
    }

    fn hierarchies(&self) -> Vec<Arc<QualifierHierarchy>> {
        vec![self.hierarchy.clone()]
    }
}
