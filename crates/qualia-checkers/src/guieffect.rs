use std::sync::Arc;

use qualia_factory::{CallContext, QualifierChecker, RefinementHooks};
use qualia_hierarchy::{HierarchyBuilder, MalformedHierarchy, Qualifier, QualifierHierarchy};
use qualia_types::{DeclKind, DefaultContext, DefaultingRules, TypePosition};

use crate::GUI_EFFECT;

/// `AlwaysSafe <: UI`. Values are safe unless declared otherwise; calls to
/// `@PolyUI` methods are as UI-bound as their most UI-bound operand.
#[derive(Debug)]
pub struct GuiEffectChecker {
    hierarchy: Arc<QualifierHierarchy>,
    safe: Qualifier,
    ui: Qualifier,
}

impl GuiEffectChecker {
    pub fn new() -> Result<Self, MalformedHierarchy> {
        let hierarchy = HierarchyBuilder::new(GUI_EFFECT, "guieffect")
            .chain(["AlwaysSafe", "UI"])
            .build()?;
        Ok(Self {
            safe: hierarchy.bottom(),
            ui: hierarchy.top(),
            hierarchy: Arc::new(hierarchy),
        })
    }
}

impl DefaultingRules for GuiEffectChecker {
    fn declaration_default(&self, _: &QualifierHierarchy, ctx: &DefaultContext<'_>) -> Option<Qualifier> {
        match ctx.position {
            TypePosition::Declaration(DeclKind::Local) => Some(self.ui),
            TypePosition::Declaration(DeclKind::Literal(_) | DeclKind::Operator | DeclKind::Cast) => None,
            TypePosition::Declaration(_) => Some(self.safe),
            _ => None,
        }
    }

    fn use_site_default(&self, _: &QualifierHierarchy, ctx: &DefaultContext<'_>) -> Option<Qualifier> {
        ctx.position.is_nested().then_some(self.safe)
    }
}

impl RefinementHooks for GuiEffectChecker {
    fn refine_call_result(&self, hierarchy: &QualifierHierarchy, ctx: &CallContext<'_>) -> Option<Qualifier> {
        if !ctx.decl.has_annotation("PolyUI") {
            return None;
        }
        ctx.receiver
            .into_iter()
            .chain(ctx.args)
            .filter_map(|ty| ty.qualifier(hierarchy.id()))
            .reduce(|a, b| hierarchy.least_upper_bound(a, b))
    }
}

impl QualifierChecker for GuiEffectChecker {
    fn name(&self) -> &str {
        "guieffect"
    }

    fn hierarchies(&self) -> Vec<Arc<QualifierHierarchy>> {
        vec![self.hierarchy.clone()]
    }
}
