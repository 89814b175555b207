//! Built-in checker plug-ins.
//!
//! Each plug-in owns one hierarchy with a fixed id, so any combination of
//! them can be composed into a single [`qualia_factory::CheckerSet`].

mod guieffect;
mod nullness;
mod ownership;

use std::sync::Arc;

use qualia_factory::QualifierChecker;
use qualia_hierarchy::{HierarchyId, MalformedHierarchy};
use thiserror::Error;

pub use crate::guieffect::GuiEffectChecker;
pub use crate::nullness::NullnessChecker;
pub use crate::ownership::OwnershipChecker;

pub const NULLNESS: HierarchyId = HierarchyId::new(0);
pub const GUI_EFFECT: HierarchyId = HierarchyId::new(1);
pub const OWNERSHIP: HierarchyId = HierarchyId::new(2);

/// Names accepted by [`builtin`].
pub const BUILTIN_CHECKERS: &[&str] = &["nullness", "guieffect", "ownership"];

#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("unknown checker `{0}`")]
    Unknown(String),
    #[error(transparent)]
    Hierarchy(#[from] MalformedHierarchy),
}

/// Instantiate a built-in plug-in by name.
pub fn builtin(name: &str) -> Result<Arc<dyn QualifierChecker>, BuiltinError> {
    let checker: Arc<dyn QualifierChecker> = match name {
        "nullness" => Arc::new(NullnessChecker::new()?),
        "guieffect" => Arc::new(GuiEffectChecker::new()?),
        "ownership" => Arc::new(OwnershipChecker::new()?),
        other => return Err(BuiltinError::Unknown(other.to_string())),
    };
    tracing::debug!(target: "qualia.checkers", checker = name, "instantiated built-in checker");
    Ok(checker)
}
