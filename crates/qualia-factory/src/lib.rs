//! Checker plug-in interface and the memoizing annotated-type factory.
//!
//! A [`CheckerSet`] composes plug-ins into one set of hierarchies and one
//! [`qualia_types::TypeAnnotator`]. The [`AnnotatedTypeFactory`] answers "what
//! is the annotated type at this use site" for one run, memoizing into a
//! [`RunCache`] that the caller owns and drops when the run ends.

mod cache;
mod checker;
mod factory;
mod snapshot;

pub use crate::cache::{CacheStats, RunCache};
pub use crate::checker::{
    CallContext, CheckerOptions, CheckerSet, ConditionContext, Narrowing, QualifierChecker,
    RefinementHooks,
};
pub use crate::factory::{AnnotatedTypeFactory, UnresolvedSite};
pub use crate::snapshot::RoutineTypes;
