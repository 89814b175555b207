//! Qualifier hierarchies: the lattice each checker declares over its
//! qualifiers.
//!
//! A hierarchy is pure algebra. It knows nothing about host types or syntax;
//! it answers subtyping, least-upper-bound and greatest-lower-bound queries for
//! the qualifiers it owns. Several hierarchies can be active in one run (one or
//! more per checker) and they never interact.

mod builder;
mod error;
mod hierarchy;
mod set;

pub use crate::builder::HierarchyBuilder;
pub use crate::error::MalformedHierarchy;
pub use crate::hierarchy::{HierarchyId, Qualifier, QualifierHierarchy};
pub use crate::set::HierarchySet;
