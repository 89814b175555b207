//! Host type shapes and the annotated-type model layered on top of them.
//!
//! The host compiler resolves types; Qualia only mirrors their shape in a
//! [`TypeStore`] arena so that qualifiers can be attached at every structural
//! position. Type-variable bounds may refer back to the variable itself
//! (`T extends Comparable<T>`), so the arena is a graph, not a tree, and every
//! traversal here is guarded by a visited set keyed on node index.

mod annotated;
mod annotator;
mod store;
mod subtyping;

pub use crate::annotated::{AnnotatedType, QualifierMap, TypeDisplay};
pub use crate::annotator::{
    ArrayCovariance, DeclKind, DefaultContext, DefaultPrecedence, DefaultingRules, LiteralKind,
    NoDefaults, TypeAnnotator, TypePosition,
};
pub use crate::store::{
    ClassDef, ClassId, PrimitiveType, TypeId, TypeNode, TypeParamDef, TypeStore, TypeVarId,
    WildcardBound,
};
pub use crate::subtyping::is_subtype;
