use qualia_core::Name;
use thiserror::Error;

use crate::HierarchyId;

/// A checker declared a qualifier relation that is not a valid lattice.
///
/// This is a configuration defect of the checker, never a property of the
/// program under analysis, so it is fatal: no checking run may start with it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedHierarchy {
    #[error("hierarchy `{hierarchy}` declares no qualifiers")]
    Empty { hierarchy: Name },
    #[error("hierarchy `{hierarchy}` declares qualifier `{qualifier}` more than once")]
    DuplicateQualifier { hierarchy: Name, qualifier: Name },
    #[error("hierarchy `{hierarchy}` references undeclared qualifier `{qualifier}`")]
    UnknownQualifier { hierarchy: Name, qualifier: Name },
    #[error("hierarchy `{hierarchy}` declares {count} qualifiers, at most {max} are supported")]
    TooManyQualifiers {
        hierarchy: Name,
        count: usize,
        max: usize,
    },
    #[error("hierarchy `{hierarchy}` has a subtyping cycle between `{first}` and `{second}`")]
    Cycle {
        hierarchy: Name,
        first: Name,
        second: Name,
    },
    #[error("hierarchy `{hierarchy}` has no unique top qualifier")]
    MissingTop { hierarchy: Name },
    #[error("hierarchy `{hierarchy}` has no unique bottom qualifier")]
    MissingBottom { hierarchy: Name },
    #[error("declared top `{qualifier}` of hierarchy `{hierarchy}` is not a supertype of every qualifier")]
    NotTop { hierarchy: Name, qualifier: Name },
    #[error("declared bottom `{qualifier}` of hierarchy `{hierarchy}` is not a subtype of every qualifier")]
    NotBottom { hierarchy: Name, qualifier: Name },
    #[error("qualifiers `{first}` and `{second}` of hierarchy `{hierarchy}` have no least upper bound")]
    NoLeastUpperBound {
        hierarchy: Name,
        first: Name,
        second: Name,
    },
    #[error("qualifiers `{first}` and `{second}` of hierarchy `{hierarchy}` have no greatest lower bound")]
    NoGreatestLowerBound {
        hierarchy: Name,
        first: Name,
        second: Name,
    },
    #[error("hierarchy id {id:?} is used by both `{first}` and `{second}`")]
    DuplicateHierarchy {
        id: HierarchyId,
        first: Name,
        second: Name,
    },
}
