use qualia_core::{Severity, Span};
use qualia_hierarchy::HierarchyId;
use qualia_hir::UseSite;
use qualia_types::AnnotatedType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViolationCode {
    Assignment,
    Argument,
    Return,
    /// Overriding parameter is not a supertype of the overridden one.
    OverrideParam,
    /// Overriding return type is not a subtype of the overridden one.
    OverrideReturn,
    CastUnsafe,
    ArrayStore,
}

impl ViolationCode {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            ViolationCode::Assignment => "assignment.type.incompatible",
            ViolationCode::Argument => "argument.type.incompatible",
            ViolationCode::Return => "return.type.incompatible",
            ViolationCode::OverrideParam => "override.param.invalid",
            ViolationCode::OverrideReturn => "override.return.invalid",
            ViolationCode::CastUnsafe => "cast.unsafe",
            ViolationCode::ArrayStore => "array.store.incompatible",
        }
    }

    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            ViolationCode::CastUnsafe => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Leading phrase of the rendered message.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            ViolationCode::Assignment => "incompatible types in assignment",
            ViolationCode::Argument => "incompatible types in argument",
            ViolationCode::Return => "incompatible types in return",
            ViolationCode::OverrideParam => "overridden parameter type is not accepted by the override",
            ViolationCode::OverrideReturn => "override returns a type the overridden method does not allow",
            ViolationCode::CastUnsafe => "cast may be unsafe",
            ViolationCode::ArrayStore => "incompatible types in array store",
        }
    }
}

/// A qualifier-subtyping failure in one hierarchy: `found` is not a subtype of
/// `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub site: UseSite,
    pub code: ViolationCode,
    pub span: Span,
    pub expected: AnnotatedType,
    pub found: AnnotatedType,
    pub hierarchy: HierarchyId,
}
