use crate::body::{ExprId, LocalId};
use crate::program::{ClassDeclId, FieldId, MethodId};

/// The declaration a use site is lexically nested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    Class(ClassDeclId),
    Field(FieldId),
    Method(MethodId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SiteNode {
    /// The owner's own declared type: a field's type, a method's return type,
    /// or a class's `this` type.
    Declared,
    Receiver,
    Local(LocalId),
    Expr(ExprId),
    /// `extends`/`implements` clause at this index (superclass first).
    Supertype(u32),
}

/// A program location whose annotated type can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UseSite {
    pub owner: Owner,
    pub node: SiteNode,
}

impl UseSite {
    #[must_use]
    pub fn field(field: FieldId) -> Self {
        Self {
            owner: Owner::Field(field),
            node: SiteNode::Declared,
        }
    }

    #[must_use]
    pub fn ret(method: MethodId) -> Self {
        Self {
            owner: Owner::Method(method),
            node: SiteNode::Declared,
        }
    }

    #[must_use]
    pub fn receiver(method: MethodId) -> Self {
        Self {
            owner: Owner::Method(method),
            node: SiteNode::Receiver,
        }
    }

    #[must_use]
    pub fn local(method: MethodId, local: LocalId) -> Self {
        Self {
            owner: Owner::Method(method),
            node: SiteNode::Local(local),
        }
    }

    #[must_use]
    pub fn expr(method: MethodId, expr: ExprId) -> Self {
        Self {
            owner: Owner::Method(method),
            node: SiteNode::Expr(expr),
        }
    }

    #[must_use]
    pub fn class(class: ClassDeclId) -> Self {
        Self {
            owner: Owner::Class(class),
            node: SiteNode::Declared,
        }
    }

    #[must_use]
    pub fn supertype(class: ClassDeclId, index: u32) -> Self {
        Self {
            owner: Owner::Class(class),
            node: SiteNode::Supertype(index),
        }
    }
}
