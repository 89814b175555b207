//! Resolved host program model consumed by the checking engine.
//!
//! The host compiler owns parsing and name resolution; what reaches Qualia is
//! a fully resolved program: classes, fields, method signatures and flow
//! oriented method bodies whose types are already interned in a
//! [`qualia_types::TypeStore`]. Explicit qualifiers written in the source are
//! carried on [`TypeRef`]s.

mod body;
mod program;
mod site;

pub use crate::body::{
    BinaryOp, Body, BodyBuilder, Expr, ExprId, ExprKind, Local, LocalId, LocalKind, Stmt, StmtId,
    StmtKind, UnaryOp,
};
pub use crate::program::{Annotation, ClassDecl, ClassDeclId, FieldDecl, FieldId, MethodDecl, MethodId, Program, TypeRef};
pub use crate::site::{Owner, SiteNode, UseSite};
