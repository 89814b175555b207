use std::fmt;

use qualia_core::{Name, Span};
use qualia_types::LiteralKind;

use crate::program::{FieldId, MethodId, TypeRef};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(u32);

impl StmtId {
    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StmtId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(u32);

impl LocalId {
    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKind {
    Param,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub name: Name,
    pub kind: LocalKind,
    pub ty: TypeRef,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    EqEq,
    NotEq,
    And,
    Or,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Local(LocalId),
    /// A field read. `receiver: None` is an implicit `this`.
    Field {
        receiver: Option<ExprId>,
        field: FieldId,
    },
    Call {
        receiver: Option<ExprId>,
        method: MethodId,
        args: Vec<ExprId>,
    },
    New {
        ty: TypeRef,
        constructor: Option<MethodId>,
        args: Vec<ExprId>,
    },
    Literal(LiteralKind),
    Cast {
        ty: TypeRef,
        expr: ExprId,
    },
    ArrayAccess {
        array: ExprId,
        index: ExprId,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnaryOp,
        expr: ExprId,
    },
    This,
    /// An expression the host failed to resolve.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Let {
        local: LocalId,
        initializer: Option<ExprId>,
    },
    /// `target` is a local, field or array element expression.
    Assign {
        target: ExprId,
        value: ExprId,
    },
    Expr(ExprId),
    If {
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        condition: ExprId,
        body: StmtId,
    },
    For {
        init: Option<StmtId>,
        condition: Option<ExprId>,
        update: Option<StmtId>,
        body: StmtId,
    },
    Return(Option<ExprId>),
    Throw(ExprId),
    Block(Vec<StmtId>),
    Break,
    Continue,
    Nop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Flow-oriented method body. Abstract and library methods carry only their
/// parameter locals and no root statement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Body {
    root: Option<StmtId>,
    stmts: Vec<Stmt>,
    exprs: Vec<Expr>,
    locals: Vec<Local>,
}

impl Body {
    #[must_use]
    pub fn root(&self) -> Option<StmtId> {
        self.root
    }

    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.idx()]
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.idx()]
    }

    #[must_use]
    pub fn local(&self, id: LocalId) -> &Local {
        &self.locals[id.idx()]
    }

    #[must_use]
    pub fn locals(&self) -> &[Local] {
        &self.locals
    }

    pub fn local_ids(&self) -> impl ExactSizeIterator<Item = LocalId> + '_ {
        (0..self.locals.len()).map(|idx| LocalId(idx as u32))
    }

    #[must_use]
    pub fn get_expr(&self, id: ExprId) -> Option<&Expr> {
        self.exprs.get(id.idx())
    }

    #[must_use]
    pub fn get_local(&self, id: LocalId) -> Option<&Local> {
        self.locals.get(id.idx())
    }

    pub fn exprs(&self) -> impl ExactSizeIterator<Item = (ExprId, &Expr)> + '_ {
        self.exprs
            .iter()
            .enumerate()
            .map(|(idx, e)| (ExprId(idx as u32), e))
    }

    #[must_use]
    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    /// Parameter locals in declaration order.
    pub fn params(&self) -> impl Iterator<Item = LocalId> + '_ {
        self.locals
            .iter()
            .enumerate()
            .filter(|(_, l)| l.kind == LocalKind::Param)
            .map(|(idx, _)| LocalId(idx as u32))
    }
}

/// Incremental constructor for [`Body`].
///
/// Nodes added without a span get an empty span at offset zero.
#[derive(Debug, Default)]
pub struct BodyBuilder {
    body: Body,
}

impl BodyBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(&mut self, name: impl Into<Name>, ty: TypeRef) -> LocalId {
        self.local_at(name, LocalKind::Param, ty, Span::new(0, 0))
    }

    pub fn local(&mut self, name: impl Into<Name>, ty: TypeRef) -> LocalId {
        self.local_at(name, LocalKind::Local, ty, Span::new(0, 0))
    }

    pub fn local_at(
        &mut self,
        name: impl Into<Name>,
        kind: LocalKind,
        ty: TypeRef,
        span: Span,
    ) -> LocalId {
        let id = LocalId(self.body.locals.len() as u32);
        self.body.locals.push(Local {
            name: name.into(),
            kind,
            ty,
            span,
        });
        id
    }

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        self.expr_at(kind, Span::new(0, 0))
    }

    pub fn expr_at(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId(self.body.exprs.len() as u32);
        self.body.exprs.push(Expr { kind, span });
        id
    }

    pub fn stmt(&mut self, kind: StmtKind) -> StmtId {
        self.stmt_at(kind, Span::new(0, 0))
    }

    pub fn stmt_at(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId(self.body.stmts.len() as u32);
        self.body.stmts.push(Stmt { kind, span });
        id
    }

    /// Finish a body rooted at `root` (usually a block).
    #[must_use]
    pub fn finish(mut self, root: StmtId) -> Body {
        self.body.root = Some(root);
        self.body
    }

    /// Finish a body without statements: parameters only.
    #[must_use]
    pub fn finish_abstract(self) -> Body {
        self.body
    }
}
