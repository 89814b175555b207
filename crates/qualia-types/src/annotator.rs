use std::fmt;
use std::sync::Arc;

use qualia_hierarchy::{Qualifier, QualifierHierarchy};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::annotated::AnnotatedType;
use crate::store::{TypeId, TypeNode, TypeStore, WildcardBound};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
}

/// The kind of declaration (or expression) a type is written in.
///
/// Passed down unchanged through nested positions so that rules can tell, say,
/// the type arguments of a local variable apart from those of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Field,
    Parameter,
    Return,
    Local,
    Receiver,
    /// `extends`/`implements` clauses and the class's own declared type.
    ClassHeader,
    /// The type of a `new` expression.
    Instantiation,
    Cast,
    Literal(LiteralKind),
    /// Result of a unary or binary operator.
    Operator,
}

/// Structural position of one qualifier slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypePosition {
    /// The outermost type of a declaration or expression.
    Declaration(DeclKind),
    TypeArgument,
    /// A formal type parameter standing in for a missing argument of a raw type.
    RawTypeArgument,
    ArrayComponent,
    TypeVariableBound,
    WildcardExtendsBound,
    WildcardSuperBound,
}

impl TypePosition {
    #[must_use]
    pub fn is_nested(self) -> bool {
        !matches!(self, TypePosition::Declaration(_))
    }

    /// Qualifier used when no rule claims the slot.
    ///
    /// Lower bounds and fresh values (literals, operator results) fall back to
    /// bottom; every other position to top.
    #[must_use]
    pub fn fallback(self, hierarchy: &QualifierHierarchy) -> Qualifier {
        match self {
            TypePosition::WildcardSuperBound
            | TypePosition::Declaration(DeclKind::Literal(_) | DeclKind::Operator) => {
                hierarchy.bottom()
            }
            _ => hierarchy.top(),
        }
    }
}

/// Which default rule wins at nested positions when both could apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultPrecedence {
    /// Nested positions consult the use-site rule first; top-level positions
    /// consult the declaration rule first.
    #[default]
    UseSite,
    /// The declaration rule is consulted first everywhere.
    Declaration,
}

/// How array component qualifiers relate under subtyping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ArrayCovariance {
    /// `@A T[] <: @B T[]` whenever `@A T <: @B T` (unsound for stores, like the host).
    #[default]
    Covariant,
    /// Components must carry equal qualifiers.
    Invariant,
}

/// Everything a default rule may look at.
#[derive(Clone, Copy)]
pub struct DefaultContext<'a> {
    pub store: &'a TypeStore,
    pub ty: TypeId,
    pub position: TypePosition,
    /// The declaration the outermost type belongs to.
    pub declaration: DeclKind,
    /// Nesting depth below the outermost type.
    pub depth: usize,
}

impl fmt::Debug for DefaultContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultContext")
            .field("ty", &self.store.display(self.ty))
            .field("position", &self.position)
            .field("declaration", &self.declaration)
            .field("depth", &self.depth)
            .finish()
    }
}

/// Per-checker defaulting rules, keyed on structural position.
///
/// Returning `None` defers to the other rule and then to
/// [`TypePosition::fallback`].
pub trait DefaultingRules: Send + Sync {
    fn declaration_default(
        &self,
        hierarchy: &QualifierHierarchy,
        ctx: &DefaultContext<'_>,
    ) -> Option<Qualifier> {
        let _ = (hierarchy, ctx);
        None
    }

    fn use_site_default(
        &self,
        hierarchy: &QualifierHierarchy,
        ctx: &DefaultContext<'_>,
    ) -> Option<Qualifier> {
        let _ = (hierarchy, ctx);
        None
    }
}

/// Rules that never claim a slot: everything gets its structural fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefaults;

impl DefaultingRules for NoDefaults {}

struct Entry {
    hierarchy: Arc<QualifierHierarchy>,
    rules: Arc<dyn DefaultingRules>,
    precedence: DefaultPrecedence,
}

/// Fills every missing qualifier slot of an annotated type.
///
/// The annotator is immutable once its hierarchies are registered and may be
/// shared across threads. Explicit qualifiers are never overwritten, so
/// annotating a fully annotated type returns it unchanged (same allocation).
#[derive(Default)]
pub struct TypeAnnotator {
    entries: Vec<Entry>,
}

impl TypeAnnotator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        hierarchy: Arc<QualifierHierarchy>,
        rules: Arc<dyn DefaultingRules>,
        precedence: DefaultPrecedence,
    ) {
        self.entries.push(Entry {
            hierarchy,
            rules,
            precedence,
        });
    }

    /// Annotate the outermost type of a declaration of kind `declaration`.
    #[must_use]
    pub fn annotate(
        &self,
        store: &TypeStore,
        ty: &AnnotatedType,
        declaration: DeclKind,
    ) -> AnnotatedType {
        self.fill(store, ty, TypePosition::Declaration(declaration), declaration, 0)
    }

    /// Annotate a type that sits at `position` inside a declaration.
    #[must_use]
    pub fn annotate_at(
        &self,
        store: &TypeStore,
        ty: &AnnotatedType,
        position: TypePosition,
        declaration: DeclKind,
    ) -> AnnotatedType {
        self.fill(store, ty, position, declaration, usize::from(position.is_nested()))
    }

    fn fill(
        &self,
        store: &TypeStore,
        ty: &AnnotatedType,
        position: TypePosition,
        declaration: DeclKind,
        depth: usize,
    ) -> AnnotatedType {
        let node = store.node(ty.underlying());
        let ctx = DefaultContext {
            store,
            ty: ty.underlying(),
            position,
            declaration,
            depth,
        };

        let mut qualifiers = None;
        for entry in &self.entries {
            let id = entry.hierarchy.id();
            if ty.qualifier(id).is_some() {
                continue;
            }
            let q = match node {
                TypeNode::TypeVar(var) => store
                    .type_param(*var)
                    .bound_qualifier(id)
                    .unwrap_or_else(|| entry.hierarchy.top()),
                TypeNode::Wildcard(_) => entry.hierarchy.top(),
                _ => Self::default_for(entry, &ctx),
            };
            qualifiers
                .get_or_insert_with(|| ty.qualifiers().clone())
                .insert(id, q);
        }

        let child_position = match node {
            TypeNode::Declared { args, .. } if args.is_empty() => TypePosition::RawTypeArgument,
            TypeNode::Declared { .. } => TypePosition::TypeArgument,
            TypeNode::Array(_) => TypePosition::ArrayComponent,
            TypeNode::TypeVar(_) => TypePosition::TypeVariableBound,
            TypeNode::Wildcard(WildcardBound::Super(_)) => TypePosition::WildcardSuperBound,
            TypeNode::Wildcard(_) => TypePosition::WildcardExtendsBound,
            TypeNode::Primitive(_) | TypeNode::Null => TypePosition::TypeArgument,
        };
        let mut children_changed = false;
        let children: Vec<AnnotatedType> = ty
            .children()
            .iter()
            .map(|child| {
                let filled = self.fill(store, child, child_position, declaration, depth + 1);
                children_changed |= !filled.ptr_eq(child);
                filled
            })
            .collect();

        match (qualifiers, children_changed) {
            (None, false) => ty.clone(),
            (qualifiers, _) => AnnotatedType::new(
                ty.underlying(),
                qualifiers.unwrap_or_else(|| ty.qualifiers().clone()),
                children,
            ),
        }
    }

    fn default_for(entry: &Entry, ctx: &DefaultContext<'_>) -> Qualifier {
        let hierarchy = entry.hierarchy.as_ref();
        let declaration = || entry.rules.declaration_default(hierarchy, ctx);
        let use_site = || entry.rules.use_site_default(hierarchy, ctx);

        let chosen = if ctx.position.is_nested() && entry.precedence == DefaultPrecedence::UseSite
        {
            use_site().or_else(declaration)
        } else {
            declaration().or_else(use_site)
        };

        match chosen {
            Some(q) if hierarchy.contains(q) => q,
            Some(q) => {
                tracing::warn!(
                    target: "qualia.annotator",
                    hierarchy = hierarchy.name(),
                    qualifier = ?q,
                    "default rule returned a qualifier of another hierarchy; using fallback"
                );
                ctx.position.fallback(hierarchy)
            }
            None => ctx.position.fallback(hierarchy),
        }
    }
}

impl fmt::Debug for TypeAnnotator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeAnnotator")
            .field(
                "hierarchies",
                &self
                    .entries
                    .iter()
                    .map(|e| e.hierarchy.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
