use std::fmt;

use qualia_core::{Name, Span};
use qualia_hierarchy::Qualifier;
use qualia_types::{ClassId, TypeId};

use crate::body::{Body, LocalId};

macro_rules! item_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[must_use]
            pub fn idx(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

item_id!(ClassDeclId);
item_id!(FieldId);
item_id!(MethodId);

/// A type as written in source: the resolved host type plus any explicit
/// qualifiers.
///
/// `nested` mirrors the children of the annotated type (generic arguments,
/// array component, ...) and may be shorter than the real shape; missing
/// entries carry no explicit qualifiers. `ty: None` is a host resolution
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeRef {
    pub ty: Option<TypeId>,
    pub qualifiers: Vec<Qualifier>,
    pub nested: Vec<TypeRef>,
}

impl TypeRef {
    #[must_use]
    pub fn new(ty: TypeId) -> Self {
        Self {
            ty: Some(ty),
            qualifiers: Vec::new(),
            nested: Vec::new(),
        }
    }

    #[must_use]
    pub fn unresolved() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, q: Qualifier) -> Self {
        self.qualifiers.push(q);
        self
    }

    #[must_use]
    pub fn with_nested(mut self, nested: Vec<TypeRef>) -> Self {
        self.nested = nested;
        self
    }

    /// Whether any explicit qualifier is written anywhere in this reference.
    #[must_use]
    pub fn has_explicit(&self) -> bool {
        !self.qualifiers.is_empty() || self.nested.iter().any(TypeRef::has_explicit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    pub name: Name,
}

impl Annotation {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.strip_prefix('@').unwrap_or(name).into(),
        }
    }

    /// Match by fully qualified or simple name.
    pub fn matches(&self, query: &str) -> bool {
        if self.name.as_str() == query {
            return true;
        }
        let annotation_simple = self.name.as_str().rsplit('.').next().unwrap_or(self.name.as_str());
        let query_simple = query.rsplit('.').next().unwrap_or(query);
        annotation_simple == query_simple
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub class: ClassId,
    pub name: Name,
    /// The class's own type as seen from inside its body (`this`).
    pub self_type: TypeRef,
    pub super_class: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub span: Span,
}

impl ClassDecl {
    pub fn new(class: ClassId, name: impl Into<Name>, self_type: TypeRef) -> Self {
        Self {
            class,
            name: name.into(),
            self_type,
            super_class: None,
            interfaces: Vec::new(),
            span: Span::new(0, 0),
        }
    }

    /// `super_class` followed by `interfaces`.
    pub fn supertypes(&self) -> impl Iterator<Item = &TypeRef> + '_ {
        self.super_class.iter().chain(&self.interfaces)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: Name,
    pub owner: ClassDeclId,
    pub ty: TypeRef,
    pub is_static: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    pub name: Name,
    pub owner: ClassDeclId,
    pub is_static: bool,
    /// Explicitly annotated receiver. `None` means the owner's `this` type.
    pub receiver: Option<TypeRef>,
    /// `None` for `void`.
    pub ret: Option<TypeRef>,
    pub body: Body,
    /// Methods this one overrides, nearest first.
    pub overrides: Vec<MethodId>,
    pub annotations: Vec<Annotation>,
    pub span: Span,
}

impl MethodDecl {
    pub fn new(owner: ClassDeclId, name: impl Into<Name>, body: Body) -> Self {
        Self {
            name: name.into(),
            owner,
            is_static: false,
            receiver: None,
            ret: None,
            body,
            overrides: Vec::new(),
            annotations: Vec::new(),
            span: Span::new(0, 0),
        }
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotations.iter().any(|a| a.matches(name))
    }

    /// Calls to side-effect-free methods preserve field refinements.
    pub fn is_side_effect_free(&self) -> bool {
        self.has_annotation("SideEffectFree") || self.has_annotation("Pure")
    }

    pub fn params(&self) -> Vec<LocalId> {
        self.body.params().collect()
    }
}

/// The resolved program handed over by the host compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    classes: Vec<ClassDecl>,
    fields: Vec<FieldDecl>,
    methods: Vec<MethodDecl>,
}

impl Program {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, class: ClassDecl) -> ClassDeclId {
        let id = ClassDeclId(self.classes.len() as u32);
        self.classes.push(class);
        id
    }

    pub fn add_field(&mut self, owner: ClassDeclId, name: impl Into<Name>, ty: TypeRef) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(FieldDecl {
            name: name.into(),
            owner,
            ty,
            is_static: false,
            span: Span::new(0, 0),
        });
        id
    }

    pub fn add_method(&mut self, method: MethodDecl) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(method);
        id
    }

    /// Mutable access for host-side fix-ups such as recording overrides
    /// after all methods are known.
    pub fn method_mut(&mut self, id: MethodId) -> &mut MethodDecl {
        &mut self.methods[id.idx()]
    }

    #[must_use]
    pub fn class(&self, id: ClassDeclId) -> Option<&ClassDecl> {
        self.classes.get(id.idx())
    }

    #[must_use]
    pub fn field(&self, id: FieldId) -> Option<&FieldDecl> {
        self.fields.get(id.idx())
    }

    #[must_use]
    pub fn method(&self, id: MethodId) -> Option<&MethodDecl> {
        self.methods.get(id.idx())
    }

    pub fn classes(&self) -> impl ExactSizeIterator<Item = (ClassDeclId, &ClassDecl)> + '_ {
        self.classes
            .iter()
            .enumerate()
            .map(|(idx, c)| (ClassDeclId(idx as u32), c))
    }

    pub fn fields(&self) -> impl ExactSizeIterator<Item = (FieldId, &FieldDecl)> + '_ {
        self.fields
            .iter()
            .enumerate()
            .map(|(idx, f)| (FieldId(idx as u32), f))
    }

    pub fn methods(&self) -> impl ExactSizeIterator<Item = (MethodId, &MethodDecl)> + '_ {
        self.methods
            .iter()
            .enumerate()
            .map(|(idx, m)| (MethodId(idx as u32), m))
    }
}
