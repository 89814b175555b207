use std::collections::HashMap;
use std::fmt;

use qualia_core::Name;
use qualia_hierarchy::Qualifier;

macro_rules! arena_id {
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

arena_id!(TypeId);
arena_id!(ClassId);
arena_id!(TypeVarId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WildcardBound {
    Unbounded,
    Extends(TypeId),
    Super(TypeId),
}

/// One node of the host type graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeNode {
    Primitive(PrimitiveType),
    /// A class or interface type. Raw when `args` is empty but the class
    /// declares type parameters.
    Declared { class: ClassId, args: Vec<TypeId> },
    Array(TypeId),
    TypeVar(TypeVarId),
    Wildcard(WildcardBound),
    /// The type of the `null` literal.
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: Name,
    pub type_params: Vec<TypeVarId>,
    pub super_class: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParamDef {
    pub name: Name,
    /// The `TypeVar` node referring to this parameter.
    pub ty: TypeId,
    pub upper_bound: Option<TypeId>,
    /// Qualifiers written on the declared bound, e.g. `T extends @NonNull Object`.
    pub bound_qualifiers: Vec<Qualifier>,
}

impl TypeParamDef {
    /// Explicit bound qualifier belonging to `hierarchy`, if any.
    #[must_use]
    pub fn bound_qualifier(&self, hierarchy: qualia_hierarchy::HierarchyId) -> Option<Qualifier> {
        self.bound_qualifiers
            .iter()
            .copied()
            .find(|q| q.hierarchy() == hierarchy)
    }
}

/// Hash-consed arena of host type shapes, classes and type parameters.
///
/// Structurally equal nodes are interned to the same [`TypeId`], so `TypeId`
/// equality is host type equality.
#[derive(Debug, Clone, Default)]
pub struct TypeStore {
    nodes: Vec<TypeNode>,
    interned: HashMap<TypeNode, TypeId>,
    classes: Vec<ClassDef>,
    class_by_name: HashMap<Name, ClassId>,
    type_params: Vec<TypeParamDef>,
    object: Option<ClassId>,
}

impl TypeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with the root class `java.lang.Object`.
    #[must_use]
    pub fn with_object() -> Self {
        let mut store = Self::new();
        let object = store.add_class("java.lang.Object", Vec::new());
        store.object = Some(object);
        store
    }

    #[must_use]
    pub fn object_class(&self) -> Option<ClassId> {
        self.object
    }

    /// Whether `ty` is the unparameterized root class type.
    #[must_use]
    pub fn is_object(&self, ty: TypeId) -> bool {
        matches!(
            self.node(ty),
            TypeNode::Declared { class, .. } if Some(*class) == self.object
        )
    }

    pub fn intern(&mut self, node: TypeNode) -> TypeId {
        if let Some(&id) = self.interned.get(&node) {
            return id;
        }
        let id = TypeId(self.nodes.len() as u32);
        self.nodes.push(node.clone());
        self.interned.insert(node, id);
        id
    }

    /// Look a node up without interning it.
    #[must_use]
    pub fn find(&self, node: &TypeNode) -> Option<TypeId> {
        self.interned.get(node).copied()
    }

    pub fn primitive(&mut self, ty: PrimitiveType) -> TypeId {
        self.intern(TypeNode::Primitive(ty))
    }

    pub fn declared(&mut self, class: ClassId, args: Vec<TypeId>) -> TypeId {
        self.intern(TypeNode::Declared { class, args })
    }

    pub fn array(&mut self, component: TypeId) -> TypeId {
        self.intern(TypeNode::Array(component))
    }

    pub fn wildcard(&mut self, bound: WildcardBound) -> TypeId {
        self.intern(TypeNode::Wildcard(bound))
    }

    pub fn null(&mut self) -> TypeId {
        self.intern(TypeNode::Null)
    }

    /// Declare a type parameter. Its bound may be set later, which is how
    /// self-referential bounds are expressed.
    pub fn add_type_param(&mut self, name: impl Into<Name>) -> TypeVarId {
        let var = TypeVarId(self.type_params.len() as u32);
        let ty = self.intern(TypeNode::TypeVar(var));
        self.type_params.push(TypeParamDef {
            name: name.into(),
            ty,
            upper_bound: None,
            bound_qualifiers: Vec::new(),
        });
        var
    }

    pub fn set_upper_bound(
        &mut self,
        var: TypeVarId,
        bound: TypeId,
        bound_qualifiers: Vec<Qualifier>,
    ) {
        let def = &mut self.type_params[var.idx()];
        def.upper_bound = Some(bound);
        def.bound_qualifiers = bound_qualifiers;
    }

    pub fn add_class(&mut self, name: impl Into<Name>, type_params: Vec<TypeVarId>) -> ClassId {
        let name = name.into();
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassDef {
            name: name.clone(),
            type_params,
            super_class: None,
            interfaces: Vec::new(),
        });
        self.class_by_name.insert(name, id);
        id
    }

    pub fn set_supertypes(&mut self, class: ClassId, super_class: Option<TypeId>, interfaces: Vec<TypeId>) {
        let def = &mut self.classes[class.idx()];
        def.super_class = super_class;
        def.interfaces = interfaces;
    }

    /// The `TypeVar` node of `var`.
    #[must_use]
    pub fn type_var(&self, var: TypeVarId) -> TypeId {
        self.type_params[var.idx()].ty
    }

    #[must_use]
    pub fn node(&self, id: TypeId) -> &TypeNode {
        &self.nodes[id.idx()]
    }

    #[must_use]
    pub fn get(&self, id: TypeId) -> Option<&TypeNode> {
        self.nodes.get(id.idx())
    }

    #[must_use]
    pub fn class(&self, id: ClassId) -> &ClassDef {
        &self.classes[id.idx()]
    }

    #[must_use]
    pub fn type_param(&self, id: TypeVarId) -> &TypeParamDef {
        &self.type_params[id.idx()]
    }

    #[must_use]
    pub fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.class_by_name.get(name).copied()
    }

    /// Whether `id` is a declared type written without arguments for a generic class.
    #[must_use]
    pub fn is_raw(&self, id: TypeId) -> bool {
        match self.node(id) {
            TypeNode::Declared { class, args } => {
                args.is_empty() && !self.class(*class).type_params.is_empty()
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Java-like rendering of a host type, using simple class names.
    #[must_use]
    pub fn display(&self, id: TypeId) -> String {
        let mut out = String::new();
        self.write_type(&mut out, id);
        out
    }

    fn write_type(&self, out: &mut String, id: TypeId) {
        match self.node(id) {
            TypeNode::Primitive(p) => out.push_str(p.keyword()),
            TypeNode::Declared { class, args } => {
                out.push_str(self.simple_name(*class));
                if !args.is_empty() {
                    out.push('<');
                    for (idx, arg) in args.iter().enumerate() {
                        if idx > 0 {
                            out.push_str(", ");
                        }
                        self.write_type(out, *arg);
                    }
                    out.push('>');
                }
            }
            TypeNode::Array(component) => {
                self.write_type(out, *component);
                out.push_str("[]");
            }
            TypeNode::TypeVar(var) => out.push_str(&self.type_param(*var).name),
            TypeNode::Wildcard(WildcardBound::Unbounded) => out.push('?'),
            TypeNode::Wildcard(WildcardBound::Extends(bound)) => {
                out.push_str("? extends ");
                self.write_type(out, *bound);
            }
            TypeNode::Wildcard(WildcardBound::Super(bound)) => {
                out.push_str("? super ");
                self.write_type(out, *bound);
            }
            TypeNode::Null => out.push_str("null"),
        }
    }

    #[must_use]
    pub fn simple_name(&self, class: ClassId) -> &str {
        let name = self.class(class).name.as_str();
        name.rsplit('.').next().unwrap_or(name)
    }
}
