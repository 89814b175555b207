use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use qualia_hierarchy::{HierarchyId, HierarchySet, Qualifier};

use crate::store::{TypeId, TypeNode, TypeStore, WildcardBound};

/// At most one qualifier per hierarchy, ordered by hierarchy id.
pub type QualifierMap = BTreeMap<HierarchyId, Qualifier>;

/// A host type shape decorated with qualifiers at every structural position.
///
/// Children follow the host shape: generic arguments for a declared type (one
/// per formal parameter when raw), `[component]` for an array, `[upper bound]`
/// for a type variable whose bound is declared, `[bound]` for a bounded
/// wildcard.
///
/// Values are immutable and cheap to clone. The structural hash is computed
/// once per node and shared by every clone, which is what makes caching
/// annotated types across use sites worthwhile.
#[derive(Clone)]
pub struct AnnotatedType(Arc<Inner>);

struct Inner {
    underlying: TypeId,
    qualifiers: QualifierMap,
    children: Vec<AnnotatedType>,
    hash: OnceLock<u64>,
}

impl AnnotatedType {
    #[must_use]
    pub fn new(underlying: TypeId, qualifiers: QualifierMap, children: Vec<AnnotatedType>) -> Self {
        AnnotatedType(Arc::new(Inner {
            underlying,
            qualifiers,
            children,
            hash: OnceLock::new(),
        }))
    }

    /// Mirror the shape of `ty` without any qualifiers.
    ///
    /// A type variable met again while its own bound is being mirrored is cut
    /// off: it is emitted without children, which keeps the mirror finite for
    /// recursive bounds such as `E extends Enum<E>`. Qualifiers written on a
    /// declared bound are copied onto the mirrored bound.
    #[must_use]
    pub fn unannotated(store: &TypeStore, ty: TypeId) -> Self {
        let mut visiting = HashSet::new();
        mirror(store, ty, &mut visiting)
    }

    #[must_use]
    pub fn underlying(&self) -> TypeId {
        self.0.underlying
    }

    #[must_use]
    pub fn qualifiers(&self) -> &QualifierMap {
        &self.0.qualifiers
    }

    #[must_use]
    pub fn qualifier(&self, hierarchy: HierarchyId) -> Option<Qualifier> {
        self.0.qualifiers.get(&hierarchy).copied()
    }

    #[must_use]
    pub fn children(&self) -> &[AnnotatedType] {
        &self.0.children
    }

    /// Replace the primary qualifier in `q`'s hierarchy.
    #[must_use]
    pub fn with_qualifier(&self, q: Qualifier) -> Self {
        if self.qualifier(q.hierarchy()) == Some(q) {
            return self.clone();
        }
        let mut qualifiers = self.0.qualifiers.clone();
        qualifiers.insert(q.hierarchy(), q);
        AnnotatedType::new(self.0.underlying, qualifiers, self.0.children.clone())
    }

    #[must_use]
    pub fn with_qualifiers(&self, qualifiers: QualifierMap) -> Self {
        if self.0.qualifiers == qualifiers {
            return self.clone();
        }
        AnnotatedType::new(self.0.underlying, qualifiers, self.0.children.clone())
    }

    #[must_use]
    pub fn with_children(&self, children: Vec<AnnotatedType>) -> Self {
        AnnotatedType::new(self.0.underlying, self.0.qualifiers.clone(), children)
    }

    /// Whether every hierarchy of `set` has a qualifier here and on every
    /// reachable child.
    #[must_use]
    pub fn is_fully_annotated(&self, set: &HierarchySet) -> bool {
        set.ids().all(|id| self.0.qualifiers.contains_key(&id))
            && self.0.children.iter().all(|c| c.is_fully_annotated(set))
    }

    /// Component type of an array.
    #[must_use]
    pub fn component(&self, store: &TypeStore) -> Option<&AnnotatedType> {
        match store.node(self.0.underlying) {
            TypeNode::Array(_) => self.0.children.first(),
            _ => None,
        }
    }

    /// Declared upper bound of a type variable.
    #[must_use]
    pub fn upper_bound(&self, store: &TypeStore) -> Option<&AnnotatedType> {
        match store.node(self.0.underlying) {
            TypeNode::TypeVar(_) => self.0.children.first(),
            _ => None,
        }
    }

    /// Lazily computed, memoized hash over the whole annotated structure.
    #[must_use]
    pub fn structural_hash(&self) -> u64 {
        *self.0.hash.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            self.0.underlying.hash(&mut hasher);
            self.0.qualifiers.hash(&mut hasher);
            self.0.children.len().hash(&mut hasher);
            for child in &self.0.children {
                hasher.write_u64(child.structural_hash());
            }
            hasher.finish()
        })
    }

    /// Whether both handles share one allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &AnnotatedType) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn display<'a>(&'a self, store: &'a TypeStore, set: &'a HierarchySet) -> TypeDisplay<'a> {
        TypeDisplay {
            ty: self,
            store,
            set,
        }
    }
}

fn mirror(store: &TypeStore, ty: TypeId, visiting: &mut HashSet<TypeId>) -> AnnotatedType {
    let children = match store.node(ty) {
        TypeNode::Declared { class, args } if args.is_empty() => store
            .class(*class)
            .type_params
            .iter()
            .map(|var| mirror(store, store.type_var(*var), visiting))
            .collect(),
        TypeNode::Declared { args, .. } => args
            .iter()
            .map(|arg| mirror(store, *arg, visiting))
            .collect(),
        TypeNode::Array(component) => vec![mirror(store, *component, visiting)],
        TypeNode::TypeVar(var) => {
            if !visiting.insert(ty) {
                return AnnotatedType::new(ty, QualifierMap::new(), Vec::new());
            }
            let def = store.type_param(*var);
            let bound = def.upper_bound.map(|bound| {
                let mirrored = mirror(store, bound, visiting);
                let explicit: QualifierMap = def
                    .bound_qualifiers
                    .iter()
                    .map(|q| (q.hierarchy(), *q))
                    .collect();
                mirrored.with_qualifiers(explicit)
            });
            visiting.remove(&ty);
            bound.into_iter().collect()
        }
        TypeNode::Wildcard(WildcardBound::Extends(bound) | WildcardBound::Super(bound)) => {
            vec![mirror(store, *bound, visiting)]
        }
        TypeNode::Wildcard(WildcardBound::Unbounded) | TypeNode::Primitive(_) | TypeNode::Null => {
            Vec::new()
        }
    };
    AnnotatedType::new(ty, QualifierMap::new(), children)
}

impl PartialEq for AnnotatedType {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.structural_hash() == other.structural_hash()
            && self.0.underlying == other.0.underlying
            && self.0.qualifiers == other.0.qualifiers
            && self.0.children == other.0.children
    }
}

impl Eq for AnnotatedType {}

impl Hash for AnnotatedType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

impl fmt::Debug for AnnotatedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("AnnotatedType");
        s.field("underlying", &self.0.underlying)
            .field("qualifiers", &self.0.qualifiers.values().collect::<Vec<_>>());
        if !self.0.children.is_empty() {
            s.field("children", &self.0.children);
        }
        s.finish()
    }
}

/// Java-like rendering of an annotated type: `@NonNull List<@Nullable String>`.
pub struct TypeDisplay<'a> {
    ty: &'a AnnotatedType,
    store: &'a TypeStore,
    set: &'a HierarchySet,
}

impl TypeDisplay<'_> {
    fn write_qualifiers(&self, f: &mut fmt::Formatter<'_>, ty: &AnnotatedType) -> fmt::Result {
        for q in ty.qualifiers().values() {
            write!(f, "@{} ", self.set.name_of(*q))?;
        }
        Ok(())
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, ty: &AnnotatedType) -> fmt::Result {
        match self.store.node(ty.underlying()) {
            TypeNode::Array(_) => {
                if let Some(component) = ty.children().first() {
                    self.write(f, component)?;
                }
                if !ty.qualifiers().is_empty() {
                    f.write_str(" ")?;
                    self.write_qualifiers(f, ty)?;
                }
                f.write_str("[]")
            }
            TypeNode::Declared { class, args } => {
                self.write_qualifiers(f, ty)?;
                f.write_str(self.store.simple_name(*class))?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (idx, child) in ty.children().iter().enumerate() {
                        if idx > 0 {
                            f.write_str(", ")?;
                        }
                        self.write(f, child)?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeNode::Wildcard(bound) => {
                self.write_qualifiers(f, ty)?;
                f.write_str("?")?;
                let keyword = match bound {
                    WildcardBound::Unbounded => return Ok(()),
                    WildcardBound::Extends(_) => " extends ",
                    WildcardBound::Super(_) => " super ",
                };
                f.write_str(keyword)?;
                match ty.children().first() {
                    Some(child) => self.write(f, child),
                    None => Ok(()),
                }
            }
            TypeNode::TypeVar(var) => {
                self.write_qualifiers(f, ty)?;
                f.write_str(&self.store.type_param(*var).name)
            }
            TypeNode::Primitive(p) => {
                self.write_qualifiers(f, ty)?;
                f.write_str(p.keyword())
            }
            TypeNode::Null => {
                self.write_qualifiers(f, ty)?;
                f.write_str("null")
            }
        }
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, self.ty)
    }
}
