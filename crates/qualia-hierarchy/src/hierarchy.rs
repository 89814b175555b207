use std::collections::HashMap;
use std::fmt;

use qualia_core::Name;

/// Identifies one qualifier hierarchy within a run.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HierarchyId(u32);

impl HierarchyId {
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        HierarchyId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for HierarchyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HierarchyId({})", self.0)
    }
}

/// An opaque qualifier tag. Belongs to exactly one hierarchy.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Qualifier {
    hierarchy: HierarchyId,
    index: u16,
}

impl Qualifier {
    pub(crate) fn new(hierarchy: HierarchyId, index: u16) -> Self {
        Self { hierarchy, index }
    }

    #[must_use]
    pub fn hierarchy(self) -> HierarchyId {
        self.hierarchy
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Qualifier({}#{})", self.hierarchy.0, self.index)
    }
}

/// A validated qualifier lattice.
///
/// Constructed only through [`crate::HierarchyBuilder`], which guarantees the
/// subtype relation is a partial order with a unique top and bottom and that
/// every pair has a least upper bound and a greatest lower bound. Both bounds
/// are tabulated at construction, so every query here is a table lookup.
#[derive(Clone)]
pub struct QualifierHierarchy {
    pub(crate) id: HierarchyId,
    pub(crate) name: Name,
    pub(crate) names: Vec<Name>,
    pub(crate) by_name: HashMap<Name, u16>,
    /// Row-major `n * n` reflexive-transitive closure: `leq[a * n + b]` iff `a <: b`.
    pub(crate) leq: Vec<bool>,
    pub(crate) lub: Vec<u16>,
    pub(crate) glb: Vec<u16>,
    pub(crate) top: u16,
    pub(crate) bottom: u16,
    pub(crate) height: usize,
}

impl QualifierHierarchy {
    #[must_use]
    pub fn id(&self) -> HierarchyId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn top(&self) -> Qualifier {
        Qualifier::new(self.id, self.top)
    }

    #[must_use]
    pub fn bottom(&self) -> Qualifier {
        Qualifier::new(self.id, self.bottom)
    }

    /// Length of the longest strictly increasing chain from bottom to top.
    ///
    /// A chain of `k` qualifiers has height `k - 1`; a single-qualifier
    /// hierarchy has height zero.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn contains(&self, q: Qualifier) -> bool {
        q.hierarchy == self.id && q.idx() < self.names.len()
    }

    /// Look up a qualifier by its declared name.
    #[must_use]
    pub fn qualifier(&self, name: &str) -> Option<Qualifier> {
        self.by_name
            .get(name)
            .map(|&index| Qualifier::new(self.id, index))
    }

    pub fn qualifiers(&self) -> impl ExactSizeIterator<Item = Qualifier> + '_ {
        (0..self.names.len()).map(move |index| Qualifier::new(self.id, index as u16))
    }

    #[must_use]
    pub fn name_of(&self, q: Qualifier) -> &str {
        self.check_owned(q);
        &self.names[q.idx()]
    }

    #[must_use]
    pub fn is_subtype(&self, sub: Qualifier, sup: Qualifier) -> bool {
        self.check_owned(sub);
        self.check_owned(sup);
        self.leq[sub.idx() * self.names.len() + sup.idx()]
    }

    #[must_use]
    pub fn least_upper_bound(&self, a: Qualifier, b: Qualifier) -> Qualifier {
        self.check_owned(a);
        self.check_owned(b);
        Qualifier::new(self.id, self.lub[a.idx() * self.names.len() + b.idx()])
    }

    #[must_use]
    pub fn greatest_lower_bound(&self, a: Qualifier, b: Qualifier) -> Qualifier {
        self.check_owned(a);
        self.check_owned(b);
        Qualifier::new(self.id, self.glb[a.idx() * self.names.len() + b.idx()])
    }

    fn check_owned(&self, q: Qualifier) {
        debug_assert!(
            self.contains(q),
            "{q:?} does not belong to hierarchy `{}` ({:?})",
            self.name,
            self.id
        );
    }
}

impl fmt::Debug for QualifierHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QualifierHierarchy")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("qualifiers", &self.names)
            .field("top", &self.names[self.top as usize])
            .field("bottom", &self.names[self.bottom as usize])
            .finish_non_exhaustive()
    }
}
