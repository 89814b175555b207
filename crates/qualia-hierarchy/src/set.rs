use std::sync::Arc;

use crate::{HierarchyId, MalformedHierarchy, Qualifier, QualifierHierarchy};

/// The hierarchies active for one checking run, in registration order.
///
/// Hierarchies are immutable after construction and shared behind `Arc`, so
/// a set can be read concurrently by per-routine analyses.
#[derive(Debug, Clone, Default)]
pub struct HierarchySet {
    hierarchies: Vec<Arc<QualifierHierarchy>>,
}

impl HierarchySet {
    pub fn new(
        hierarchies: impl IntoIterator<Item = Arc<QualifierHierarchy>>,
    ) -> Result<Self, MalformedHierarchy> {
        let mut set = HierarchySet::default();
        for hierarchy in hierarchies {
            set.insert(hierarchy)?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, hierarchy: Arc<QualifierHierarchy>) -> Result<(), MalformedHierarchy> {
        if let Some(existing) = self.get(hierarchy.id()) {
            return Err(MalformedHierarchy::DuplicateHierarchy {
                id: hierarchy.id(),
                first: existing.name().into(),
                second: hierarchy.name().into(),
            });
        }
        self.hierarchies.push(hierarchy);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: HierarchyId) -> Option<&QualifierHierarchy> {
        self.hierarchies
            .iter()
            .find(|h| h.id() == id)
            .map(|h| h.as_ref())
    }

    #[must_use]
    pub fn shared(&self, id: HierarchyId) -> Option<&Arc<QualifierHierarchy>> {
        self.hierarchies.iter().find(|h| h.id() == id)
    }

    /// The hierarchy owning `q`.
    ///
    /// Panics if `q` was minted by a hierarchy outside this set.
    #[must_use]
    pub fn of(&self, q: Qualifier) -> &QualifierHierarchy {
        match self.get(q.hierarchy()) {
            Some(h) => h,
            None => panic!("{q:?} belongs to a hierarchy outside this set"),
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &QualifierHierarchy> + '_ {
        self.hierarchies.iter().map(|h| h.as_ref())
    }

    pub fn ids(&self) -> impl ExactSizeIterator<Item = HierarchyId> + '_ {
        self.hierarchies.iter().map(|h| h.id())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hierarchies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hierarchies.is_empty()
    }

    /// Display name of `q`, or `"?"` for a foreign qualifier.
    #[must_use]
    pub fn name_of(&self, q: Qualifier) -> &str {
        self.get(q.hierarchy())
            .filter(|h| h.contains(q))
            .map_or("?", |h| h.name_of(q))
    }

    /// Largest height among member hierarchies.
    #[must_use]
    pub fn max_height(&self) -> usize {
        self.iter().map(QualifierHierarchy::height).max().unwrap_or(0)
    }
}
