use std::collections::HashMap;

use qualia_hir::UseSite;
use qualia_types::AnnotatedType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Memoized annotated types for one checking run.
///
/// Owned by exactly one run and dropped with it; never shared between runs.
#[derive(Debug, Default)]
pub struct RunCache {
    types: HashMap<UseSite, AnnotatedType>,
    hits: u64,
    misses: u64,
}

impl RunCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&mut self, site: &UseSite) -> Option<AnnotatedType> {
        match self.types.get(site) {
            Some(ty) => {
                self.hits += 1;
                Some(ty.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub(crate) fn insert(&mut self, site: UseSite, ty: AnnotatedType) {
        self.types.insert(site, ty);
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.types.len(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
