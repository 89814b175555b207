use std::collections::BTreeMap;

use qualia_hierarchy::HierarchySet;
use qualia_hir::{FieldId, LocalId};
use qualia_types::AnnotatedType;

/// A storage location whose qualifiers the refinement pass tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FlowValue {
    Local(LocalId),
    /// A field of `this`.
    Field(FieldId),
}

/// Refined types at one program point. Values not present have their
/// declared type.
///
/// Only primary qualifiers are refined; nested positions keep their
/// declared qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlowStore {
    values: BTreeMap<FlowValue, AnnotatedType>,
}

impl FlowStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, value: FlowValue) -> Option<&AnnotatedType> {
        self.values.get(&value)
    }

    pub fn insert(&mut self, value: FlowValue, ty: AnnotatedType) {
        self.values.insert(value, ty);
    }

    pub fn remove(&mut self, value: FlowValue) {
        self.values.remove(&value);
    }

    /// Forget every field refinement, e.g. after a call that may write fields.
    pub fn clear_fields(&mut self) {
        self.values.retain(|value, _| !matches!(value, FlowValue::Field(_)));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FlowValue, &AnnotatedType)> + '_ {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Merge at a join point: values present in both stores are combined by
    /// least upper bound in every hierarchy; the rest are dropped.
    #[must_use]
    pub fn join(&self, other: &FlowStore, set: &HierarchySet) -> FlowStore {
        let values = self
            .values
            .iter()
            .filter_map(|(key, a)| {
                let b = other.values.get(key)?;
                Some((*key, lub(a, b, set)))
            })
            .collect();
        FlowStore { values }
    }
}

fn lub(a: &AnnotatedType, b: &AnnotatedType, set: &HierarchySet) -> AnnotatedType {
    if a == b {
        return a.clone();
    }
    let mut qualifiers = a.qualifiers().clone();
    for hierarchy in set.iter() {
        let id = hierarchy.id();
        if let (Some(x), Some(y)) = (a.qualifier(id), b.qualifier(id)) {
            qualifiers.insert(id, hierarchy.least_upper_bound(x, y));
        }
    }
    a.with_qualifiers(qualifiers)
}
