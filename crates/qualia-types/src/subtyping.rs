use qualia_hierarchy::QualifierHierarchy;

use crate::annotated::AnnotatedType;
use crate::annotator::ArrayCovariance;
use crate::store::{TypeNode, TypeStore, WildcardBound};

/// Qualifier subtyping of two fully annotated types in one hierarchy.
///
/// The primary qualifiers must be related by the hierarchy. Below the top
/// level, generic arguments of the same class are invariant unless the target
/// argument is a wildcard (`? extends` is covariant, `? super` contravariant),
/// and array components follow `covariance`. Host-level subtyping between
/// different classes is the host compiler's concern; only the primary
/// qualifiers are compared in that case.
#[must_use]
pub fn is_subtype(
    store: &TypeStore,
    hierarchy: &QualifierHierarchy,
    covariance: ArrayCovariance,
    sub: &AnnotatedType,
    sup: &AnnotatedType,
) -> bool {
    Subtyping {
        store,
        hierarchy,
        covariance,
    }
    .is_subtype(sub, sup)
}

struct Subtyping<'a> {
    store: &'a TypeStore,
    hierarchy: &'a QualifierHierarchy,
    covariance: ArrayCovariance,
}

impl Subtyping<'_> {
    fn is_subtype(&self, sub: &AnnotatedType, sup: &AnnotatedType) -> bool {
        let id = self.hierarchy.id();
        let (Some(a), Some(b)) = (sub.qualifier(id), sup.qualifier(id)) else {
            debug_assert!(false, "subtype check on a partially annotated type");
            return true;
        };
        if !self.hierarchy.is_subtype(a, b) {
            return false;
        }

        match (self.store.node(sub.underlying()), self.store.node(sup.underlying())) {
            (
                TypeNode::Declared { class: sub_class, .. },
                TypeNode::Declared { class: sup_class, .. },
            ) if sub_class == sup_class && sub.children().len() == sup.children().len() => sub
                .children()
                .iter()
                .zip(sup.children())
                .all(|(s, t)| self.contains(s, t)),
            (TypeNode::Array(_), TypeNode::Array(_)) => {
                match (sub.children().first(), sup.children().first()) {
                    (Some(s), Some(t)) => match self.covariance {
                        ArrayCovariance::Covariant => self.is_subtype(s, t),
                        ArrayCovariance::Invariant => self.same(s, t),
                    },
                    _ => true,
                }
            }
            _ => true,
        }
    }

    /// Type-argument containment: does argument `s` fit the slot `t`?
    fn contains(&self, s: &AnnotatedType, t: &AnnotatedType) -> bool {
        let TypeNode::Wildcard(bound) = self.store.node(t.underlying()) else {
            return self.same(s, t);
        };
        let Some(t_bound) = t.children().first() else {
            return true;
        };
        let id = self.hierarchy.id();
        let s_wildcard = match self.store.node(s.underlying()) {
            TypeNode::Wildcard(b) => Some(*b),
            _ => None,
        };
        match bound {
            WildcardBound::Unbounded => true,
            WildcardBound::Extends(_) => match s_wildcard {
                None => self.is_subtype(s, t_bound),
                Some(WildcardBound::Extends(_)) => s
                    .children()
                    .first()
                    .map_or(true, |s_bound| self.is_subtype(s_bound, t_bound)),
                // `?` and `? super X` are only bounded above by top.
                Some(_) => t_bound.qualifier(id) == Some(self.hierarchy.top()),
            },
            WildcardBound::Super(_) => match s_wildcard {
                None => self.is_subtype(t_bound, s),
                Some(WildcardBound::Super(_)) => s
                    .children()
                    .first()
                    .map_or(true, |s_bound| self.is_subtype(t_bound, s_bound)),
                // `?` and `? extends X` are only bounded below by bottom.
                Some(_) => t_bound.qualifier(id) == Some(self.hierarchy.bottom()),
            },
        }
    }

    fn same(&self, a: &AnnotatedType, b: &AnnotatedType) -> bool {
        self.is_subtype(a, b) && self.is_subtype(b, a)
    }
}
