use std::collections::HashMap;

use qualia_core::Name;

use crate::{HierarchyId, MalformedHierarchy, QualifierHierarchy};

const MAX_QUALIFIERS: usize = u16::MAX as usize;

/// Declarative description of a qualifier hierarchy.
///
/// Checkers list their qualifiers and the direct subtype edges between them;
/// [`HierarchyBuilder::build`] closes the relation and validates that it forms
/// a lattice.
///
/// ```
/// use qualia_hierarchy::{HierarchyBuilder, HierarchyId};
///
/// let nullness = HierarchyBuilder::new(HierarchyId::new(0), "nullness")
///     .qualifiers(["Nullable", "NonNull"])
///     .subtype("NonNull", "Nullable")
///     .build()
///     .unwrap();
/// let non_null = nullness.qualifier("NonNull").unwrap();
/// assert_eq!(nullness.bottom(), non_null);
/// ```
#[derive(Debug, Clone)]
pub struct HierarchyBuilder {
    id: HierarchyId,
    name: Name,
    qualifiers: Vec<Name>,
    edges: Vec<(Name, Name)>,
    top: Option<Name>,
    bottom: Option<Name>,
}

impl HierarchyBuilder {
    pub fn new(id: HierarchyId, name: impl Into<Name>) -> Self {
        Self {
            id,
            name: name.into(),
            qualifiers: Vec::new(),
            edges: Vec::new(),
            top: None,
            bottom: None,
        }
    }

    #[must_use]
    pub fn qualifier(mut self, name: impl Into<Name>) -> Self {
        self.qualifiers.push(name.into());
        self
    }

    #[must_use]
    pub fn qualifiers<I, N>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Name>,
    {
        self.qualifiers.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declare `sub <: sup`.
    #[must_use]
    pub fn subtype(mut self, sub: impl Into<Name>, sup: impl Into<Name>) -> Self {
        self.edges.push((sub.into(), sup.into()));
        self
    }

    /// Declare a totally ordered chain, listed from bottom to top.
    ///
    /// Qualifiers not yet declared are added.
    #[must_use]
    pub fn chain<I, N>(mut self, bottom_to_top: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Name>,
    {
        let chain: Vec<Name> = bottom_to_top.into_iter().map(Into::into).collect();
        for name in &chain {
            if !self.qualifiers.contains(name) {
                self.qualifiers.push(name.clone());
            }
        }
        for pair in chain.windows(2) {
            self.edges.push((pair[0].clone(), pair[1].clone()));
        }
        self
    }

    /// Pin the top qualifier. Without this the unique maximum is inferred.
    #[must_use]
    pub fn top(mut self, name: impl Into<Name>) -> Self {
        self.top = Some(name.into());
        self
    }

    /// Pin the bottom qualifier. Without this the unique minimum is inferred.
    #[must_use]
    pub fn bottom(mut self, name: impl Into<Name>) -> Self {
        self.bottom = Some(name.into());
        self
    }

    pub fn build(self) -> Result<QualifierHierarchy, MalformedHierarchy> {
        let hierarchy = self.name.clone();
        let n = self.qualifiers.len();
        if n == 0 {
            return Err(MalformedHierarchy::Empty { hierarchy });
        }
        if n > MAX_QUALIFIERS {
            return Err(MalformedHierarchy::TooManyQualifiers {
                hierarchy: hierarchy.clone(),
                count: n,
                max: MAX_QUALIFIERS,
            });
        }

        let mut by_name: HashMap<Name, u16> = HashMap::with_capacity(n);
        for (idx, name) in self.qualifiers.iter().enumerate() {
            if by_name.insert(name.clone(), idx as u16).is_some() {
                return Err(MalformedHierarchy::DuplicateQualifier {
                    hierarchy: hierarchy.clone(),
                    qualifier: name.clone(),
                });
            }
        }

        let lookup = |name: &Name| -> Result<usize, MalformedHierarchy> {
            by_name
                .get(name)
                .map(|&idx| idx as usize)
                .ok_or_else(|| MalformedHierarchy::UnknownQualifier {
                    hierarchy: hierarchy.clone(),
                    qualifier: name.clone(),
                })
        };

        // Reflexive-transitive closure (Warshall).
        let mut leq = vec![false; n * n];
        for i in 0..n {
            leq[i * n + i] = true;
        }
        for (sub, sup) in &self.edges {
            let (sub, sup) = (lookup(sub)?, lookup(sup)?);
            leq[sub * n + sup] = true;
        }
        for k in 0..n {
            for i in 0..n {
                if !leq[i * n + k] {
                    continue;
                }
                for j in 0..n {
                    if leq[k * n + j] {
                        leq[i * n + j] = true;
                    }
                }
            }
        }

        for a in 0..n {
            for b in (a + 1)..n {
                if leq[a * n + b] && leq[b * n + a] {
                    return Err(MalformedHierarchy::Cycle {
                        hierarchy: hierarchy.clone(),
                        first: self.qualifiers[a].clone(),
                        second: self.qualifiers[b].clone(),
                    });
                }
            }
        }

        let is_max = |q: usize| (0..n).all(|x| leq[x * n + q]);
        let is_min = |q: usize| (0..n).all(|x| leq[q * n + x]);

        let top = match &self.top {
            Some(name) => {
                let q = lookup(name)?;
                if !is_max(q) {
                    return Err(MalformedHierarchy::NotTop {
                        hierarchy: hierarchy.clone(),
                        qualifier: name.clone(),
                    });
                }
                q
            }
            None => (0..n)
                .find(|&q| is_max(q))
                .ok_or_else(|| MalformedHierarchy::MissingTop {
                    hierarchy: hierarchy.clone(),
                })?,
        };
        let bottom = match &self.bottom {
            Some(name) => {
                let q = lookup(name)?;
                if !is_min(q) {
                    return Err(MalformedHierarchy::NotBottom {
                        hierarchy: hierarchy.clone(),
                        qualifier: name.clone(),
                    });
                }
                q
            }
            None => (0..n)
                .find(|&q| is_min(q))
                .ok_or_else(|| MalformedHierarchy::MissingBottom {
                    hierarchy: hierarchy.clone(),
                })?,
        };

        let mut lub = vec![0u16; n * n];
        let mut glb = vec![0u16; n * n];
        for a in 0..n {
            for b in a..n {
                let upper = least_of(n, &leq, |u| leq[a * n + u] && leq[b * n + u]).ok_or_else(
                    || MalformedHierarchy::NoLeastUpperBound {
                        hierarchy: hierarchy.clone(),
                        first: self.qualifiers[a].clone(),
                        second: self.qualifiers[b].clone(),
                    },
                )?;
                let lower = greatest_of(n, &leq, |l| leq[l * n + a] && leq[l * n + b])
                    .ok_or_else(|| MalformedHierarchy::NoGreatestLowerBound {
                        hierarchy: hierarchy.clone(),
                        first: self.qualifiers[a].clone(),
                        second: self.qualifiers[b].clone(),
                    })?;
                lub[a * n + b] = upper as u16;
                lub[b * n + a] = upper as u16;
                glb[a * n + b] = lower as u16;
                glb[b * n + a] = lower as u16;
            }
        }

        let height = longest_chain(n, &leq);
        tracing::debug!(
            target: "qualia.hierarchy",
            hierarchy = %self.name,
            qualifiers = n,
            height,
            "built qualifier hierarchy"
        );

        Ok(QualifierHierarchy {
            id: self.id,
            name: self.name,
            names: self.qualifiers,
            by_name,
            leq,
            lub,
            glb,
            top: top as u16,
            bottom: bottom as u16,
            height,
        })
    }
}

/// The element of `{x | pred(x)}` below every other member, if any.
fn least_of(n: usize, leq: &[bool], pred: impl Fn(usize) -> bool) -> Option<usize> {
    let members: Vec<usize> = (0..n).filter(|&x| pred(x)).collect();
    members
        .iter()
        .copied()
        .find(|&m| members.iter().all(|&o| leq[m * n + o]))
}

/// The element of `{x | pred(x)}` above every other member, if any.
fn greatest_of(n: usize, leq: &[bool], pred: impl Fn(usize) -> bool) -> Option<usize> {
    let members: Vec<usize> = (0..n).filter(|&x| pred(x)).collect();
    members
        .iter()
        .copied()
        .find(|&m| members.iter().all(|&o| leq[o * n + m]))
}

fn longest_chain(n: usize, leq: &[bool]) -> usize {
    // If `a <: b` strictly then everything below `a` is also below `b`, so
    // ordering by the size of the down-set is a topological order.
    let down: Vec<usize> = (0..n)
        .map(|q| (0..n).filter(|&x| leq[x * n + q]).count())
        .collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|&q| down[q]);

    let mut depth = vec![0usize; n];
    for &q in &order {
        depth[q] = (0..n)
            .filter(|&x| x != q && leq[x * n + q])
            .map(|x| depth[x] + 1)
            .max()
            .unwrap_or(0);
    }
    depth.into_iter().max().unwrap_or(0)
}
