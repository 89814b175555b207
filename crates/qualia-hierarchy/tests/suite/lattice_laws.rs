use proptest::prelude::*;
use qualia_hierarchy::{HierarchyBuilder, HierarchyId, Qualifier, QualifierHierarchy};

const PROPTEST_CASES: u32 = 256;

/// A bounded poset: `Bot < q_i < Top` for every middle qualifier plus random
/// forward edges `q_i < q_j` (`i < j`), which can never form a cycle.
fn arb_bounded_poset() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..=5).prop_flat_map(|n| {
        let pairs: Vec<(usize, usize)> = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();
        let len = pairs.len();
        (
            Just(n),
            prop::sample::subsequence(pairs, 0..=len),
        )
    })
}

fn build(n: usize, edges: &[(usize, usize)]) -> Option<QualifierHierarchy> {
    let mut builder = HierarchyBuilder::new(HierarchyId::new(0), "generated")
        .qualifiers(["Bot", "Top"])
        .qualifiers((0..n).map(|i| format!("q{i}")));
    for i in 0..n {
        builder = builder
            .subtype("Bot", format!("q{i}"))
            .subtype(format!("q{i}"), "Top");
    }
    for (i, j) in edges {
        builder = builder.subtype(format!("q{i}"), format!("q{j}"));
    }
    builder.build().ok()
}

fn all(h: &QualifierHierarchy) -> Vec<Qualifier> {
    h.qualifiers().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(PROPTEST_CASES))]

    #[test]
    fn subtyping_is_a_partial_order((n, edges) in arb_bounded_poset()) {
        let Some(h) = build(n, &edges) else { return Ok(()); };
        let qs = all(&h);
        for &a in &qs {
            prop_assert!(h.is_subtype(a, a));
            for &b in &qs {
                if a != b {
                    prop_assert!(!(h.is_subtype(a, b) && h.is_subtype(b, a)));
                }
                for &c in &qs {
                    if h.is_subtype(a, b) && h.is_subtype(b, c) {
                        prop_assert!(h.is_subtype(a, c));
                    }
                }
            }
        }
    }

    #[test]
    fn top_and_bottom_are_extremal((n, edges) in arb_bounded_poset()) {
        let Some(h) = build(n, &edges) else { return Ok(()); };
        for a in h.qualifiers() {
            prop_assert!(h.is_subtype(a, h.top()));
            prop_assert!(h.is_subtype(h.bottom(), a));
        }
    }

    #[test]
    fn lub_is_the_least_upper_bound((n, edges) in arb_bounded_poset()) {
        let Some(h) = build(n, &edges) else { return Ok(()); };
        let qs = all(&h);
        for &a in &qs {
            for &b in &qs {
                let u = h.least_upper_bound(a, b);
                prop_assert!(h.is_subtype(a, u) && h.is_subtype(b, u));
                prop_assert_eq!(u, h.least_upper_bound(b, a));
                for &v in &qs {
                    if h.is_subtype(a, v) && h.is_subtype(b, v) {
                        prop_assert!(h.is_subtype(u, v));
                    }
                }
            }
        }
    }

    #[test]
    fn glb_is_the_greatest_lower_bound((n, edges) in arb_bounded_poset()) {
        let Some(h) = build(n, &edges) else { return Ok(()); };
        let qs = all(&h);
        for &a in &qs {
            for &b in &qs {
                let l = h.greatest_lower_bound(a, b);
                prop_assert!(h.is_subtype(l, a) && h.is_subtype(l, b));
                for &v in &qs {
                    if h.is_subtype(v, a) && h.is_subtype(v, b) {
                        prop_assert!(h.is_subtype(v, l));
                    }
                }
            }
        }
    }

    #[test]
    fn subtype_iff_lub_is_the_supertype((n, edges) in arb_bounded_poset()) {
        let Some(h) = build(n, &edges) else { return Ok(()); };
        let qs = all(&h);
        for &a in &qs {
            for &b in &qs {
                prop_assert_eq!(h.is_subtype(a, b), h.least_upper_bound(a, b) == b);
                prop_assert_eq!(h.is_subtype(a, b), h.greatest_lower_bound(a, b) == a);
            }
        }
    }

    #[test]
    fn height_bounds_every_chain((n, edges) in arb_bounded_poset()) {
        let Some(h) = build(n, &edges) else { return Ok(()); };
        // Bot < q_i < Top always holds, and the middle layer adds at most n - 1 steps.
        prop_assert!(h.height() >= 2);
        prop_assert!(h.height() <= n + 1);
    }
}
