use qualia_hierarchy::Qualifier;
use qualia_types::{is_subtype, AnnotatedType, ArrayCovariance, TypeId, WildcardBound};

use super::fixture::Fixture;

fn leaf(fx: &Fixture, ty: TypeId, q: &str) -> AnnotatedType {
    node(fx, ty, fx.q(q), Vec::new())
}

fn node(fx: &Fixture, ty: TypeId, q: Qualifier, children: Vec<AnnotatedType>) -> AnnotatedType {
    AnnotatedType::new(ty, [(fx.hierarchy.id(), q)].into_iter().collect(), children)
}

fn sub(fx: &Fixture, a: &AnnotatedType, b: &AnnotatedType) -> bool {
    is_subtype(&fx.store, &fx.hierarchy, ArrayCovariance::Covariant, a, b)
}

#[test]
fn primary_qualifiers_follow_the_hierarchy() {
    let fx = Fixture::new();
    let bottom = leaf(&fx, fx.string, "BOTTOM");
    let top = leaf(&fx, fx.string, "TOP");
    assert!(sub(&fx, &bottom, &top));
    assert!(!sub(&fx, &top, &bottom));
    assert!(sub(&fx, &top, &top));
}

#[test]
fn type_arguments_are_invariant() {
    let mut fx = Fixture::new();
    let list_string = fx.list_of(fx.string);
    let top = fx.q("TOP");
    let of = |arg: &str| node(&fx, list_string, top, vec![leaf(&fx, fx.string, arg)]);

    assert!(sub(&fx, &of("MID"), &of("MID")));
    assert!(!sub(&fx, &of("BOTTOM"), &of("TOP")));
    assert!(!sub(&fx, &of("TOP"), &of("BOTTOM")));
}

#[test]
fn extends_wildcards_are_covariant() {
    let mut fx = Fixture::new();
    let wildcard = fx.store.wildcard(WildcardBound::Extends(fx.string));
    let list_wildcard = fx.list_of(wildcard);
    let list_string = fx.list_of(fx.string);
    let top = fx.q("TOP");

    let target = node(
        &fx,
        list_wildcard,
        top,
        vec![node(&fx, wildcard, top, vec![leaf(&fx, fx.string, "MID")])],
    );
    let of = |arg: &str| node(&fx, list_string, top, vec![leaf(&fx, fx.string, arg)]);

    assert!(sub(&fx, &of("BOTTOM"), &target));
    assert!(sub(&fx, &of("MID"), &target));
    assert!(!sub(&fx, &of("TOP"), &target));
}

#[test]
fn super_wildcards_are_contravariant() {
    let mut fx = Fixture::new();
    let wildcard = fx.store.wildcard(WildcardBound::Super(fx.string));
    let list_wildcard = fx.list_of(wildcard);
    let list_string = fx.list_of(fx.string);
    let top = fx.q("TOP");

    let target = node(
        &fx,
        list_wildcard,
        top,
        vec![node(&fx, wildcard, top, vec![leaf(&fx, fx.string, "MID")])],
    );
    let of = |arg: &str| node(&fx, list_string, top, vec![leaf(&fx, fx.string, arg)]);

    assert!(sub(&fx, &of("TOP"), &target));
    assert!(!sub(&fx, &of("BOTTOM"), &target));
}

#[test]
fn unbounded_wildcards_accept_any_argument() {
    let mut fx = Fixture::new();
    let wildcard = fx.store.wildcard(WildcardBound::Unbounded);
    let list_wildcard = fx.list_of(wildcard);
    let list_string = fx.list_of(fx.string);
    let top = fx.q("TOP");

    let target = node(&fx, list_wildcard, top, vec![node(&fx, wildcard, top, Vec::new())]);
    for arg in ["BOTTOM", "MID", "TOP"] {
        let source = node(&fx, list_string, top, vec![leaf(&fx, fx.string, arg)]);
        assert!(sub(&fx, &source, &target), "List<@{arg} String>");
    }
}

#[test]
fn array_components_follow_the_covariance_policy() {
    let mut fx = Fixture::new();
    let array = fx.store.array(fx.string);
    let top = fx.q("TOP");
    let of = |component: &str| node(&fx, array, top, vec![leaf(&fx, fx.string, component)]);
    let (narrow, wide) = (of("BOTTOM"), of("TOP"));

    assert!(is_subtype(&fx.store, &fx.hierarchy, ArrayCovariance::Covariant, &narrow, &wide));
    assert!(!is_subtype(&fx.store, &fx.hierarchy, ArrayCovariance::Invariant, &narrow, &wide));
    assert!(is_subtype(&fx.store, &fx.hierarchy, ArrayCovariance::Invariant, &wide, &wide));
    assert!(!is_subtype(&fx.store, &fx.hierarchy, ArrayCovariance::Covariant, &wide, &narrow));
}
