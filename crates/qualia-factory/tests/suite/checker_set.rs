use std::sync::Arc;

use qualia_factory::{CheckerOptions, CheckerSet, QualifierChecker};
use qualia_hierarchy::MalformedHierarchy;
use qualia_types::{ArrayCovariance, DefaultPrecedence, LiteralKind};

use super::fixture::{Fixture, TestChecker};

#[test]
fn hierarchies_of_different_checkers_must_not_collide() {
    let a: Arc<dyn QualifierChecker> = Arc::new(TestChecker::new(7, "TOP"));
    let b: Arc<dyn QualifierChecker> = Arc::new(TestChecker::new(7, "BOTTOM"));
    let err = CheckerSet::new(vec![a, b]).unwrap_err();
    assert!(matches!(err, MalformedHierarchy::DuplicateHierarchy { .. }));
}

#[test]
fn overridden_options_are_reported_per_hierarchy() {
    let options = CheckerOptions {
        array_covariance: ArrayCovariance::Invariant,
        default_precedence: DefaultPrecedence::Declaration,
    };
    let fx = Fixture::with_options(options);
    assert_eq!(fx.checkers.options_for(fx.hierarchy.id()), options);
    assert_eq!(fx.checkers.len(), 1);
    assert_eq!(
        fx.checkers.owner_of(fx.hierarchy.id()).map(|c| c.name()),
        Some("test")
    );
}

#[test]
fn literal_qualifiers_are_routed_to_the_owning_checker() {
    let fx = Fixture::new();
    assert_eq!(
        fx.checkers.literal_qualifier(&fx.hierarchy, LiteralKind::Null),
        Some(fx.q("MID"))
    );
    assert_eq!(fx.checkers.literal_qualifier(&fx.hierarchy, LiteralKind::Int), None);
}
