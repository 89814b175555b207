use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use qualia_hierarchy::{Qualifier, QualifierHierarchy};
use qualia_types::{
    AnnotatedType, DeclKind, DefaultContext, DefaultPrecedence, DefaultingRules, LiteralKind,
    NoDefaults, TypeAnnotator, TypePosition, WildcardBound,
};

use super::fixture::Fixture;

struct FixedRules {
    declaration: Option<Qualifier>,
    use_site: Option<Qualifier>,
}

impl DefaultingRules for FixedRules {
    fn declaration_default(&self, _: &QualifierHierarchy, _: &DefaultContext<'_>) -> Option<Qualifier> {
        self.declaration
    }

    fn use_site_default(&self, _: &QualifierHierarchy, _: &DefaultContext<'_>) -> Option<Qualifier> {
        self.use_site
    }
}

fn annotator(fx: &Fixture, rules: impl DefaultingRules + 'static, precedence: DefaultPrecedence) -> TypeAnnotator {
    let mut annotator = TypeAnnotator::new();
    annotator.register(fx.hierarchy.clone(), Arc::new(rules), precedence);
    annotator
}

#[test]
fn declaration_and_use_site_defaults_differ() {
    let mut fx = Fixture::new();
    let list_string = fx.list_of(fx.string);
    let annotator = annotator(
        &fx,
        FixedRules {
            declaration: Some(fx.q("TOP")),
            use_site: Some(fx.q("BOTTOM")),
        },
        DefaultPrecedence::UseSite,
    );

    let ty = annotator.annotate(
        &fx.store,
        &AnnotatedType::unannotated(&fx.store, list_string),
        DeclKind::Field,
    );
    assert_eq!(ty.display(&fx.store, &fx.set).to_string(), "@TOP List<@BOTTOM String>");
    assert!(ty.is_fully_annotated(&fx.set));
}

#[test]
fn declaration_precedence_wins_at_nested_positions() {
    let mut fx = Fixture::new();
    let list_string = fx.list_of(fx.string);
    let annotator = annotator(
        &fx,
        FixedRules {
            declaration: Some(fx.q("TOP")),
            use_site: Some(fx.q("BOTTOM")),
        },
        DefaultPrecedence::Declaration,
    );

    let ty = annotator.annotate(
        &fx.store,
        &AnnotatedType::unannotated(&fx.store, list_string),
        DeclKind::Field,
    );
    assert_eq!(ty.display(&fx.store, &fx.set).to_string(), "@TOP List<@TOP String>");
}

#[test]
fn missing_preferred_rule_falls_back_to_the_other() {
    let mut fx = Fixture::new();
    let list_string = fx.list_of(fx.string);
    let annotator = annotator(
        &fx,
        FixedRules {
            declaration: Some(fx.q("MID")),
            use_site: None,
        },
        DefaultPrecedence::UseSite,
    );
    let ty = annotator.annotate(
        &fx.store,
        &AnnotatedType::unannotated(&fx.store, list_string),
        DeclKind::Local,
    );
    assert_eq!(ty.display(&fx.store, &fx.set).to_string(), "@MID List<@MID String>");
}

#[test]
fn explicit_qualifiers_are_never_overwritten() {
    let mut fx = Fixture::new();
    let list_string = fx.list_of(fx.string);
    let annotator = annotator(
        &fx,
        FixedRules {
            declaration: Some(fx.q("TOP")),
            use_site: Some(fx.q("TOP")),
        },
        DefaultPrecedence::UseSite,
    );

    let mirror = AnnotatedType::unannotated(&fx.store, list_string);
    let arg = mirror.children()[0].with_qualifier(fx.q("BOTTOM"));
    let partial = mirror.with_children(vec![arg]);

    let ty = annotator.annotate(&fx.store, &partial, DeclKind::Parameter);
    assert_eq!(ty.display(&fx.store, &fx.set).to_string(), "@TOP List<@BOTTOM String>");
}

#[test]
fn annotating_a_full_type_is_a_no_op() {
    let mut fx = Fixture::new();
    let list_string = fx.list_of(fx.string);
    let annotator = annotator(&fx, NoDefaults, DefaultPrecedence::UseSite);

    let once = annotator.annotate(
        &fx.store,
        &AnnotatedType::unannotated(&fx.store, list_string),
        DeclKind::Field,
    );
    let twice = annotator.annotate(&fx.store, &once, DeclKind::Return);
    assert!(twice.ptr_eq(&once));
}

#[test]
fn type_variable_uses_inherit_the_bound_annotation() {
    let mut fx = Fixture::new();
    let t = fx.store.add_type_param("T");
    let (object, mid) = (fx.object, fx.q("MID"));
    fx.store.set_upper_bound(t, object, vec![mid]);
    let u = fx.store.add_type_param("U");
    let annotator = annotator(
        &fx,
        FixedRules {
            declaration: Some(fx.q("BOTTOM")),
            use_site: Some(fx.q("BOTTOM")),
        },
        DefaultPrecedence::UseSite,
    );

    let t_ty = fx.store.type_var(t);
    let t_use = annotator.annotate(&fx.store, &AnnotatedType::unannotated(&fx.store, t_ty), DeclKind::Local);
    assert_eq!(t_use.qualifier(fx.hierarchy.id()), Some(fx.q("MID")));
    assert_eq!(
        t_use.upper_bound(&fx.store).unwrap().qualifier(fx.hierarchy.id()),
        Some(fx.q("MID"))
    );

    // No declared bound at all: unbounded upper position gets top.
    let u_ty = fx.store.type_var(u);
    let u_use = annotator.annotate(&fx.store, &AnnotatedType::unannotated(&fx.store, u_ty), DeclKind::Local);
    assert_eq!(u_use.qualifier(fx.hierarchy.id()), Some(fx.q("TOP")));
}

#[test]
fn wildcards_default_per_bound_kind() {
    let mut fx = Fixture::new();
    let unbounded = fx.store.wildcard(WildcardBound::Unbounded);
    let sup = fx.store.wildcard(WildcardBound::Super(fx.string));
    let list_unbounded = fx.list_of(unbounded);
    let list_super = fx.list_of(sup);
    let annotator = annotator(&fx, NoDefaults, DefaultPrecedence::UseSite);

    let ty = annotator.annotate(
        &fx.store,
        &AnnotatedType::unannotated(&fx.store, list_unbounded),
        DeclKind::Field,
    );
    assert_eq!(ty.display(&fx.store, &fx.set).to_string(), "@TOP List<@TOP ?>");

    let ty = annotator.annotate(
        &fx.store,
        &AnnotatedType::unannotated(&fx.store, list_super),
        DeclKind::Field,
    );
    assert_eq!(
        ty.display(&fx.store, &fx.set).to_string(),
        "@TOP List<@TOP ? super @BOTTOM String>"
    );
}

#[test]
fn recursive_bounds_terminate_fully_annotated() {
    let mut fx = Fixture::new();
    let t = fx.store.add_type_param("T");
    let comparable_param = fx.store.add_type_param("X");
    let comparable = fx.store.add_class("java.lang.Comparable", vec![comparable_param]);
    let t_ty = fx.store.type_var(t);
    let comparable_t = fx.store.declared(comparable, vec![t_ty]);
    fx.store.set_upper_bound(t, comparable_t, Vec::new());
    let annotator = annotator(&fx, NoDefaults, DefaultPrecedence::UseSite);

    let ty = annotator.annotate(&fx.store, &AnnotatedType::unannotated(&fx.store, t_ty), DeclKind::Parameter);
    assert!(ty.is_fully_annotated(&fx.set));
    assert_eq!(ty.display(&fx.store, &fx.set).to_string(), "@TOP T");
}

#[test]
fn rules_observe_structural_positions() {
    struct Recording(Mutex<Vec<TypePosition>>);
    impl DefaultingRules for Recording {
        fn declaration_default(&self, _: &QualifierHierarchy, ctx: &DefaultContext<'_>) -> Option<Qualifier> {
            self.0.lock().unwrap().push(ctx.position);
            None
        }
    }

    let mut fx = Fixture::new();
    let raw_list = fx.store.declared(fx.list, vec![]);
    let array = fx.store.array(raw_list);
    let recording = Arc::new(Recording(Mutex::new(Vec::new())));
    let mut annotator = TypeAnnotator::new();
    annotator.register(fx.hierarchy.clone(), recording.clone(), DefaultPrecedence::Declaration);

    let ty = annotator.annotate(&fx.store, &AnnotatedType::unannotated(&fx.store, array), DeclKind::Field);
    assert!(ty.is_fully_annotated(&fx.set));
    // The raw argument is the formal `E`, a type variable, so rules are not consulted for it.
    assert_eq!(
        *recording.0.lock().unwrap(),
        vec![
            TypePosition::Declaration(DeclKind::Field),
            TypePosition::ArrayComponent,
        ]
    );
    let component = ty.component(&fx.store).unwrap();
    assert_eq!(component.children()[0].underlying(), fx.store.type_var(fx.list_param));
}

#[test]
fn literals_fall_back_to_bottom() {
    let mut fx = Fixture::new();
    let null = fx.store.null();
    let annotator = annotator(&fx, NoDefaults, DefaultPrecedence::UseSite);
    let ty = annotator.annotate(
        &fx.store,
        &AnnotatedType::unannotated(&fx.store, null),
        DeclKind::Literal(LiteralKind::Null),
    );
    assert_eq!(ty.qualifier(fx.hierarchy.id()), Some(fx.q("BOTTOM")));
}
