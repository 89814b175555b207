use pretty_assertions::assert_eq;
use qualia_core::Span;
use qualia_hir::{BodyBuilder, ExprKind, MethodDecl, MethodId, StmtKind, TypeRef, UseSite};
use qualia_types::LiteralKind;

use super::fixture::Fixture;

/// `void take(<param> p) {}`
fn take(fx: &mut Fixture, param: TypeRef) -> MethodId {
    let mut b = BodyBuilder::new();
    b.param("p", param);
    let method = MethodDecl::new(fx.class, "take", b.finish_abstract());
    fx.add_method(method)
}

#[test]
fn arguments_are_checked_against_parameters() {
    let mut fx = Fixture::new();
    let param = fx.string(&["BOTTOM"]);
    let callee = take(&mut fx, param);

    let mut b = BodyBuilder::new();
    let p = b.param("p", fx.string(&[]));
    let arg = b.expr_at(ExprKind::Local(p), Span::new(20, 21));
    let call = b.expr(ExprKind::Call {
        receiver: None,
        method: callee,
        args: vec![arg],
    });
    let stmt = b.stmt(StmtKind::Expr(call));
    let root = b.stmt(StmtKind::Block(vec![stmt]));
    let method = fx.add_method(MethodDecl::new(fx.class, "m", b.finish(root)));

    let outcome = fx.run();
    assert_eq!(Fixture::codes(&outcome), vec!["argument.type.incompatible"]);
    let violation = &outcome.violations[0];
    assert_eq!(violation.site, UseSite::expr(method, arg));
    assert_eq!(violation.span, Span::new(20, 21));
    assert_eq!(
        fx.rendered(violation),
        ("@TOP String".to_string(), "@BOTTOM String".to_string())
    );
}

#[test]
fn constructor_arguments_are_checked() {
    let mut fx = Fixture::new();
    let param = fx.string(&["MID"]);
    let constructor = take(&mut fx, param);

    let mut b = BodyBuilder::new();
    let p = b.param("p", fx.string(&[]));
    let arg = b.expr(ExprKind::Local(p));
    let c_ty = fx.program.class(fx.class).unwrap().self_type.clone();
    let new = b.expr(ExprKind::New {
        ty: c_ty,
        constructor: Some(constructor),
        args: vec![arg],
    });
    let stmt = b.stmt(StmtKind::Expr(new));
    let root = b.stmt(StmtKind::Block(vec![stmt]));
    fx.add_method(MethodDecl::new(fx.class, "m", b.finish(root)));

    assert_eq!(Fixture::codes(&fx.run()), vec!["argument.type.incompatible"]);
}

#[test]
fn returns_are_checked_against_the_declared_return_type() {
    let mut fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let p = b.param("p", fx.string(&[]));
    let value = b.expr(ExprKind::Local(p));
    let ret = b.stmt_at(StmtKind::Return(Some(value)), Span::new(5, 14));
    let root = b.stmt(StmtKind::Block(vec![ret]));
    let mut method = MethodDecl::new(fx.class, "m", b.finish(root));
    method.ret = Some(fx.string(&["MID"]));
    fx.add_method(method);

    let outcome = fx.run();
    assert_eq!(Fixture::codes(&outcome), vec!["return.type.incompatible"]);
    assert_eq!(outcome.violations[0].span, Span::new(5, 14));
}

#[test]
fn field_assignments_use_the_field_declaration() {
    let mut fx = Fixture::new();
    let bottom = fx.string(&["BOTTOM"]);
    let field = fx.program.add_field(fx.class, "f", bottom);

    let mut b = BodyBuilder::new();
    let p = b.param("p", fx.string(&[]));
    let this = b.expr(ExprKind::This);
    let target = b.expr(ExprKind::Field {
        receiver: Some(this),
        field,
    });
    let value = b.expr(ExprKind::Local(p));
    let assign = b.stmt(StmtKind::Assign { target, value });
    let root = b.stmt(StmtKind::Block(vec![assign]));
    fx.add_method(MethodDecl::new(fx.class, "m", b.finish(root)));

    assert_eq!(Fixture::codes(&fx.run()), vec!["assignment.type.incompatible"]);
}

#[test]
fn refined_values_are_checked_not_declared_ones() {
    let mut fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let x = b.local("x", fx.string(&[]));
    let y = b.local("y", fx.string(&["MID"]));
    let null = b.expr(ExprKind::Literal(LiteralKind::Null));
    let let_x = b.stmt(StmtKind::Let {
        local: x,
        initializer: Some(null),
    });
    let read = b.expr(ExprKind::Local(x));
    let let_y = b.stmt(StmtKind::Let {
        local: y,
        initializer: Some(read),
    });
    let root = b.stmt(StmtKind::Block(vec![let_x, let_y]));
    fx.add_method(MethodDecl::new(fx.class, "m", b.finish(root)));

    // `x` is declared TOP but holds a MID value.
    assert_eq!(Fixture::codes(&fx.run()), Vec::<&str>::new());
}

/// `<cast> c = (@BOTTOM String) p;`
fn cast_method(fx: &mut Fixture) {
    let mut b = BodyBuilder::new();
    let p = b.param("p", fx.string(&[]));
    let c = b.local("c", fx.string(&[]));
    let operand = b.expr(ExprKind::Local(p));
    let cast = b.expr(ExprKind::Cast {
        ty: fx.string(&["BOTTOM"]),
        expr: operand,
    });
    let stmt = b.stmt(StmtKind::Let {
        local: c,
        initializer: Some(cast),
    });
    let root = b.stmt(StmtKind::Block(vec![stmt]));
    fx.add_method(MethodDecl::new(fx.class, "m", b.finish(root)));
}

#[test]
fn downcasts_are_reported_as_warnings() {
    let mut fx = Fixture::new();
    cast_method(&mut fx);

    let outcome = fx.run();
    assert_eq!(Fixture::codes(&outcome), vec!["cast.unsafe"]);

    let mut sink: Vec<qualia_core::Diagnostic> = Vec::new();
    fx.run_with().emit(&outcome, &mut sink);
    assert!(!sink[0].is_error());
}

#[test]
fn unsafe_cast_reporting_can_be_disabled() {
    let mut fx = Fixture::new();
    cast_method(&mut fx);
    fx.options.report_unsafe_casts = false;

    assert_eq!(Fixture::codes(&fx.run()), Vec::<&str>::new());
}

#[test]
fn casts_without_qualifiers_keep_the_operand_qualifier() {
    let mut fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let p = b.param("p", fx.string(&[]));
    let c = b.local("c", fx.string(&["BOTTOM"]));
    let operand = b.expr(ExprKind::Local(p));
    let cast = b.expr(ExprKind::Cast {
        ty: fx.string(&[]),
        expr: operand,
    });
    let stmt = b.stmt(StmtKind::Let {
        local: c,
        initializer: Some(cast),
    });
    let root = b.stmt(StmtKind::Block(vec![stmt]));
    fx.add_method(MethodDecl::new(fx.class, "m", b.finish(root)));

    // No cast warning; the TOP operand still cannot flow into a BOTTOM local.
    assert_eq!(Fixture::codes(&fx.run()), vec!["assignment.type.incompatible"]);
}

#[test]
fn array_stores_are_checked_against_the_component() {
    let mut fx = Fixture::new();
    let array = fx.store.array(fx.string);
    let array_ty = TypeRef::new(array).with_nested(vec![fx.string(&["BOTTOM"])]);

    let mut b = BodyBuilder::new();
    let a = b.param("a", array_ty);
    let p = b.param("p", fx.string(&[]));
    let array_read = b.expr(ExprKind::Local(a));
    let index = b.expr(ExprKind::Literal(LiteralKind::Int));
    let target = b.expr(ExprKind::ArrayAccess {
        array: array_read,
        index,
    });
    let value = b.expr(ExprKind::Local(p));
    let assign = b.stmt(StmtKind::Assign { target, value });
    let root = b.stmt(StmtKind::Block(vec![assign]));
    fx.add_method(MethodDecl::new(fx.class, "m", b.finish(root)));

    assert_eq!(Fixture::codes(&fx.run()), vec!["array.store.incompatible"]);
}

#[test]
fn overrides_check_parameters_contravariantly_and_returns_covariantly() {
    let mut fx = Fixture::new();
    let parent = {
        let mut b = BodyBuilder::new();
        b.param("p", fx.string(&["MID"]));
        let mut m = MethodDecl::new(fx.class, "m", b.finish_abstract());
        m.ret = Some(fx.string(&["MID"]));
        fx.add_method(m)
    };
    // Wider parameter, narrower return: fine.
    let good = {
        let mut b = BodyBuilder::new();
        b.param("p", fx.string(&["TOP"]));
        let mut m = MethodDecl::new(fx.class, "m", b.finish_abstract());
        m.ret = Some(fx.string(&["BOTTOM"]));
        m.overrides.push(parent);
        fx.add_method(m)
    };
    // Narrower parameter, wider return: both reported.
    let bad = {
        let mut b = BodyBuilder::new();
        let p = b.param("p", fx.string(&["BOTTOM"]));
        let mut m = MethodDecl::new(fx.class, "m", b.finish_abstract());
        m.ret = Some(fx.string(&["TOP"]));
        m.overrides.push(parent);
        (fx.add_method(m), p)
    };

    let outcome = fx.run();
    assert_eq!(
        Fixture::codes(&outcome),
        vec!["override.param.invalid", "override.return.invalid"]
    );
    assert!(outcome.violations.iter().all(|v| v.site.owner != qualia_hir::Owner::Method(good)));
    assert_eq!(outcome.violations[0].site, UseSite::local(bad.0, bad.1));
    assert_eq!(outcome.violations[1].site, UseSite::ret(bad.0));
}

#[test]
fn unreachable_code_is_not_checked() {
    let mut fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let p = b.param("p", fx.string(&[]));
    let x = b.local("x", fx.string(&["BOTTOM"]));
    let ret = b.stmt(StmtKind::Return(None));
    let value = b.expr(ExprKind::Local(p));
    let dead = b.stmt(StmtKind::Let {
        local: x,
        initializer: Some(value),
    });
    let root = b.stmt(StmtKind::Block(vec![ret, dead]));
    fx.add_method(MethodDecl::new(fx.class, "m", b.finish(root)));

    assert_eq!(Fixture::codes(&fx.run()), Vec::<&str>::new());
}

#[test]
fn one_violation_per_hierarchy_at_a_site() {
    let mut fx = Fixture::with_second_hierarchy();
    let mut b = BodyBuilder::new();
    let p = b.param("p", fx.string(&[]));
    let x = b.local("x", fx.string(&["BOTTOM", "LOW"]));
    let value = b.expr(ExprKind::Local(p));
    let stmt = b.stmt(StmtKind::Let {
        local: x,
        initializer: Some(value),
    });
    let root = b.stmt(StmtKind::Block(vec![stmt]));
    fx.add_method(MethodDecl::new(fx.class, "m", b.finish(root)));

    let outcome = fx.run();
    let hierarchies: Vec<_> = outcome.violations.iter().map(|v| v.hierarchy).collect();
    assert_eq!(hierarchies, vec![fx.hierarchies[0].id(), fx.hierarchies[1].id()]);
    assert!(outcome.violations.iter().all(|v| v.site == outcome.violations[0].site));
}
