use pretty_assertions::assert_eq;
use qualia_check::RunError;
use qualia_core::{CancellationToken, Diagnostic, Severity};
use qualia_hir::{BodyBuilder, ExprKind, LocalKind, MethodDecl, MethodId, StmtKind, TypeRef, UseSite};
use qualia_types::LiteralKind;

use super::fixture::{ChainChecker, Fixture};

/// ```java
/// void take(String p) {}
/// void a() { String x = null; take(x); }
/// ```
#[test]
fn subtype_argument_is_accepted() {
    let mut fx = Fixture::new();
    let take = {
        let mut b = BodyBuilder::new();
        b.param("p", fx.string(&[]));
        let m = MethodDecl::new(fx.class, "take", b.finish_abstract());
        fx.add_method(m)
    };
    let mut b = BodyBuilder::new();
    let x = b.local("x", fx.string(&[]));
    let null = b.expr(ExprKind::Literal(LiteralKind::Null));
    let let_x = b.stmt(StmtKind::Let {
        local: x,
        initializer: Some(null),
    });
    let arg = b.expr(ExprKind::Local(x));
    let call = b.expr(ExprKind::Call {
        receiver: None,
        method: take,
        args: vec![arg],
    });
    let call_stmt = b.stmt(StmtKind::Expr(call));
    let root = b.stmt(StmtKind::Block(vec![let_x, call_stmt]));
    fx.add_method(MethodDecl::new(fx.class, "a", b.finish(root)));

    let outcome = fx.run();
    assert!(outcome.violations.is_empty(), "{:?}", outcome.violations);
    assert_eq!(outcome.stats.routines, 1);
}

/// `void c(String p) { @BOTTOM String x = p; }`
fn top_into_bottom_local(fx: &mut Fixture) -> MethodId {
    let mut b = BodyBuilder::new();
    let p = b.param("p", fx.string(&[]));
    let x = b.local("x", fx.string(&["BOTTOM"]));
    let value = b.expr(ExprKind::Local(p));
    let stmt = b.stmt(StmtKind::Let {
        local: x,
        initializer: Some(value),
    });
    let root = b.stmt(StmtKind::Block(vec![stmt]));
    let method = MethodDecl::new(fx.class, "c", b.finish(root));
    fx.add_method(method)
}

#[test]
fn top_into_bottom_is_one_violation() {
    let mut fx = Fixture::new();
    top_into_bottom_local(&mut fx);

    let outcome = fx.run();
    assert_eq!(outcome.violations.len(), 1);
    let violation = &outcome.violations[0];
    assert_eq!(violation.code.code(), "assignment.type.incompatible");
    assert_eq!(violation.hierarchy, fx.hierarchies[0].id());
    assert_eq!(
        fx.rendered(violation),
        ("@TOP String".to_string(), "@BOTTOM String".to_string())
    );
}

/// ```java
/// void e(String p) {
///     ??? y = p;            // unresolved local type
///     String z = <invalid>;
///     @BOTTOM String x = p;
/// }
/// ```
#[test]
fn unresolved_sites_are_skipped_and_traversal_continues() {
    let mut fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let p = b.param("p", fx.string(&[]));
    let y = b.local("y", TypeRef::unresolved());
    let z = b.local("z", fx.string(&[]));
    let x = b.local("x", fx.string(&["BOTTOM"]));
    let p_1 = b.expr(ExprKind::Local(p));
    let let_y = b.stmt(StmtKind::Let {
        local: y,
        initializer: Some(p_1),
    });
    let invalid = b.expr(ExprKind::Invalid);
    let let_z = b.stmt(StmtKind::Let {
        local: z,
        initializer: Some(invalid),
    });
    let p_2 = b.expr(ExprKind::Local(p));
    let let_x = b.stmt(StmtKind::Let {
        local: x,
        initializer: Some(p_2),
    });
    let root = b.stmt(StmtKind::Block(vec![let_y, let_z, let_x]));
    fx.add_method(MethodDecl::new(fx.class, "e", b.finish(root)));

    let outcome = fx.run();
    assert_eq!(Fixture::codes(&outcome), vec!["assignment.type.incompatible"]);
    assert_eq!(outcome.stats.skipped_routines, 0);
}

#[test]
fn violations_follow_program_order_and_keep_going() {
    let mut fx = Fixture::new();
    let first = top_into_bottom_local(&mut fx);
    let second = top_into_bottom_local(&mut fx);

    let outcome = fx.run();
    let owners: Vec<_> = outcome.violations.iter().map(|v| v.site.owner).collect();
    assert_eq!(
        owners,
        vec![qualia_hir::Owner::Method(first), qualia_hir::Owner::Method(second)]
    );
}

/// ```java
/// void n(String p) {
///     if (true) {
///         if (true) {}
///         @BOTTOM String x1 = p;
///     }
///     @BOTTOM String x2 = p;
/// }
/// ```
#[test]
fn violations_inside_nested_branches_come_before_later_statements() {
    let mut fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let p = b.param("p", fx.string(&[]));
    let x1 = b.local("x1", fx.string(&["BOTTOM"]));
    let x2 = b.local("x2", fx.string(&["BOTTOM"]));
    let inner_cond = b.expr(ExprKind::Literal(LiteralKind::Boolean));
    let empty = b.stmt(StmtKind::Block(vec![]));
    let inner_if = b.stmt(StmtKind::If {
        condition: inner_cond,
        then_branch: empty,
        else_branch: None,
    });
    let p_1 = b.expr(ExprKind::Local(p));
    let let_x1 = b.stmt(StmtKind::Let {
        local: x1,
        initializer: Some(p_1),
    });
    let then_branch = b.stmt(StmtKind::Block(vec![inner_if, let_x1]));
    let outer_cond = b.expr(ExprKind::Literal(LiteralKind::Boolean));
    let outer_if = b.stmt(StmtKind::If {
        condition: outer_cond,
        then_branch,
        else_branch: None,
    });
    let p_2 = b.expr(ExprKind::Local(p));
    let let_x2 = b.stmt(StmtKind::Let {
        local: x2,
        initializer: Some(p_2),
    });
    let root = b.stmt(StmtKind::Block(vec![outer_if, let_x2]));
    let method = fx.add_method(MethodDecl::new(fx.class, "n", b.finish(root)));

    let outcome = fx.run();
    let sites: Vec<_> = outcome.violations.iter().map(|v| v.site).collect();
    assert_eq!(sites, vec![UseSite::expr(method, p_1), UseSite::expr(method, p_2)]);
}

#[test]
fn repeated_runs_are_identical() {
    let mut fx = Fixture::new();
    top_into_bottom_local(&mut fx);
    top_into_bottom_local(&mut fx);

    let run = fx.run_with();
    let first = run.run().unwrap();
    let second = run.run().unwrap();
    assert_eq!(first.violations, second.violations);
    assert_eq!(first.stats, second.stats);
    assert!(first.stats.cache.hits > 0);
}

#[test]
fn sequential_flow_matches_parallel_flow() {
    let mut fx = Fixture::new();
    for _ in 0..4 {
        top_into_bottom_local(&mut fx);
    }
    let parallel = fx.run();
    fx.options.flow.parallel = false;
    let sequential = fx.run();
    assert_eq!(parallel.violations, sequential.violations);
}

#[test]
fn cancelled_runs_report_cancellation() {
    let mut fx = Fixture::new();
    top_into_bottom_local(&mut fx);
    let cancel = CancellationToken::new();
    let run = fx.run_with().with_cancellation(cancel.clone());
    cancel.cancel();

    assert!(matches!(run.run(), Err(RunError::Cancelled)));
    assert!(run.cancellation_token().is_cancelled());
}

#[test]
fn clashing_hierarchies_fail_before_checking() {
    let mut fx = Fixture::new();
    top_into_bottom_local(&mut fx);
    // Same hierarchy id as the fixture's checker.
    fx.plugins
        .push(std::sync::Arc::new(ChainChecker::new(0, "clash", &["A", "B"], None)));

    let result = qualia_check::CheckRun::with_plugins(&fx.store, &fx.program, fx.plugins.clone(), fx.options);
    assert!(matches!(result, Err(RunError::Hierarchy(_))));
}

#[test]
fn diagnostics_render_found_required_and_hierarchy() {
    let mut fx = Fixture::new();
    top_into_bottom_local(&mut fx);

    let run = fx.run_with();
    let outcome = run.run().unwrap();
    let mut sink: Vec<Diagnostic> = Vec::new();
    run.emit(&outcome, &mut sink);

    assert_eq!(sink.len(), 1);
    assert_eq!(sink[0].severity, Severity::Error);
    assert_eq!(sink[0].code, "assignment.type.incompatible");
    assert_eq!(
        sink[0].message,
        "incompatible types in assignment: found `@TOP String`, required `@BOTTOM String` (lattice)"
    );
}

#[test]
fn abstract_methods_are_not_refined() {
    let mut fx = Fixture::new();
    let mut b = BodyBuilder::new();
    b.local_at("p", LocalKind::Param, fx.string(&[]), qualia_core::Span::new(0, 1));
    fx.add_method(MethodDecl::new(fx.class, "abstract_m", b.finish_abstract()));

    let outcome = fx.run();
    assert_eq!(outcome.stats.routines, 0);
    assert!(outcome.violations.is_empty());
}
