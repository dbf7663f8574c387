//! Propagation across chained routes.

use route_propagation::scenario::{RouteProfile, Scenario};
use route_propagation::{
    CapturingSink, Disposition, ErrorHandlerPolicy, Exchange, ExceptionClause, FaultCause,
    FaultPlan, FaultPoint, FnStep, Next, Route, Router,
};

fn crumbs(exchange: &Exchange) -> Vec<(String, FaultPoint)> {
    exchange
        .history()
        .iter()
        .map(|b| (b.route_id.clone(), b.point))
        .collect()
}

#[test]
fn child_handles_its_own_fault() {
    let sink = CapturingSink::new();
    let exchange = Scenario::chained(
        RouteProfile::unsupervised(false),
        RouteProfile::supervised(true).without_catch(),
    )
    .fault_at(1, FaultPoint::Try)
    .run(sink.clone())
    .unwrap();

    assert!(!exchange.has_failed());
    assert!(exchange.has_exception_caught());
    assert!(sink.is_empty());

    assert_eq!(
        exchange.outcome_of("child").map(|o| o.disposition),
        Some(Disposition::Handled)
    );
    assert_eq!(
        exchange.outcome_of("parent").map(|o| o.disposition),
        Some(Disposition::Completed)
    );
    // innermost first
    assert_eq!(exchange.outcomes()[0].route_id, "child");
}

#[test]
fn child_fault_escalates_to_parent_clause() {
    let sink = CapturingSink::new();
    let exchange = Scenario::chained(
        RouteProfile::supervised(false),
        RouteProfile::unsupervised(false).without_clause(),
    )
    .fault_at(1, FaultPoint::Next)
    .run(sink.clone())
    .unwrap();

    assert!(exchange.has_failed());
    assert!(exchange.has_exception_caught());
    assert_eq!(sink.routes_for(exchange.id()), vec!["parent"]);

    let child = exchange.outcome_of("child").unwrap();
    assert_eq!(child.disposition, Disposition::Uncaught);
    assert!(!child.signalled);

    let parent = exchange.outcome_of("parent").unwrap();
    assert_eq!(parent.disposition, Disposition::Unhandled);
    assert!(parent.escalated);
    assert!(parent.signalled);

    // The fault keeps the location it was raised at
    assert!(exchange.fault().unwrap().raised_at("child", FaultPoint::Next));
    assert_eq!(
        crumbs(&exchange),
        vec![
            ("parent".to_string(), FaultPoint::Try),
            ("parent".to_string(), FaultPoint::Next),
            ("child".to_string(), FaultPoint::Try),
            ("child".to_string(), FaultPoint::Next),
            ("parent".to_string(), FaultPoint::ExceptionClause),
        ]
    );
}

#[test]
fn escalated_fault_bypasses_parent_catch() {
    let mut router = Router::with_sink(CapturingSink::new());
    router
        .define_route(
            Route::new("parent", Next::route("child"))
                .catch_step(FnStep::new("mark", |ex: &mut Exchange| {
                    ex.set("parent_catch", true);
                    Ok(())
                }))
                .with_exception_clause(ExceptionClause::handled()),
        )
        .unwrap();
    router
        .define_route(Route::new("child", Next::sink("mock:next")))
        .unwrap();

    let plan = FaultPlan::new().at("child", FaultPoint::Try);
    let exchange = router.send_with_faults("parent", Exchange::new(), &plan).unwrap();

    assert!(!exchange.contains("parent_catch"));
    assert!(!exchange.visited("parent", FaultPoint::Catch));
    assert!(!exchange.has_failed());
    assert!(exchange
        .exception_caught()
        .unwrap()
        .raised_at("child", FaultPoint::Try));
}

#[test]
fn every_supervised_route_on_the_path_signals() {
    for len in 2..=5 {
        let sink = CapturingSink::new();
        let scenario = Scenario::chain(vec![RouteProfile::supervised(false); len])
            .fault_at(len - 1, FaultPoint::Next);
        let exchange = scenario.run(sink.clone()).unwrap();

        assert!(exchange.has_failed());
        assert!(exchange.has_exception_caught());

        // Innermost boundary resolves first
        let mut expected: Vec<String> = scenario
            .route_ids()
            .iter()
            .map(|id| id.to_string())
            .collect();
        expected.reverse();
        assert_eq!(sink.routes_for(exchange.id()), expected, "chain of {}", len);
    }
}

#[test]
fn unsupervised_parent_stays_silent_over_supervised_child() {
    let sink = CapturingSink::new();
    let exchange = Scenario::chained(
        RouteProfile::unsupervised(false),
        RouteProfile::supervised(false),
    )
    .fault_at(1, FaultPoint::Next)
    .run(sink.clone())
    .unwrap();

    assert!(exchange.has_failed());
    assert_eq!(sink.routes_for(exchange.id()), vec!["child"]);
}

#[test]
fn handled_parent_recovers_from_failing_child_clause() {
    let sink = CapturingSink::new();
    let exchange = Scenario::chained(
        RouteProfile::supervised(true),
        RouteProfile::supervised(true),
    )
    .fault_at(1, FaultPoint::Next)
    .fault_at(1, FaultPoint::ExceptionClause)
    .run(sink.clone())
    .unwrap();

    assert!(!exchange.has_failed());
    // Only the parent clause caught, and it caught the child clause's fault
    assert!(exchange
        .exception_caught()
        .unwrap()
        .raised_at("child", FaultPoint::ExceptionClause));
    // The child boundary saw the failure before the parent handled it
    assert_eq!(sink.routes_for(exchange.id()), vec!["child"]);
    assert_eq!(
        exchange.outcome_of("child").map(|o| o.disposition),
        Some(Disposition::ClauseFailed)
    );
    assert_eq!(
        exchange.outcome_of("parent").map(|o| o.disposition),
        Some(Disposition::Handled)
    );
}

#[test]
fn failing_parent_clause_keeps_child_mark() {
    let sink = CapturingSink::new();
    let exchange = Scenario::chained(
        RouteProfile::supervised(false),
        RouteProfile::unsupervised(false),
    )
    .fault_at(1, FaultPoint::Next)
    .fault_at(0, FaultPoint::ExceptionClause)
    .run(sink.clone())
    .unwrap();

    assert!(exchange.has_failed());
    assert!(exchange
        .exception_caught()
        .unwrap()
        .raised_at("child", FaultPoint::Next));
    assert!(exchange.fault().unwrap().raised_at("parent", FaultPoint::ExceptionClause));
    assert_eq!(sink.routes_for(exchange.id()), vec!["parent"]);
}

#[test]
fn failing_child_clause_leaves_nothing_caught() {
    let exchange = Scenario::chained(
        RouteProfile::unsupervised(false).without_clause(),
        RouteProfile::unsupervised(true),
    )
    .fault_at(1, FaultPoint::Try)
    .fault_at(1, FaultPoint::Catch)
    .fault_at(1, FaultPoint::ExceptionClause)
    .run(CapturingSink::new())
    .unwrap();

    assert!(exchange.has_failed());
    assert!(!exchange.has_exception_caught());
    assert_eq!(
        exchange.outcome_of("parent").map(|o| o.disposition),
        Some(Disposition::Uncaught)
    );
}

#[test]
fn child_catch_absorbs_before_parent_sees_fault() {
    let exchange = Scenario::chained(
        RouteProfile::unsupervised(false),
        RouteProfile::unsupervised(false).without_clause(),
    )
    .fault_at(1, FaultPoint::Try)
    .run(CapturingSink::new())
    .unwrap();

    // Child catch absorbs, so the whole chain completes
    assert!(!exchange.has_failed());
    assert!(!exchange.has_exception_caught());
    assert_eq!(
        exchange.outcome_of("child").map(|o| o.disposition),
        Some(Disposition::Absorbed)
    );
}

#[test]
fn unresolved_chained_route_faults_at_next() {
    let sink = CapturingSink::new();
    let mut router = Router::with_sink(sink.clone());
    router
        .define_route(
            Route::new("parent", Next::route("ghost"))
                .with_exception_clause(ExceptionClause::unhandled())
                .with_error_handler(ErrorHandlerPolicy::Supervised),
        )
        .unwrap();

    let exchange = router.request("parent").unwrap();

    assert!(exchange.has_failed());
    let fault = exchange.fault().unwrap();
    assert!(fault.raised_at("parent", FaultPoint::Next));
    assert_eq!(fault.cause(), &FaultCause::UnresolvedRoute("ghost".into()));
    assert_eq!(sink.count_for(exchange.id()), 1);
    assert!(!exchange.outcome_of("parent").unwrap().escalated);
}

#[test]
fn chain_state_is_shared_across_routes() {
    let mut router = Router::new();
    router
        .define_route(
            Route::new("parent", Next::route("child")).try_step(FnStep::new(
                "stamp",
                |ex: &mut Exchange| {
                    ex.set("stamped_by", "parent".to_string());
                    Ok(())
                },
            )),
        )
        .unwrap();
    router
        .define_route(
            Route::new("child", Next::sink("mock:next")).try_step(FnStep::new(
                "read",
                |ex: &mut Exchange| {
                    let seen = ex.get::<String>("stamped_by").cloned();
                    ex.set("child_saw", seen);
                    Ok(())
                },
            )),
        )
        .unwrap();

    let exchange = router.request("parent").unwrap();

    assert_eq!(
        exchange.get::<Option<String>>("child_saw"),
        Some(&Some("parent".to_string()))
    );
    assert!(exchange.visited("child", FaultPoint::Next));
}
