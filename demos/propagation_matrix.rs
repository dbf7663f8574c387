use route_propagation::config::RoutesConfig;
use route_propagation::scenario::{RouteProfile, Scenario};
use route_propagation::{
    CapturingSink, ErrorHandlerPolicy, Exchange, ExceptionClause, FaultCause, FaultPlan,
    FaultPoint, FnStep, Next, Route, Router,
};
use tracing_subscriber::EnvFilter;

// ============================================================================
// SCENARIO MATRIX
// ============================================================================

fn print_matrix(title: &str, scenarios: &[Scenario]) {
    println!("\n{}", title);
    println!("{}", "-".repeat(title.len()));

    for scenario in scenarios {
        let sink = CapturingSink::new();
        let exchange = match scenario.run(sink.clone()) {
            Ok(exchange) => exchange,
            Err(e) => {
                println!("   {}: router error: {}", scenario, e);
                continue;
            }
        };

        println!(
            "   {:<100} failed={:<5} caught={:<5} signals={}",
            scenario.to_string(),
            exchange.has_failed(),
            exchange.has_exception_caught(),
            sink.count_for(exchange.id())
        );
        for outcome in exchange.outcomes() {
            println!("      {}", outcome);
        }
    }
}

fn single_route_matrix() -> Vec<Scenario> {
    let mut scenarios = Vec::new();
    for policy in [ErrorHandlerPolicy::None, ErrorHandlerPolicy::Supervised] {
        for handled in [false, true] {
            let profile = RouteProfile::new(policy, handled);
            scenarios.push(Scenario::single(profile));
            scenarios.push(Scenario::single(profile).fault_at(0, FaultPoint::Try));
            scenarios.push(
                Scenario::single(profile)
                    .fault_at(0, FaultPoint::Try)
                    .fault_at(0, FaultPoint::Catch),
            );
            scenarios.push(
                Scenario::single(profile)
                    .fault_at(0, FaultPoint::Next)
                    .fault_at(0, FaultPoint::ExceptionClause),
            );
            scenarios.push(Scenario::single(profile).fault_at(0, FaultPoint::Next));
        }
    }
    scenarios
}

fn chained_route_matrix() -> Vec<Scenario> {
    let parent = RouteProfile::supervised(false);
    let mut scenarios = Vec::new();
    for child in [
        RouteProfile::unsupervised(false).without_clause(),
        RouteProfile::unsupervised(true),
        RouteProfile::supervised(true).without_catch(),
        RouteProfile::supervised(false),
    ] {
        scenarios.push(Scenario::chained(parent, child).fault_at(1, FaultPoint::Try));
        scenarios.push(Scenario::chained(parent, child).fault_at(1, FaultPoint::Next));
    }
    scenarios
}

// ============================================================================
// HAND-WRITTEN ROUTES
// ============================================================================

fn hand_written_routes() -> Result<(), Box<dyn std::error::Error>> {
    println!("\nHand-written routes with steps");
    println!("------------------------------");

    let sink = CapturingSink::forwarding();
    let mut router = Router::with_sink(sink.clone());

    router.define_route(
        Route::new("orders", Next::route("billing"))
            .try_step(FnStep::new("tag", |ex: &mut Exchange| {
                ex.set("tagged", true);
                Ok(())
            }))
            .with_exception_clause(ExceptionClause::handled().step(FnStep::new(
                "compensate",
                |ex: &mut Exchange| {
                    ex.set("compensated", true);
                    Ok(())
                },
            )))
            .with_error_handler(ErrorHandlerPolicy::Supervised),
    )?;
    router.define_route(
        Route::new("billing", Next::sink("mock:ledger"))
            .try_step(FnStep::new("charge", |ex: &mut Exchange| {
                match ex.payload::<u32>() {
                    Some(amount) if *amount > 0 => Ok(()),
                    _ => Err(FaultCause::step("charge", "nothing to charge")),
                }
            }))
            .with_exception_clause(ExceptionClause::unhandled())
            .with_error_handler(ErrorHandlerPolicy::Supervised),
    )?;
    router.validate()?;

    for amount in [42u32, 0] {
        let exchange = router.send("orders", Exchange::with_payload(amount))?;
        println!(
            "   amount={:<3} failed={:<5} caught={:<5} compensated={:<5} signals={:?}",
            amount,
            exchange.has_failed(),
            exchange.has_exception_caught(),
            exchange.get::<bool>("compensated").copied().unwrap_or(false),
            sink.routes_for(exchange.id())
        );
    }

    let plan = FaultPlan::new().at("billing", FaultPoint::Next);
    let exchange = router.send_with_faults("orders", Exchange::with_payload(7u32), &plan)?;
    println!(
        "   ledger down: failed={} caught={:?}",
        exchange.has_failed(),
        exchange.exception_caught().map(|f| f.to_string())
    );

    Ok(())
}

// ============================================================================
// CONFIGURED ROUTES
// ============================================================================

fn configured_routes() -> Result<(), Box<dyn std::error::Error>> {
    println!("\nRoutes loaded from TOML");
    println!("-----------------------");

    let config = RoutesConfig::from_toml_str(
        r#"
        [[route]]
        id = "parent"
        error_handler = "supervised"
        exception_clause = { handled = false }
        next = { route = "child" }

        [[route]]
        id = "child"
        next = { sink = "mock:next" }
        "#,
    )?;

    let sink = CapturingSink::new();
    let router = config.into_router(sink.clone())?;
    let plan = FaultPlan::new().at("child", FaultPoint::Next);
    let exchange = router.send_with_faults("parent", Exchange::new(), &plan)?;

    println!(
        "   failed={} caught={} signalled by {:?}",
        exchange.has_failed(),
        exchange.has_exception_caught(),
        sink.routes_for(exchange.id())
    );
    for crumb in exchange.history() {
        println!("      {} {}", crumb.route_id, crumb.point);
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error")),
        )
        .init();

    println!("Route propagation matrix");
    println!("========================");

    print_matrix("Single route", &single_route_matrix());
    print_matrix("Chained routes (parent supervised, unhandled)", &chained_route_matrix());
    hand_written_routes()?;
    configured_routes()?;

    Ok(())
}
