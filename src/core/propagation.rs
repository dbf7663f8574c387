use std::sync::Arc;

use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::core::exchange::Exchange;
use crate::core::fault::{Fault, FaultCause, FaultPoint};
use crate::core::route::{Next, Route};
use crate::core::route_outcome::{Disposition, RouteOutcome};
use crate::steps::fault_plan::FaultPlan;
use crate::steps::route_step::RouteStep;
use crate::supervision::sink::UnhandledSink;

/// How the pipeline of one route ended, before supervision
struct Stage {
    disposition: Disposition,
    escalated: bool,
    result: Result<(), Fault>,
}

impl Stage {
    fn resolved(disposition: Disposition, escalated: bool) -> Self {
        Self {
            disposition,
            escalated,
            result: Ok(()),
        }
    }

    fn failed(disposition: Disposition, escalated: bool, fault: Fault) -> Self {
        Self {
            disposition,
            escalated,
            result: Err(fault),
        }
    }
}

/// A fault raised while continuing to `next`
struct NextFault {
    fault: Fault,
    /// Came out of a chained route rather than the delivery itself
    escalated: bool,
}

/// Resolves one traversal against a set of routes
///
/// # Per-route state machine
///
/// ```text
/// Trying ──ok──────────────────────────────→ Continuing ──ok──→ Succeeded
///   │                                            │
///   └─fault─→ Catching ──ok (fault cleared)──────┘
///               │ (no catch, or catch faulted)   │ fault (incl. chained route)
///               ↓                                ↓
///             ExceptionClause ──handled──→ Succeeded
///               └─unhandled / clause faulted / no clause──→ Failed
/// ```
///
/// The whole machine runs under the route's
/// [`ErrorHandlerPolicy`](crate::core::error_handler_policy::ErrorHandlerPolicy),
/// which sees only the final result. A failed chained route is a fault of
/// the caller's `Continuing` state and enters the caller's clause stage.
pub(crate) struct PropagationEngine<'a> {
    routes: &'a HashMap<String, Route>,
    sink: &'a dyn UnhandledSink,
    plan: &'a FaultPlan,
    stack: Vec<&'a str>,
}

impl<'a> PropagationEngine<'a> {
    pub(crate) fn new(
        routes: &'a HashMap<String, Route>,
        sink: &'a dyn UnhandledSink,
        plan: &'a FaultPlan,
    ) -> Self {
        Self {
            routes,
            sink,
            plan,
            stack: Vec::new(),
        }
    }

    /// Run `route` for `exchange`, leaving the final fault state on it
    pub(crate) fn invoke(&mut self, route: &'a Route, exchange: &mut Exchange) -> Result<(), Fault> {
        debug!(route = route.id(), exchange = %exchange.id(), "entering route");
        self.stack.push(route.id());

        let policy = route.error_handler();
        let sink = self.sink;
        let mut disposition = Disposition::Completed;
        let mut escalated = false;

        let result = policy.supervise(route.id(), exchange, sink, &mut |ex: &mut Exchange| {
            let stage = self.run_pipeline(route, ex);
            disposition = stage.disposition;
            escalated = stage.escalated;
            stage.result
        });

        self.stack.pop();

        match &result {
            Ok(()) => exchange.clear_fault(),
            Err(fault) => exchange.set_fault(fault.clone()),
        }
        exchange.push_outcome(RouteOutcome {
            route_id: route.id().to_string(),
            disposition,
            escalated,
            signalled: result.is_err() && policy.is_supervised(),
        });

        debug!(
            route = route.id(),
            exchange = %exchange.id(),
            disposition = %disposition,
            "leaving route"
        );
        result
    }

    fn run_pipeline(&mut self, route: &'a Route, exchange: &mut Exchange) -> Stage {
        let mut disposition = Disposition::Completed;

        if let Err(fault) = self.run_segment(route, FaultPoint::Try, route.try_body(), exchange) {
            let Some(catch_body) = route.catch_body() else {
                return self.evaluate_clause(route, exchange, fault, false);
            };

            // The catch segment sees the fault it is handling
            exchange.set_fault(fault);
            match self.run_segment(route, FaultPoint::Catch, catch_body, exchange) {
                Ok(()) => {
                    exchange.clear_fault();
                    disposition = Disposition::Absorbed;
                }
                Err(replacement) => {
                    return self.evaluate_clause(route, exchange, replacement, false);
                }
            }
        }

        match self.continue_to_next(route, exchange) {
            Ok(()) => Stage::resolved(disposition, false),
            Err(next) => self.evaluate_clause(route, exchange, next.fault, next.escalated),
        }
    }

    fn continue_to_next(&mut self, route: &'a Route, exchange: &mut Exchange) -> Result<(), NextFault> {
        let local = |fault: Fault| NextFault {
            fault,
            escalated: false,
        };

        self.probe(route, FaultPoint::Next, exchange).map_err(local)?;

        match route.next() {
            Next::Sink(uri) => {
                debug!(route = route.id(), sink = %uri, "delivered to sink");
                Ok(())
            }
            Next::Route(target) => {
                if self.stack.contains(&target.as_str()) {
                    let cause = FaultCause::CircularRoute(target.clone());
                    return Err(local(Fault::new(route.id(), FaultPoint::Next, cause)));
                }
                let Some(child) = self.routes.get(target.as_str()) else {
                    let cause = FaultCause::UnresolvedRoute(target.clone());
                    return Err(local(Fault::new(route.id(), FaultPoint::Next, cause)));
                };
                self.invoke(child, exchange).map_err(|fault| NextFault {
                    fault,
                    escalated: true,
                })
            }
        }
    }

    fn evaluate_clause(
        &mut self,
        route: &'a Route,
        exchange: &mut Exchange,
        fault: Fault,
        escalated: bool,
    ) -> Stage {
        let Some(clause) = route.exception_clause() else {
            exchange.set_fault(fault.clone());
            return Stage::failed(Disposition::Uncaught, escalated, fault);
        };

        warn!(
            route = route.id(),
            exchange = %exchange.id(),
            fault = %fault,
            handled = clause.is_handled(),
            "exception clause caught fault"
        );
        let previous = exchange.mark_caught(fault.clone());
        exchange.set_fault(fault.clone());

        if let Err(clause_fault) =
            self.run_segment(route, FaultPoint::ExceptionClause, clause.body(), exchange)
        {
            // This clause did not catch its own fault; earlier marks stay
            exchange.revert_caught(previous);
            exchange.set_fault(clause_fault.clone());
            return Stage::failed(Disposition::ClauseFailed, escalated, clause_fault);
        }

        if clause.is_handled() {
            exchange.clear_fault();
            Stage::resolved(Disposition::Handled, escalated)
        } else {
            Stage::failed(Disposition::Unhandled, escalated, fault)
        }
    }

    /// Run the steps of one segment, then its observation point
    fn run_segment(
        &self,
        route: &Route,
        point: FaultPoint,
        steps: &[Arc<dyn RouteStep>],
        exchange: &mut Exchange,
    ) -> Result<(), Fault> {
        exchange.record(route.id(), point);

        for step in steps {
            if let Err(cause) = step.process(exchange) {
                debug!(route = route.id(), step = step.name(), %point, "step failed");
                return Err(Fault::new(route.id(), point, cause));
            }
        }

        self.inject(route, point)
    }

    /// Record reaching `point`, then apply the fault plan
    fn probe(&self, route: &Route, point: FaultPoint, exchange: &mut Exchange) -> Result<(), Fault> {
        exchange.record(route.id(), point);
        self.inject(route, point)
    }

    fn inject(&self, route: &Route, point: FaultPoint) -> Result<(), Fault> {
        if self.plan.contains(route.id(), point) {
            debug!(route = route.id(), %point, "injecting fault");
            return Err(Fault::injected(route.id(), point));
        }
        Ok(())
    }
}
