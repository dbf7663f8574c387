//! Error-handling configuration matrix.
//!
//! A [`Scenario`] is a chain of routes, each described by a compact
//! [`RouteProfile`], plus the points where faults are injected. It can
//! build the corresponding [`Router`], name itself after the
//! configuration it exercises, and predict the traversal outcome without
//! running the engine.

use std::fmt;

use crate::core::error_handler_policy::ErrorHandlerPolicy;
use crate::core::exception_clause::ExceptionClause;
use crate::core::exchange::Exchange;
use crate::core::fault::FaultPoint;
use crate::core::route::{Next, Route};
use crate::core::router::Router;
use crate::core::router_error::RouterError;
use crate::steps::fault_plan::FaultPlan;
use crate::supervision::sink::UnhandledSink;

/// Terminal sink of the innermost route
pub const SINK_URI: &str = "mock:next";

/// Error-handling setup of one route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteProfile {
    pub policy: ErrorHandlerPolicy,
    /// `Some(handled)` if the route has an exception clause
    pub clause: Option<bool>,
    pub catch: bool,
}

impl RouteProfile {
    /// Route with a catch segment and an exception clause
    pub fn new(policy: ErrorHandlerPolicy, handled: bool) -> Self {
        Self {
            policy,
            clause: Some(handled),
            catch: true,
        }
    }

    pub fn supervised(handled: bool) -> Self {
        Self::new(ErrorHandlerPolicy::Supervised, handled)
    }

    pub fn unsupervised(handled: bool) -> Self {
        Self::new(ErrorHandlerPolicy::None, handled)
    }

    pub fn without_clause(mut self) -> Self {
        self.clause = None;
        self
    }

    pub fn without_catch(mut self) -> Self {
        self.catch = false;
        self
    }

    /// Every combination of policy, clause and catch presence
    pub fn all() -> Vec<RouteProfile> {
        let mut out = Vec::with_capacity(12);
        for policy in [ErrorHandlerPolicy::None, ErrorHandlerPolicy::Supervised] {
            for clause in [None, Some(false), Some(true)] {
                for catch in [true, false] {
                    out.push(RouteProfile {
                        policy,
                        clause,
                        catch,
                    });
                }
            }
        }
        out
    }

    pub fn is_handled(&self) -> bool {
        self.clause == Some(true)
    }

    /// Body-less route with this profile
    pub fn to_route(&self, id: &str, next: Next) -> Route {
        let mut route = Route::new(id, next).with_error_handler(self.policy);
        if self.catch {
            route = route.with_catch();
        }
        if let Some(handled) = self.clause {
            route = route.with_exception_clause(ExceptionClause::new(handled));
        }
        route
    }
}

/// Predicted observable state of a traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Expectation {
    pub failed: bool,
    pub exception_caught: bool,
    /// Number of unhandled-exception signals
    pub signals: usize,
}

/// A chain of routes plus injected faults
///
/// Route `i` chains to route `i + 1`; the last route delivers to
/// [`SINK_URI`]. Ids follow the chain length: `route` for one route,
/// `parent`/`child` for two, `route0`.. otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    routes: Vec<(String, RouteProfile)>,
    faults: Vec<(usize, FaultPoint)>,
}

impl Scenario {
    pub fn single(profile: RouteProfile) -> Self {
        Self::chain([profile])
    }

    pub fn chained(parent: RouteProfile, child: RouteProfile) -> Self {
        Self::chain([parent, child])
    }

    pub fn chain(profiles: impl IntoIterator<Item = RouteProfile>) -> Self {
        let profiles: Vec<RouteProfile> = profiles.into_iter().collect();
        let ids: Vec<String> = match profiles.len() {
            1 => vec!["route".to_string()],
            2 => vec!["parent".to_string(), "child".to_string()],
            n => (0..n).map(|i| format!("route{}", i)).collect(),
        };
        Self {
            routes: ids.into_iter().zip(profiles).collect(),
            faults: Vec::new(),
        }
    }

    /// Inject a fault at `point` of the route at `index` (outermost is 0)
    ///
    /// Indices past the end of the chain are ignored.
    pub fn fault_at(mut self, index: usize, point: FaultPoint) -> Self {
        if index < self.routes.len() && !self.faults.contains(&(index, point)) {
            self.faults.push((index, point));
        }
        self
    }

    pub fn route_ids(&self) -> Vec<&str> {
        self.routes.iter().map(|(id, _)| id.as_str()).collect()
    }

    pub fn profiles(&self) -> Vec<RouteProfile> {
        self.routes.iter().map(|(_, p)| *p).collect()
    }

    pub fn faults(&self) -> &[(usize, FaultPoint)] {
        &self.faults
    }

    /// Id of the outermost route
    pub fn entry(&self) -> Option<&str> {
        self.routes.first().map(|(id, _)| id.as_str())
    }

    pub fn fault_plan(&self) -> FaultPlan {
        let mut plan = FaultPlan::new();
        for (index, point) in &self.faults {
            plan.add(self.routes[*index].0.clone(), *point);
        }
        plan
    }

    pub fn router<S: UnhandledSink + 'static>(&self, sink: S) -> Result<Router, RouterError> {
        let mut router = Router::with_sink(sink);
        for (i, (id, profile)) in self.routes.iter().enumerate() {
            let next = match self.routes.get(i + 1) {
                Some((child, _)) => Next::route(child.clone()),
                None => Next::sink(SINK_URI),
            };
            router.define_route(profile.to_route(id, next))?;
        }
        Ok(router)
    }

    /// Build the router and send a fresh exchange into the outermost route
    ///
    /// # Errors
    ///
    /// A scenario without routes has no entry point. Running it is a
    /// request for the unnamed route and fails with
    /// `RouterError::UnknownRoute("")`, as [`Router::request`] would.
    pub fn run<S: UnhandledSink + 'static>(&self, sink: S) -> Result<Exchange, RouterError> {
        let router = self.router(sink)?;
        let entry = self
            .entry()
            .ok_or_else(|| RouterError::UnknownRoute(String::new()))?;
        router.send_with_faults(entry, Exchange::new(), &self.fault_plan())
    }

    /// Name of the configuration, e.g.
    /// `ChainedRouteWithErrorHandlerOnParentAndHandledExceptionOnBoth`
    pub fn label(&self) -> String {
        let supervised = self.ids_where(|p| p.policy.is_supervised());
        let handled = self.ids_where(RouteProfile::is_handled);
        let no_clause = self.ids_where(|p| p.clause.is_none());
        let no_catch = self.ids_where(|p| !p.catch);

        let mut label = if self.routes.len() == 1 {
            format!(
                "SingleRoute{}{}",
                if supervised.is_empty() {
                    "WithoutErrorHandler"
                } else {
                    "WithErrorHandler"
                },
                if handled.is_empty() {
                    "AndNoHandledException"
                } else {
                    "AndHandledException"
                }
            )
        } else {
            format!(
                "ChainedRouteWithErrorHandlerOn{}AndHandledExceptionOn{}",
                self.which(&supervised),
                self.which(&handled)
            )
        };

        if !no_clause.is_empty() {
            label.push_str("AndNoExceptionClause");
            if self.routes.len() > 1 {
                label.push_str("On");
                label.push_str(&self.which(&no_clause));
            }
        }
        if !no_catch.is_empty() {
            label.push_str("AndNoCatch");
            if self.routes.len() > 1 {
                label.push_str("On");
                label.push_str(&self.which(&no_catch));
            }
        }
        label
    }

    fn ids_where(&self, pred: impl Fn(&RouteProfile) -> bool) -> Vec<&str> {
        self.routes
            .iter()
            .filter(|(_, p)| pred(p))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    fn which(&self, ids: &[&str]) -> String {
        let n = self.routes.len();
        match ids.len() {
            0 => "None".to_string(),
            len if len == n && n == 2 => "Both".to_string(),
            len if len == n => "All".to_string(),
            _ => ids
                .iter()
                .map(|id| capitalize(id))
                .collect::<Vec<_>>()
                .join("And"),
        }
    }

    /// Predict the traversal outcome from the profiles alone
    pub fn expected(&self) -> Expectation {
        let mut expectation = Expectation::default();
        if !self.routes.is_empty() {
            expectation.failed = self.predict(0, &mut expectation);
        }
        expectation
    }

    fn predict(&self, index: usize, state: &mut Expectation) -> bool {
        let profile = self.routes[index].1;
        let faulted = |point: FaultPoint| self.faults.contains(&(index, point));

        let mut pending = faulted(FaultPoint::Try) && (!profile.catch || faulted(FaultPoint::Catch));
        if !pending {
            pending = faulted(FaultPoint::Next)
                || (index + 1 < self.routes.len() && self.predict(index + 1, state));
        }

        let failed = pending
            && match profile.clause {
                None => true,
                // A faulting clause does not count as having caught
                Some(_) if faulted(FaultPoint::ExceptionClause) => true,
                Some(handled) => {
                    state.exception_caught = true;
                    !handled
                }
            };

        if failed && profile.policy.is_supervised() {
            state.signals += 1;
        }
        failed
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())?;
        for (index, point) in &self.faults {
            write!(f, " !{}:{}", self.routes[*index].0, point)?;
        }
        Ok(())
    }
}

fn capitalize(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_configuration() {
        assert_eq!(
            Scenario::single(RouteProfile::supervised(true)).label(),
            "SingleRouteWithErrorHandlerAndHandledException"
        );
        assert_eq!(
            Scenario::single(RouteProfile::unsupervised(false)).label(),
            "SingleRouteWithoutErrorHandlerAndNoHandledException"
        );
        assert_eq!(
            Scenario::chained(RouteProfile::supervised(true), RouteProfile::unsupervised(true))
                .label(),
            "ChainedRouteWithErrorHandlerOnParentAndHandledExceptionOnBoth"
        );
        assert_eq!(
            Scenario::chained(
                RouteProfile::unsupervised(false),
                RouteProfile::supervised(true).without_catch()
            )
            .label(),
            "ChainedRouteWithErrorHandlerOnChildAndHandledExceptionOnChildAndNoCatchOnChild"
        );
        assert_eq!(
            Scenario::chain([RouteProfile::supervised(false); 3]).label(),
            "ChainedRouteWithErrorHandlerOnAllAndHandledExceptionOnNone"
        );
    }

    #[test]
    fn chain_ids_and_plan() {
        let scenario = Scenario::chain([RouteProfile::supervised(false); 3])
            .fault_at(2, FaultPoint::Next)
            .fault_at(7, FaultPoint::Try);

        assert_eq!(scenario.route_ids(), vec!["route0", "route1", "route2"]);
        assert_eq!(scenario.faults(), &[(2, FaultPoint::Next)]);
        assert!(scenario.fault_plan().contains("route2", FaultPoint::Next));
    }

    #[test]
    fn router_chains_routes_in_order() {
        let scenario =
            Scenario::chained(RouteProfile::supervised(true), RouteProfile::unsupervised(true));
        let router = scenario.router(crate::supervision::sink::TracingSink).unwrap();

        assert_eq!(router.route("parent").map(|r| r.next()), Some(&Next::route("child")));
        assert_eq!(router.route("child").map(|r| r.next()), Some(&Next::sink(SINK_URI)));
        assert_eq!(router.validate(), Ok(()));
    }

    #[test]
    fn predicts_escalation_through_supervised_chain() {
        let expected = Scenario::chain([RouteProfile::supervised(false); 4])
            .fault_at(3, FaultPoint::Next)
            .expected();

        assert_eq!(
            expected,
            Expectation {
                failed: true,
                exception_caught: true,
                signals: 4,
            }
        );
    }

    #[test]
    fn profiles_are_distinct_keys() {
        let profiles: hashbrown::HashSet<RouteProfile> = RouteProfile::all().into_iter().collect();
        assert_eq!(profiles.len(), 12);
        assert!(profiles.contains(&RouteProfile::supervised(true).without_catch()));
    }

    #[test]
    fn empty_scenario_requests_unnamed_route() {
        let scenario = Scenario::chain(Vec::new());

        assert_eq!(scenario.entry(), None);
        assert!(scenario.route_ids().is_empty());
        assert!(matches!(
            scenario.run(crate::supervision::capturing::CapturingSink::new()),
            Err(RouterError::UnknownRoute(id)) if id.is_empty()
        ));
    }

    #[test]
    fn predicts_clause_failure_as_not_caught() {
        let expected = Scenario::single(RouteProfile::unsupervised(false))
            .fault_at(0, FaultPoint::Next)
            .fault_at(0, FaultPoint::ExceptionClause)
            .expected();

        assert_eq!(
            expected,
            Expectation {
                failed: true,
                exception_caught: false,
                signals: 0,
            }
        );
    }

    #[test]
    fn predicts_absorption() {
        let expected = Scenario::single(RouteProfile::supervised(false))
            .fault_at(0, FaultPoint::Try)
            .expected();

        assert_eq!(expected, Expectation::default());
    }
}
