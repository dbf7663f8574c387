use std::fmt;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use tracing::debug;

use crate::core::exchange::Exchange;
use crate::core::propagation::PropagationEngine;
use crate::core::route::{Next, Route};
use crate::core::router_error::RouterError;
use crate::steps::fault_plan::FaultPlan;
use crate::supervision::sink::{TracingSink, UnhandledSink};

/// Registry of routes and synchronous traversal entry point
///
/// Manages the route definitions and resolves chained calls between them.
///
/// # Traversal
///
/// * A traversal runs on the calling thread and returns only when every
///   chained route has resolved
/// * The returned exchange carries the final state: `has_failed()`,
///   `has_exception_caught()`, history and per-route outcomes
/// * Unhandled faults of supervised routes go to the router's
///   [`UnhandledSink`] (a [`TracingSink`] unless configured otherwise)
///
/// The router is immutable while traversing, so one instance can serve
/// concurrent traversals from many threads.
///
/// # Example
///
/// ```ignore
/// let sink = CapturingSink::new();
/// let mut router = Router::with_sink(sink.clone());
///
/// router.define_route(
///     Route::new("parent", Next::route("child"))
///         .with_exception_clause(ExceptionClause::unhandled())
///         .with_error_handler(ErrorHandlerPolicy::Supervised),
/// )?;
/// router.define_route(Route::new("child", Next::sink("mock:next")))?;
/// router.validate()?;
///
/// let plan = FaultPlan::new().at("child", FaultPoint::Next);
/// let exchange = router.send_with_faults("parent", Exchange::new(), &plan)?;
///
/// assert!(exchange.has_failed());
/// assert!(exchange.has_exception_caught());
/// assert_eq!(sink.routes_for(exchange.id()), vec!["parent"]);
/// ```
pub struct Router {
    routes: HashMap<String, Route>,
    sink: Arc<dyn UnhandledSink>,
}

impl Router {
    /// Create an empty router logging unhandled faults through tracing
    pub fn new() -> Self {
        Self::with_sink(TracingSink)
    }

    pub fn with_sink<S: UnhandledSink + 'static>(sink: S) -> Self {
        Self {
            routes: HashMap::new(),
            sink: Arc::new(sink),
        }
    }

    /// Register a route
    ///
    /// Chained references are not checked here so routes can be defined in
    /// any order; see [`validate()`](Self::validate).
    pub fn define_route(&mut self, route: Route) -> Result<(), RouterError> {
        if route.id().is_empty() {
            return Err(RouterError::EmptyRouteId);
        }
        if self.routes.contains_key(route.id()) {
            return Err(RouterError::DuplicateRoute(route.id().to_string()));
        }
        debug!(route = route.id(), next = %route.next(), "route defined");
        self.routes.insert(route.id().to_string(), route);
        Ok(())
    }

    pub fn route(&self, id: &str) -> Option<&Route> {
        self.routes.get(id)
    }

    /// Registered route ids, sorted
    pub fn route_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Check that every chained reference resolves and no chain loops
    ///
    /// Traversals survive both problems (they surface as faults at the
    /// offending `next`), but a configuration that has them is almost
    /// certainly wrong.
    pub fn validate(&self) -> Result<(), RouterError> {
        for id in self.route_ids() {
            if let Some(Next::Route(target)) = self.routes.get(id).map(Route::next)
                && !self.routes.contains_key(target.as_str())
            {
                return Err(RouterError::UnresolvedReference {
                    from: id.to_string(),
                    to: target.clone(),
                });
            }
        }

        // Each route has one successor, so every chain is a simple walk
        for start in self.route_ids() {
            let mut path = vec![start.to_string()];
            let mut seen: HashSet<&str> = HashSet::new();
            seen.insert(start);
            let mut current = start;

            while let Some(target) = self.routes.get(current).and_then(|r| r.next().route_id()) {
                path.push(target.to_string());
                if !seen.insert(target) {
                    return Err(RouterError::CircularReference { path });
                }
                current = target;
            }
        }

        Ok(())
    }

    /// Traverse `route_id` with `exchange` and no injected faults
    pub fn send(&self, route_id: &str, exchange: Exchange) -> Result<Exchange, RouterError> {
        self.send_with_faults(route_id, exchange, &FaultPlan::new())
    }

    /// Traverse `route_id` with `exchange`, raising faults where `plan` says
    ///
    /// # Errors
    ///
    /// Only [`RouterError::UnknownRoute`] when `route_id` is not registered.
    /// Every fault raised during the traversal is reported on the returned
    /// exchange instead.
    pub fn send_with_faults(
        &self,
        route_id: &str,
        mut exchange: Exchange,
        plan: &FaultPlan,
    ) -> Result<Exchange, RouterError> {
        let route = self
            .routes
            .get(route_id)
            .ok_or_else(|| RouterError::UnknownRoute(route_id.to_string()))?;

        let mut engine = PropagationEngine::new(&self.routes, self.sink.as_ref(), plan);
        // The outcome is already recorded on the exchange
        let _ = engine.invoke(route, &mut exchange);

        debug!(
            route = route_id,
            exchange = %exchange.id(),
            failed = exchange.has_failed(),
            exception_caught = exchange.has_exception_caught(),
            "traversal complete"
        );
        Ok(exchange)
    }

    /// Traverse `route_id` with a fresh, empty exchange
    pub fn request(&self, route_id: &str) -> Result<Exchange, RouterError> {
        self.send(route_id, Exchange::new())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.route_ids())
            .finish_non_exhaustive()
    }
}
