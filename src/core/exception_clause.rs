use std::fmt;
use std::sync::Arc;

use crate::steps::route_step::RouteStep;

/// Route-scoped fault interceptor ("onException")
///
/// Receives every fault that escapes the try/catch segments of its route,
/// or that is raised while delivering to the route's successor. The fault
/// is always marked caught on the exchange; `handled` decides whether it is
/// then cleared.
///
/// If a step of the clause body fails, that new fault supersedes the one
/// being processed and leaves the route unhandled.
#[derive(Clone, Default)]
pub struct ExceptionClause {
    handled: bool,
    body: Vec<Arc<dyn RouteStep>>,
}

impl ExceptionClause {
    pub fn new(handled: bool) -> Self {
        Self {
            handled,
            body: Vec::new(),
        }
    }

    /// Clause that clears the fault after running
    pub fn handled() -> Self {
        Self::new(true)
    }

    /// Clause that observes the fault but leaves it set
    pub fn unhandled() -> Self {
        Self::new(false)
    }

    /// Append a step to the clause body (fluent API - consumes self)
    pub fn step<S: RouteStep + 'static>(mut self, step: S) -> Self {
        self.body.push(Arc::new(step));
        self
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub(crate) fn body(&self) -> &[Arc<dyn RouteStep>] {
        &self.body
    }
}

impl fmt::Debug for ExceptionClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionClause")
            .field("handled", &self.handled)
            .field(
                "body",
                &self.body.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
