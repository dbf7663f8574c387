use std::fmt;
use std::sync::Arc;

use crate::core::error_handler_policy::ErrorHandlerPolicy;
use crate::core::exception_clause::ExceptionClause;
use crate::steps::route_step::RouteStep;

/// Successor of a route
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Next {
    /// Terminal endpoint; delivery ends the traversal
    Sink(String),
    /// Chained route, invoked synchronously
    Route(String),
}

impl Next {
    pub fn sink(uri: impl Into<String>) -> Self {
        Next::Sink(uri.into())
    }

    pub fn route(id: impl Into<String>) -> Self {
        Next::Route(id.into())
    }

    /// Id of the chained route, if any
    pub fn route_id(&self) -> Option<&str> {
        match self {
            Next::Route(id) => Some(id),
            Next::Sink(_) => None,
        }
    }
}

impl fmt::Display for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Next::Sink(uri) => write!(f, "{}", uri),
            Next::Route(id) => write!(f, "route:{}", id),
        }
    }
}

/// A named pipeline stage
///
/// ```text
/// ErrorHandlerPolicy
///   → try segment ──fault──→ catch segment (optional)
///   → next (sink or chained route)
///   ← exception clause (optional) for faults escaping the above
/// ```
///
/// Routes are immutable once registered with a
/// [`Router`](crate::core::router::Router) and shared read-only by every
/// traversal.
///
/// # Example
///
/// ```ignore
/// let route = Route::new("parent", Next::route("child"))
///     .try_step(ValidateStep)
///     .catch_step(FallbackStep)
///     .with_exception_clause(ExceptionClause::handled())
///     .with_error_handler(ErrorHandlerPolicy::Supervised);
/// ```
#[derive(Clone)]
pub struct Route {
    id: String,
    try_body: Vec<Arc<dyn RouteStep>>,
    catch_body: Option<Vec<Arc<dyn RouteStep>>>,
    exception_clause: Option<ExceptionClause>,
    error_handler: ErrorHandlerPolicy,
    next: Next,
}

impl Route {
    /// Route with empty try segment, no catch, no clause and no supervision
    pub fn new(id: impl Into<String>, next: Next) -> Self {
        Self {
            id: id.into(),
            try_body: Vec::new(),
            catch_body: None,
            exception_clause: None,
            error_handler: ErrorHandlerPolicy::None,
            next,
        }
    }

    /// Fully specified route
    pub fn define(
        id: impl Into<String>,
        try_body: Vec<Arc<dyn RouteStep>>,
        catch_body: Option<Vec<Arc<dyn RouteStep>>>,
        exception_clause: Option<ExceptionClause>,
        error_handler: ErrorHandlerPolicy,
        next: Next,
    ) -> Self {
        Self {
            id: id.into(),
            try_body,
            catch_body,
            exception_clause,
            error_handler,
            next,
        }
    }

    /// Append a step to the try segment (fluent API - consumes self)
    pub fn try_step<S: RouteStep + 'static>(mut self, step: S) -> Self {
        self.try_body.push(Arc::new(step));
        self
    }

    /// Append a step to the catch segment, creating the segment if needed
    pub fn catch_step<S: RouteStep + 'static>(mut self, step: S) -> Self {
        self.catch_body
            .get_or_insert_with(Vec::new)
            .push(Arc::new(step));
        self
    }

    /// Add an empty catch segment; it absorbs any try fault
    pub fn with_catch(mut self) -> Self {
        self.catch_body.get_or_insert_with(Vec::new);
        self
    }

    pub fn with_exception_clause(mut self, clause: ExceptionClause) -> Self {
        self.exception_clause = Some(clause);
        self
    }

    pub fn with_error_handler(mut self, policy: ErrorHandlerPolicy) -> Self {
        self.error_handler = policy;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn try_body(&self) -> &[Arc<dyn RouteStep>] {
        &self.try_body
    }

    pub fn catch_body(&self) -> Option<&[Arc<dyn RouteStep>]> {
        self.catch_body.as_deref()
    }

    pub fn exception_clause(&self) -> Option<&ExceptionClause> {
        self.exception_clause.as_ref()
    }

    pub fn error_handler(&self) -> ErrorHandlerPolicy {
        self.error_handler
    }

    pub fn next(&self) -> &Next {
        &self.next
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |steps: &[Arc<dyn RouteStep>]| -> Vec<String> {
            steps.iter().map(|s| s.name().to_string()).collect()
        };
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("try_body", &names(&self.try_body))
            .field("catch_body", &self.catch_body.as_deref().map(names))
            .field("exception_clause", &self.exception_clause)
            .field("error_handler", &self.error_handler)
            .field("next", &self.next)
            .finish()
    }
}
