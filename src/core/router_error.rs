use thiserror::Error;

/// Errors raised by route registration and lookup
///
/// These describe a misconfigured router or a bad request from the
/// driver. Faults raised while a traversal runs are never reported here;
/// they end up on the [`Exchange`](crate::core::exchange::Exchange).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("no route registered under '{0}'")]
    UnknownRoute(String),

    #[error("route '{0}' is already registered")]
    DuplicateRoute(String),

    #[error("route id must not be empty")]
    EmptyRouteId,

    #[error("route '{from}' chains to unregistered route '{to}'")]
    UnresolvedReference { from: String, to: String },

    #[error("circular route chain: {}", path.join(" -> "))]
    CircularReference { path: Vec<String> },
}
