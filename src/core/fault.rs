use std::fmt;

use thiserror::Error;

/// Named points of a route where a fault can surface
///
/// Each point is also an observation point: the engine records a
/// breadcrumb on the exchange whenever it is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FaultPoint {
    /// End of the try segment
    Try,
    /// End of the catch segment
    Catch,
    /// End of the exception clause body
    ExceptionClause,
    /// Delivery to the route's successor (sink or chained route)
    Next,
}

impl FaultPoint {
    /// Every point, in pipeline order
    pub const ALL: [FaultPoint; 4] = [
        FaultPoint::Try,
        FaultPoint::Catch,
        FaultPoint::ExceptionClause,
        FaultPoint::Next,
    ];
}

impl fmt::Display for FaultPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultPoint::Try => write!(f, "onTry"),
            FaultPoint::Catch => write!(f, "onCatch"),
            FaultPoint::ExceptionClause => write!(f, "onException"),
            FaultPoint::Next => write!(f, "onNext"),
        }
    }
}

/// Why a fault was raised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultCause {
    /// Raised by a fault plan at an observation point
    #[error("injected fault")]
    Injected,

    /// Raised by a route step
    #[error("step '{step}' failed: {message}")]
    Step { step: String, message: String },

    /// A chained `next` names a route that is not registered
    #[error("no route registered under '{0}'")]
    UnresolvedRoute(String),

    /// A chained `next` re-enters a route already on the call stack
    #[error("route '{0}' is already being traversed")]
    CircularRoute(String),
}

impl FaultCause {
    /// Shorthand for a step failure
    pub fn step(step: impl Into<String>, message: impl Into<String>) -> Self {
        FaultCause::Step {
            step: step.into(),
            message: message.into(),
        }
    }
}

/// A fault carried by an exchange
///
/// Stamped with the route and point where it surfaced. Faults are plain
/// values: cloning one to record it as caught does not detach it from the
/// exchange's current fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{cause} (route '{route_id}', {point})")]
pub struct Fault {
    route_id: String,
    point: FaultPoint,
    #[source]
    cause: FaultCause,
}

impl Fault {
    pub fn new(route_id: impl Into<String>, point: FaultPoint, cause: FaultCause) -> Self {
        Self {
            route_id: route_id.into(),
            point,
            cause,
        }
    }

    pub fn injected(route_id: impl Into<String>, point: FaultPoint) -> Self {
        Self::new(route_id, point, FaultCause::Injected)
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn point(&self) -> FaultPoint {
        self.point
    }

    pub fn cause(&self) -> &FaultCause {
        &self.cause
    }

    /// True if this fault was raised at `point` of `route_id`
    pub fn raised_at(&self, route_id: &str, point: FaultPoint) -> bool {
        self.route_id == route_id && self.point == point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_names_route_and_point() {
        let fault = Fault::injected("child", FaultPoint::Next);
        assert_eq!(fault.to_string(), "injected fault (route 'child', onNext)");
        assert!(fault.raised_at("child", FaultPoint::Next));
        assert!(!fault.raised_at("parent", FaultPoint::Next));
    }

    #[test]
    fn step_cause_is_the_source() {
        let fault = Fault::new(
            "route",
            FaultPoint::Try,
            FaultCause::step("validate", "missing header"),
        );
        let source = fault.source().map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("step 'validate' failed: missing header")
        );
    }
}
