use std::fmt;

/// How a route resolved the traversal that crossed it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// No fault reached the route boundary
    Completed,
    /// A try fault was resolved by the catch segment
    Absorbed,
    /// The exception clause caught the fault and cleared it
    Handled,
    /// The exception clause caught the fault but left it set
    Unhandled,
    /// The exception clause itself faulted
    ClauseFailed,
    /// The route has no exception clause and the fault passed through
    Uncaught,
}

impl Disposition {
    /// True if the route reported failure to its caller
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Disposition::Unhandled | Disposition::ClauseFailed | Disposition::Uncaught
        )
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Completed => write!(f, "COMPLETED"),
            Disposition::Absorbed => write!(f, "ABSORBED"),
            Disposition::Handled => write!(f, "HANDLED"),
            Disposition::Unhandled => write!(f, "CAUGHT_UNHANDLED"),
            Disposition::ClauseFailed => write!(f, "CLAUSE_FAILED"),
            Disposition::Uncaught => write!(f, "UNCAUGHT"),
        }
    }
}

/// Record of one route boundary crossing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOutcome {
    pub route_id: String,
    pub disposition: Disposition,
    /// The fault the route resolved came out of a chained route
    pub escalated: bool,
    /// The route's supervisory policy emitted an unhandled-exception signal
    pub signalled: bool,
}

impl fmt::Display for RouteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.route_id, self.disposition)?;
        if self.escalated {
            write!(f, " (escalated)")?;
        }
        if self.signalled {
            write!(f, " [unhandled exception logged]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_dispositions() {
        assert!(!Disposition::Completed.is_failure());
        assert!(!Disposition::Absorbed.is_failure());
        assert!(!Disposition::Handled.is_failure());
        assert!(Disposition::Unhandled.is_failure());
        assert!(Disposition::ClauseFailed.is_failure());
        assert!(Disposition::Uncaught.is_failure());
    }

    #[test]
    fn outcome_display() {
        let outcome = RouteOutcome {
            route_id: "parent".into(),
            disposition: Disposition::Unhandled,
            escalated: true,
            signalled: true,
        };
        assert_eq!(
            outcome.to_string(),
            "parent: CAUGHT_UNHANDLED (escalated) [unhandled exception logged]"
        );
    }
}
