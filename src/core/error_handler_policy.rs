use std::fmt;

use crate::core::exchange::Exchange;
use crate::core::fault::Fault;
use crate::supervision::sink::{UnhandledSignal, UnhandledSink};

/// Supervisory strategy wrapping a whole route body
///
/// # Policies
///
/// * **None**: faults leaving the exception-clause stage propagate to the
///   caller unchanged and nothing is logged (default)
/// * **Supervised**: a fault leaving the exception-clause stage unhandled is
///   reported once to the [`UnhandledSink`] and then re-raised. A fault
///   cleared by a handled clause never reaches the policy.
///
/// Stacked supervised routes each report at their own boundary, so a fault
/// escalating through N supervised routes yields N signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "config",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum ErrorHandlerPolicy {
    #[default]
    None,
    Supervised,
}

impl ErrorHandlerPolicy {
    pub fn is_supervised(self) -> bool {
        matches!(self, ErrorHandlerPolicy::Supervised)
    }

    /// Run `body` under this policy
    ///
    /// Same "onion" shape as a middleware: the body is the whole
    /// try/catch/clause pipeline of the route.
    pub(crate) fn supervise(
        self,
        route_id: &str,
        exchange: &mut Exchange,
        sink: &dyn UnhandledSink,
        body: &mut dyn FnMut(&mut Exchange) -> Result<(), Fault>,
    ) -> Result<(), Fault> {
        let result = body(exchange);

        if let (ErrorHandlerPolicy::Supervised, Err(fault)) = (self, &result) {
            sink.unhandled(UnhandledSignal {
                exchange_id: exchange.id(),
                route_id: route_id.to_string(),
                fault: fault.clone(),
            });
        }

        result
    }
}

impl fmt::Display for ErrorHandlerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorHandlerPolicy::None => write!(f, "none"),
            ErrorHandlerPolicy::Supervised => write!(f, "supervised"),
        }
    }
}
