//! Route Propagation - exception propagation for chained message routes
//!
//! This library decides, for an exchange traversing one or more chained
//! routes, whether a fault is absorbed by a catch segment, handled by an
//! exception clause, logged by a supervisory error handler, or left to
//! fail the traversal.
//!
//! # Quick Start
//!
//! ```ignore
//! use route_propagation::{ErrorHandlerPolicy, Exchange, ExceptionClause, Next, Route, Router};
//!
//! let mut router = Router::new();
//! router.define_route(
//!     Route::new("orders", Next::sink("mock:next"))
//!         .with_exception_clause(ExceptionClause::handled())
//!         .with_error_handler(ErrorHandlerPolicy::Supervised),
//! )?;
//!
//! let exchange = router.send("orders", Exchange::new())?;
//! assert!(!exchange.has_failed());
//! ```

pub mod core;
pub mod scenario;
pub mod steps;
pub mod supervision;

#[cfg(feature = "config")]
pub mod config;

// Convenience re-exports
pub use crate::core::error_handler_policy::ErrorHandlerPolicy;
pub use crate::core::exception_clause::ExceptionClause;
pub use crate::core::exchange::{Breadcrumb, Exchange, ExchangeId};
pub use crate::core::fault::{Fault, FaultCause, FaultPoint};
pub use crate::core::route::{Next, Route};
pub use crate::core::route_outcome::{Disposition, RouteOutcome};
pub use crate::core::router::Router;
pub use crate::core::router_error::RouterError;
pub use crate::steps::fault_plan::FaultPlan;
pub use crate::steps::route_step::{FailingStep, FnStep, RouteStep, StepResult};
pub use crate::supervision::capturing::CapturingSink;
pub use crate::supervision::sink::{TracingSink, UnhandledSignal, UnhandledSink};
