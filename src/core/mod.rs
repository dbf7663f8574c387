pub mod error_handler_policy;
pub mod exception_clause;
pub mod exchange;
pub mod fault;
pub(crate) mod propagation;
pub mod route;
pub mod route_outcome;
pub mod router;
pub mod router_error;
