/// Route step trait and stock steps
pub mod route_step;

/// Deterministic fault injection plans
pub mod fault_plan;
