/// Unhandled-exception signal, sink trait and the tracing sink
pub mod sink;

/// In-memory sink for inspecting signals
pub mod capturing;
