use std::sync::Arc;

use crate::core::exchange::ExchangeId;
use crate::core::fault::Fault;

/// The "unhandled exception" log signal
///
/// Emitted once per route boundary by a supervised route whose fault
/// left the exception-clause stage without being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledSignal {
    pub exchange_id: ExchangeId,
    pub route_id: String,
    pub fault: Fault,
}

/// Process-wide destination for unhandled-exception signals
///
/// Shared by every traversal of a router; implementations must accept
/// concurrent appends. Ordering across traversals is not guaranteed.
pub trait UnhandledSink: Send + Sync {
    fn unhandled(&self, signal: UnhandledSignal);
}

impl<S: UnhandledSink + ?Sized> UnhandledSink for Arc<S> {
    fn unhandled(&self, signal: UnhandledSignal) {
        (**self).unhandled(signal)
    }
}

/// Default sink: one `error` event per signal
///
/// ```text
/// ERROR route_propagation: unhandled exception route=parent exchange=ex-7 fault=injected fault (route 'child', onNext)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl UnhandledSink for TracingSink {
    fn unhandled(&self, signal: UnhandledSignal) {
        tracing::error!(
            route = %signal.route_id,
            exchange = %signal.exchange_id,
            fault = %signal.fault,
            "unhandled exception"
        );
    }
}
