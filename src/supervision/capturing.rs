use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::exchange::ExchangeId;
use crate::supervision::sink::{TracingSink, UnhandledSignal, UnhandledSink};

/// Sink that records every signal for later inspection
///
/// Clones share the same storage, so a driver can keep one handle and
/// give another to the router.
///
/// # Example
///
/// ```ignore
/// let sink = CapturingSink::new();
/// let router = Router::with_sink(sink.clone());
///
/// let exchange = router.send_with_faults("route", Exchange::new(), &plan)?;
/// assert_eq!(sink.count_for(exchange.id()), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CapturingSink {
    signals: Arc<Mutex<Vec<UnhandledSignal>>>,
    forward: bool,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and also emit through [`TracingSink`]
    pub fn forwarding() -> Self {
        Self {
            forward: true,
            ..Self::default()
        }
    }

    /// Snapshot of every recorded signal, in append order
    pub fn signals(&self) -> Vec<UnhandledSignal> {
        self.signals.lock().clone()
    }

    pub fn signals_for(&self, exchange_id: ExchangeId) -> Vec<UnhandledSignal> {
        self.signals
            .lock()
            .iter()
            .filter(|s| s.exchange_id == exchange_id)
            .cloned()
            .collect()
    }

    /// Routes that signalled for an exchange, innermost first
    pub fn routes_for(&self, exchange_id: ExchangeId) -> Vec<String> {
        self.signals
            .lock()
            .iter()
            .filter(|s| s.exchange_id == exchange_id)
            .map(|s| s.route_id.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.signals.lock().len()
    }

    pub fn count_for(&self, exchange_id: ExchangeId) -> usize {
        self.signals
            .lock()
            .iter()
            .filter(|s| s.exchange_id == exchange_id)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.lock().is_empty()
    }

    pub fn clear(&self) {
        self.signals.lock().clear();
    }
}

impl UnhandledSink for CapturingSink {
    fn unhandled(&self, signal: UnhandledSignal) {
        if self.forward {
            TracingSink.unhandled(signal.clone());
        }
        self.signals.lock().push(signal);
    }
}
