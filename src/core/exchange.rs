use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;

use crate::core::fault::{Fault, FaultPoint};
use crate::core::route_outcome::RouteOutcome;

static NEXT_EXCHANGE_ID: AtomicU64 = AtomicU64::new(1);

type Value = Box<dyn Any + Send + Sync>;

/// Process-unique identifier of an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExchangeId(u64);

impl ExchangeId {
    fn next() -> Self {
        Self(NEXT_EXCHANGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ex-{}", self.0)
    }
}

/// An observation point the exchange passed through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub route_id: String,
    pub point: FaultPoint,
}

/// The unit of work flowing through routes
///
/// Carries an opaque payload, the current fault (if any), the sticky
/// "exception caught" marker and a property bag. An exchange is owned by
/// exactly one traversal and mutated in place by every stage.
///
/// # Example
///
/// ```ignore
/// let mut exchange = Exchange::with_payload("order-42".to_string());
/// exchange.set("priority", 3u8);
///
/// let exchange = router.send("orders", exchange)?;
/// assert!(!exchange.has_failed());
/// ```
pub struct Exchange {
    id: ExchangeId,
    payload: Option<Value>,
    fault: Option<Fault>,
    exception_caught: Option<Fault>,
    properties: HashMap<String, Value>,
    history: Vec<Breadcrumb>,
    outcomes: Vec<RouteOutcome>,
}

impl Exchange {
    /// Property key under which the caught fault is exposed
    pub const EXCEPTION_CAUGHT: &'static str = "EXCEPTION_CAUGHT";

    pub fn new() -> Self {
        Self {
            id: ExchangeId::next(),
            payload: None,
            fault: None,
            exception_caught: None,
            properties: HashMap::new(),
            history: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn with_payload<T: Any + Send + Sync>(payload: T) -> Self {
        let mut exchange = Self::new();
        exchange.set_payload(payload);
        exchange
    }

    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(|p| p.downcast_ref::<T>())
    }

    pub fn set_payload<T: Any + Send + Sync>(&mut self, payload: T) {
        self.payload = Some(Box::new(payload));
    }

    /// Set a property
    ///
    /// [`Exchange::EXCEPTION_CAUGHT`] is owned by the propagation engine;
    /// writes to it are ignored.
    pub fn set<T: Any + Send + Sync>(&mut self, key: &str, value: T) {
        if key == Self::EXCEPTION_CAUGHT {
            tracing::warn!(exchange = %self.id, key, "ignoring write to reserved property");
            return;
        }
        self.properties.insert(key.to_string(), Box::new(value));
    }

    /// Get a property, typed
    ///
    /// `get::<Fault>(Exchange::EXCEPTION_CAUGHT)` returns the caught fault.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        if key == Self::EXCEPTION_CAUGHT {
            return self
                .exception_caught
                .as_ref()
                .and_then(|f| (f as &dyn Any).downcast_ref::<T>());
        }
        self.properties.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn contains(&self, key: &str) -> bool {
        if key == Self::EXCEPTION_CAUGHT {
            return self.exception_caught.is_some();
        }
        self.properties.contains_key(key)
    }

    /// Remove a property. The caught marker is sticky and cannot be removed.
    pub fn remove(&mut self, key: &str) -> bool {
        if key == Self::EXCEPTION_CAUGHT {
            return false;
        }
        self.properties.remove(key).is_some()
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn has_failed(&self) -> bool {
        self.fault.is_some()
    }

    /// The last fault marked caught by an exception clause
    pub fn exception_caught(&self) -> Option<&Fault> {
        self.exception_caught.as_ref()
    }

    pub fn has_exception_caught(&self) -> bool {
        self.exception_caught.is_some()
    }

    /// Observation points reached, in traversal order
    pub fn history(&self) -> &[Breadcrumb] {
        &self.history
    }

    pub fn visited(&self, route_id: &str, point: FaultPoint) -> bool {
        self.history
            .iter()
            .any(|b| b.route_id == route_id && b.point == point)
    }

    /// One entry per route boundary crossed, innermost route first
    pub fn outcomes(&self) -> &[RouteOutcome] {
        &self.outcomes
    }

    pub fn outcome_of(&self, route_id: &str) -> Option<&RouteOutcome> {
        self.outcomes.iter().rev().find(|o| o.route_id == route_id)
    }

    pub(crate) fn set_fault(&mut self, fault: Fault) {
        self.fault = Some(fault);
    }

    pub(crate) fn clear_fault(&mut self) {
        self.fault = None;
    }

    /// Mark `fault` as caught, returning the previous marker
    pub(crate) fn mark_caught(&mut self, fault: Fault) -> Option<Fault> {
        self.exception_caught.replace(fault)
    }

    /// Drop a mark made by a clause that then faulted itself
    pub(crate) fn revert_caught(&mut self, previous: Option<Fault>) {
        self.exception_caught = previous;
    }

    pub(crate) fn record(&mut self, route_id: &str, point: FaultPoint) {
        self.history.push(Breadcrumb {
            route_id: route_id.to_string(),
            point,
        });
    }

    pub(crate) fn push_outcome(&mut self, outcome: RouteOutcome) {
        self.outcomes.push(outcome);
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.properties.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Exchange")
            .field("id", &self.id)
            .field("has_payload", &self.payload.is_some())
            .field("fault", &self.fault)
            .field("exception_caught", &self.exception_caught)
            .field("properties", &keys)
            .field("history", &self.history)
            .field("outcomes", &self.outcomes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = Exchange::new();
        let b = Exchange::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn typed_properties() {
        let mut exchange = Exchange::with_payload(vec![1u8, 2, 3]);
        exchange.set("attempt", 2u32);

        assert_eq!(exchange.payload::<Vec<u8>>(), Some(&vec![1, 2, 3]));
        assert_eq!(exchange.get::<u32>("attempt"), Some(&2));
        assert_eq!(exchange.get::<String>("attempt"), None);
        assert!(exchange.remove("attempt"));
        assert!(!exchange.contains("attempt"));
    }

    #[test]
    fn caught_marker_is_sticky() {
        let mut exchange = Exchange::new();
        let fault = Fault::injected("route", FaultPoint::Try);

        exchange.set(Exchange::EXCEPTION_CAUGHT, "spoofed");
        assert!(!exchange.has_exception_caught());

        exchange.mark_caught(fault.clone());
        exchange.clear_fault();
        assert!(!exchange.remove(Exchange::EXCEPTION_CAUGHT));
        assert!(exchange.contains(Exchange::EXCEPTION_CAUGHT));
        assert_eq!(
            exchange.get::<Fault>(Exchange::EXCEPTION_CAUGHT),
            Some(&fault)
        );
    }

    #[test]
    fn reverting_a_mark_restores_the_earlier_one() {
        let mut exchange = Exchange::new();
        let first = Fault::injected("child", FaultPoint::Next);
        let second = Fault::injected("parent", FaultPoint::Next);

        assert_eq!(exchange.mark_caught(first.clone()), None);
        let previous = exchange.mark_caught(second);
        exchange.revert_caught(previous);

        assert_eq!(exchange.exception_caught(), Some(&first));
    }
}
