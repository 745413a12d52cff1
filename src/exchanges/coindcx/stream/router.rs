use crate::exchanges::coindcx::events::StreamEvent;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, trace, warn};

/// Callback for one inbound event. Receives the payload exactly as decoded
/// from the frame; nested encodings inside it are the handler's business.
pub type EventHandler = Box<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Identifies one registration, for `unregister`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Event name to ordered handler list.
#[derive(Default)]
pub struct EventRouter {
    handlers: HashMap<StreamEvent, Vec<(HandlerId, EventHandler)>>,
    next_id: u64,
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(event, list)| (event.as_str(), list.len()))
            .collect();
        f.debug_struct("EventRouter")
            .field("handlers", &counts)
            .finish_non_exhaustive()
    }
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for `event`. Handlers run in registration order.
    pub fn register<F>(&mut self, event: StreamEvent, handler: F) -> HandlerId
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register_boxed(event, Box::new(handler))
    }

    pub fn register_boxed(&mut self, event: StreamEvent, handler: EventHandler) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.handlers.entry(event).or_default().push((id, handler));
        id
    }

    /// Remove one registration. Returns whether it existed.
    pub fn unregister(&mut self, id: HandlerId) -> bool {
        for list in self.handlers.values_mut() {
            if let Some(pos) = list.iter().position(|(existing, _)| *existing == id) {
                drop(list.remove(pos));
                return true;
            }
        }
        false
    }

    pub fn handler_count(&self, event: StreamEvent) -> usize {
        self.handlers.get(&event).map_or(0, Vec::len)
    }

    /// Route a wire event name. Names outside the known set are dropped.
    /// Returns the number of handlers that completed without error.
    pub fn dispatch(&self, name: &str, payload: &Value) -> usize {
        match StreamEvent::from_wire(name) {
            Some(event) => self.dispatch_event(event, payload),
            None => {
                trace!(event = name, "dropping unrouted event");
                0
            }
        }
    }

    pub fn dispatch_event(&self, event: StreamEvent, payload: &Value) -> usize {
        let Some(list) = self.handlers.get(&event) else {
            return 0;
        };

        let mut succeeded = 0;
        for (id, handler) in list {
            match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => succeeded += 1,
                Ok(Err(e)) => {
                    warn!(event = %event, handler = id.0, error = %e, "event handler failed");
                }
                Err(_) => {
                    error!(event = %event, handler = id.0, "event handler panicked");
                }
            }
        }
        succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> EventHandler) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = Arc::clone(&log);
            move |tag: &'static str| -> EventHandler {
                let log = Arc::clone(&log);
                Box::new(move |payload: &Value| {
                    log.lock().unwrap().push(format!("{}:{}", tag, payload["id"]));
                    Ok(())
                })
            }
        };
        (log, make)
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        let (log, make) = recorder();
        let mut router = EventRouter::new();
        router.register_boxed(StreamEvent::OrderUpdate, make("first"));
        router.register_boxed(StreamEvent::OrderUpdate, make("second"));

        let ran = router.dispatch("order-update", &json!({"id": 7}));

        assert_eq!(ran, 2);
        assert_eq!(*log.lock().unwrap(), vec!["first:7", "second:7"]);
    }

    #[test]
    fn test_failing_handler_does_not_stop_the_next() {
        let (log, make) = recorder();
        let mut router = EventRouter::new();
        router.register(StreamEvent::OrderUpdate, |_| anyhow::bail!("boom"));
        router.register_boxed(StreamEvent::OrderUpdate, make("after-error"));
        router.register(StreamEvent::OrderUpdate, |_| panic!("handler bug"));
        router.register_boxed(StreamEvent::OrderUpdate, make("after-panic"));

        let ran = router.dispatch("df-order-update", &json!({"id": 1}));

        assert_eq!(ran, 2);
        assert_eq!(*log.lock().unwrap(), vec!["after-error:1", "after-panic:1"]);

        // router is still usable afterwards
        assert_eq!(router.dispatch("order-update", &json!({"id": 2})), 2);
    }

    #[test]
    fn test_unknown_and_unregistered_events_are_dropped() {
        let (log, make) = recorder();
        let mut router = EventRouter::new();
        router.register_boxed(StreamEvent::NewTrade, make("trade"));

        assert_eq!(router.dispatch("funding-rate", &json!({})), 0);
        assert_eq!(router.dispatch("candlestick", &json!({})), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_payload_is_passed_unmodified() {
        let seen = Arc::new(Mutex::new(None));
        let mut router = EventRouter::new();
        {
            let seen = Arc::clone(&seen);
            router.register(StreamEvent::BalanceUpdate, move |payload| {
                *seen.lock().unwrap() = Some(payload.clone());
                Ok(())
            });
        }

        let payload = json!({"event": "balance-update", "data": "[{\"balance\":\"10\"}]"});
        router.dispatch("balance-update", &payload);

        assert_eq!(seen.lock().unwrap().as_ref(), Some(&payload));
    }

    #[test]
    fn test_unregister_removes_single_handler() {
        let (log, make) = recorder();
        let mut router = EventRouter::new();
        let first = router.register_boxed(StreamEvent::DepthUpdate, make("a"));
        router.register_boxed(StreamEvent::DepthUpdate, make("b"));

        assert!(router.unregister(first));
        assert!(!router.unregister(first));
        assert_eq!(router.handler_count(StreamEvent::DepthUpdate), 1);

        router.dispatch("depth-update", &json!({"id": 3}));
        assert_eq!(*log.lock().unwrap(), vec!["b:3"]);
    }
}
