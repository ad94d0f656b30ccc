//! Navigation event bus.
//!
//! # Responsibilities
//! - Keep the subscriber list for `navigate` and `history-changed`
//! - Deliver capture-priority subscribers before normal ones
//! - Let a subscriber stop propagation to the remaining ones
//!
//! # Design Decisions
//! - One bus per document, cloned by handle (`Arc` inside)
//! - Handlers are snapshotted before delivery, so a handler may publish
//!   (re-entrant dispatch) or (un)subscribe without deadlocking
//! - Registration order is preserved within each priority class

use std::cell::Cell;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::observability::metrics;
use crate::view::NodeId;

/// Event names carried on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Navigate,
    HistoryChanged,
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventName::Navigate => write!(f, "navigate"),
            EventName::HistoryChanged => write!(f, "history-changed"),
        }
    }
}

/// A navigation event. Not retained after dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationEvent {
    /// An intercepted link click.
    Navigate {
        resolved_path: String,
        anchor: Option<NodeId>,
    },
    /// The history entry changed (push, back or forward).
    HistoryChanged { state: Value },
}

impl NavigationEvent {
    pub fn name(&self) -> EventName {
        match self {
            NavigationEvent::Navigate { .. } => EventName::Navigate,
            NavigationEvent::HistoryChanged { .. } => EventName::HistoryChanged,
        }
    }
}

/// An event being delivered to handlers.
pub struct Dispatch {
    event: NavigationEvent,
    stopped: Cell<bool>,
}

impl Dispatch {
    pub fn event(&self) -> &NavigationEvent {
        &self.event
    }

    /// Skip every handler not yet called for this event.
    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped.get()
    }
}

/// Subscription options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscribeOptions {
    /// Run before normal-priority subscribers.
    pub capture: bool,
}

impl SubscribeOptions {
    pub fn capture() -> Self {
        Self { capture: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Outcome of a `publish` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub handlers_called: usize,
    pub propagation_stopped: bool,
}

pub type Handler = Arc<dyn Fn(&Dispatch) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    event: EventName,
    capture: bool,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

/// Shared publish/subscribe hub for navigation events.
#[derive(Clone, Default)]
pub struct NavigationBus {
    inner: Arc<Mutex<BusInner>>,
}

impl fmt::Debug for NavigationBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl NavigationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`.
    pub fn subscribe<F>(&self, event: EventName, options: SubscribeOptions, handler: F) -> SubscriptionId
    where
        F: Fn(&Dispatch) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.subscribers.push(Subscriber {
            id,
            event,
            capture: options.capture,
            handler: Arc::new(handler),
        });
        tracing::debug!(event = %event, capture = options.capture, "Navigation subscriber added");
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        inner.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Deliver `event` to its subscribers, capture-priority first.
    pub fn publish(&self, event: NavigationEvent) -> Delivery {
        let name = event.name();
        let handlers: Vec<Handler> = {
            let inner = self.lock();
            let matching = inner.subscribers.iter().filter(|s| s.event == name);
            let (capture, normal): (Vec<&Subscriber>, Vec<&Subscriber>) =
                matching.partition(|s| s.capture);
            capture
                .into_iter()
                .chain(normal)
                .map(|s| s.handler.clone())
                .collect()
        };

        let dispatch = Dispatch {
            event,
            stopped: Cell::new(false),
        };
        let mut handlers_called = 0;
        for handler in handlers {
            if dispatch.is_propagation_stopped() {
                break;
            }
            handler(&dispatch);
            handlers_called += 1;
        }

        metrics::record_navigation_event(name);
        tracing::trace!(
            event = %name,
            handlers = handlers_called,
            stopped = dispatch.is_propagation_stopped(),
            "Navigation event dispatched"
        );

        Delivery {
            handlers_called,
            propagation_stopped: dispatch.is_propagation_stopped(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BusInner> {
        // A panicking handler never runs under this lock, so poisoning only
        // follows a panic in the bus itself.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(state: Value) -> NavigationEvent {
        NavigationEvent::HistoryChanged { state }
    }

    #[test]
    fn test_capture_runs_first() {
        let bus = NavigationBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let o = order.clone();
        bus.subscribe(EventName::HistoryChanged, SubscribeOptions::default(), move |_| {
            o.lock().unwrap().push("normal");
        });
        let o = order.clone();
        bus.subscribe(EventName::HistoryChanged, SubscribeOptions::capture(), move |_| {
            o.lock().unwrap().push("capture");
        });

        let delivery = bus.publish(history(Value::Null));
        assert_eq!(delivery.handlers_called, 2);
        assert_eq!(*order.lock().unwrap(), vec!["capture", "normal"]);
    }

    #[test]
    fn test_stop_propagation() {
        let bus = NavigationBus::new();
        let reached = Arc::new(Mutex::new(false));

        let r = reached.clone();
        bus.subscribe(EventName::Navigate, SubscribeOptions::default(), move |_| {
            *r.lock().unwrap() = true;
        });
        bus.subscribe(EventName::Navigate, SubscribeOptions::capture(), |d| d.stop_propagation());

        let delivery = bus.publish(NavigationEvent::Navigate {
            resolved_path: "/a".into(),
            anchor: None,
        });
        assert!(delivery.propagation_stopped);
        assert_eq!(delivery.handlers_called, 1);
        assert!(!*reached.lock().unwrap());
    }

    #[test]
    fn test_events_are_filtered_by_name() {
        let bus = NavigationBus::new();
        bus.subscribe(EventName::Navigate, SubscribeOptions::default(), |_| {});
        let delivery = bus.publish(history(Value::Null));
        assert_eq!(delivery.handlers_called, 0);
    }

    #[test]
    fn test_reentrant_publish_and_unsubscribe() {
        let bus = NavigationBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        bus.subscribe(EventName::HistoryChanged, SubscribeOptions::default(), move |d| {
            if let NavigationEvent::HistoryChanged { state } = d.event() {
                s.lock().unwrap().push(state.clone());
            }
        });
        let inner_bus = bus.clone();
        let id = bus.subscribe(EventName::Navigate, SubscribeOptions::default(), move |d| {
            if let NavigationEvent::Navigate { resolved_path, .. } = d.event() {
                inner_bus.publish(history(Value::String(resolved_path.clone())));
            }
        });

        bus.publish(NavigationEvent::Navigate {
            resolved_path: "/x".into(),
            anchor: None,
        });
        assert_eq!(*seen.lock().unwrap(), vec![Value::String("/x".into())]);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(), 1);
    }
}
