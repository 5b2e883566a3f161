use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use termdock_types::PushEvent;

/// Opaque subscriber identity, unique per bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Subscriber callback; an `Err` is logged and never interrupts dispatch
pub type EventHandler = Arc<dyn Fn(&PushEvent) -> anyhow::Result<()> + Send + Sync>;

/// Ordered handler sets keyed by event type.
///
/// The lock is never held across a handler invocation, so handlers may
/// register and unregister from inside a dispatch cycle.
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<String, Vec<(HandlerId, EventHandler)>>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> HandlerId {
        HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn register<F>(&self, event_type: &str, handler: F) -> HandlerId
    where
        F: Fn(&PushEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id();
        self.register_with_id(event_type, id, handler);
        id
    }

    /// Returns false without touching the set when the identity is already
    /// registered for this event type
    pub fn register_with_id<F>(&self, event_type: &str, id: HandlerId, handler: F) -> bool
    where
        F: Fn(&PushEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.lock().unwrap();
        let handlers = subscribers.entry(event_type.to_string()).or_default();
        if handlers.iter().any(|(existing, _)| *existing == id) {
            return false;
        }
        handlers.push((id, Arc::new(handler)));
        true
    }

    pub fn unregister(&self, event_type: &str, id: HandlerId) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap();
        let Some(handlers) = subscribers.get_mut(event_type) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            subscribers.remove(event_type);
        }
        removed
    }

    pub fn unregister_all(&self, event_type: &str) {
        self.subscribers.lock().unwrap().remove(event_type);
    }

    pub fn clear(&self) {
        self.subscribers.lock().unwrap().clear();
    }

    pub fn contains(&self, event_type: &str, id: HandlerId) -> bool {
        self.subscribers
            .lock()
            .unwrap()
            .get(event_type)
            .map(|handlers| handlers.iter().any(|(existing, _)| *existing == id))
            .unwrap_or(false)
    }

    /// Registration-ordered copy of the handler set for one event type
    pub fn snapshot(&self, event_type: &str) -> Vec<(HandlerId, EventHandler)> {
        self.subscribers
            .lock()
            .unwrap()
            .get(event_type)
            .cloned()
            .unwrap_or_default()
    }
}
