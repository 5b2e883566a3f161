//! Process-wide publish/subscribe hub for backend push notifications
//!
//! The [`EventBus`] is an explicitly constructed, injectable service shared by
//! any number of session controllers. In host-bridge mode the platform pushes
//! events straight into [`EventBus::deliver`] and the bus only does subscriber
//! bookkeeping; in network mode the bus also owns a persistent websocket to
//! the backend, including keep-alive probing and bounded reconnection.

mod channel;
mod registry;

pub use channel::{ChannelConfig, ChannelConnection, ChannelStatus};
pub use registry::{EventHandler, HandlerId};

use std::sync::Mutex;

use log::warn;

use termdock_types::PushEvent;

use channel::ChannelHandle;
use registry::SubscriberRegistry;

/// Publish/subscribe hub, one instance per process (or per test)
pub struct EventBus {
    registry: SubscriberRegistry,
    channel: Mutex<Option<ChannelHandle>>,
    connection: Mutex<ChannelConnection>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            registry: SubscriberRegistry::new(),
            channel: Mutex::new(None),
            connection: Mutex::new(ChannelConnection::default()),
        }
    }

    /// Register a handler for one event type, returning its identity.
    ///
    /// Delivery order for a given event type follows registration order.
    pub fn register<F>(&self, event_type: &str, handler: F) -> HandlerId
    where
        F: Fn(&PushEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.registry.register(event_type, handler)
    }

    /// Register under a caller-held identity; a no-op when that identity is
    /// already registered for the event type.
    pub fn register_with_id<F>(&self, event_type: &str, id: HandlerId, handler: F) -> bool
    where
        F: Fn(&PushEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.registry.register_with_id(event_type, id, handler)
    }

    /// Issue a fresh handler identity without registering anything
    pub fn handler_id(&self) -> HandlerId {
        self.registry.next_id()
    }

    pub fn unregister(&self, event_type: &str, id: HandlerId) -> bool {
        self.registry.unregister(event_type, id)
    }

    /// Drop every handler for one event type
    pub fn unregister_all(&self, event_type: &str) {
        self.registry.unregister_all(event_type)
    }

    /// Drop every handler for every event type
    pub fn clear(&self) {
        self.registry.clear()
    }

    /// Deliver one normalized event to its subscribers.
    ///
    /// This is the entry point the host bridge pushes into directly; the
    /// network channel funnels through it as well. Dispatch iterates a
    /// snapshot, so handlers may mutate subscriptions freely; a handler
    /// removed earlier in the cycle is skipped, and a failing handler never
    /// blocks the remaining ones.
    pub fn deliver(&self, event: &PushEvent) {
        for (id, handler) in self.registry.snapshot(&event.event_type) {
            if !self.registry.contains(&event.event_type, id) {
                continue;
            }
            if let Err(err) = handler(event) {
                warn!(
                    "handler {:?} for {} failed: {err}",
                    id, event.event_type
                );
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
