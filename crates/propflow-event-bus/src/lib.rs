//! Typed pub/sub broker for Propflow domain events
//!
//! The EventBus is the seam between event producers (the CRUD layer, the
//! payment scheduler, redelivery workers) and the automation engine.
//! Producers fire events; the engine consumes them through a match-all
//! subscription, while dashboards can subscribe to single trigger types.

use dashmap::DashMap;
use propflow_core::{Event, TriggerType};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Default channel capacity for event subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// The event bus for publishing and subscribing to domain events
pub struct EventBus {
    /// Map of trigger types to their broadcast senders
    listeners: DashMap<TriggerType, broadcast::Sender<Event>>,
    /// Sender for subscribers interested in every event
    match_all_sender: broadcast::Sender<Event>,
    /// Channel capacity
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (match_all_sender, _) = broadcast::channel(capacity);
        Self {
            listeners: DashMap::new(),
            match_all_sender,
            capacity,
        }
    }

    /// Subscribe to events of a specific trigger type
    pub fn subscribe(&self, trigger: TriggerType) -> broadcast::Receiver<Event> {
        trace!(trigger = %trigger, "Subscribing to trigger type");

        self.listeners
            .entry(trigger)
            .or_insert_with(|| {
                let (tx, _) = broadcast::channel(self.capacity);
                tx
            })
            .subscribe()
    }

    /// Subscribe to all events regardless of trigger type
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event> {
        self.match_all_sender.subscribe()
    }

    /// Fire an event to all subscribers
    ///
    /// The event is delivered to subscribers of its trigger type and to
    /// all match-all subscribers.
    pub fn fire(&self, event: Event) {
        debug!(event_id = %event.id, trigger = %event.trigger, "Firing event");

        if let Some(sender) = self.listeners.get(&event.trigger) {
            // Send errors just mean no active receivers
            let _ = sender.send(event.clone());
        }

        let _ = self.match_all_sender.send(event);
    }

    /// Get the number of trigger types with active subscriptions
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for EventBus
pub type SharedEventBus = Arc<EventBus>;
