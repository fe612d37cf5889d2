//! Broadcast event bus for distributing `ScheduleEvent` to subscribers.
//!
//! Built on `tokio::sync::broadcast`. The reconciler publishes one event per
//! observable transition; embedders subscribe to forward them to the
//! orchestrator's event API, a log sink, or a test assertion. Publishing
//! with no active subscribers is a no-op.

use ruckus_types::event::{EventKind, ScheduleEvent};
use ruckus_types::meta::ResourceKey;
use tokio::sync::broadcast;

/// Multi-consumer bus for schedule events.
///
/// Wraps a `tokio::sync::broadcast` channel. Cloning the bus clones the
/// sender, allowing multiple producers and consumers.
pub struct EventBus {
    sender: broadcast::Sender<ScheduleEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ScheduleEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: ScheduleEvent) {
        tracing::debug!(
            schedule = %event.schedule,
            kind = ?event.kind,
            severity = ?event.severity,
            message = %event.message,
            "schedule event"
        );
        let _ = self.sender.send(event);
    }

    /// Publish a Normal-severity event.
    pub fn normal(&self, schedule: ResourceKey, kind: EventKind, message: impl Into<String>) {
        self.publish(ScheduleEvent::normal(schedule, kind, message));
    }

    /// Publish a Warning-severity event.
    pub fn warning(&self, schedule: ResourceKey, kind: EventKind, message: impl Into<String>) {
        self.publish(ScheduleEvent::warning(schedule, kind, message));
    }

    /// Access the underlying broadcast sender.
    pub fn sender(&self) -> &broadcast::Sender<ScheduleEvent> {
        &self.sender
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1_024)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
