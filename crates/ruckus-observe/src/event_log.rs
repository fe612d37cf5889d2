//! Schedule event log sink.
//!
//! The reconciler records every observable transition as a typed
//! `ScheduleEvent` on the broadcast bus. This module is the sink that turns
//! those events into tracing records at a level matching their severity --
//! in a cluster deployment these are the lines an operator greps for, and
//! an embedder forwarding events to the orchestrator's event API can reuse
//! the same subscription.
//!
//! The logger runs as a background task and exits once every bus sender is
//! gone.

use ruckus_core::event::EventBus;
use ruckus_types::event::{EventSeverity, ScheduleEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Write one event into the tracing pipeline.
pub fn record(event: &ScheduleEvent) {
    match event.severity {
        EventSeverity::Normal => tracing::info!(
            schedule = %event.schedule,
            kind = ?event.kind,
            time = %event.time,
            "{}",
            event.message
        ),
        EventSeverity::Warning => tracing::warn!(
            schedule = %event.schedule,
            kind = ?event.kind,
            time = %event.time,
            "{}",
            event.message
        ),
    }
}

/// Spawn the background task draining `bus` into the tracing pipeline.
///
/// The subscription is taken before this function returns, so events
/// published afterwards are never missed. The task resolves to the number
/// of events it recorded once the last bus sender is dropped. A lagged
/// subscription is logged and skipped rather than wedging the logger.
pub fn spawn_event_logger(bus: &EventBus) -> JoinHandle<u64> {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        let mut recorded = 0u64;
        loop {
            match events.recv().await {
                Ok(event) => {
                    record(&event);
                    recorded += 1;
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event logger fell behind, skipping");
                }
                Err(RecvError::Closed) => break,
            }
        }
        recorded
    })
}
