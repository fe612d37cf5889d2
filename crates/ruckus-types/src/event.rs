//! Typed events the controller attaches to a schedule.
//!
//! Every observable transition emits one of these: engine created, engine
//! seen completed, engine gone missing, schedule halted/completed, a fire
//! skipped under the Forbid policy. Severity mirrors orchestrator event
//! conventions (Normal/Warning).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::meta::ResourceKey;

/// Severity of a schedule event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    Normal,
    Warning,
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// An engine was created for a fire.
    SuccessfulCreate,
    /// Engine creation failed.
    FailedCreate,
    /// An engine was deleted (Replace policy).
    SuccessfulDelete,
    /// Engine deletion failed.
    FailedDelete,
    /// The schedule entered the halted state.
    ScheduleHalted,
    /// The schedule entered the completed state.
    ScheduleCompleted,
    /// An active child was observed finished.
    SawCompletedEngine,
    /// An active child disappeared from the cluster.
    MissingEngine,
    /// A fire was skipped because a child was still active (Forbid).
    MissEngine,
    /// The next fire time could not be determined.
    FailedNeedsStart,
}

/// A single event attached to a ChaosSchedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEvent {
    /// The schedule the event is attached to.
    pub schedule: ResourceKey,
    pub kind: EventKind,
    pub severity: EventSeverity,
    pub message: String,
    pub time: DateTime<Utc>,
}

impl ScheduleEvent {
    pub fn normal(schedule: ResourceKey, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            schedule,
            kind,
            severity: EventSeverity::Normal,
            message: message.into(),
            time: Utc::now(),
        }
    }

    pub fn warning(schedule: ResourceKey, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            schedule,
            kind,
            severity: EventSeverity::Warning,
            message: message.into(),
            time: Utc::now(),
        }
    }
}
