//! ChaosSchedule resource types.
//!
//! A ChaosSchedule describes when and how often chaos should be injected;
//! the controller materializes ChaosEngine children from it at the right
//! times. The spec is user-owned; the controller writes only the status
//! subresource and the `scheduleState` field (when a one-shot schedule
//! finishes or a repeat schedule runs out its time range).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::meta::{ObjectMeta, ObjectReference, ResourceKey};

// ---------------------------------------------------------------------------
// ChaosSchedule
// ---------------------------------------------------------------------------

/// The user-authored resource describing a chaos experiment schedule.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChaosSchedule {
    pub metadata: ObjectMeta,
    pub spec: ChaosScheduleSpec,
    #[serde(default)]
    pub status: ChaosScheduleStatus,
}

impl ChaosSchedule {
    pub const KIND: &'static str = "ChaosSchedule";

    pub fn key(&self) -> ResourceKey {
        self.metadata.key()
    }
}

/// Desired state of a ChaosSchedule.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChaosScheduleSpec {
    /// Service account handed verbatim to the engines this schedule creates.
    #[serde(default)]
    pub chaos_service_account: String,
    /// When to fire: exactly one of now / once / repeat.
    pub schedule: ScheduleSpec,
    /// User-driven lifecycle knob: active, halt, stop or complete.
    #[serde(default)]
    pub schedule_state: ScheduleState,
    /// Whether engines from the same schedule may overlap in time.
    #[serde(default)]
    pub concurrency_policy: ConcurrencyPolicy,
    /// Opaque template for the child ChaosEngine's spec.
    #[serde(default)]
    pub engine_template_spec: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Schedule variants
// ---------------------------------------------------------------------------

/// The firing strategy. Externally tagged so the wire shape is
/// `{"now": true}`, `{"once": {...}}` or `{"repeat": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ScheduleSpec {
    /// Fire exactly once, immediately.
    Now(bool),
    /// Fire exactly once, at a specific instant.
    Once(ScheduleOnce),
    /// Fire repeatedly inside an optional time range, gated by work-day and
    /// work-hour windows.
    Repeat(ScheduleRepeat),
}

impl ScheduleSpec {
    /// Short name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ScheduleSpec::Now(_) => "now",
            ScheduleSpec::Once(_) => "once",
            ScheduleSpec::Repeat(_) => "repeat",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOnce {
    /// The instant at which the single engine is to be created.
    pub execution_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRepeat {
    /// Absolute bounds on firing. Missing start means the schedule's
    /// creation timestamp; missing end means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub properties: RepeatProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_hours: Option<WorkHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_days: Option<WorkDays>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepeatProperties {
    /// Minimum period between two fires, `"<N>m"` or `"<N>h"`. Required
    /// for repeat schedules; validated when the cron is derived.
    #[serde(default)]
    pub min_chaos_interval: String,
    /// Accepted for forward compatibility; currently ignored.
    #[serde(default)]
    pub random: bool,
}

/// Hours of the day during which fires are admitted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkHours {
    /// Cron-hour sub-expression over 0-23, e.g. `"9-17"` or `"0,6,12,18"`.
    pub included_hours: String,
}

/// Days of the week during which fires are admitted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkDays {
    /// Sub-expression over 0-6 or weekday mnemonics, sun=0 ... sat=6,
    /// e.g. `"Mon-Fri"` or `"0,2,4"`.
    pub included_days: String,
}

// ---------------------------------------------------------------------------
// Lifecycle enums
// ---------------------------------------------------------------------------

/// User-facing lifecycle state of a schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleState {
    /// Firing as scheduled. An absent value is treated as active.
    #[default]
    Active,
    /// No fires; active children drain naturally. Resumable by user edit.
    Halt,
    /// Accepted for forward compatibility; currently a no-op.
    Stop,
    /// The schedule has run out; no further fires ever.
    Complete,
}

/// Whether two engines from the same schedule may exist simultaneously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ConcurrencyPolicy {
    /// Fire even while a previous engine is still running.
    Allow,
    /// Skip the fire while a previous engine is still running.
    #[default]
    Forbid,
    /// Delete the running engine, then fire.
    Replace,
}

/// Observed phase of the schedule, written by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SchedulePhase {
    Running,
    Completed,
    Halted,
    Stopped,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Observed state of a ChaosSchedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChaosScheduleStatus {
    #[serde(default)]
    pub schedule: ScheduleStatus,
    /// Time of the most recent successful fire. Monotone non-decreasing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_schedule_time: Option<DateTime<Utc>>,
    /// Time the last active child was observed finished or gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_schedule_completion_time: Option<DateTime<Utc>>,
    /// References to children currently believed running. Rebuilt against
    /// the labeled engine list on every reconcile; never trusted blindly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active: Vec<ObjectReference>,
}

impl ChaosScheduleStatus {
    /// Whether `uid` is present in the active list.
    pub fn in_active_list(&self, uid: Uuid) -> bool {
        self.active.iter().any(|r| r.uid == uid)
    }

    /// Remove the entry with `uid` from the active list, if present.
    pub fn remove_from_active(&mut self, uid: Uuid) {
        self.active.retain(|r| r.uid != uid);
    }

    /// Append a reference to the active list unless its uid is already
    /// tracked. Keeps status-writer retries idempotent.
    pub fn add_active(&mut self, reference: ObjectReference) {
        if !self.in_active_list(reference.uid) {
            self.active.push(reference);
        }
    }
}

/// The schedule-level slice of status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SchedulePhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Number of engines materialized so far. Incremented by exactly one
    /// per successful fire; never decremented.
    #[serde(default)]
    pub run_instances: u32,
    /// Approximate time of the next fire, when one is projected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_next_run_time: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
