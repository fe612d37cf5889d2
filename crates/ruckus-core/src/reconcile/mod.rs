//! The reconciliation state machine.
//!
//! Entered on each enqueue (a schedule change, or an owned engine change
//! routed via its controller reference). One pass is pure in `now` and the
//! cluster snapshot: it loads the schedule, refreshes the active list, and
//! dispatches on the schedule state and type. It returns either an error
//! (the hosting runtime requeues with backoff) or an optional requeue-after
//! hint. Requeue durations are advisory lower bounds -- the runtime may
//! fire earlier on watch events, and the machine converges regardless of
//! when it is invoked.

mod immediate;
mod materializer;
mod repeat;
mod status;
mod tracker;

use std::time::Duration;

use chrono::{DateTime, Utc};

use ruckus_types::config::ControllerConfig;
use ruckus_types::error::{ReconcileError, ScheduleDefinitionError};
use ruckus_types::event::EventKind;
use ruckus_types::meta::ResourceKey;
use ruckus_types::schedule::{ChaosSchedule, SchedulePhase, ScheduleSpec, ScheduleState};

use crate::cluster::ClusterClient;
use crate::event::EventBus;

// ---------------------------------------------------------------------------
// Settings and outcome
// ---------------------------------------------------------------------------

/// Timing knobs for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Pause after creating an engine (informer-cache settle).
    pub post_create_settle: Duration,
    /// Attempt budget for conflicted status writes.
    pub status_retry_attempts: u32,
    /// Spacing between conflicted status-write attempts.
    pub status_retry_backoff: Duration,
    /// Requeue interval while a completing schedule drains its children.
    pub drain_requeue: Duration,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            post_create_settle: Duration::from_secs(1),
            status_retry_attempts: 5,
            status_retry_backoff: Duration::from_secs(1),
            drain_requeue: Duration::from_secs(10),
        }
    }
}

impl ReconcilerSettings {
    /// Settings with every sleep zeroed. For tests and embedders that
    /// provide their own pacing.
    pub fn immediate() -> Self {
        Self {
            post_create_settle: Duration::ZERO,
            status_retry_backoff: Duration::ZERO,
            ..Self::default()
        }
    }
}

impl From<&ControllerConfig> for ReconcilerSettings {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            post_create_settle: Duration::from_millis(config.post_create_settle_ms),
            status_retry_attempts: config.status_retry_attempts,
            status_retry_backoff: Duration::from_millis(config.status_retry_backoff_ms),
            drain_requeue: Duration::from_secs(config.drain_requeue_secs),
        }
    }
}

/// What one reconcile pass asks of the hosting runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Re-invoke after this long; `None` means wait for the next watch
    /// event.
    pub requeue_after: Option<Duration>,
}

impl ReconcileOutcome {
    pub fn done() -> Self {
        Self {
            requeue_after: None,
        }
    }

    pub fn after(wait: Duration) -> Self {
        Self {
            requeue_after: Some(wait),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Drives ChaosSchedules toward their declared firing behavior.
///
/// Holds no per-schedule state: everything observable flows through the
/// cluster client, so concurrent reconciles of *different* schedules and
/// crash-restarts of the process both converge. The hosting runtime
/// serializes reconciles of the same schedule.
pub struct Reconciler<C: ClusterClient> {
    client: C,
    events: EventBus,
    settings: ReconcilerSettings,
}

impl<C: ClusterClient> Reconciler<C> {
    pub fn new(client: C, events: EventBus) -> Self {
        Self::with_settings(client, events, ReconcilerSettings::default())
    }

    pub fn with_settings(client: C, events: EventBus, settings: ReconcilerSettings) -> Self {
        Self {
            client,
            events,
            settings,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// One reconcile pass for the schedule at `key`, evaluated at `now`.
    pub async fn reconcile(
        &self,
        key: &ResourceKey,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(schedule) = self.client.get_schedule(key).await? else {
            // Deleted after the enqueue; children are garbage-collected via
            // their owner references.
            tracing::debug!(schedule = %key, "schedule gone, nothing to reconcile");
            return Ok(ReconcileOutcome::done());
        };

        tracing::info!(
            schedule = %key,
            state = ?schedule.spec.schedule_state,
            kind = schedule.spec.schedule.kind(),
            "reconciling chaos schedule"
        );

        match schedule.spec.schedule_state {
            ScheduleState::Active => self.reconcile_active(&schedule, now).await,
            ScheduleState::Halt => {
                if schedule.status.schedule.status != Some(SchedulePhase::Halted) {
                    self.reconcile_halt(key).await
                } else {
                    Ok(ReconcileOutcome::done())
                }
            }
            ScheduleState::Complete => {
                if schedule.status.schedule.status != Some(SchedulePhase::Completed) {
                    self.reconcile_complete(&schedule, now).await
                } else {
                    Ok(ReconcileOutcome::done())
                }
            }
            // Accepted for forward compatibility; no behavior yet.
            ScheduleState::Stop => Ok(ReconcileOutcome::done()),
        }
    }

    async fn reconcile_active(
        &self,
        schedule: &ChaosSchedule,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        match &schedule.spec.schedule {
            ScheduleSpec::Now(true) => self.reconcile_immediate(schedule, now).await,
            ScheduleSpec::Now(false) => Err(ScheduleDefinitionError::NowDisabled.into()),
            ScheduleSpec::Once(once) => {
                let wait = once.execution_time - now;
                if wait > chrono::Duration::zero() {
                    tracing::info!(
                        schedule = %schedule.key(),
                        execution_time = %once.execution_time,
                        "time left before the one-shot fire"
                    );
                    Ok(ReconcileOutcome::after(wait.to_std().unwrap_or_default()))
                } else {
                    self.reconcile_immediate(schedule, now).await
                }
            }
            ScheduleSpec::Repeat(repeat) => {
                let repeat = repeat.clone();
                self.reconcile_repeat(schedule, &repeat, now).await
            }
        }
    }

    async fn reconcile_halt(&self, key: &ResourceKey) -> Result<ReconcileOutcome, ReconcileError> {
        match self
            .apply_status(key, |s| {
                s.status.schedule.status = Some(SchedulePhase::Halted);
            })
            .await
        {
            Ok(Some(_)) => {
                self.events.normal(
                    key.clone(),
                    EventKind::ScheduleHalted,
                    "schedule halted successfully",
                );
                Ok(ReconcileOutcome::done())
            }
            Ok(None) => Ok(ReconcileOutcome::done()),
            Err(err) => {
                self.events.warning(
                    key.clone(),
                    EventKind::ScheduleHalted,
                    "cannot update status as halted",
                );
                Err(err)
            }
        }
    }

    async fn reconcile_complete(
        &self,
        schedule: &ChaosSchedule,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let key = schedule.key();

        // Children still draining: only refresh the active list and come
        // back shortly.
        if !schedule.status.active.is_empty() {
            let refresh = tracker::observe(&self.client, schedule).await?;
            if !refresh.is_empty() {
                if self
                    .apply_status(&key, |s| tracker::apply(s, &refresh, now))
                    .await?
                    .is_none()
                {
                    return Ok(ReconcileOutcome::done());
                }
                self.emit_refresh_events(&key, &refresh);
            }
            return Ok(ReconcileOutcome::after(self.settings.drain_requeue));
        }

        match self
            .apply_status(&key, |s| {
                s.status.schedule.status = Some(SchedulePhase::Completed);
                s.status.schedule.end_time = Some(now);
            })
            .await
        {
            Ok(Some(_)) => {
                self.events.normal(
                    key.clone(),
                    EventKind::ScheduleCompleted,
                    "schedule completed successfully",
                );
                Ok(ReconcileOutcome::done())
            }
            Ok(None) => Ok(ReconcileOutcome::done()),
            Err(err) => {
                self.events.warning(
                    key.clone(),
                    EventKind::ScheduleCompleted,
                    "cannot update status as completed",
                );
                Err(err)
            }
        }
    }
}

