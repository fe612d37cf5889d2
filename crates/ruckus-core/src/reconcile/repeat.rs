//! The repeat path: the cron-driven heart of the scheduler.
//!
//! Each pass refreshes the active list, checks the time-range bounds,
//! derives the cron plan, resolves the next fire, and either waits,
//! skips (Forbid), clears the way (Replace) or materializes an engine
//! named after the scheduled instant.

use chrono::{DateTime, Utc};

use ruckus_types::error::ReconcileError;
use ruckus_types::event::EventKind;
use ruckus_types::meta::{ObjectReference, ResourceKey};
use ruckus_types::schedule::{
    ChaosSchedule, ConcurrencyPolicy, SchedulePhase, ScheduleRepeat, ScheduleState,
};

use crate::cluster::ClusterClient;
use crate::firing::{self, FireDecision, FirePlan};

use super::{materializer, tracker, ReconcileOutcome, Reconciler};

impl<C: ClusterClient> Reconciler<C> {
    pub(crate) async fn reconcile_repeat(
        &self,
        schedule: &ChaosSchedule,
        repeat: &ScheduleRepeat,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let key = schedule.key();

        // Window not open yet: wait for the effective start.
        let effective_start = repeat
            .time_range
            .as_ref()
            .and_then(|r| r.start_time)
            .unwrap_or(schedule.metadata.creation_timestamp);
        if effective_start > now {
            let wait = (effective_start - now).to_std().unwrap_or_default();
            tracing::info!(schedule = %key, ?wait, "schedule window not open yet");
            return Ok(ReconcileOutcome::after(wait));
        }

        // Refresh the active list against the listed ground truth.
        let refresh = tracker::observe(&self.client, schedule).await?;
        let mut schedule = if refresh.is_empty() {
            schedule.clone()
        } else {
            let Some(updated) = self
                .apply_status(&key, |s| tracker::apply(s, &refresh, now))
                .await?
            else {
                return Ok(ReconcileOutcome::done());
            };
            self.emit_refresh_events(&key, &refresh);
            updated
        };

        // End of the range already behind us: wrap up.
        let end_time = repeat.time_range.as_ref().and_then(|r| r.end_time);
        if let Some(end) = end_time
            && now > end
        {
            tracing::info!(schedule = %key, %end, "end time already passed");
            return self.finalize_repeat(&key, now).await;
        }

        // Being deleted: leave the children to the garbage collector.
        if schedule.metadata.is_being_deleted() {
            return Ok(ReconcileOutcome::done());
        }

        let plan = match FirePlan::derive(repeat) {
            Ok(plan) => plan,
            Err(err) => {
                self.events.warning(
                    key.clone(),
                    EventKind::FailedNeedsStart,
                    format!("cannot derive a fire schedule: {err}"),
                );
                return Err(err.into());
            }
        };
        let decision = match firing::resolve(&plan, &schedule, repeat, now) {
            Ok(decision) => decision,
            Err(err) => {
                self.events.warning(
                    key.clone(),
                    EventKind::FailedNeedsStart,
                    format!("cannot determine if an engine needs to be started: {err}"),
                );
                return Err(err.into());
            }
        };

        match decision {
            FireDecision::Wait { next_run, wait } => {
                // No fire left inside the range: wrap up instead of waiting
                // past the end.
                if let Some(end) = end_time
                    && next_run > end
                {
                    tracing::info!(schedule = %key, %end, "no schedule time available before end time");
                    return self.finalize_repeat(&key, now).await;
                }
                if schedule.status.schedule.expected_next_run_time != Some(next_run) {
                    if self
                        .apply_status(&key, |s| {
                            s.status.schedule.expected_next_run_time = Some(next_run);
                        })
                        .await?
                        .is_none()
                    {
                        return Ok(ReconcileOutcome::done());
                    }
                }
                tracing::info!(schedule = %key, %next_run, ?wait, "time left before the next fire");
                Ok(ReconcileOutcome::after(wait))
            }
            FireDecision::Due { scheduled_time } => {
                if !schedule.status.active.is_empty() {
                    match schedule.spec.concurrency_policy {
                        ConcurrencyPolicy::Allow => {}
                        ConcurrencyPolicy::Forbid => {
                            self.events.warning(
                                key.clone(),
                                EventKind::MissEngine,
                                format!(
                                    "missed scheduled time to start an engine because of an active engine at: {scheduled_time}"
                                ),
                            );
                            return Ok(ReconcileOutcome::after(plan.period()));
                        }
                        ConcurrencyPolicy::Replace => {
                            for reference in schedule.status.active.clone() {
                                self.replace_active_engine(&key, &reference).await?;
                            }
                            schedule.status.active.clear();
                        }
                    }
                }
                self.fire(&key, &schedule, repeat, &plan, scheduled_time).await
            }
        }
    }

    /// Materialize an engine for `scheduled_time` and record the fire.
    async fn fire(
        &self,
        key: &ResourceKey,
        schedule: &ChaosSchedule,
        repeat: &ScheduleRepeat,
        plan: &FirePlan,
        scheduled_time: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let name = materializer::hashed_name(&schedule.metadata.name, scheduled_time);
        let engine = materializer::from_template(schedule, name);
        let engine = self.ensure_engine(key, engine).await?;
        let reference = ObjectReference::from(&engine.metadata);

        let start_time = repeat
            .time_range
            .as_ref()
            .and_then(|r| r.start_time)
            .unwrap_or(schedule.metadata.creation_timestamp);
        let expected_next = scheduled_time + plan.period();

        self.apply_status(key, |s| {
            s.spec.schedule_state = ScheduleState::Active;
            s.status.schedule.status = Some(SchedulePhase::Running);
            s.status.schedule.run_instances += 1;
            s.status.schedule.start_time = Some(start_time);
            s.status.schedule.expected_next_run_time = Some(expected_next);
            s.status.last_schedule_time = Some(match s.status.last_schedule_time {
                Some(prev) => prev.max(scheduled_time),
                None => scheduled_time,
            });
            s.status.add_active(reference.clone());
        })
        .await?;
        self.settle().await;
        Ok(ReconcileOutcome::after(plan.period()))
    }

    /// The repeat schedule has run out its time range.
    async fn finalize_repeat(
        &self,
        key: &ResourceKey,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if self
            .apply_status(key, |s| {
                s.spec.schedule_state = ScheduleState::Complete;
                s.status.schedule.status = Some(SchedulePhase::Completed);
                s.status.schedule.end_time = Some(now);
                s.status.schedule.expected_next_run_time = None;
                s.status.active.clear();
            })
            .await?
            .is_some()
        {
            self.events.normal(
                key.clone(),
                EventKind::ScheduleCompleted,
                "schedule completed successfully",
            );
        }
        Ok(ReconcileOutcome::done())
    }
}
