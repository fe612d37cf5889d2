//! The now/once path: a single engine named after the schedule itself.
//!
//! `now` fires on the first reconcile; `once` behaves the same after its
//! execution time has passed. The engine carries the bare schedule name, so
//! a re-entered reconcile adopts the existing engine instead of creating a
//! second one. When the engine is later observed finished, the schedule is
//! flipped to `complete`; the follow-up reconcile (triggered by that very
//! update) settles the status phase.

use chrono::{DateTime, Utc};

use ruckus_types::error::ReconcileError;
use ruckus_types::meta::{ObjectReference, ResourceKey};
use ruckus_types::schedule::{ChaosSchedule, SchedulePhase, ScheduleState};

use crate::cluster::ClusterClient;

use super::{materializer, tracker, ReconcileOutcome, Reconciler};

impl<C: ClusterClient> Reconciler<C> {
    pub(crate) async fn reconcile_immediate(
        &self,
        schedule: &ChaosSchedule,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let key = schedule.key();

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

        let engine_key = ResourceKey::new(
            schedule.metadata.namespace.clone(),
            schedule.metadata.name.clone(),
        );
        match self.client.get_engine(&engine_key).await? {
            None => {
                tracing::info!(schedule = %key, "creating the one-shot engine");
                let engine =
                    materializer::from_template(schedule, schedule.metadata.name.clone());
                let engine = self.ensure_engine(&key, engine).await?;
                let reference = ObjectReference::from(&engine.metadata);

                self.apply_status(&key, |s| {
                    s.spec.schedule_state = ScheduleState::Active;
                    s.status.schedule.status = Some(SchedulePhase::Running);
                    s.status.schedule.start_time = Some(now);
                    s.status.schedule.run_instances += 1;
                    s.status.last_schedule_time = Some(match s.status.last_schedule_time {
                        Some(prev) => prev.max(now),
                        None => now,
                    });
                    s.status.add_active(reference.clone());
                })
                .await?;
                self.settle().await;
                Ok(ReconcileOutcome::done())
            }
            Some(engine) if engine.is_finished() => {
                tracing::info!(schedule = %key, "one-shot engine finished, completing schedule");
                self.apply_status(&key, |s| {
                    s.spec.schedule_state = ScheduleState::Complete;
                    s.status.schedule.end_time = Some(now);
                })
                .await?;
                Ok(ReconcileOutcome::done())
            }
            Some(_) => Ok(ReconcileOutcome::done()),
        }
    }
}
