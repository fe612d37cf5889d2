//! Active-children tracking.
//!
//! The labeled engine list is the only reliable witness for what is still
//! running: relying on owner-ref garbage collection alone can wedge a
//! schedule in "active" forever after a child is force-deleted. On every
//! reconcile, before any decision, the tracker diffs `status.active`
//! against that list: children observed completed leave the list, and so do
//! children that no longer exist.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use ruckus_types::engine::ChaosEngine;
use ruckus_types::error::ClusterError;
use ruckus_types::meta::ObjectReference;
use ruckus_types::schedule::ChaosSchedule;

use crate::cluster::ClusterClient;

use super::materializer::engine_selector;

/// Why an entry is leaving the active list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemovalReason {
    /// The engine reported `engineStatus: completed`.
    Completed,
    /// The engine is gone from the cluster.
    Missing,
}

#[derive(Debug, Clone)]
pub(crate) struct ActiveRemoval {
    pub reference: ObjectReference,
    pub reason: RemovalReason,
}

/// The diff between `status.active` and the listed ground truth.
#[derive(Debug, Clone, Default)]
pub(crate) struct ActiveRefresh {
    pub removals: Vec<ActiveRemoval>,
}

impl ActiveRefresh {
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty()
    }
}

/// List the schedule's engines and compute which active entries must go.
pub(crate) async fn observe<C: ClusterClient>(
    client: &C,
    schedule: &ChaosSchedule,
) -> Result<ActiveRefresh, ClusterError> {
    let selector = engine_selector(schedule.metadata.uid);
    let engines = client
        .list_engines(&schedule.metadata.namespace, &selector)
        .await?;
    let by_uid: HashMap<Uuid, &ChaosEngine> =
        engines.iter().map(|e| (e.metadata.uid, e)).collect();

    let mut removals = Vec::new();
    for reference in &schedule.status.active {
        match by_uid.get(&reference.uid) {
            Some(engine) if engine.is_finished() => removals.push(ActiveRemoval {
                reference: reference.clone(),
                reason: RemovalReason::Completed,
            }),
            Some(_) => {}
            None => removals.push(ActiveRemoval {
                reference: reference.clone(),
                reason: RemovalReason::Missing,
            }),
        }
    }
    Ok(ActiveRefresh { removals })
}

/// Apply a refresh to a (freshly fetched) schedule. Safe to re-apply on
/// status-write retries.
pub(crate) fn apply(schedule: &mut ChaosSchedule, refresh: &ActiveRefresh, now: DateTime<Utc>) {
    for removal in &refresh.removals {
        schedule.status.remove_from_active(removal.reference.uid);
        schedule.status.last_schedule_completion_time = Some(now);
    }
}

impl<C: ClusterClient> super::Reconciler<C> {
    /// Emit one event per active-list removal. Called once per refresh,
    /// after the status write landed, so retries do not duplicate events.
    pub(crate) fn emit_refresh_events(
        &self,
        key: &ruckus_types::meta::ResourceKey,
        refresh: &ActiveRefresh,
    ) {
        use ruckus_types::event::EventKind;
        for removal in &refresh.removals {
            match removal.reason {
                RemovalReason::Completed => self.events.normal(
                    key.clone(),
                    EventKind::SawCompletedEngine,
                    format!("saw completed engine {}", removal.reference.name),
                ),
                RemovalReason::Missing => self.events.normal(
                    key.clone(),
                    EventKind::MissingEngine,
                    format!("active engine went missing: {}", removal.reference.name),
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruckus_types::meta::ObjectMeta;
    use ruckus_types::schedule::{ChaosScheduleSpec, ChaosScheduleStatus, ScheduleSpec};

    fn schedule_with_active(active: Vec<ObjectReference>) -> ChaosSchedule {
        let mut metadata = ObjectMeta::new("litmus", "pod-killer");
        metadata.uid = Uuid::now_v7();
        ChaosSchedule {
            metadata,
            spec: ChaosScheduleSpec {
                chaos_service_account: String::new(),
                schedule: ScheduleSpec::Now(true),
                schedule_state: Default::default(),
                concurrency_policy: Default::default(),
                engine_template_spec: serde_json::Map::new(),
            },
            status: ChaosScheduleStatus {
                active,
                ..Default::default()
            },
        }
    }

    #[test]
    fn apply_removes_and_stamps_completion() {
        let uid = Uuid::now_v7();
        let reference = ObjectReference {
            name: "pod-killer-1700000000".to_string(),
            namespace: "litmus".to_string(),
            uid,
        };
        let mut schedule = schedule_with_active(vec![reference.clone()]);
        let refresh = ActiveRefresh {
            removals: vec![ActiveRemoval {
                reference,
                reason: RemovalReason::Completed,
            }],
        };
        let now = Utc::now();

        apply(&mut schedule, &refresh, now);
        assert!(schedule.status.active.is_empty());
        assert_eq!(schedule.status.last_schedule_completion_time, Some(now));

        // Re-applying (status-writer retry) is a no-op beyond the stamp.
        apply(&mut schedule, &refresh, now);
        assert!(schedule.status.active.is_empty());
    }

    #[test]
    fn apply_empty_refresh_leaves_status_untouched() {
        let reference = ObjectReference {
            name: "e".to_string(),
            namespace: "litmus".to_string(),
            uid: Uuid::now_v7(),
        };
        let mut schedule = schedule_with_active(vec![reference]);
        apply(&mut schedule, &ActiveRefresh::default(), Utc::now());
        assert_eq!(schedule.status.active.len(), 1);
        assert!(schedule.status.last_schedule_completion_time.is_none());
    }
}
