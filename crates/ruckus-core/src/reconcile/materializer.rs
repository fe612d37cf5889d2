//! Engine materialization: turning a schedule's template into a child.
//!
//! The child carries the schedule's labels plus the selector pair the
//! tracker lists by, the schedule's annotations, and a controller owner
//! reference so the orchestrator garbage-collects it and routes its events
//! back to the schedule.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use ruckus_types::engine::{
    APP_LABEL, APP_LABEL_VALUE, CHAOS_UID_LABEL, ChaosEngine, EngineSpec, EngineState,
    EngineStatus,
};
use ruckus_types::meta::{ObjectMeta, OwnerReference};
use ruckus_types::schedule::ChaosSchedule;

use crate::calendar::time_hash;

/// The label selector identifying engines created by the schedule with
/// `uid`. This is what the tracker lists by -- the ground truth for the
/// active list.
pub(crate) fn engine_selector(uid: Uuid) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_LABEL.to_string(), APP_LABEL_VALUE.to_string()),
        (CHAOS_UID_LABEL.to_string(), uid.to_string()),
    ])
}

/// Name for a repeat-schedule engine: `<schedule-name>-<unix-seconds>`.
pub(crate) fn hashed_name(schedule_name: &str, scheduled_time: DateTime<Utc>) -> String {
    format!("{schedule_name}-{}", time_hash(scheduled_time))
}

/// Build an engine from the schedule's template.
///
/// `name` is the bare schedule name for now/once and the hashed name for
/// repeat fires.
pub(crate) fn from_template(schedule: &ChaosSchedule, name: String) -> ChaosEngine {
    let mut labels = schedule.metadata.labels.clone();
    labels.extend(engine_selector(schedule.metadata.uid));

    let mut template = schedule.spec.engine_template_spec.clone();
    // The scheduler owns engineState; a template value would collide with
    // the flattened field.
    template.remove("engineState");
    if !schedule.spec.chaos_service_account.is_empty() {
        template.insert(
            "chaosServiceAccount".to_string(),
            serde_json::Value::String(schedule.spec.chaos_service_account.clone()),
        );
    }

    let mut metadata = ObjectMeta::new(schedule.metadata.namespace.clone(), name);
    metadata.labels = labels;
    metadata.annotations = schedule.metadata.annotations.clone();
    metadata.owner_references = vec![OwnerReference::controller_of(
        &schedule.metadata,
        ChaosSchedule::KIND,
    )];

    ChaosEngine {
        metadata,
        spec: EngineSpec {
            engine_state: EngineState::Active,
            template,
        },
        status: EngineStatus::default(),
    }
}

impl<C: crate::cluster::ClusterClient> super::Reconciler<C> {
    /// Create `engine`, treating a name collision as idempotent success.
    ///
    /// The hashed name is an at-most-once-per-second lock: if the process
    /// died between a create and its status update, the retry lands here
    /// with the same name and adopts the existing engine instead of
    /// duplicating it.
    pub(crate) async fn ensure_engine(
        &self,
        schedule_key: &ruckus_types::meta::ResourceKey,
        engine: ChaosEngine,
    ) -> Result<ChaosEngine, ruckus_types::error::ReconcileError> {
        use ruckus_types::error::ClusterError;
        use ruckus_types::event::EventKind;

        match self.client.create_engine(&engine).await {
            Ok(created) => {
                self.events.normal(
                    schedule_key.clone(),
                    EventKind::SuccessfulCreate,
                    format!("created engine {}", created.metadata.name),
                );
                Ok(created)
            }
            Err(ClusterError::AlreadyExists) => {
                tracing::info!(
                    schedule = %schedule_key,
                    engine = %engine.metadata.name,
                    "engine already exists, adopting it"
                );
                match self.client.get_engine(&engine.key()).await? {
                    Some(existing) => Ok(existing),
                    // Deleted between create and get; the next reconcile's
                    // list will sort out the active list.
                    None => Err(ClusterError::Unavailable(format!(
                        "engine {} vanished right after a name collision",
                        engine.metadata.name
                    ))
                    .into()),
                }
            }
            Err(err) => {
                self.events.warning(
                    schedule_key.clone(),
                    EventKind::FailedCreate,
                    format!("error creating engine: {err}"),
                );
                Err(err.into())
            }
        }
    }

    /// Delete an active engine ahead of a Replace-policy fire and drop it
    /// from the active list.
    pub(crate) async fn replace_active_engine(
        &self,
        schedule_key: &ruckus_types::meta::ResourceKey,
        reference: &ruckus_types::meta::ObjectReference,
    ) -> Result<(), ruckus_types::error::ReconcileError> {
        use ruckus_types::event::EventKind;
        use ruckus_types::meta::ResourceKey;

        let engine_key = ResourceKey::new(reference.namespace.clone(), reference.name.clone());
        match self.client.delete_engine(&engine_key).await {
            Ok(_existed) => {
                self.events.normal(
                    schedule_key.clone(),
                    EventKind::SuccessfulDelete,
                    format!("deleted engine {}", reference.name),
                );
                let uid = reference.uid;
                self.apply_status(schedule_key, |s| s.status.remove_from_active(uid))
                    .await?;
                Ok(())
            }
            Err(err) => {
                self.events.warning(
                    schedule_key.clone(),
                    EventKind::FailedDelete,
                    format!("error deleting engine {}: {err}", reference.name),
                );
                Err(err.into())
            }
        }
    }
}
