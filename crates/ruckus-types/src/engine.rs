//! ChaosEngine resource types.
//!
//! The engine is the child resource that runs one chaos experiment. This
//! system only ever creates engines (and deletes them under the Replace
//! policy); their spec and status are otherwise owned by the chaos operator.
//! The one observable the scheduler depends on is `status.engineStatus`,
//! whose `completed` value is terminal.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::meta::{ObjectMeta, ResourceKey};

/// Label key identifying scheduler-created engines.
pub const APP_LABEL: &str = "app";
/// Label value identifying scheduler-created engines.
pub const APP_LABEL_VALUE: &str = "chaos-engine";
/// Label key carrying the owning schedule's uid.
pub const CHAOS_UID_LABEL: &str = "chaosUID";

/// A single chaos experiment run, owned by a ChaosSchedule.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChaosEngine {
    pub metadata: ObjectMeta,
    pub spec: EngineSpec,
    #[serde(default)]
    pub status: EngineStatus,
}

impl ChaosEngine {
    pub const KIND: &'static str = "ChaosEngine";

    pub fn key(&self) -> ResourceKey {
        self.metadata.key()
    }

    /// Whether the engine has run to completion. Completion is terminal.
    pub fn is_finished(&self) -> bool {
        self.status.engine_status == EnginePhase::Completed
    }
}

/// Engine spec: the scheduler sets `engineState` and passes the rest of the
/// schedule's template through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngineSpec {
    #[serde(default)]
    pub engine_state: EngineState,
    /// Everything else from the schedule's `engineTemplateSpec`, opaque to
    /// the scheduler.
    #[serde(flatten)]
    pub template: serde_json::Map<String, serde_json::Value>,
}

/// Desired state of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Active,
    Stop,
}

/// Observed status of an engine; written by the chaos operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    #[serde(default)]
    pub engine_status: EnginePhase,
}

/// Phase of an engine run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum EnginePhase {
    #[default]
    Initialized,
    Running,
    Completed,
    Stopped,
}
