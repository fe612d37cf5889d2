//! The orchestrator port.
//!
//! Defines the storage interface the reconciler drives: reading schedules,
//! writing their status, and creating/listing/deleting engines. The
//! infrastructure layer (ruckus-infra) implements this trait; in production
//! deployments the implementation wraps the orchestrator's API client, in
//! tests and embedded setups it is an in-memory cluster.
//!
//! Uses native async fn in traits (Rust 2024 edition, no async_trait macro).

use std::collections::BTreeMap;

use ruckus_types::engine::ChaosEngine;
use ruckus_types::error::ClusterError;
use ruckus_types::meta::ResourceKey;
use ruckus_types::schedule::ChaosSchedule;

/// Client for the resources the scheduler reads and writes.
///
/// Every call is a suspension point; the reconciler performs no blocking
/// work between them. Writes are optimistic: `update_schedule` carries the
/// caller's observed `resourceVersion` and fails with
/// [`ClusterError::Conflict`] when it is stale.
pub trait ClusterClient: Send + Sync {
    /// Get a schedule by key. `None` when it does not exist.
    fn get_schedule(
        &self,
        key: &ResourceKey,
    ) -> impl Future<Output = Result<Option<ChaosSchedule>, ClusterError>> + Send;

    /// Persist a schedule's controller-owned fields (`scheduleState` and the
    /// status subresource). Returns the stored copy with its bumped
    /// `resourceVersion`.
    fn update_schedule(
        &self,
        schedule: &ChaosSchedule,
    ) -> impl Future<Output = Result<ChaosSchedule, ClusterError>> + Send;

    /// Get an engine by key. `None` when it does not exist.
    fn get_engine(
        &self,
        key: &ResourceKey,
    ) -> impl Future<Output = Result<Option<ChaosEngine>, ClusterError>> + Send;

    /// List engines in `namespace` whose labels match every pair in
    /// `selector`. This is the ground truth for the active list.
    fn list_engines(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<Vec<ChaosEngine>, ClusterError>> + Send;

    /// Create an engine. Fails with [`ClusterError::AlreadyExists`] when the
    /// name is taken -- which the reconciler treats as idempotent success.
    /// Returns the stored copy with its server-assigned uid.
    fn create_engine(
        &self,
        engine: &ChaosEngine,
    ) -> impl Future<Output = Result<ChaosEngine, ClusterError>> + Send;

    /// Delete an engine. Returns `true` if it existed.
    fn delete_engine(
        &self,
        key: &ResourceKey,
    ) -> impl Future<Output = Result<bool, ClusterError>> + Send;
}
