//! Dashmap-backed in-memory cluster.
//!
//! Implements `ClusterClient` from `ruckus-core` with the orchestrator
//! behaviors the reconciler's correctness rests on:
//!
//! - creates assign a server-side uid and resource version 1; a duplicate
//!   name fails with `AlreadyExists`
//! - schedule updates are optimistic: a stale observed resource version
//!   fails with `Conflict`, a successful write bumps it
//! - listing filters by namespace and label equality
//!
//! Fault hooks (`inject_conflicts`, `fail_updates`) let tests exercise the
//! conflict-retry discipline and the crash window between an engine create
//! and its status update.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use uuid::Uuid;

use ruckus_core::cluster::ClusterClient;
use ruckus_types::engine::{ChaosEngine, EnginePhase};
use ruckus_types::error::ClusterError;
use ruckus_types::meta::ResourceKey;
use ruckus_types::schedule::ChaosSchedule;

struct Inner {
    schedules: DashMap<ResourceKey, ChaosSchedule>,
    engines: DashMap<ResourceKey, ChaosEngine>,
    /// Remaining `update_schedule` calls to fail with `Conflict`.
    conflicts: AtomicU32,
    /// Remaining `update_schedule` calls to fail with `Unavailable`.
    failures: AtomicU32,
}

/// Shared-handle in-memory cluster. Cloning shares the underlying state.
#[derive(Clone)]
pub struct InMemoryCluster {
    inner: Arc<Inner>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                schedules: DashMap::new(),
                engines: DashMap::new(),
                conflicts: AtomicU32::new(0),
                failures: AtomicU32::new(0),
            }),
        }
    }

    /// Admit a schedule, assigning a uid and resource version the way the
    /// orchestrator would. Returns the stored copy.
    pub fn put_schedule(&self, mut schedule: ChaosSchedule) -> ChaosSchedule {
        if schedule.metadata.uid.is_nil() {
            schedule.metadata.uid = Uuid::now_v7();
        }
        if schedule.metadata.resource_version == 0 {
            schedule.metadata.resource_version = 1;
        }
        self.inner
            .schedules
            .insert(schedule.key(), schedule.clone());
        schedule
    }

    /// Current stored copy of a schedule.
    pub fn schedule(&self, key: &ResourceKey) -> Option<ChaosSchedule> {
        self.inner.schedules.get(key).map(|s| s.clone())
    }

    /// Current stored copy of an engine.
    pub fn engine(&self, key: &ResourceKey) -> Option<ChaosEngine> {
        self.inner.engines.get(key).map(|e| e.clone())
    }

    /// All stored engines, in no particular order.
    pub fn engines(&self) -> Vec<ChaosEngine> {
        self.inner.engines.iter().map(|e| e.clone()).collect()
    }

    pub fn engine_count(&self) -> usize {
        self.inner.engines.len()
    }

    /// Mutate a schedule as an out-of-band writer (user edit, another
    /// controller). Bumps the resource version, invalidating in-flight
    /// optimistic writes. Returns `false` when the schedule does not exist.
    pub fn edit_schedule(
        &self,
        key: &ResourceKey,
        mutate: impl FnOnce(&mut ChaosSchedule),
    ) -> bool {
        match self.inner.schedules.get_mut(key) {
            Some(mut entry) => {
                mutate(&mut entry);
                entry.metadata.resource_version += 1;
                true
            }
            None => false,
        }
    }

    /// Mark an engine's run as completed (what the chaos operator would do).
    pub fn complete_engine(&self, key: &ResourceKey) -> bool {
        match self.inner.engines.get_mut(key) {
            Some(mut entry) => {
                entry.status.engine_status = EnginePhase::Completed;
                true
            }
            None => false,
        }
    }

    /// Force-delete an engine, bypassing owner references.
    pub fn remove_engine(&self, key: &ResourceKey) -> bool {
        self.inner.engines.remove(key).is_some()
    }

    /// Fail the next `n` schedule updates with a version conflict.
    pub fn inject_conflicts(&self, n: u32) {
        self.inner.conflicts.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` schedule updates as if the cluster dropped them.
    pub fn fail_updates(&self, n: u32) {
        self.inner.failures.store(n, Ordering::SeqCst);
    }

    fn take_injected(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterClient for InMemoryCluster {
    async fn get_schedule(
        &self,
        key: &ResourceKey,
    ) -> Result<Option<ChaosSchedule>, ClusterError> {
        Ok(self.schedule(key))
    }

    async fn update_schedule(
        &self,
        schedule: &ChaosSchedule,
    ) -> Result<ChaosSchedule, ClusterError> {
        if Self::take_injected(&self.inner.failures) {
            return Err(ClusterError::Unavailable("injected fault".to_string()));
        }
        if Self::take_injected(&self.inner.conflicts) {
            return Err(ClusterError::Conflict);
        }

        let key = schedule.key();
        let mut entry = self
            .inner
            .schedules
            .get_mut(&key)
            .ok_or(ClusterError::NotFound)?;
        if entry.metadata.resource_version != schedule.metadata.resource_version {
            return Err(ClusterError::Conflict);
        }
        let mut stored = schedule.clone();
        stored.metadata.resource_version += 1;
        *entry = stored.clone();
        Ok(stored)
    }

    async fn get_engine(&self, key: &ResourceKey) -> Result<Option<ChaosEngine>, ClusterError> {
        Ok(self.engine(key))
    }

    async fn list_engines(
        &self,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Result<Vec<ChaosEngine>, ClusterError> {
        Ok(self
            .inner
            .engines
            .iter()
            .filter(|engine| {
                engine.metadata.namespace == namespace
                    && selector
                        .iter()
                        .all(|(k, v)| engine.metadata.labels.get(k) == Some(v))
            })
            .map(|engine| engine.clone())
            .collect())
    }

    async fn create_engine(&self, engine: &ChaosEngine) -> Result<ChaosEngine, ClusterError> {
        match self.inner.engines.entry(engine.key()) {
            dashmap::Entry::Occupied(_) => Err(ClusterError::AlreadyExists),
            dashmap::Entry::Vacant(vacant) => {
                let mut stored = engine.clone();
                if stored.metadata.uid.is_nil() {
                    stored.metadata.uid = Uuid::now_v7();
                }
                stored.metadata.resource_version = 1;
                vacant.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn delete_engine(&self, key: &ResourceKey) -> Result<bool, ClusterError> {
        Ok(self.inner.engines.remove(key).is_some())
    }
}
