//! Conflict-tolerant status writes.
//!
//! The status subresource is the only contended resource in the system:
//! the reconciler, the orchestrator and kubectl-style edits race on it.
//! Every write therefore goes through `apply_status`: fetch fresh, apply
//! the intended delta, write, and on a version conflict refetch and
//! re-apply. Delta closures must be idempotent against a fresh base (use
//! `add_active`, not a blind push).

use ruckus_types::error::{ClusterError, ReconcileError};
use ruckus_types::meta::ResourceKey;
use ruckus_types::schedule::ChaosSchedule;

use crate::cluster::ClusterClient;

use super::Reconciler;

impl<C: ClusterClient> Reconciler<C> {
    /// Apply `mutate` to the freshest copy of the schedule and persist it.
    ///
    /// Retries version conflicts up to the configured attempt budget with
    /// the configured spacing. Returns `None` when the schedule no longer
    /// exists -- the resource was deleted and there is nothing to write.
    pub(crate) async fn apply_status<F>(
        &self,
        key: &ResourceKey,
        mut mutate: F,
    ) -> Result<Option<ChaosSchedule>, ReconcileError>
    where
        F: FnMut(&mut ChaosSchedule),
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let Some(mut schedule) = self.client.get_schedule(key).await? else {
                tracing::debug!(schedule = %key, "schedule vanished mid-update");
                return Ok(None);
            };
            mutate(&mut schedule);
            match self.client.update_schedule(&schedule).await {
                Ok(stored) => return Ok(Some(stored)),
                Err(ClusterError::Conflict) => {
                    if attempt >= self.settings.status_retry_attempts {
                        return Err(ReconcileError::StatusExhausted {
                            attempts: attempt,
                            source: ClusterError::Conflict,
                        });
                    }
                    tracing::debug!(
                        schedule = %key,
                        attempt,
                        "status write conflicted, refetching"
                    );
                    tokio::time::sleep(self.settings.status_retry_backoff).await;
                }
                Err(ClusterError::NotFound) => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Pause after creating an engine so the orchestrator's cache can
    /// surface the new child before the next reconcile lists it.
    pub(crate) async fn settle(&self) {
        if !self.settings.post_create_settle.is_zero() {
            tokio::time::sleep(self.settings.post_create_settle).await;
        }
    }
}
