//! Embedded controller bootstrap.
//!
//! Wires the pieces a deployment needs into one handle: the tracing
//! pipeline, the controller config, the event bus with its log sink, the
//! cluster and the reconciler. The hosting runtime (work queue, watches,
//! leader election) stays external -- an embedder calls `reconcile` through
//! the handle whenever its queue pops a key, and `shutdown` when it stops.

use std::path::Path;

use tokio::task::JoinHandle;

use ruckus_core::event::EventBus;
use ruckus_core::reconcile::{Reconciler, ReconcilerSettings};
use ruckus_observe::event_log;
use ruckus_observe::tracing_setup::{self, TracingOptions};
use ruckus_types::config::ControllerConfig;

use crate::config::load_controller_config;
use crate::memory::InMemoryCluster;

/// A bootstrapped controller: config, cluster, reconciler and the event
/// log sink, wired together and ready to serve reconcile requests.
pub struct Controller {
    config: ControllerConfig,
    cluster: InMemoryCluster,
    reconciler: Reconciler<InMemoryCluster>,
    event_logger: JoinHandle<u64>,
}

impl Controller {
    /// Bring up a controller from `{config_dir}/config.toml`.
    ///
    /// Installs the tracing subscriber (tolerating an embedder that already
    /// owns the global one), loads the config, and starts the event log
    /// sink on the reconciler's bus.
    pub async fn bootstrap(config_dir: &Path, tracing: &TracingOptions) -> Self {
        if let Err(err) = tracing_setup::init_tracing(tracing) {
            tracing::debug!("tracing subscriber already installed: {err}");
        }

        let config = load_controller_config(config_dir).await;
        let events = EventBus::new(config.event_capacity);
        let event_logger = event_log::spawn_event_logger(&events);
        let cluster = InMemoryCluster::new();
        let reconciler = Reconciler::with_settings(
            cluster.clone(),
            events,
            ReconcilerSettings::from(&config),
        );

        tracing::info!(
            settle_ms = config.post_create_settle_ms,
            status_retries = config.status_retry_attempts,
            "controller bootstrapped"
        );

        Self {
            config,
            cluster,
            reconciler,
            event_logger,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn cluster(&self) -> &InMemoryCluster {
        &self.cluster
    }

    pub fn reconciler(&self) -> &Reconciler<InMemoryCluster> {
        &self.reconciler
    }

    /// Stop the controller: drop the event bus, wait for the log sink to
    /// drain, flush pending traces. Returns the number of events the sink
    /// recorded over the controller's lifetime.
    pub async fn shutdown(self) -> u64 {
        let Self {
            reconciler,
            event_logger,
            ..
        } = self;
        // The reconciler holds the last bus sender; dropping it lets the
        // sink drain and exit.
        drop(reconciler);
        let recorded = event_logger.await.unwrap_or(0);
        tracing_setup::shutdown_tracing();
        recorded
    }
}
