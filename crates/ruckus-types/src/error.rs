use thiserror::Error;

/// Errors in a schedule's own definition: a bad interval, a malformed
/// calendar window, an underivable cron. Fatal for the reconcile; not
/// retried until the resource changes.
#[derive(Debug, Error)]
pub enum ScheduleDefinitionError {
    #[error(
        "invalid minChaosInterval '{0}': must be '<N>m' or '<N>h' with N > 0"
    )]
    InvalidInterval(String),

    #[error("invalid includedHours '{expr}': {reason}")]
    InvalidHours { expr: String, reason: String },

    #[error("invalid includedDays '{expr}': {reason}")]
    InvalidDays { expr: String, reason: String },

    #[error("unparseable cron expression '{expr}': {reason}")]
    UnparseableCron { expr: String, reason: String },

    #[error("cron expression '{0}' yields no upcoming fire time")]
    NoUpcomingFire(String),

    #[error("schedule type 'now' is present but set to false")]
    NowDisabled,
}

/// Errors from orchestrator operations (used by the `ClusterClient` port in
/// ruckus-core).
#[derive(Debug, Clone, Error)]
pub enum ClusterError {
    #[error("resource not found")]
    NotFound,

    #[error("resource already exists")]
    AlreadyExists,

    #[error("resource version conflict")]
    Conflict,

    #[error("cluster unavailable: {0}")]
    Unavailable(String),
}

/// Everything a single reconcile can fail with. Returned to the hosting
/// runtime, which applies backoff.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Definition(#[from] ScheduleDefinitionError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("status update failed after {attempts} attempts: {source}")]
    StatusExhausted {
        attempts: u32,
        #[source]
        source: ClusterError,
    },
}
