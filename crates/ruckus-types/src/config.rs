//! Controller configuration types.
//!
//! `ControllerConfig` represents the top-level `config.toml` that tunes the
//! reconciler's timing knobs. All fields have sensible defaults; a missing
//! file means a default config.

use serde::{Deserialize, Serialize};

/// Tunable settings for the controller.
///
/// Loaded from `{config_dir}/config.toml`. Every field defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Pause after creating an engine, giving the orchestrator's cache time
    /// to surface the new child before the next reconcile lists it.
    #[serde(default = "default_post_create_settle_ms")]
    pub post_create_settle_ms: u64,

    /// Attempts for a conflicted status write before giving up.
    #[serde(default = "default_status_retry_attempts")]
    pub status_retry_attempts: u32,

    /// Spacing between conflicted status-write attempts.
    #[serde(default = "default_status_retry_backoff_ms")]
    pub status_retry_backoff_ms: u64,

    /// Requeue interval while a completing schedule drains its children.
    #[serde(default = "default_drain_requeue_secs")]
    pub drain_requeue_secs: u64,

    /// Capacity of the broadcast event bus.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_post_create_settle_ms() -> u64 {
    1_000
}

fn default_status_retry_attempts() -> u32 {
    5
}

fn default_status_retry_backoff_ms() -> u64 {
    1_000
}

fn default_drain_requeue_secs() -> u64 {
    10
}

fn default_event_capacity() -> usize {
    1_024
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            post_create_settle_ms: default_post_create_settle_ms(),
            status_retry_attempts: default_status_retry_attempts(),
            status_retry_backoff_ms: default_status_retry_backoff_ms(),
            drain_requeue_secs: default_drain_requeue_secs(),
            event_capacity: default_event_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = ControllerConfig::default();
        assert_eq!(config.post_create_settle_ms, 1_000);
        assert_eq!(config.status_retry_attempts, 5);
        assert_eq!(config.status_retry_backoff_ms, 1_000);
        assert_eq!(config.drain_requeue_secs, 10);
        assert_eq!(config.event_capacity, 1_024);
    }

    #[test]
    fn deserialize_empty_toml_uses_defaults() {
        let config: ControllerConfig = toml::from_str("").unwrap();
        assert_eq!(config.status_retry_attempts, 5);
    }

    #[test]
    fn deserialize_partial_toml_overrides() {
        let config: ControllerConfig = toml::from_str(
            r#"
post_create_settle_ms = 0
status_retry_backoff_ms = 50
"#,
        )
        .unwrap();
        assert_eq!(config.post_create_settle_ms, 0);
        assert_eq!(config.status_retry_backoff_ms, 50);
        // untouched fields keep defaults
        assert_eq!(config.status_retry_attempts, 5);
        assert_eq!(config.event_capacity, 1_024);
    }
}
