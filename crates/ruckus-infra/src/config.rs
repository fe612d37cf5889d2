//! Controller configuration loader.
//!
//! Reads `config.toml` from the controller's config directory and
//! deserializes it into [`ControllerConfig`]. Falls back to defaults when
//! the file is missing or malformed -- a bad config file must never keep
//! the controller from starting.

use std::path::Path;

use ruckus_types::config::ControllerConfig;

/// Load controller configuration from `{config_dir}/config.toml`.
///
/// - If the file does not exist, returns [`ControllerConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the
///   default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_controller_config(config_dir: &Path) -> ControllerConfig {
    let config_path = config_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No config.toml found at {}, using defaults",
                config_path.display()
            );
            return ControllerConfig::default();
        }
        Err(err) => {
            tracing::warn!(
                "Failed to read {}: {err}, using defaults",
                config_path.display()
            );
            return ControllerConfig::default();
        }
    };

    match toml::from_str::<ControllerConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ControllerConfig::default()
        }
    }
}
