//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;
use std::path::Path;

/// Quote a string as a TOML basic string (escapes backslashes in paths)
fn quoted(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

fn quoted_path(path: &Path) -> String {
    quoted(&path.to_string_lossy())
}

impl Config {
    /// Serialize config to TOML string (single source of truth for format)
    pub fn to_toml(&self) -> String {
        format!(
            r#"# nomi configuration
#
# Environment variables override this file:
#   NOMI_API_URL, NOMI_TIMEOUT_SECS, NOMI_DATA_DIR, NOMI_NO_TUI=1, RUST_LOG

# Backend base URL (including the /api/v1 prefix)
api_url = {api_url}

# Request timeout in seconds. Persona generation can take well over a minute,
# so keep this generous.
request_timeout_secs = {timeout}

# Local storage for the current simulation and chat transcripts
data_dir = {data_dir}

# TUI redraw cadence in milliseconds
tick_rate_ms = {tick_rate}

# Re-check simulation status when returning to the chat screen
sync_on_focus = {sync_on_focus}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = {log_level}
# File logging (in addition to TUI buffer or stderr)
file_enabled = {log_file_enabled}
file_dir = {log_file_dir}
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = {log_file_prefix}
"#,
            api_url = quoted(&self.api_url),
            timeout = self.request_timeout_secs,
            data_dir = quoted_path(&self.data_dir),
            tick_rate = self.tick_rate_ms,
            sync_on_focus = self.sync_on_focus,
            log_level = quoted(&self.logging.level),
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = quoted_path(&self.logging.file_dir),
            log_file_rotation = self.logging.file_rotation.as_str(),
            log_file_prefix = quoted(&self.logging.file_prefix),
        )
    }

    /// Save current configuration to file
    pub fn save(&self) -> Result<(), std::io::Error> {
        let Some(path) = Self::config_path() else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config path",
            ));
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, self.to_toml())
    }
}
