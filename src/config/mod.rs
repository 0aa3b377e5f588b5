//! Configuration for the nomi client
//!
//! Configuration is loaded in order of precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file (~/.config/nomi/config.toml)
//! 3. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod observability;
mod serialization;


pub use observability::{FileLogging, LogRotation, LoggingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend the client talks to when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// UI redraw cadence
pub const DEFAULT_TICK_RATE_MS: u64 = 200;

/// Platform data directory for the local store: e.g. ~/.local/share/nomi
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("nomi"))
        .unwrap_or_else(|| PathBuf::from("./.nomi"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL, including the `/api/v1` prefix
    pub api_url: String,

    /// Total request timeout; must cover slow persona generation
    pub request_timeout_secs: u64,

    /// Directory holding the local SQLite store
    pub data_dir: PathBuf,

    /// UI redraw cadence in milliseconds
    pub tick_rate_ms: u64,

    /// Re-sync simulation status when returning to the chat screen
    pub sync_on_focus: bool,

    /// Whether to enable the TUI (can be disabled for headless mode)
    pub enable_tui: bool,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: crate::api::DEFAULT_TIMEOUT_SECS,
            data_dir: default_data_dir(),
            tick_rate_ms: DEFAULT_TICK_RATE_MS,
            sync_on_focus: true,
            enable_tui: true,
            logging: LoggingConfig::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure (subset of Config that makes sense to persist)
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub api_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub data_dir: Option<String>,
    pub tick_rate_ms: Option<u64>,
    pub sync_on_focus: Option<bool>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/nomi/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("nomi").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Silently fail - config is optional
            }
        }

        // Use Config::default().to_toml() as single source of truth
        let template = Self::default().to_toml();

        // Write config (ignore errors - config is optional)
        let _ = std::fs::write(&path, template);
    }

    /// Parse config file contents
    pub(crate) fn parse_file_config(contents: &str) -> Result<FileConfig, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load file config if it exists
    ///
    /// Exits the process if the file exists but cannot be read or parsed: a
    /// broken config should fail fast with a clear error, not silently fall
    /// back to defaults while the user debugs the wrong thing.
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => match Self::parse_file_config(&contents) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                    eprintln!("║  CONFIG ERROR - Failed to parse configuration file          ║");
                    eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                    eprintln!("  File: {}\n", path.display());
                    eprintln!("  Error: {}\n", e);
                    eprintln!("  Tip: Check for:\n");
                    eprintln!("    - Missing quotes around string values");
                    eprintln!("    - Invalid boolean values (use true/false)");
                    eprintln!("    - Numbers written as strings");
                    eprintln!("    - Typos in section names\n");
                    eprintln!("  To reset, run `nomi config --reset`.\n");
                    std::process::exit(1);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FileConfig::default(),
            Err(e) => {
                eprintln!("\n╔══════════════════════════════════════════════════════════════╗");
                eprintln!("║  CONFIG ERROR - Cannot read configuration file              ║");
                eprintln!("╚══════════════════════════════════════════════════════════════╝\n");
                eprintln!("  File: {}\n", path.display());
                eprintln!("  Error: {}\n", e);
                std::process::exit(1);
            }
        }
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn from_env() -> Self {
        let file = Self::load_file_config();
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge a parsed file with an environment lookup
    pub(crate) fn resolve(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        // API URL: env > file > default
        let api_url = env("NOMI_API_URL")
            .filter(|v| !v.trim().is_empty())
            .or(file.api_url)
            .unwrap_or(defaults.api_url);

        // Timeout: env > file > default; zero would fail every call
        let request_timeout_secs = env("NOMI_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .or(file.request_timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(defaults.request_timeout_secs);

        // Data directory: env > file > default
        let data_dir = env("NOMI_DATA_DIR")
            .or(file.data_dir)
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        // Redraw cadence: file > default
        let tick_rate_ms = file
            .tick_rate_ms
            .filter(|ms| *ms > 0)
            .unwrap_or(defaults.tick_rate_ms);

        let sync_on_focus = file.sync_on_focus.unwrap_or(defaults.sync_on_focus);

        // TUI toggle: env only (runtime flag)
        let enable_tui = env("NOMI_NO_TUI")
            .map(|v| v != "1" && v.to_lowercase() != "true")
            .unwrap_or(true);

        let logging = LoggingConfig::from_file(file.logging);

        Self {
            api_url,
            request_timeout_secs,
            data_dir,
            tick_rate_ms,
            sync_on_focus,
            enable_tui,
            logging,
        }
    }
}
