//! # Observability
//!
//! Centralized logging setup for the AuthSync workspace.
//!
//! Binaries call [`init`] or [`init_with_config`] once at startup and use the
//! standard `tracing` macros everywhere else. Library crates never install a
//! subscriber themselves.
//!
//! Two sinks are supported:
//!
//! - **Compact stderr** (default): human-readable lines filtered by
//!   `RUST_LOG` or the configured default level.
//! - **JSONL file**: when [`LogConfig::log_path`] is set, every event is
//!   written as one JSON object per line to an append-only file, e.g.
//!   `~/.authsync/logs/authsync.jsonl`. Credential-bearing fields
//!   (`password`, `cookie`, tokens) are redacted before they reach disk.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init("authsync");
//!     tracing::info!("service started");
//! }
//! ```

mod file_sink;
mod json_layer;

use std::path::PathBuf;

pub use json_layer::{LogEntry, REDACTED_FIELDS};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "authsync", "authsync-cli").
    /// Included in every JSONL line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional JSONL log file. When unset, logs go to stderr only.
    pub log_path: Option<PathBuf>,

    /// Also emit compact logs to stderr when a log file is configured.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging with default settings (compact stderr output).
///
/// ```rust,ignore
/// observability::init("authsync");
/// tracing::info!("ready");
/// ```
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// If the JSONL file cannot be opened the error is reported on stderr and
/// logging falls back to the compact stderr subscriber. Calling this twice is
/// harmless; the second installation attempt is ignored.
pub fn init_with_config(config: LogConfig) {
    if let Some(path) = config.log_path.clone() {
        match file_sink::init_file_subscriber(&config, &path) {
            Ok(()) => return,
            Err(e) => {
                eprintln!(
                    "observability: failed to open log file {}: {}; using stderr",
                    path.display(),
                    e
                );
            }
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.default_level))
        .with_target(true)
        .compact()
        .with_writer(std::io::stderr)
        .try_init();
}

/// Default JSONL location under the user's home directory.
pub fn default_log_path(service_name: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".authsync")
            .join("logs")
            .join(format!("{service_name}.jsonl"))
    })
}

fn env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

/// Re-export tracing macros for convenience.
pub use tracing::{debug, error, info, instrument, trace, warn};

/// Re-export Level for advanced filtering.
pub use tracing::Level;
