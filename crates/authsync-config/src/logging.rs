//! Logging initialization.
//!
//! Thin wrapper over the observability crate so binaries have a single call
//! to make at startup.

use observability::LogConfig;
use std::path::PathBuf;

/// Initialize the logging system.
///
/// - `level`: default filter (trace, debug, info, warn, error); `RUST_LOG` wins.
/// - `log_path`: when set, structured JSONL goes there and compact lines are
///   mirrored to stderr; otherwise only stderr is used.
///
/// ```ignore
/// init_logging("authsync", "info", Some(paths.log_file("authsync")));
/// tracing::info!("started");
/// ```
pub fn init_logging(service_name: &str, level: &str, log_path: Option<PathBuf>) {
    let also_stderr = log_path.is_some();
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: parse_level(level).as_str().to_ascii_lowercase(),
        log_path,
        also_stderr,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
