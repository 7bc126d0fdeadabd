//! Logging infrastructure
//!
//! The library itself only emits `tracing` events; this module is an
//! optional helper for host applications that want those events on disk.
//! Logs are written to `$XDG_STATE_HOME/<app_id>/telemetry.log` following
//! XDG standards.

use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{xdg_state_home, LoggingConfig};

/// Initialize the logging system
///
/// Sets up tracing with:
/// - File output to the XDG state directory, rotated daily
/// - Log level from config, overridable via RUST_LOG
pub fn init(app_id: &str, config: &LoggingConfig) -> crate::error::Result<LoggingGuard> {
    let log_dir = log_dir(app_id);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "telemetry.log");

    // Non-blocking writer so logging never stalls the host
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Initialize logging for tests (logs to the test writer)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any pending log writes.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

fn log_dir(app_id: &str) -> PathBuf {
    xdg_state_home().join(app_id)
}

/// Returns the log file path for an application
pub fn log_file_path(app_id: &str) -> PathBuf {
    log_dir(app_id).join("telemetry.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path() {
        let path = log_file_path("com.example.app");
        assert!(path.ends_with("com.example.app/telemetry.log"));
    }
}
