//! Developer-diagnostics logging
//!
//! This is the `tracing` log developers read, written to
//! `$XDG_STATE_HOME/fleetflow/` with daily rotation. The user-facing log
//! screen is the [`crate::journal::Journal`], which is entirely separate.

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::{Config, LoggingConfig};

/// Guard that keeps the logging worker alive; dropping it flushes pending
/// writes.
pub type LogGuard = tracing_appender::non_blocking::WorkerGuard;

/// Initialize the logging system.
///
/// The level comes from `RUST_LOG` when set, falling back to the configured
/// level. Output goes to a daily-rotated file, never to the terminal (the
/// front-end owns the terminal).
pub fn init(config: &LoggingConfig) -> crate::error::Result<LogGuard> {
    let log_dir = Config::state_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "fleetflow.log");
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

    Ok(guard)
}

/// Initialize logging for tests (captured per-test by the harness).
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

#[cfg(test)]
mod tests {
    use crate::config::Config;

    #[test]
    fn test_log_path_under_state_dir() {
        let path = Config::log_path();
        assert!(path.ends_with("fleetflow/fleetflow.log"));
    }
}
