//! File-based tracing setup.
//!
//! Logs go to a daily-rolling file under `${ERRWISE_HOME}/logs`, never to
//! the terminal; stdout stays clean for command output. `ERRWISE_LOG`
//! controls the filter (default `info`).

use anyhow::{Context, Result};
use errwise_core::config::paths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber. The returned guard must be held for
/// the life of the process so buffered log lines are flushed on exit.
pub fn init() -> Result<WorkerGuard> {
    let logs_dir = paths::logs_dir();
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("create logs directory {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&logs_dir, "errwise.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env("ERRWISE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
