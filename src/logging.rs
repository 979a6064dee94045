//! Logging setup
//!
//! The TUI owns the terminal, so interactive sessions log to a daily rolling
//! JSON file only. One-shot commands log compactly to stderr. Both honour
//! `RUST_LOG`.

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "estate_chat=info";
const LOG_FILE_NAME: &str = "estate-chat.log";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("estate-chat").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// File-only logging for the TUI.
///
/// The returned guard flushes buffered lines when dropped; keep it alive
/// until the terminal has been restored.
pub fn init_tui() -> Result<WorkerGuard> {
    let log_dir = log_dir();
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .json()
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_filter(env_filter(DEFAULT_FILTER));

    tracing_subscriber::registry().with(file_layer).try_init()?;

    tracing::info!(dir = %log_dir.display(), "logging initialized");
    Ok(guard)
}

/// Stderr logging for one-shot commands. Quiet unless `verbose` or
/// `RUST_LOG` asks for more.
pub fn init_cli(verbose: bool) -> Result<()> {
    let default = if verbose { "estate_chat=debug" } else { "estate_chat=warn" };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .compact()
        .with_target(false)
        .with_filter(env_filter(default));

    tracing_subscriber::registry().with(stderr_layer).try_init()?;
    Ok(())
}
