//! Tracing subscriber setup for the binary.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "foxwatch=info";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Log to stderr. Used by the non-interactive modes.
pub fn init_stderr() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter())
        .init();
}

/// Append JSON log lines to `path`.
///
/// The TUI owns the terminal, so this is the only way to get logs out of
/// an interactive session.
pub fn init_file(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(std::sync::Mutex::new(file))
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(filter())
        .init();
    Ok(())
}
