//! Logging init: stderr by default, or appended to a file.

use std::fs;
use std::io;
use std::path::Path;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,web_import=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Logs to stderr. `RUST_LOG` overrides the default filter.
pub fn init_logging_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Appends logs to `path`, creating its directory. On error nothing is
/// installed, so the caller can fall back to [`init_logging_stderr`].
pub fn init_logging_file(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(BoxMakeWriter::new(std::sync::Mutex::new(file)))
        .with_ansi(false)
        .init();

    tracing::info!("web-import logging to {}", path.display());
    Ok(())
}
