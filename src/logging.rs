//! File-based logging.
//!
//! The terminal belongs to the UI, so every log line goes to a file.  The
//! filter comes from `RUST_LOG` when set, otherwise from the configured level.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Normalise a bare user-supplied level, falling back to `info`.
pub fn parse_level(value: &str) -> &'static str {
    match value.trim().to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        "error" => "error",
        "off" | "none" => "off",
        _ => "info",
    }
}

/// Turn the configured level into an `EnvFilter` directive.
///
/// Bare levels go through [`parse_level`].  Anything with target directives
/// (`feedmux=debug`, `info,reqwest=warn`) is kept as written if it parses,
/// otherwise it falls back to `info`.
pub fn filter_directive(value: &str) -> String {
    let value = value.trim();
    if !value.contains(['=', ',']) {
        return parse_level(value).to_string();
    }
    match EnvFilter::try_new(value) {
        Ok(_) => value.to_string(),
        Err(_) => "info".to_string(),
    }
}

/// Install the global subscriber writing to `path`.
///
/// # Errors
/// Returns an error if the log file cannot be created.
pub fn init(path: &Path, level: &str) -> io::Result<()> {
    let level = filter_directive(level);
    if level == "off" {
        return Ok(());
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let log_file = File::create(path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let file_layer = fmt::layer()
        .with_writer(log_file.with_max_level(tracing::Level::TRACE))
        .with_ansi(false)
        .with_target(true);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init();

    tracing::info!(path = %path.display(), %level, "logging initialized");
    Ok(())
}
