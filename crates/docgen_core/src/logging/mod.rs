//! Logging for docgen.
//!
//! Two layers:
//! - `tracing` for application diagnostics (stderr, optionally a file)
//! - [`BatchLogger`] for the human-readable log of one batch run
//!
//! # Example
//!
//! ```no_run
//! use docgen_core::logging::{BatchLogger, LogConfig};
//!
//! let logger = BatchLogger::new("batch_20250101_120000", ".logs", LogConfig::default(), None)
//!     .unwrap();
//! logger.phase("Render");
//! logger.command("soffice --headless --convert-to pdf ...");
//! logger.progress(5, 10);
//! logger.success("Batch finished");
//! ```

mod batch_logger;
mod types;

pub use batch_logger::BatchLogger;
pub use types::{ConsoleCallback, LogConfig, LogLevel};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.as_filter()))
}

/// Install the global subscriber writing to stderr.
///
/// `RUST_LOG` overrides `default_level`. Call once at startup.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(env_filter(default_level))
        .init();
}

/// Like [`init_tracing`], plus a non-blocking `docgen.log` in `logs_dir`.
///
/// Hold the returned guard until exit so buffered lines are flushed. If
/// `logs_dir` cannot be created only the stderr layer is installed.
pub fn init_tracing_with_file(default_level: LogLevel, logs_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(logs_dir) {
        init_tracing(default_level);
        tracing::warn!("No log file in {}: {}", logs_dir.display(), e);
        return None;
    }

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(logs_dir, "docgen.log"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(env_filter(default_level))
        .init();

    Some(guard)
}

/// Subscriber for tests: warnings and above, captured by the test harness.
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
