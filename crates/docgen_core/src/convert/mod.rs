//! Editable → fixed-layout conversion.
//!
//! The orchestrator only sees the [`DocumentConverter`] trait; the shipped
//! implementation drives a headless LibreOffice.

mod soffice;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use soffice::SofficeConverter;

/// Errors that can occur during conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Source document not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("Converter produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for conversion.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// What a successful conversion ran and printed.
#[derive(Debug, Clone, Default)]
pub struct ConversionOutput {
    /// Command line, for the batch log.
    pub command: String,
    /// Output lines with `true` for stderr.
    pub lines: Vec<(String, bool)>,
}

/// Converts one editable document into a fixed-layout one.
pub trait DocumentConverter: Send + Sync {
    /// Converter name for logs.
    fn name(&self) -> &str;

    /// Convert `source` into `target`. `target`'s directory must exist.
    fn convert(&self, source: &Path, target: &Path) -> ConvertResult<ConversionOutput>;
}

/// `<dir>/<stem>.pdf` next to an editable document.
pub fn pdf_path_for(docx: &Path) -> PathBuf {
    docx.with_extension("pdf")
}
