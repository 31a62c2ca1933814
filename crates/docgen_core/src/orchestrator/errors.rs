//! Error types for the batch pipeline.
//!
//! Three layers, by blast radius:
//! - [`PipelineError`]: pre-flight failures, the batch does not start
//! - [`StepError`]: a whole step could not run; later steps still do
//! - [`RecordError`]: one record/artifact failed; the loop continues

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::convert::ConvertError;
use crate::document::DocxError;
use crate::mail::MailError;
use crate::records::RecordsError;

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Batch-level error. Only raised before the first record is processed.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Required input files are absent (all of them listed).
    #[error("Missing required input files: {}", join_paths(.paths))]
    MissingInputs { paths: Vec<PathBuf> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("Cannot read records: {0}")]
    RecordsUnavailable(#[from] RecordsError),

    /// Columns referenced by jobs are missing from the data header.
    #[error("Data file is missing columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    /// Failed to set up the batch (directories, logger, transports).
    #[error("Batch setup failed: {message}")]
    SetupFailed { message: String },
}

impl PipelineError {
    pub fn setup_failed(message: impl Into<String>) -> Self {
        Self::SetupFailed {
            message: message.into(),
        }
    }

    /// Whether this error lists missing inputs.
    pub fn is_missing_inputs(&self) -> bool {
        matches!(self, Self::MissingInputs { .. })
    }
}

/// Error from a pipeline step.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    IoError {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// Generic step error with message.
    #[error("{0}")]
    Other(String),
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::IoError {
            operation: operation.into(),
            source,
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Failure while producing one record's artifact.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Render failed: {0}")]
    Render(#[from] DocxError),

    #[error("Conversion failed: {0}")]
    Convert(#[from] ConvertError),

    #[error("Send failed: {0}")]
    Send(#[from] MailError),

    #[error("No fixed-layout document to send")]
    NothingToSend,

    #[error("No mail transport configured")]
    NoTransport,
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for per-record operations.
pub type RecordResult<T> = Result<T, RecordError>;
