//! Batch orchestrator.
//!
//! This module runs one batch: every record of the data source through every
//! configured job, then the follow-up steps over the produced artifacts.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor (pre-flight, setup, report)
//!     └── Pipeline
//!         ├── Step: Render   (per record; mail jobs convert + send inline)
//!         ├── Step: Convert  (remaining DOCX → PDF)
//!         ├── Step: Merge    (combined PDF, and DOCX when cleanup is off)
//!         └── Step: Cleanup  (remove DOCX intermediates)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use docgen_core::config::ConfigManager;
//! use docgen_core::orchestrator::BatchProcessor;
//!
//! let mut config = ConfigManager::new("docgen.toml");
//! config.load().unwrap();
//! let base_dir = config.base_dir();
//!
//! let result = BatchProcessor::new(config.into_settings(), base_dir)
//!     .run()
//!     .unwrap();
//! println!("{} failure(s)", result.total_failures());
//! ```

mod errors;
mod pipeline;
mod preflight;
mod processor;
mod results;
mod step;
pub mod steps;
mod throttle;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{
    PipelineError, PipelineResult, RecordError, RecordResult, StepError, StepResult,
};
pub use pipeline::{Pipeline, PipelineRunResult};
pub use preflight::{missing_columns, missing_inputs, required_inputs};
pub use processor::{BatchProcessor, CheckedInputs};
pub use results::{BatchResult, CategoryReport, Counter, StepFailure, REPORT_FILE};
pub use step::PipelineStep;
pub use steps::{CleanupStep, ConvertStep, MergeStep, RenderStep};
pub use throttle::Throttle;
pub use types::{
    BatchState, Context, ConversionStatus, DispatchStatus, GeneratedArtifact, PreparedJob,
    StepOutcome,
};

/// Create the batch pipeline with all steps in order.
///
/// 1. Render - one DOCX per record and job
/// 2. Convert - DOCX to PDF
/// 3. Merge - combined documents per job
/// 4. Cleanup - remove DOCX intermediates
pub fn create_batch_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(RenderStep::new())
        .with_step(ConvertStep::new())
        .with_step(MergeStep::new())
        .with_step(CleanupStep::new())
}
