//! Core types for the batch pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::{JobSettings, Settings};
use crate::convert::DocumentConverter;
use crate::document::Template;
use crate::logging::BatchLogger;
use crate::mail::{BodyTemplate, MailTransport};
use crate::naming::NameRegistry;
use crate::pdf::PdfMerger;
use crate::records::RecordSet;

use super::results::{BatchResult, CategoryReport};
use super::throttle::Throttle;

/// Outcome of a step's execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (with reason).
    Skipped(String),
}

/// A job with its inputs loaded and its output directory created.
#[derive(Debug, Clone)]
pub struct PreparedJob {
    pub settings: JobSettings,
    pub template: Template,
    pub output_dir: PathBuf,
    /// Mail body, for jobs that dispatch.
    pub body: Option<BodyTemplate>,
}

impl PreparedJob {
    pub fn name(&self) -> &str {
        &self.settings.name
    }
}

/// Read-only context passed to pipeline steps.
///
/// Collaborators sit behind traits so tests can substitute them.
pub struct Context {
    pub settings: Settings,
    /// Directory relative config paths were resolved against.
    pub base_dir: PathBuf,
    /// Output root; job folders live inside.
    pub output_dir: PathBuf,
    pub jobs: Vec<PreparedJob>,
    pub records: RecordSet,
    pub logger: Arc<BatchLogger>,
    pub converter: Box<dyn DocumentConverter>,
    pub merger: Box<dyn PdfMerger>,
    pub mailer: Option<Box<dyn MailTransport>>,
    pub throttle: Throttle,
}

/// Where an artifact's conversion stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionStatus {
    Pending,
    Done(PathBuf),
    Failed(String),
}

/// Where an artifact's mail dispatch stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchStatus {
    NotRequested,
    Sent { to: String },
    Failed(String),
}

/// One rendered document and what happened to it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub job: String,
    pub record_index: usize,
    pub display_name: String,
    pub docx_path: PathBuf,
    pub conversion: ConversionStatus,
    pub dispatch: DispatchStatus,
}

impl GeneratedArtifact {
    pub fn new(
        job: impl Into<String>,
        record_index: usize,
        display_name: impl Into<String>,
        docx_path: PathBuf,
    ) -> Self {
        Self {
            job: job.into(),
            record_index,
            display_name: display_name.into(),
            docx_path,
            conversion: ConversionStatus::Pending,
            dispatch: DispatchStatus::NotRequested,
        }
    }

    pub fn pdf_path(&self) -> Option<&PathBuf> {
        match &self.conversion {
            ConversionStatus::Done(path) => Some(path),
            _ => None,
        }
    }
}

/// Mutable batch state accumulated by the steps.
#[derive(Debug)]
pub struct BatchState {
    pub result: BatchResult,
    /// Artifacts per job, in processing order (same indices as `Context::jobs`).
    pub artifacts: Vec<Vec<GeneratedArtifact>>,
    pub names: NameRegistry,
}

impl BatchState {
    pub fn new(ctx: &Context) -> Self {
        let mut result = BatchResult::new(&ctx.output_dir, ctx.records.len());
        result.categories = ctx
            .jobs
            .iter()
            .map(|job| CategoryReport::new(job.name(), &job.output_dir))
            .collect();
        Self {
            result,
            artifacts: vec![Vec::new(); ctx.jobs.len()],
            names: NameRegistry::new(),
        }
    }

    pub fn category_mut(&mut self, job: usize) -> &mut CategoryReport {
        &mut self.result.categories[job]
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.iter().map(Vec::len).sum()
    }
}
