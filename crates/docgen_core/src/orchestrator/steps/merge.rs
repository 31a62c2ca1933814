//! Merge step - combined documents per job.
//!
//! Jobs with a `combined_name` get `<combined_name>.pdf` once two or more
//! PDFs exist. With cleanup disabled, the DOCX files are combined too.
//! Merge failures are recorded on the job and do not touch per-record files.

use std::path::PathBuf;

use crate::document::merge_documents;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{BatchState, Context, GeneratedArtifact, StepOutcome};
use crate::pdf::merge_existing;

/// Minimum number of documents worth combining.
const MIN_MERGE_INPUTS: usize = 2;

/// Builds combined artifacts.
pub struct MergeStep;

impl MergeStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MergeStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for MergeStep {
    fn name(&self) -> &str {
        "Merge"
    }

    fn description(&self) -> &str {
        "Merge combined documents"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut BatchState) -> StepResult<StepOutcome> {
        if ctx.jobs.iter().all(|j| j.settings.combined_name.is_none()) {
            return Ok(StepOutcome::Skipped("no job has a combined_name".to_string()));
        }

        for (job_index, job) in ctx.jobs.iter().enumerate() {
            let Some(combined_name) = job.settings.combined_name.as_deref() else {
                continue;
            };
            ctx.logger.section(job.name());

            let pdfs: Vec<PathBuf> = state.artifacts[job_index]
                .iter()
                .filter_map(GeneratedArtifact::pdf_path)
                .cloned()
                .collect();
            if pdfs.len() >= MIN_MERGE_INPUTS {
                let output = job.output_dir.join(format!("{}.pdf", combined_name));
                match merge_existing(ctx.merger.as_ref(), &pdfs, &output) {
                    Ok(outcome) => {
                        ctx.logger.success(&format!(
                            "Combined {} PDF(s) into {}",
                            outcome.merged.len(),
                            output.display()
                        ));
                        state.category_mut(job_index).combined.push(output);
                    }
                    Err(e) => {
                        ctx.logger.error(&format!("PDF merge failed: {}", e));
                        state
                            .category_mut(job_index)
                            .errors
                            .push(format!("PDF merge: {}", e));
                    }
                }
            } else {
                ctx.logger.info(&format!(
                    "{} PDF(s), nothing to combine",
                    pdfs.len()
                ));
            }

            if ctx.settings.processing.cleanup_docx {
                continue;
            }
            let docs: Vec<PathBuf> = state.artifacts[job_index]
                .iter()
                .map(|a| a.docx_path.clone())
                .collect();
            if docs.len() < MIN_MERGE_INPUTS {
                continue;
            }
            let output = job.output_dir.join(format!("{}.docx", combined_name));
            match merge_documents(&docs, &output) {
                Ok(count) => {
                    ctx.logger.success(&format!(
                        "Combined {} DOCX file(s) into {}",
                        count,
                        output.display()
                    ));
                    state.category_mut(job_index).combined.push(output);
                }
                Err(e) => {
                    ctx.logger.error(&format!("DOCX merge failed: {}", e));
                    state
                        .category_mut(job_index)
                        .errors
                        .push(format!("DOCX merge: {}", e));
                }
            }
        }

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &BatchState) -> StepResult<()> {
        for category in &state.result.categories {
            if let Some(missing) = category.combined.iter().find(|p| !p.exists()) {
                return Err(StepError::invalid_output(format!(
                    "combined file {} was not written",
                    missing.display()
                )));
            }
        }
        Ok(())
    }
}
