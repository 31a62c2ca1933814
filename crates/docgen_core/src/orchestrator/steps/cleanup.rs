//! Cleanup step - removes DOCX intermediates from job folders.

use crate::cleanup::sweep_editable;
use crate::orchestrator::errors::StepResult;
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{BatchState, Context, StepOutcome};

/// Sweeps every job's output folder when `cleanup_docx` is on.
pub struct CleanupStep;

impl CleanupStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CleanupStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for CleanupStep {
    fn name(&self) -> &str {
        "Cleanup"
    }

    fn description(&self) -> &str {
        "Remove DOCX files"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut BatchState) -> StepResult<StepOutcome> {
        if !ctx.settings.processing.cleanup_docx {
            return Ok(StepOutcome::Skipped("cleanup_docx is off".to_string()));
        }

        for (job_index, job) in ctx.jobs.iter().enumerate() {
            let report = sweep_editable(&job.output_dir);
            for (path, reason) in &report.failed {
                ctx.logger
                    .warn(&format!("Could not remove {}: {}", path.display(), reason));
            }
            ctx.logger.info(&format!(
                "{}: removed {} DOCX file(s)",
                job.name(),
                report.removed_count()
            ));

            let category = state.category_mut(job_index);
            category.cleaned += report.removed_count();
            category.errors.extend(
                report
                    .failed
                    .into_iter()
                    .map(|(path, reason)| format!("cleanup {}: {}", path.display(), reason)),
            );
        }

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, _state: &BatchState) -> StepResult<()> {
        Ok(())
    }
}
