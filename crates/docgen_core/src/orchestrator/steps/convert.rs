//! Convert step - turns rendered DOCX files into PDFs.
//!
//! Artifacts already converted during rendering (mail jobs) are left alone.
//! The configured delay separates conversions within a job.

use crate::convert::pdf_path_for;
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{
    BatchState, Context, ConversionStatus, GeneratedArtifact, StepOutcome,
};

/// Converts pending artifacts with the context's converter.
pub struct ConvertStep;

impl ConvertStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConvertStep {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert one artifact, recording the outcome on it.
///
/// Converter output goes to the tail buffer and is shown on failure.
pub(crate) fn convert_artifact(ctx: &Context, artifact: &mut GeneratedArtifact) -> bool {
    let target = pdf_path_for(&artifact.docx_path);
    ctx.logger.reset_tail();

    match ctx.converter.convert(&artifact.docx_path, &target) {
        Ok(output) => {
            ctx.logger.command(&output.command);
            for (line, is_stderr) in &output.lines {
                ctx.logger.converter_line(line, *is_stderr);
            }
            ctx.logger.info(&format!(
                "  PDF created: {}",
                target
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default()
            ));
            artifact.conversion = ConversionStatus::Done(target);
            true
        }
        Err(e) => {
            ctx.logger.error(&format!(
                "Conversion failed for {}: {}",
                artifact.display_name, e
            ));
            ctx.logger.dump_tail(ctx.converter.name());
            artifact.conversion = ConversionStatus::Failed(e.to_string());
            false
        }
    }
}

impl PipelineStep for ConvertStep {
    fn name(&self) -> &str {
        "Convert"
    }

    fn description(&self) -> &str {
        "Convert to PDF"
    }

    fn validate_input(&self, _ctx: &Context) -> StepResult<()> {
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut BatchState) -> StepResult<StepOutcome> {
        let pending: usize = state
            .artifacts
            .iter()
            .flatten()
            .filter(|a| a.conversion == ConversionStatus::Pending)
            .count();
        if pending == 0 {
            return Ok(StepOutcome::Skipped("nothing to convert".to_string()));
        }

        ctx.logger.info(&format!(
            "Converting {} document(s) with {}",
            pending,
            ctx.converter.name()
        ));

        for (job_index, job) in ctx.jobs.iter().enumerate() {
            let indices: Vec<usize> = state.artifacts[job_index]
                .iter()
                .enumerate()
                .filter(|(_, a)| a.conversion == ConversionStatus::Pending)
                .map(|(i, _)| i)
                .collect();
            if indices.is_empty() {
                continue;
            }

            ctx.logger.section(job.name());
            for (position, &i) in indices.iter().enumerate() {
                let ok = convert_artifact(ctx, &mut state.artifacts[job_index][i]);
                state.category_mut(job_index).converted.record(ok);
                ctx.throttle.pause_between(position, indices.len());
            }
        }

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &BatchState) -> StepResult<()> {
        let missing: Vec<String> = state
            .artifacts
            .iter()
            .flatten()
            .filter_map(GeneratedArtifact::pdf_path)
            .filter(|p| !p.exists())
            .map(|p| p.display().to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StepError::invalid_output(format!(
                "converted files vanished: {}",
                missing.join(", ")
            )))
        }
    }
}
