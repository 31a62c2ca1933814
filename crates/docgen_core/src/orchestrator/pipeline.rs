//! Pipeline runner that executes steps in sequence.

use super::results::StepFailure;
use super::step::PipelineStep;
use super::types::{BatchState, Context, StepOutcome};

/// Pipeline that runs a sequence of steps.
///
/// Each step runs with validation before and after. A failing step is
/// logged and recorded in the batch result; the remaining steps still run.
pub struct Pipeline {
    /// Steps to execute in order.
    steps: Vec<Box<dyn PipelineStep>>,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Add a step to the pipeline.
    pub fn add_step<S: PipelineStep + 'static>(&mut self, step: S) -> &mut Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Add a step (builder pattern).
    pub fn with_step<S: PipelineStep + 'static>(mut self, step: S) -> Self {
        self.add_step(step);
        self
    }

    /// Run every step against the batch.
    pub fn run(&self, ctx: &Context, state: &mut BatchState) -> PipelineRunResult {
        let mut result = PipelineRunResult::default();

        for step in &self.steps {
            let step_name = step.name();
            ctx.logger.phase(step.description());

            match self.run_step(step.as_ref(), ctx, state) {
                Ok(StepOutcome::Success) => {
                    ctx.logger.success(&format!("{} completed", step_name));
                    result.steps_completed.push(step_name.to_string());
                }
                Ok(StepOutcome::Skipped(reason)) => {
                    ctx.logger.info(&format!("{} skipped: {}", step_name, reason));
                    result.steps_skipped.push(step_name.to_string());
                }
                Err(message) => {
                    ctx.logger.error(&format!("{} failed: {}", step_name, message));
                    tracing::warn!("Step '{}' failed: {}", step_name, message);
                    state.result.step_failures.push(StepFailure {
                        step: step_name.to_string(),
                        message,
                    });
                    result.steps_failed.push(step_name.to_string());
                }
            }
        }

        result
    }

    fn run_step(
        &self,
        step: &dyn PipelineStep,
        ctx: &Context,
        state: &mut BatchState,
    ) -> Result<StepOutcome, String> {
        ctx.logger
            .debug(&format!("Validating input for '{}'", step.name()));
        step.validate_input(ctx).map_err(|e| e.to_string())?;

        ctx.logger.debug(&format!("Executing '{}'", step.name()));
        let outcome = step.execute(ctx, state).map_err(|e| e.to_string())?;

        if outcome == StepOutcome::Success {
            ctx.logger
                .debug(&format!("Validating output for '{}'", step.name()));
            step.validate_output(ctx, state).map_err(|e| e.to_string())?;
        }
        Ok(outcome)
    }

    /// Get the number of steps in the pipeline.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Get step names in order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineRunResult {
    /// Steps that completed successfully.
    pub steps_completed: Vec<String>,
    /// Steps that were skipped.
    pub steps_skipped: Vec<String>,
    /// Steps that failed.
    pub steps_failed: Vec<String>,
}

impl PipelineRunResult {
    /// Total number of steps that ran.
    pub fn total_steps(&self) -> usize {
        self.steps_completed.len() + self.steps_skipped.len() + self.steps_failed.len()
    }
}
