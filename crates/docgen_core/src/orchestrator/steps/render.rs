//! Render step - one document per record and job.
//!
//! For each record in source order, every job whose filter admits it gets a
//! fresh copy of its template with the record's values substituted. Records
//! missing required fields are skipped and counted. Jobs that dispatch mail
//! convert and send right away, so a record is finished before the next one
//! starts. The configured delay follows each record that produced work,
//! except the last record.

use std::path::Path;

use crate::config::JobEmailSettings;
use crate::mail::{MailAttachment, OutgoingMail};
use crate::naming::{attachment_name, NameRegistry};
use crate::orchestrator::errors::{RecordError, RecordResult, StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{
    BatchState, Context, DispatchStatus, GeneratedArtifact, PreparedJob, StepOutcome,
};
use crate::records::Record;
use crate::substitute::substitute_document;

use super::convert::convert_artifact;

/// Renders templates for every record.
pub struct RenderStep;

impl RenderStep {
    pub fn new() -> Self {
        Self
    }

    /// Substitute the record into a template copy and save it.
    fn render(
        &self,
        job: &PreparedJob,
        record: &Record,
        display_name: &str,
        names: &mut NameRegistry,
    ) -> RecordResult<GeneratedArtifact> {
        let settings = &job.settings;
        let base = names.reserve(
            &job.output_dir,
            settings.file_prefix(),
            display_name,
            record.index,
            settings.indexed,
        );

        let mut doc = job.template.instantiate()?;
        let map = settings.replacements(record);
        let report = substitute_document(doc.document_mut(), &map, settings.mode);
        tracing::debug!(
            job = %settings.name,
            record = record.index,
            visited = report.visited,
            changed = report.changed,
            "Substituted placeholders"
        );

        let docx_path = job.output_dir.join(format!("{}.docx", base));
        doc.save(&docx_path)?;
        Ok(GeneratedArtifact::new(
            &settings.name,
            record.index,
            display_name,
            docx_path,
        ))
    }

    /// Build and send the record's message with its PDF attached.
    fn dispatch(
        &self,
        ctx: &Context,
        job: &PreparedJob,
        email: &JobEmailSettings,
        record: &Record,
        pdf: &Path,
        display_name: &str,
    ) -> RecordResult<String> {
        let mailer = ctx.mailer.as_ref().ok_or(RecordError::NoTransport)?;
        let to = record
            .get(&email.recipient_column)
            .unwrap_or_default()
            .to_string();

        let values: Vec<(String, String)> = email
            .body_fields
            .iter()
            .map(|(token, column)| {
                (
                    token.clone(),
                    record.get(column).unwrap_or_default().to_string(),
                )
            })
            .collect();
        let html_body = job
            .body
            .as_ref()
            .map(|body| body.render(&values))
            .unwrap_or_default();

        let prefix = email
            .attachment_prefix
            .as_deref()
            .unwrap_or_else(|| job.settings.file_prefix());

        let mail = OutgoingMail {
            from: ctx.settings.email.sender_email.clone(),
            to: to.clone(),
            subject: email.subject.clone(),
            html_body,
            attachment: Some(MailAttachment {
                filename: attachment_name(prefix, display_name),
                path: pdf.to_path_buf(),
            }),
        };
        mailer.send(&mail)?;
        Ok(to)
    }

    /// Convert and send one freshly rendered artifact.
    fn finish_mail_job(
        &self,
        ctx: &Context,
        state: &mut BatchState,
        job_index: usize,
        email: &JobEmailSettings,
        record: &Record,
        mut artifact: GeneratedArtifact,
    ) {
        let job = &ctx.jobs[job_index];
        let converted = convert_artifact(ctx, &mut artifact);
        state.category_mut(job_index).converted.record(converted);

        let sent = match artifact.pdf_path().cloned() {
            Some(pdf) => self.dispatch(ctx, job, email, record, &pdf, &artifact.display_name),
            None => Err(RecordError::NothingToSend),
        };
        match sent {
            Ok(to) => {
                ctx.logger.info(&format!("  Mail sent: {}", to));
                state.category_mut(job_index).dispatched.record(true);
                artifact.dispatch = DispatchStatus::Sent { to };
            }
            Err(RecordError::NothingToSend) => {
                // Conversion failure is already counted.
                artifact.dispatch = DispatchStatus::Failed(RecordError::NothingToSend.to_string());
            }
            Err(e) => {
                ctx.logger
                    .error(&format!("Mail to {} failed: {}", artifact.display_name, e));
                state.category_mut(job_index).dispatched.record(false);
                artifact.dispatch = DispatchStatus::Failed(e.to_string());
            }
        }
        state.artifacts[job_index].push(artifact);
    }

    /// Process one record for every job. Returns whether anything was rendered.
    fn process_record(&self, ctx: &Context, state: &mut BatchState, record: &Record) -> bool {
        let mut worked = false;

        for (job_index, job) in ctx.jobs.iter().enumerate() {
            let settings = &job.settings;
            if !settings.accepts(record) {
                continue;
            }

            let missing = record.missing(&settings.required_columns());
            if !missing.is_empty() {
                ctx.logger.warn(&format!(
                    "Row {}: skipped for {} (missing {})",
                    record.index + 1,
                    settings.name,
                    missing.join(", ")
                ));
                state.category_mut(job_index).skipped += 1;
                continue;
            }

            let display_name = record
                .get(&settings.name_column)
                .unwrap_or_default()
                .to_string();
            ctx.logger
                .info(&format!("{}: {}", settings.name, display_name));
            worked = true;

            match self.render(job, record, &display_name, &mut state.names) {
                Ok(artifact) => {
                    state.category_mut(job_index).rendered.record(true);
                    match &settings.email {
                        Some(email) => {
                            self.finish_mail_job(ctx, state, job_index, email, record, artifact)
                        }
                        None => state.artifacts[job_index].push(artifact),
                    }
                }
                Err(e) => {
                    ctx.logger.error(&format!(
                        "Row {} ({}): {}",
                        record.index + 1,
                        display_name,
                        e
                    ));
                    state.category_mut(job_index).rendered.record(false);
                }
            }
        }

        worked
    }
}

impl Default for RenderStep {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineStep for RenderStep {
    fn name(&self) -> &str {
        "Render"
    }

    fn description(&self) -> &str {
        "Render documents"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.jobs.is_empty() {
            return Err(StepError::invalid_input("no jobs configured"));
        }
        for job in &ctx.jobs {
            if !job.output_dir.is_dir() {
                return Err(StepError::invalid_input(format!(
                    "output folder {} does not exist",
                    job.output_dir.display()
                )));
            }
            if job.settings.email.is_some() && ctx.mailer.is_none() {
                return Err(StepError::invalid_input(format!(
                    "job {} sends mail but no transport is configured",
                    job.name()
                )));
            }
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut BatchState) -> StepResult<StepOutcome> {
        let total = ctx.records.len();
        if total == 0 {
            return Ok(StepOutcome::Skipped("data file has no records".to_string()));
        }
        ctx.logger.info(&format!(
            "{} record(s), {} job(s)",
            total,
            ctx.jobs.len()
        ));

        for (position, record) in ctx.records.records.iter().enumerate() {
            let worked = self.process_record(ctx, state, record);
            ctx.logger.progress(position + 1, total);
            if worked {
                ctx.throttle.pause_between(position, total);
            }
        }

        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &BatchState) -> StepResult<()> {
        let missing: Vec<String> = state
            .artifacts
            .iter()
            .flatten()
            .filter(|a| !a.docx_path.exists())
            .map(|a| a.docx_path.display().to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StepError::invalid_output(format!(
                "rendered files missing: {}",
                missing.join(", ")
            )))
        }
    }
}
