//! Batch processor: pre-flight, setup, pipeline run and report.
//!
//! `BatchProcessor` is the entry point the CLI uses. Pre-flight failures are
//! returned as [`PipelineError`]; once the pipeline starts, every problem
//! ends up as a counter in the returned [`BatchResult`].

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ConfigError, LoggingSettings, Settings};
use crate::convert::{DocumentConverter, SofficeConverter};
use crate::document::Template;
use crate::logging::{BatchLogger, ConsoleCallback, LogConfig};
use crate::mail::{BodyTemplate, MailTransport, SmtpMailer};
use crate::pdf::{LopdfMerger, PdfMerger};
use crate::records::{load_records, RecordSet};

use super::create_batch_pipeline;
use super::errors::{PipelineError, PipelineResult};
use super::preflight::{missing_columns, missing_inputs};
use super::results::BatchResult;
use super::throttle::Throttle;
use super::types::{BatchState, Context, PreparedJob};

/// Inputs that passed pre-flight.
#[derive(Debug)]
pub struct CheckedInputs {
    pub jobs: Vec<PreparedJob>,
    pub records: RecordSet,
}

impl From<&LoggingSettings> for LogConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level,
            compact: settings.compact,
            progress_step: settings.progress_step,
            error_tail: settings.error_tail as usize,
            timestamps: true,
        }
    }
}

/// Runs one batch over all records and jobs.
///
/// # Example
///
/// ```ignore
/// let result = BatchProcessor::new(settings, base_dir)
///     .with_console(Box::new(|line| println!("{}", line)))
///     .run()?;
/// println!("{} failure(s)", result.total_failures());
/// ```
pub struct BatchProcessor {
    settings: Settings,
    /// Directory relative paths are resolved against.
    base_dir: PathBuf,
    converter: Option<Box<dyn DocumentConverter>>,
    merger: Option<Box<dyn PdfMerger>>,
    mailer: Option<Box<dyn MailTransport>>,
    console: Option<ConsoleCallback>,
}

impl BatchProcessor {
    pub fn new(settings: Settings, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            base_dir: base_dir.into(),
            converter: None,
            merger: None,
            mailer: None,
            console: None,
        }
    }

    /// Use `converter` instead of the configured `soffice`.
    pub fn with_converter<C: DocumentConverter + 'static>(mut self, converter: C) -> Self {
        self.converter = Some(Box::new(converter));
        self
    }

    pub fn with_merger<M: PdfMerger + 'static>(mut self, merger: M) -> Self {
        self.merger = Some(Box::new(merger));
        self
    }

    /// Use `mailer` instead of an SMTP session from `[email]`.
    pub fn with_mailer<T: MailTransport + 'static>(mut self, mailer: T) -> Self {
        self.mailer = Some(Box::new(mailer));
        self
    }

    /// Forward batch log lines to `callback`.
    pub fn with_console(mut self, callback: ConsoleCallback) -> Self {
        self.console = Some(callback);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn output_dir(&self) -> PathBuf {
        Settings::resolve(&self.base_dir, &self.settings.paths.output_folder)
    }

    pub fn logs_dir(&self) -> PathBuf {
        Settings::resolve(&self.base_dir, &self.settings.paths.logs_folder)
    }

    /// Validate configuration, inputs and the data header without writing
    /// anything.
    pub fn preflight(&self) -> PipelineResult<CheckedInputs> {
        let missing_keys = self.settings.missing_keys();
        if !missing_keys.is_empty() {
            return Err(ConfigError::MissingKeys(missing_keys).into());
        }

        let missing = missing_inputs(&self.settings, &self.base_dir);
        if !missing.is_empty() {
            return Err(PipelineError::MissingInputs { paths: missing });
        }

        let records = load_records(&Settings::resolve(
            &self.base_dir,
            &self.settings.files.data_file,
        ))?;
        let missing = missing_columns(&self.settings, &records);
        if !missing.is_empty() {
            return Err(PipelineError::MissingColumns { missing });
        }

        let output_dir = self.output_dir();
        let mut jobs = Vec::with_capacity(self.settings.jobs.len());
        for job in &self.settings.jobs {
            let template_path = Settings::resolve(&self.base_dir, &job.template);
            let template = Template::load(&template_path).map_err(|e| {
                PipelineError::setup_failed(format!(
                    "cannot read template {}: {}",
                    template_path.display(),
                    e
                ))
            })?;
            let body = match &job.email {
                Some(email) => Some(
                    BodyTemplate::load(Settings::resolve(&self.base_dir, &email.body_template))
                        .map_err(|e| PipelineError::setup_failed(e.to_string()))?,
                ),
                None => None,
            };
            jobs.push(PreparedJob {
                settings: job.clone(),
                template,
                output_dir: output_dir.join(job.output_subdir()),
                body,
            });
        }

        Ok(CheckedInputs { jobs, records })
    }

    /// Run the batch.
    pub fn run(mut self) -> PipelineResult<BatchResult> {
        let CheckedInputs { jobs, records } = self.preflight()?;

        let output_dir = self.output_dir();
        for dir in std::iter::once(&output_dir).chain(jobs.iter().map(|j| &j.output_dir)) {
            fs::create_dir_all(dir).map_err(|e| {
                PipelineError::setup_failed(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }

        let batch_name = format!("batch_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
        let logger = BatchLogger::new(
            &batch_name,
            self.logs_dir(),
            LogConfig::from(&self.settings.logging),
            self.console.take(),
        )
        .map_err(|e| PipelineError::setup_failed(format!("cannot create batch log: {}", e)))?;

        let mailer = match self.mailer.take() {
            Some(mailer) => Some(mailer),
            None if self.settings.needs_email() => Some(Box::new(
                SmtpMailer::new(&self.settings.email)
                    .map_err(|e| PipelineError::setup_failed(e.to_string()))?,
            ) as Box<dyn MailTransport>),
            None => None,
        };
        let converter = self.converter.take().unwrap_or_else(|| {
            Box::new(SofficeConverter::new(&self.settings.processing.converter))
        });
        let merger = self
            .merger
            .take()
            .unwrap_or_else(|| Box::new(LopdfMerger));

        let throttle = Throttle::from_secs(self.settings.processing.delay_between_files);
        let ctx = Context {
            settings: self.settings,
            base_dir: self.base_dir,
            output_dir,
            jobs,
            records,
            logger: Arc::new(logger),
            converter,
            merger,
            mailer,
            throttle,
        };

        Ok(run_batch(&ctx, &batch_name))
    }
}

/// Pipeline run plus the final report.
fn run_batch(ctx: &Context, batch_name: &str) -> BatchResult {
    let logger = &ctx.logger;
    logger.phase(&format!("Batch {}", batch_name));
    logger.info(&format!(
        "Data file: {}",
        Settings::resolve(&ctx.base_dir, &ctx.settings.files.data_file).display()
    ));
    logger.info(&format!("Output folder: {}", ctx.output_dir.display()));
    logger.debug(&format!("Batch log: {}", logger.path().display()));
    logger.info(&format!(
        "Cleanup DOCX: {}, delay: {}s",
        if ctx.settings.processing.cleanup_docx { "yes" } else { "no" },
        ctx.throttle.delay().as_secs()
    ));

    let mut state = BatchState::new(ctx);
    let run = create_batch_pipeline().run(ctx, &mut state);
    tracing::debug!(
        completed = run.steps_completed.len(),
        skipped = run.steps_skipped.len(),
        failed = run.steps_failed.len(),
        "Pipeline finished"
    );

    logger.phase("Report");
    state.result.finish();
    for category in &state.result.categories {
        logger.info(&category.summary());
        for path in &category.combined {
            logger.info(&format!("  Combined: {}", path.display()));
        }
    }
    match state.result.write_report(&ctx.output_dir) {
        Ok(path) => logger.info(&format!("Report: {}", path.display())),
        Err(e) => logger.warn(&format!("Could not write batch report: {}", e)),
    }

    if state.result.has_failures() {
        logger.warn(&format!(
            "Batch finished with {} failure(s)",
            state.result.total_failures()
        ));
    } else {
        logger.success("Batch finished");
    }
    logger.info(&format!("Files are in {}", ctx.output_dir.display()));
    logger.flush();

    state.result
}
