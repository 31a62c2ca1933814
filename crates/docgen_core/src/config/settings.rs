//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables, plus
//! the `[[jobs]]` array describing each template/output category.
//! Table sections can be updated independently for atomic section-level updates.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::Alignment;
use crate::logging::LogLevel;
use crate::records::Record;
use crate::substitute::{ReplacementMap, SubstitutionMode};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Input files.
    #[serde(default)]
    pub files: FileSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Batch processing options.
    #[serde(default)]
    pub processing: ProcessingSettings,

    /// SMTP account used by jobs that dispatch mail.
    #[serde(default)]
    pub email: EmailSettings,

    /// Generation jobs, processed in order for every record.
    #[serde(default)]
    pub jobs: Vec<JobSettings>,
}

impl Settings {
    /// A starter configuration with one certificate job.
    pub fn sample() -> Self {
        Self {
            files: FileSettings {
                data_file: "participants.xlsx".to_string(),
            },
            jobs: vec![JobSettings {
                name: "certificates".to_string(),
                template: "certificate.docx".to_string(),
                output_subdir: None,
                file_prefix: Some("Certificate".to_string()),
                name_column: "ФИО участника".to_string(),
                indexed: true,
                mode: SubstitutionMode::Collapse,
                combined_name: Some("All_certificates".to_string()),
                fields: vec![
                    FieldBinding::new("ФИО_участника", "ФИО участника")
                        .with_align(Alignment::Center),
                    FieldBinding::new("Название_доклада", "Название доклада"),
                ],
                filter: None,
                email: None,
            }],
            ..Default::default()
        }
    }

    /// Resolve a configured path against `base_dir` unless it is absolute.
    pub fn resolve(base_dir: &Path, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Whether any job sends mail.
    pub fn needs_email(&self) -> bool {
        self.jobs.iter().any(|j| j.email.is_some())
    }

    /// Every missing required key, in a stable order.
    pub fn missing_keys(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.files.data_file.trim().is_empty() {
            missing.push("files.data_file".to_string());
        }
        if self.jobs.is_empty() {
            missing.push("jobs (at least one [[jobs]] entry)".to_string());
        }
        for (i, job) in self.jobs.iter().enumerate() {
            let label = if job.name.trim().is_empty() {
                format!("jobs[{}]", i)
            } else {
                format!("jobs.{}", job.name)
            };
            if job.name.trim().is_empty() {
                missing.push(format!("{}.name", label));
            }
            if job.template.trim().is_empty() {
                missing.push(format!("{}.template", label));
            }
            if job.name_column.trim().is_empty() {
                missing.push(format!("{}.name_column", label));
            }
            for (k, field) in job.fields.iter().enumerate() {
                if field.placeholder.trim().is_empty() {
                    missing.push(format!("{}.fields[{}].placeholder", label, k));
                }
                if field.column.trim().is_empty() {
                    missing.push(format!("{}.fields[{}].column", label, k));
                }
            }
            if let Some(filter) = &job.filter {
                if filter.column.trim().is_empty() {
                    missing.push(format!("{}.filter.column", label));
                }
            }
            if let Some(email) = &job.email {
                if email.recipient_column.trim().is_empty() {
                    missing.push(format!("{}.email.recipient_column", label));
                }
                if email.body_template.trim().is_empty() {
                    missing.push(format!("{}.email.body_template", label));
                }
            }
        }
        if self.needs_email() {
            if self.email.smtp_server.trim().is_empty() {
                missing.push("email.smtp_server".to_string());
            }
            if self.email.sender_email.trim().is_empty() {
                missing.push("email.sender_email".to_string());
            }
            if self.email.sender_password.is_empty() {
                missing.push("email.sender_password".to_string());
            }
        }
        missing
    }
}

/// Path configuration for output and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Output folder; one subfolder per job is created inside.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_output_folder() -> String {
    "output".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Input files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileSettings {
    /// Tabular data source (CSV or spreadsheet).
    #[serde(default)]
    pub data_file: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of converter output lines to show on failure.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Minimum level written to the batch log.
    #[serde(default)]
    pub level: LogLevel,
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            level: LogLevel::default(),
        }
    }
}

/// Batch processing options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Delete editable documents once the batch is done.
    #[serde(default = "default_true")]
    pub cleanup_docx: bool,

    /// Pause between records and between conversions, in seconds.
    #[serde(default = "default_delay")]
    pub delay_between_files: u64,

    /// Converter program name or path.
    #[serde(default = "default_converter")]
    pub converter: String,
}

fn default_delay() -> u64 {
    1
}

fn default_converter() -> String {
    "soffice".to_string()
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            cleanup_docx: true,
            delay_between_files: default_delay(),
            converter: default_converter(),
        }
    }
}

/// SMTP account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    #[serde(default)]
    pub smtp_server: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub sender_email: String,

    #[serde(default)]
    pub sender_password: String,
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_server: String::new(),
            smtp_port: default_smtp_port(),
            sender_email: String::new(),
            sender_password: String::new(),
        }
    }
}

/// One template + output category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    #[serde(default)]
    pub name: String,

    /// Template path, relative to the base directory.
    #[serde(default)]
    pub template: String,

    /// Output subfolder (defaults to `name`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_subdir: Option<String>,

    /// Filename prefix (defaults to `name`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_prefix: Option<String>,

    /// Column used for file names and log messages.
    #[serde(default)]
    pub name_column: String,

    /// Append the 1-based record position to file names.
    #[serde(default = "default_true")]
    pub indexed: bool,

    #[serde(default)]
    pub mode: SubstitutionMode,

    /// Base name of the combined PDF (and DOCX when cleanup is off).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_name: Option<String>,

    #[serde(default)]
    pub fields: Vec<FieldBinding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<RecordFilter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<JobEmailSettings>,
}

impl JobSettings {
    pub fn output_subdir(&self) -> &str {
        self.output_subdir.as_deref().unwrap_or(&self.name)
    }

    pub fn file_prefix(&self) -> &str {
        self.file_prefix.as_deref().unwrap_or(&self.name)
    }

    /// Columns a record needs before it is rendered, without duplicates.
    pub fn required_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = vec![self.name_column.as_str()];
        columns.extend(
            self.fields
                .iter()
                .filter(|f| f.required)
                .map(|f| f.column.as_str()),
        );
        if let Some(email) = &self.email {
            columns.push(email.recipient_column.as_str());
            columns.extend(email.body_fields.values().map(String::as_str));
        }
        let mut seen = Vec::with_capacity(columns.len());
        columns.retain(|c| {
            if seen.contains(c) {
                false
            } else {
                seen.push(*c);
                true
            }
        });
        columns
    }

    /// Columns the data source header must contain.
    pub fn header_columns(&self) -> Vec<&str> {
        let mut columns = self.required_columns();
        let optional = self.fields.iter().map(|f| f.column.as_str());
        for column in optional.chain(self.filter.as_ref().map(|f| f.column.as_str())) {
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        columns
    }

    /// Whether the job filter admits `record`.
    pub fn accepts(&self, record: &Record) -> bool {
        match &self.filter {
            None => true,
            Some(filter) => record
                .get(&filter.column)
                .is_some_and(|v| filter.values.iter().any(|allowed| allowed == v)),
        }
    }

    /// Replacement map for one record.
    pub fn replacements(&self, record: &Record) -> ReplacementMap {
        let mut map = ReplacementMap::new();
        for field in &self.fields {
            let value = field.value_for(record);
            map.bind_field(field.field_name(), &value, field.align);
        }
        map
    }
}

/// Binds a template placeholder to a data column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldBinding {
    /// Field name, with or without braces (`ФИО_участника` or `{ФИО_участника}`).
    #[serde(default)]
    pub placeholder: String,

    #[serde(default)]
    pub column: String,

    /// An empty cell skips the record. Optional fields render as empty text.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub required: bool,

    /// Paragraph alignment applied when `{placeholder}` is substituted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Alignment>,

    /// Value translation, e.g. rank `1` → `I`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, String>,
}

impl FieldBinding {
    pub fn new(placeholder: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            column: column.into(),
            required: true,
            align: None,
            values: BTreeMap::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_align(mut self, align: Alignment) -> Self {
        self.align = Some(align);
        self
    }

    pub fn with_value(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.values.insert(from.into(), to.into());
        self
    }

    /// Field name without surrounding braces.
    pub fn field_name(&self) -> &str {
        let name = self.placeholder.trim();
        name.strip_prefix('{')
            .and_then(|n| n.strip_suffix('}'))
            .unwrap_or(name)
    }

    /// Cell value after translation; empty when absent.
    pub fn value_for(&self, record: &Record) -> String {
        let raw = record.get(&self.column).unwrap_or_default();
        self.values
            .get(raw)
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }
}

/// Only records whose `column` value is one of `values` are processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordFilter {
    #[serde(default)]
    pub column: String,
    pub values: Vec<String>,
}

/// Per-job mail dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEmailSettings {
    #[serde(default)]
    pub recipient_column: String,

    #[serde(default)]
    pub subject: String,

    /// HTML body template path, relative to the base directory.
    #[serde(default)]
    pub body_template: String,

    /// Body token (without braces) → column.
    #[serde(default)]
    pub body_fields: BTreeMap<String, String>,

    /// Attachment name prefix (defaults to the job's file prefix).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_prefix: Option<String>,
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Files,
    Logging,
    Processing,
    Email,
}

impl ConfigSection {
    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Files => "files",
            ConfigSection::Logging => "logging",
            ConfigSection::Processing => "processing",
            ConfigSection::Email => "email",
        }
    }
}
