//! Fake collaborators for orchestrator tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Settings;
use crate::convert::{ConversionOutput, ConvertError, ConvertResult, DocumentConverter};
use crate::document::fixtures::{self, FixtureRun};
use crate::logging::{BatchLogger, LogConfig};
use crate::mail::{MailError, MailResult, MailTransport, OutgoingMail};
use crate::pdf::{MergeResult, PdfMerger};
use crate::records::RecordSet;

use super::throttle::Throttle;
use super::types::Context;

/// Writes a placeholder PDF; fails for sources whose name contains a marker.
#[derive(Default)]
pub struct FakeConverter {
    pub fail_on: Vec<String>,
}

impl DocumentConverter for FakeConverter {
    fn name(&self) -> &str {
        "fake"
    }

    fn convert(&self, source: &Path, target: &Path) -> ConvertResult<ConversionOutput> {
        let name = source.to_string_lossy();
        if self.fail_on.iter().any(|m| name.contains(m.as_str())) {
            return Err(ConvertError::CommandFailed {
                tool: "fake".into(),
                exit_code: 1,
                message: "cannot load document".into(),
            });
        }
        fs::write(target, b"%PDF-1.4 fake")?;
        Ok(ConversionOutput {
            command: format!("fake {}", source.display()),
            lines: vec![("converted".to_string(), false)],
        })
    }
}

/// Records merge calls and writes an empty output.
#[derive(Clone, Default)]
pub struct RecordingMerger {
    pub calls: Arc<Mutex<Vec<Vec<PathBuf>>>>,
}

impl PdfMerger for RecordingMerger {
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> MergeResult<()> {
        self.calls.lock().push(inputs.to_vec());
        fs::write(output, b"%PDF-1.4 merged").map_err(|source| crate::pdf::MergeError::Write {
            path: output.to_path_buf(),
            source,
        })
    }
}

/// Keeps sent messages; refuses recipients listed in `reject`.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<OutgoingMail>>>,
    pub reject: Vec<String>,
}

impl MailTransport for RecordingMailer {
    fn send(&self, mail: &OutgoingMail) -> MailResult<()> {
        if self.reject.contains(&mail.to) {
            return Err(MailError::transport("550 mailbox unavailable"));
        }
        self.sent.lock().push(mail.clone());
        Ok(())
    }
}

/// A template whose body holds one paragraph per line of `lines`.
pub fn write_template(path: &Path, lines: &[&str]) {
    let body: String = lines
        .iter()
        .map(|line| fixtures::paragraph(&[FixtureRun::plain(line)]))
        .collect();
    fs::write(path, fixtures::docx_bytes(&body, None, None)).unwrap();
}

/// Context with no jobs and no records.
pub fn empty_context(dir: &Path) -> Context {
    let logger = BatchLogger::new("test", dir.join(".logs"), LogConfig::default(), None).unwrap();
    Context {
        settings: Settings::default(),
        base_dir: dir.to_path_buf(),
        output_dir: dir.join("output"),
        jobs: Vec::new(),
        records: RecordSet::default(),
        logger: Arc::new(logger),
        converter: Box::new(FakeConverter::default()),
        merger: Box::new(RecordingMerger::default()),
        mailer: None,
        throttle: Throttle::from_secs(0),
    }
}
