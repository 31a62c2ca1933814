//! Batch counters and the JSON run report.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Report file written into the output folder.
pub const REPORT_FILE: &str = "batch_report.json";

/// Attempted / succeeded / failed for one kind of operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl Counter {
    pub fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if ok {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Counters for one job (output category).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub name: String,
    pub output_dir: PathBuf,
    pub rendered: Counter,
    pub converted: Counter,
    pub dispatched: Counter,
    /// Records that lacked required fields.
    pub skipped: usize,
    /// Combined artifacts written by the merge step.
    #[serde(default)]
    pub combined: Vec<PathBuf>,
    /// Editable documents removed by cleanup.
    #[serde(default)]
    pub cleaned: usize,
    /// Merge and cleanup problems that did not stop the batch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl CategoryReport {
    pub fn new(name: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    pub fn failures(&self) -> usize {
        self.rendered.failed + self.converted.failed + self.dispatched.failed + self.errors.len()
    }

    /// One-line summary for the console.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}: rendered {}/{}, converted {}/{}",
            self.name,
            self.rendered.succeeded,
            self.rendered.attempted,
            self.converted.succeeded,
            self.converted.attempted
        );
        if self.dispatched.attempted > 0 {
            line.push_str(&format!(
                ", sent {}/{}",
                self.dispatched.succeeded, self.dispatched.attempted
            ));
        }
        if self.skipped > 0 {
            line.push_str(&format!(", skipped {}", self.skipped));
        }
        line
    }
}

/// A step that failed as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub step: String,
    pub message: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
    pub records_total: usize,
    pub output_dir: PathBuf,
    pub categories: Vec<CategoryReport>,
    #[serde(default)]
    pub step_failures: Vec<StepFailure>,
}

impl BatchResult {
    pub fn new(output_dir: impl Into<PathBuf>, records_total: usize) -> Self {
        Self {
            started_at: chrono::Local::now().to_rfc3339(),
            output_dir: output_dir.into(),
            records_total,
            ..Default::default()
        }
    }

    pub fn category(&self, name: &str) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn total_failures(&self) -> usize {
        self.categories.iter().map(CategoryReport::failures).sum::<usize>()
            + self.step_failures.len()
    }

    pub fn has_failures(&self) -> bool {
        self.total_failures() > 0
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(chrono::Local::now().to_rfc3339());
    }

    /// Write `batch_report.json` into `dir`.
    pub fn write_report(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(REPORT_FILE);
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut counter = Counter::default();
        counter.record(true);
        counter.record(false);
        counter.record(true);
        assert_eq!(
            counter,
            Counter {
                attempted: 3,
                succeeded: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn report_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut result = BatchResult::new(dir.path(), 3);
        let mut category = CategoryReport::new("diplomas", dir.path().join("Дипломы"));
        category.rendered.record(true);
        category.converted.record(false);
        category.skipped = 1;
        result.categories.push(category);
        result.finish();

        let path = result.write_report(dir.path()).unwrap();
        let loaded: BatchResult =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(loaded, result);
        assert_eq!(loaded.total_failures(), 1);
        assert_eq!(
            loaded.categories[0].summary(),
            "diplomas: rendered 1/1, converted 0/1, skipped 1"
        );
    }
}
