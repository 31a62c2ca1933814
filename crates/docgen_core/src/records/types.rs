//! Record types and errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading tabular input.
#[derive(Error, Debug)]
pub enum RecordsError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to read workbook {path}: {message}")]
    Workbook { path: PathBuf, message: String },

    #[error("No header row in {0}")]
    NoHeader(PathBuf),

    #[error("Unsupported data file format: {0}")]
    UnsupportedFormat(PathBuf),
}

impl RecordsError {
    pub fn workbook(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Workbook {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for record loading.
pub type RecordsResult<T> = Result<T, RecordsError>;

/// One data row: column name → trimmed cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 0-based position among the data rows of the source.
    pub index: usize,
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new(index: usize, fields: Vec<(String, String)>) -> Self {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k, v.trim().to_string()))
            .collect();
        Self { index, fields }
    }

    /// Value of `column`, or `None` when the column is absent or the cell is
    /// empty.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Columns from `required` with no value in this record.
    pub fn missing<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|c| self.get(c).is_none())
            .collect()
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.fields.iter().all(|(_, v)| v.is_empty())
    }
}

/// All rows of a data source plus its header.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl RecordSet {
    /// Columns from `required` that the header does not contain.
    pub fn missing_columns<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|c| !self.columns.iter().any(|col| col == c))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::new(
            0,
            vec![
                ("ФИО".into(), "  Иванов И.И. ".into()),
                ("Email".into(), "   ".into()),
            ],
        )
    }

    #[test]
    fn values_are_trimmed_and_empty_is_absent() {
        let r = record();
        assert_eq!(r.get("ФИО"), Some("Иванов И.И."));
        assert_eq!(r.get("Email"), None);
        assert_eq!(r.get("Unknown"), None);
    }

    #[test]
    fn missing_lists_empty_and_absent_columns() {
        let r = record();
        assert_eq!(r.missing(&["ФИО", "Email", "Rank"]), vec!["Email", "Rank"]);
    }

    #[test]
    fn record_set_reports_missing_columns() {
        let set = RecordSet {
            columns: vec!["A".into(), "B".into()],
            records: Vec::new(),
        };
        assert_eq!(set.missing_columns(&["A", "C"]), vec!["C"]);
        assert!(set.is_empty());
    }
}
