//! CSV input.

use std::fs;
use std::path::Path;

use super::types::{Record, RecordSet, RecordsError, RecordsResult};

/// Read a CSV file with a header row.
///
/// The delimiter is `;` when the header line holds more semicolons than
/// commas (spreadsheet exports in many locales), `,` otherwise. A UTF-8 BOM is
/// stripped. Fully blank rows are skipped but still count towards row indices.
pub fn read_csv(path: &Path) -> RecordsResult<RecordSet> {
    let content = fs::read_to_string(path).map_err(|source| RecordsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let header_line = content.lines().next().unwrap_or_default();
    if header_line.trim().is_empty() {
        return Err(RecordsError::NoHeader(path.to_path_buf()));
    }
    let delimiter = if header_line.matches(';').count() > header_line.matches(',').count() {
        b';'
    } else {
        b','
    };

    let csv_error = |source| RecordsError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(csv_error)?;
        let fields = columns
            .iter()
            .cloned()
            .zip(row.iter().map(str::to_string))
            .collect();
        let record = Record::new(index, fields);
        if !record.is_blank() {
            records.push(record);
        }
    }

    tracing::debug!(path = %path.display(), rows = records.len(), "Read CSV records");
    Ok(RecordSet { columns, records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reads_comma_separated_with_bom() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "\u{feff}ФИО,Email\nИванов И.И.,a@b.c\n,\nПетров П.П.,\n").unwrap();

        let set = read_csv(&path).unwrap();
        assert_eq!(set.columns, vec!["ФИО", "Email"]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.records[0].get("ФИО"), Some("Иванов И.И."));
        assert_eq!(set.records[1].index, 2);
        assert_eq!(set.records[1].get("Email"), None);
    }

    #[test]
    fn detects_semicolon_delimiter() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "Name;Title\n\"Smith, J.\";Report\n").unwrap();

        let set = read_csv(&path).unwrap();
        assert_eq!(set.records[0].get("Name"), Some("Smith, J."));
        assert_eq!(set.records[0].get("Title"), Some("Report"));
    }

    #[test]
    fn short_rows_leave_missing_fields_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "A,B,C\n1\n").unwrap();

        let set = read_csv(&path).unwrap();
        assert_eq!(set.records[0].get("A"), Some("1"));
        assert_eq!(set.records[0].get("C"), None);
    }

    #[test]
    fn empty_file_has_no_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "").unwrap();
        assert!(matches!(read_csv(&path), Err(RecordsError::NoHeader(_))));
    }
}
