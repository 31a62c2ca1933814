//! Tabular record input.
//!
//! The data source is chosen by file extension: `.csv` goes through the `csv`
//! reader, spreadsheet formats through `calamine`.

mod csv_source;
mod types;
mod workbook;

use std::path::Path;

pub use csv_source::read_csv;
pub use types::{Record, RecordSet, RecordsError, RecordsResult};
pub use workbook::read_workbook;

/// Load all records from `path`.
pub fn load_records(path: &Path) -> RecordsResult<RecordSet> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path),
        _ => Err(RecordsError::UnsupportedFormat(path.to_path_buf())),
    }
}
