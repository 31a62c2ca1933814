//! Spreadsheet input (XLSX, XLS, XLSB, ODS) via calamine.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use super::types::{Record, RecordSet, RecordsError, RecordsResult};

/// Read the first worksheet; its first row is the header.
pub fn read_workbook(path: &Path) -> RecordsResult<RecordSet> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| RecordsError::workbook(path, e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| RecordsError::NoHeader(path.to_path_buf()))?
        .map_err(|e| RecordsError::workbook(path, e.to_string()))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| RecordsError::NoHeader(path.to_path_buf()))?;
    let columns: Vec<String> = header.iter().map(cell_text).collect();

    let mut records = Vec::new();
    for (index, row) in rows.enumerate() {
        let fields = columns
            .iter()
            .cloned()
            .zip(row.iter().map(cell_text))
            .collect();
        let record = Record::new(index, fields);
        if !record.is_blank() {
            records.push(record);
        }
    }

    tracing::debug!(path = %path.display(), rows = records.len(), "Read workbook records");
    Ok(RecordSet { columns, records })
}

/// Cell as text. Whole floats lose their fractional part so `1.0` compares
/// equal to `"1"`.
pub(crate) fn cell_text(cell: &Data) -> String {
    let text = match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    };
    text.trim().to_string()
}
