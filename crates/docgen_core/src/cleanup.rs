//! Removal of editable intermediates from an output tree.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<PathBuf>,
    /// Files (or directory entries) that could not be removed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

fn is_docx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"))
}

/// Delete every `*.docx` under `root`, recursively.
///
/// Individual failures are logged and collected; the sweep continues. A
/// missing `root` yields an empty report.
pub fn sweep_editable(root: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();
    if !root.exists() {
        return report;
    }

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                tracing::warn!("Cannot read {}: {}", path.display(), e);
                report.failed.push((path, e.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_docx(entry.path()) {
            continue;
        }

        match fs::remove_file(entry.path()) {
            Ok(()) => {
                tracing::debug!("Removed {}", entry.path().display());
                report.removed.push(entry.into_path());
            }
            Err(e) => {
                tracing::warn!("Failed to remove {}: {}", entry.path().display(), e);
                report.failed.push((entry.into_path(), e.to_string()));
            }
        }
    }

    report
}
