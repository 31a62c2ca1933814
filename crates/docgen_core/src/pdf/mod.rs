//! Fixed-layout (PDF) merging.

mod lopdf_merger;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use lopdf_merger::LopdfMerger;

/// Errors that can occur while merging.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Nothing to merge")]
    NoInputs,

    #[error("Failed to read PDF {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Malformed PDF {path}: {message}")]
    Structure { path: PathBuf, message: String },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    pub fn read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Read {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn structure(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Structure {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for merging.
pub type MergeResult<T> = Result<T, MergeError>;

/// Concatenates fixed-layout documents.
pub trait PdfMerger: Send + Sync {
    /// Merge `inputs` (all existing, in order) into `output`.
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> MergeResult<()>;
}

/// What a merge used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Merge the inputs that still exist, in order. Missing paths are skipped.
pub fn merge_existing(
    merger: &dyn PdfMerger,
    inputs: &[PathBuf],
    output: &Path,
) -> MergeResult<MergeOutcome> {
    let (merged, skipped): (Vec<PathBuf>, Vec<PathBuf>) =
        inputs.iter().cloned().partition(|p| p.exists());
    if merged.is_empty() {
        return Err(MergeError::NoInputs);
    }
    for path in &skipped {
        tracing::debug!(path = %path.display(), "Skipping missing merge input");
    }

    merger.merge(&merged, output)?;
    Ok(MergeOutcome { merged, skipped })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::Path;

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Write a PDF with one page per label; each page shows its label.
    pub fn write_pdf(path: &Path, labels: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for label in labels {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), Object::Integer(24)]),
                    Operation::new("Td", vec![Object::Integer(100), Object::Integer(600)]),
                    Operation::new("Tj", vec![Object::string_literal(*label)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let media_box: Vec<Object> = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(595),
            Object::Integer(842),
        ];
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(labels.len() as i64),
            "Resources" => resources_id,
            "MediaBox" => media_box,
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    /// Labels of every page, in page order.
    pub fn page_labels(path: &Path) -> Vec<String> {
        let doc = Document::load(path).unwrap();
        doc.get_pages()
            .values()
            .map(|&id| {
                let content = doc.get_page_content(id).unwrap();
                let text = String::from_utf8_lossy(&content).to_string();
                let start = text.find('(').unwrap() + 1;
                let end = text[start..].find(')').unwrap() + start;
                text[start..end].to_string()
            })
            .collect()
    }
}
