//! Concatenation of editable documents.
//!
//! The first package is the base and is kept as-is. The body content of each
//! later document is appended after a page break, before the base's final
//! section properties. Styles, numbering and media of the later documents are
//! not carried over.

use std::path::{Path, PathBuf};

use super::docx::{DocxDocument, DocxResult};
use super::xml::{Element, Node};

/// `<w:p><w:r><w:br w:type="page"/></w:r></w:p>`
fn page_break() -> Node {
    Node::Element(
        Element::new("w:p").with_child(
            Element::new("w:r").with_child(Element::new("w:br").with_attr("w:type", "page")),
        ),
    )
}

/// Merge existing documents from `inputs` (in order) into `output`.
///
/// Paths that do not exist are skipped. Returns the number of documents
/// merged, or `Ok(0)` without writing when none exist.
pub fn merge_documents(inputs: &[PathBuf], output: &Path) -> DocxResult<usize> {
    let mut existing = inputs.iter().filter(|p| p.exists());

    let Some(first) = existing.next() else {
        return Ok(0);
    };
    let mut base = DocxDocument::open(first)?;
    let mut merged = 1;

    for path in existing {
        let next = DocxDocument::open(path)?;
        let mut nodes = vec![page_break()];
        nodes.extend(next.body_content());
        base.append_body(nodes)?;
        merged += 1;
    }

    base.save(output)?;
    tracing::debug!(merged, output = %output.display(), "Merged editable documents");
    Ok(merged)
}
