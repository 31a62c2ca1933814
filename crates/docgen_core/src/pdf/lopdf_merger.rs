//! PDF concatenation with lopdf.
//!
//! Every input is renumbered into a disjoint object id range. Page objects
//! are kept (with their inheritable attributes copied down from the old page
//! tree) and hung under one fresh page tree in input order. The old catalogs,
//! page tree nodes and outlines are dropped.

use std::path::{Path, PathBuf};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use super::{MergeError, MergeResult, PdfMerger};

/// Page attributes a page may inherit from its ancestors.
const INHERITABLE: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against malformed (cyclic) page trees.
const MAX_TREE_DEPTH: usize = 64;

/// [`PdfMerger`] backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfMerger;

impl PdfMerger for LopdfMerger {
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> MergeResult<()> {
        if inputs.is_empty() {
            return Err(MergeError::NoInputs);
        }

        let mut merged = Document::with_version("1.5");
        let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
        let mut next_id = 1;

        for path in inputs {
            let mut doc =
                Document::load(path).map_err(|e| MergeError::read(path, e.to_string()))?;
            doc.renumber_objects_with(next_id);
            next_id = doc.max_id + 1;

            for (_, page_id) in doc.get_pages() {
                let page = flatten_page(&doc, page_id)
                    .map_err(|message| MergeError::structure(path, message))?;
                pages.push((page_id, page));
            }

            for (id, object) in std::mem::take(&mut doc.objects) {
                match object_type(&object) {
                    Some(b"Catalog") | Some(b"Pages") | Some(b"Page") | Some(b"Outlines")
                    | Some(b"Outline") => {}
                    _ => {
                        merged.objects.insert(id, object);
                    }
                }
            }
        }

        let pages_id: ObjectId = (next_id, 0);
        let catalog_id: ObjectId = (next_id + 1, 0);

        let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
        let count = pages.len() as i64;
        for (id, mut page) in pages {
            page.set("Parent", pages_id);
            merged.objects.insert(id, Object::Dictionary(page));
        }

        merged.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => Object::Integer(count),
            }),
        );
        merged.objects.insert(
            catalog_id,
            Object::Dictionary(dictionary! {
                "Type" => "Catalog",
                "Pages" => pages_id,
            }),
        );
        merged.trailer.set("Root", catalog_id);
        merged.max_id = catalog_id.0;

        merged.renumber_objects();
        merged.compress();
        merged.save(output).map_err(|source| MergeError::Write {
            path: output.to_path_buf(),
            source,
        })?;

        tracing::debug!(
            inputs = inputs.len(),
            pages = count,
            output = %output.display(),
            "Merged PDFs"
        );
        Ok(())
    }
}

fn object_type(object: &Object) -> Option<&[u8]> {
    object.as_dict().ok()?.get(b"Type").ok()?.as_name().ok()
}

/// Page dictionary with inherited attributes copied in.
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary, String> {
    let mut page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| format!("page {:?}: {}", page_id, e))?
        .clone();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(parent_id) = parent {
        depth += 1;
        if depth > MAX_TREE_DEPTH {
            return Err(format!("page tree deeper than {} levels", MAX_TREE_DEPTH));
        }
        let Ok(node) = doc.get_object(parent_id).and_then(Object::as_dict) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(page)
}
