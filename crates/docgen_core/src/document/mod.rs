//! Word-processing documents: XML tree, model, DOCX codec and merging.

pub mod docx;
pub mod merge;
pub mod model;
pub mod xml;

#[cfg(test)]
pub(crate) mod fixtures;

pub use docx::{DocxDocument, DocxError, DocxResult, Template, DOCUMENT_PART};
pub use merge::merge_documents;
pub use model::{
    Alignment, Block, Document, Paragraph, Region, Run, RunFormat, Section, Table, TableCell,
    TableRow, TextContainer, Underline,
};
pub use xml::XmlError;
