//! DOCX package reading and writing.
//!
//! A package is kept as its raw zip parts. `word/document.xml` and every
//! header/footer part referenced from a section are parsed into XML trees and
//! projected onto the [`Document`] model. On save, each parsed part is walked
//! in lockstep with the model: only paragraphs the engine rewrote are
//! re-emitted, and parts with no rewritten paragraph keep their original bytes.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::model::{
    Alignment, Block, Document, Paragraph, Region, Run, RunFormat, Section, Table, TableCell,
    TableRow, TextContainer, Underline,
};
use super::xml::{self, Element, Node, XmlError};

pub const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

const W_BODY: &str = "w:body";
const W_P: &str = "w:p";
const W_PPR: &str = "w:pPr";
const W_JC: &str = "w:jc";
const W_R: &str = "w:r";
const W_RPR: &str = "w:rPr";
const W_T: &str = "w:t";
const W_TBL: &str = "w:tbl";
const W_TR: &str = "w:tr";
const W_TC: &str = "w:tc";
const W_SECTPR: &str = "w:sectPr";

/// `w:pPr` children that must come after `w:jc`.
const AFTER_JC: &[&str] = &[
    "w:textDirection",
    "w:textAlignment",
    "w:textboxTightWrap",
    "w:outlineLvl",
    "w:divId",
    "w:cnfStyle",
    "w:rPr",
    "w:sectPr",
    "w:pPrChange",
];

/// Errors raised while reading or writing a DOCX package.
#[derive(Error, Debug)]
pub enum DocxError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid DOCX package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Malformed XML in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: XmlError,
    },

    #[error("Missing package part: {0}")]
    MissingPart(String),

    #[error("Package part {0} is not valid UTF-8")]
    Encoding(String),

    #[error("Unexpected structure in {part}: {message}")]
    Structure { part: String, message: String },
}

impl DocxError {
    pub fn structure(part: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structure {
            part: part.into(),
            message: message.into(),
        }
    }
}

/// Result type for DOCX operations.
pub type DocxResult<T> = Result<T, DocxError>;

#[derive(Debug, Clone)]
struct Part {
    name: String,
    data: Vec<u8>,
}

/// A template whose bytes are read once and instantiated per record.
#[derive(Debug, Clone)]
pub struct Template {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl Template {
    /// Read the template file. Parsing happens per instance.
    pub fn load(path: impl AsRef<Path>) -> DocxResult<Self> {
        let path = path.as_ref().to_path_buf();
        let bytes = fs::read(&path)?;
        Ok(Self { path, bytes })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A fresh, independent copy of the template.
    pub fn instantiate(&self) -> DocxResult<DocxDocument> {
        DocxDocument::from_bytes(&self.bytes)
    }
}

/// An opened DOCX package.
#[derive(Debug, Clone)]
pub struct DocxDocument {
    parts: Vec<Part>,
    body_root: Element,
    region_roots: HashMap<String, Element>,
    body_appended: bool,
    document: Document,
}

impl DocxDocument {
    pub fn open(path: impl AsRef<Path>) -> DocxResult<Self> {
        let bytes = fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> DocxResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            parts.push(Part { name, data });
        }

        let body_root = parse_part(&parts, DOCUMENT_PART)?;
        let body = body_root
            .child(W_BODY)
            .ok_or_else(|| DocxError::structure(DOCUMENT_PART, "no w:body element"))?;
        let blocks = read_blocks(body);

        let relationships = read_relationships(&parts)?;
        let mut region_roots = HashMap::new();
        let mut sections = Vec::new();
        for sect_pr in section_properties(body) {
            let mut section = Section::default();
            for reference in sect_pr.elements() {
                let is_header = reference.is("w:headerReference");
                if !is_header && !reference.is("w:footerReference") {
                    continue;
                }
                let Some(target) = reference
                    .attr("r:id")
                    .and_then(|id| relationships.get(id))
                else {
                    continue;
                };
                // A part shared by several sections belongs to the first one.
                if region_roots.contains_key(target) {
                    continue;
                }
                let root = parse_part(&parts, target)?;
                let region = Region {
                    part: target.clone(),
                    kind: reference.attr("w:type").unwrap_or("default").to_string(),
                    blocks: read_blocks(&root),
                };
                region_roots.insert(target.clone(), root);
                if is_header {
                    section.headers.push(region);
                } else {
                    section.footers.push(region);
                }
            }
            sections.push(section);
        }

        Ok(Self {
            parts,
            body_root,
            region_roots,
            body_appended: false,
            document: Document {
                body: blocks,
                sections,
            },
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Names of all parts in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    /// Body content nodes, excluding the trailing section properties.
    pub(crate) fn body_content(&self) -> Vec<Node> {
        let Some(body) = self.body_root.child(W_BODY) else {
            return Vec::new();
        };
        let mut nodes = body.children.clone();
        if let Some(pos) = nodes
            .iter()
            .rposition(|n| matches!(n, Node::Element(e) if e.is(W_SECTPR)))
        {
            nodes.truncate(pos);
        }
        nodes
    }

    /// Insert raw nodes at the end of the body, before the final `w:sectPr`.
    ///
    /// Appended content is outside the model and written back as-is.
    pub(crate) fn append_body(&mut self, nodes: Vec<Node>) -> DocxResult<()> {
        let body = self
            .body_root
            .child_mut(W_BODY)
            .ok_or_else(|| DocxError::structure(DOCUMENT_PART, "no w:body element"))?;
        let insert_at = body
            .children
            .iter()
            .rposition(|n| matches!(n, Node::Element(e) if e.is(W_SECTPR)))
            .unwrap_or(body.children.len());
        body.children.splice(insert_at..insert_at, nodes);
        self.body_appended = true;
        Ok(())
    }

    /// Serialize the package.
    pub fn to_bytes(&self) -> DocxResult<Vec<u8>> {
        let mut rewritten: HashMap<&str, String> = HashMap::new();

        if self.body_appended || self.document.body.iter().any(Block::is_modified) {
            let mut root = self.body_root.clone();
            let body = root
                .child_mut(W_BODY)
                .ok_or_else(|| DocxError::structure(DOCUMENT_PART, "no w:body element"))?;
            apply_blocks(body, &self.document.body);
            rewritten.insert(DOCUMENT_PART, xml::to_document_string(&root));
        }

        for region in self.document.regions() {
            if !region.blocks.iter().any(Block::is_modified) {
                continue;
            }
            if let Some(original) = self.region_roots.get(&region.part) {
                let mut root = original.clone();
                apply_blocks(&mut root, &region.blocks);
                rewritten.insert(region.part.as_str(), xml::to_document_string(&root));
            }
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for part in &self.parts {
            writer.start_file(part.name.as_str(), options)?;
            match rewritten.get(part.name.as_str()) {
                Some(xml) => writer.write_all(xml.as_bytes())?,
                None => writer.write_all(&part.data)?,
            }
        }
        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> DocxResult<()> {
        let bytes = self.to_bytes()?;
        fs::write(path.as_ref(), bytes)?;
        Ok(())
    }
}

fn parse_part(parts: &[Part], name: &str) -> DocxResult<Element> {
    let part = parts
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| DocxError::MissingPart(name.to_string()))?;
    let text =
        std::str::from_utf8(&part.data).map_err(|_| DocxError::Encoding(name.to_string()))?;
    xml::parse(text).map_err(|source| DocxError::Xml {
        part: name.to_string(),
        source,
    })
}

/// Relationship id to part name for `word/document.xml`.
fn read_relationships(parts: &[Part]) -> DocxResult<HashMap<String, String>> {
    if !parts.iter().any(|p| p.name == DOCUMENT_RELS_PART) {
        return Ok(HashMap::new());
    }
    let root = parse_part(parts, DOCUMENT_RELS_PART)?;
    let mut map = HashMap::new();
    for rel in root.elements().filter(|e| e.is("Relationship")) {
        if rel.attr("TargetMode") == Some("External") {
            continue;
        }
        if let (Some(id), Some(target)) = (rel.attr("Id"), rel.attr("Target")) {
            map.insert(id.to_string(), resolve_target(target));
        }
    }
    Ok(map)
}

fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{}", target.trim_start_matches("./")),
    }
}

/// Section properties in document order: those carried by paragraphs, then
/// the body-level one.
fn section_properties(body: &Element) -> Vec<&Element> {
    let mut found: Vec<&Element> = body
        .elements()
        .filter(|e| e.is(W_P))
        .filter_map(|p| p.child(W_PPR).and_then(|ppr| ppr.child(W_SECTPR)))
        .collect();
    found.extend(body.elements().filter(|e| e.is(W_SECTPR)));
    found
}

fn read_blocks(container: &Element) -> Vec<Block> {
    container
        .elements()
        .filter_map(|e| match e.name.as_str() {
            W_P => Some(Block::Paragraph(read_paragraph(e))),
            W_TBL => Some(Block::Table(read_table(e))),
            _ => None,
        })
        .collect()
}

fn read_table(tbl: &Element) -> Table {
    Table {
        rows: tbl
            .elements()
            .filter(|e| e.is(W_TR))
            .map(|tr| TableRow {
                cells: tr
                    .elements()
                    .filter(|e| e.is(W_TC))
                    .map(|tc| TableCell {
                        blocks: read_blocks(tc),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn read_paragraph(p: &Element) -> Paragraph {
    let alignment = p
        .child(W_PPR)
        .and_then(|ppr| ppr.child(W_JC))
        .and_then(|jc| jc.attr("w:val"))
        .and_then(Alignment::from_docx);
    let runs = text_run_slots(p)
        .into_iter()
        .filter_map(|slot| match &p.children[slot] {
            Node::Element(r) => Some(read_run(r)),
            _ => None,
        })
        .collect();
    Paragraph::from_runs(runs, alignment)
}

/// Positions of `p`'s children that are plain text runs.
///
/// Hyperlinks, insertions, bookmarks and simple fields are not `w:r` children
/// and are never listed. A `w:r` holding anything besides text, tabs and
/// line breaks is left out, as is every run of a complex field
/// (`w:fldChar` begin to end), result text included.
fn text_run_slots(p: &Element) -> Vec<usize> {
    let mut slots = Vec::new();
    let mut field_depth = 0usize;
    for (slot, node) in p.children.iter().enumerate() {
        let Node::Element(r) = node else {
            continue;
        };
        if !r.is(W_R) {
            continue;
        }
        let mut plain = true;
        for child in r.elements() {
            match child.name.as_str() {
                W_RPR | W_T | "w:tab" | "w:cr" | "w:lastRenderedPageBreak" => {}
                "w:br" if is_text_break(child) => {}
                "w:fldChar" => {
                    plain = false;
                    match child.attr("w:fldCharType") {
                        Some("begin") => field_depth += 1,
                        Some("end") => field_depth = field_depth.saturating_sub(1),
                        _ => {}
                    }
                }
                _ => plain = false,
            }
        }
        if plain && field_depth == 0 {
            slots.push(slot);
        }
    }
    slots
}

fn is_text_break(br: &Element) -> bool {
    matches!(br.attr("w:type"), None | Some("textWrapping"))
}

fn read_run(r: &Element) -> Run {
    let properties = r.child(W_RPR).cloned();
    let format = properties.as_ref().map(read_format).unwrap_or_default();
    let mut text = String::new();
    for child in r.elements() {
        match child.name.as_str() {
            W_T => text.push_str(&child.text()),
            "w:tab" => text.push('\t'),
            "w:cr" => text.push('\n'),
            "w:br" if is_text_break(child) => text.push('\n'),
            _ => {}
        }
    }
    Run {
        text,
        format,
        properties,
    }
}

fn read_format(rpr: &Element) -> RunFormat {
    RunFormat {
        bold: rpr.child("w:b").map(toggle_value),
        italic: rpr.child("w:i").map(toggle_value),
        underline: rpr
            .child("w:u")
            .and_then(|u| u.attr("w:val"))
            .map(Underline::from_docx),
        font_name: rpr
            .child("w:rFonts")
            .and_then(|f| f.attr("w:ascii").or_else(|| f.attr("w:hAnsi")))
            .map(str::to_string),
        font_size: rpr
            .child("w:sz")
            .and_then(|s| s.attr("w:val"))
            .and_then(|v| v.parse().ok()),
    }
}

fn toggle_value(element: &Element) -> bool {
    !matches!(element.attr("w:val"), Some("0") | Some("false") | Some("off"))
}

/// Build a `w:rPr` from formatting attributes, in schema order.
fn format_properties(format: &RunFormat) -> Option<Element> {
    if format.is_empty() {
        return None;
    }
    let mut rpr = Element::new(W_RPR);
    if let Some(font) = &format.font_name {
        rpr = rpr.with_child(
            Element::new("w:rFonts")
                .with_attr("w:ascii", font.as_str())
                .with_attr("w:hAnsi", font.as_str())
                .with_attr("w:cs", font.as_str()),
        );
    }
    if let Some(bold) = format.bold {
        rpr = rpr.with_child(toggle_element("w:b", bold));
    }
    if let Some(italic) = format.italic {
        rpr = rpr.with_child(toggle_element("w:i", italic));
    }
    if let Some(size) = format.font_size {
        rpr = rpr
            .with_child(Element::new("w:sz").with_attr("w:val", size.to_string()))
            .with_child(Element::new("w:szCs").with_attr("w:val", size.to_string()));
    }
    if let Some(underline) = &format.underline {
        rpr = rpr.with_child(Element::new("w:u").with_attr("w:val", underline.docx_value()));
    }
    Some(rpr)
}

fn toggle_element(name: &str, on: bool) -> Element {
    let element = Element::new(name);
    if on {
        element
    } else {
        element.with_attr("w:val", "0")
    }
}

/// Walk `container`'s block children in lockstep with `blocks`.
fn apply_blocks(container: &mut Element, blocks: &[Block]) {
    let mut blocks = blocks.iter();
    for node in container.children.iter_mut() {
        let Node::Element(element) = node else {
            continue;
        };
        if element.is(W_P) {
            if let Some(Block::Paragraph(p)) = blocks.next() {
                if p.is_modified() {
                    write_paragraph(element, p);
                }
            }
        } else if element.is(W_TBL) {
            if let Some(Block::Table(t)) = blocks.next() {
                apply_table(element, t);
            }
        }
    }
}

fn apply_table(tbl: &mut Element, table: &Table) {
    let rows = tbl.children.iter_mut().filter_map(|n| match n {
        Node::Element(e) if e.is(W_TR) => Some(e),
        _ => None,
    });
    for (tr, row) in rows.zip(&table.rows) {
        let cells = tr.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) if e.is(W_TC) => Some(e),
            _ => None,
        });
        for (tc, cell) in cells.zip(&row.cells) {
            apply_blocks(tc, &cell.blocks);
        }
    }
}

/// Swap the paragraph's text runs for the model's runs.
///
/// The new runs take the place of the first old text run. Every other child
/// (`w:pPr`, hyperlinks, fields, bookmarks, revisions) stays where it was.
fn write_paragraph(element: &mut Element, paragraph: &Paragraph) {
    if let Some(alignment) = paragraph.alignment() {
        match element.child_mut(W_PPR) {
            Some(ppr) => set_justification(ppr, alignment),
            None => {
                let mut ppr = Element::new(W_PPR);
                set_justification(&mut ppr, alignment);
                element.children.insert(0, Node::Element(ppr));
            }
        }
    }

    let slots = text_run_slots(element);
    let insert_at = match slots.first() {
        Some(&first) => first,
        None => element
            .children
            .iter()
            .position(|n| !matches!(n, Node::Element(e) if e.is(W_PPR)))
            .unwrap_or(element.children.len()),
    };
    for &slot in slots.iter().rev() {
        element.children.remove(slot);
    }
    let runs: Vec<Node> = paragraph
        .runs()
        .iter()
        .map(|run| Node::Element(write_run(run)))
        .collect();
    element.children.splice(insert_at..insert_at, runs);
}

fn set_justification(ppr: &mut Element, alignment: Alignment) {
    if let Some(jc) = ppr.child_mut(W_JC) {
        jc.set_attr("w:val", alignment.docx_value());
        return;
    }
    let jc = Node::Element(Element::new(W_JC).with_attr("w:val", alignment.docx_value()));
    let position = ppr
        .children
        .iter()
        .position(|n| matches!(n, Node::Element(e) if AFTER_JC.contains(&e.name.as_str())))
        .unwrap_or(ppr.children.len());
    ppr.children.insert(position, jc);
}

fn write_run(run: &Run) -> Element {
    let mut element = Element::new(W_R);
    if let Some(rpr) = run
        .properties
        .clone()
        .or_else(|| format_properties(&run.format))
    {
        element.children.push(Node::Element(rpr));
    }

    let mut pending = String::new();
    for c in run.text.chars() {
        match c {
            '\t' | '\n' => {
                flush_text(&mut element, &mut pending);
                let name = if c == '\t' { "w:tab" } else { "w:br" };
                element.children.push(Node::Element(Element::new(name)));
            }
            _ => pending.push(c),
        }
    }
    flush_text(&mut element, &mut pending);
    element
}

fn flush_text(run: &mut Element, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let t = Element::new(W_T)
        .with_attr("xml:space", "preserve")
        .with_text(std::mem::take(pending));
    run.children.push(Node::Element(t));
}
