//! Owned document model.
//!
//! The tree mirrors the word-processing structure the substitution engine
//! cares about: body blocks, tables with nested cells, and the header/footer
//! regions owned by each section. Everything else in the package is kept as
//! raw XML by the DOCX codec.

use serde::{Deserialize, Serialize};

use super::xml::Element;

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    /// Parse a `w:jc` value.
    pub fn from_docx(value: &str) -> Option<Self> {
        match value {
            "left" | "start" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" | "end" => Some(Self::Right),
            "both" | "distribute" => Some(Self::Justify),
            _ => None,
        }
    }

    /// Value written to `w:jc`.
    pub fn docx_value(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "both",
        }
    }
}

/// Underline style (`w:u/@w:val`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Underline {
    None,
    Single,
    Double,
    Other(String),
}

impl Underline {
    pub fn from_docx(value: &str) -> Self {
        match value {
            "none" => Self::None,
            "single" => Self::Single,
            "double" => Self::Double,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn docx_value(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Single => "single",
            Self::Double => "double",
            Self::Other(v) => v,
        }
    }
}

/// Run-level formatting attributes the engine copies between runs.
///
/// `None` means "not set on this run" (inherited from the style).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFormat {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<Underline>,
    pub font_name: Option<String>,
    /// Size in half-points, as stored in `w:sz`.
    pub font_size: Option<u32>,
}

impl RunFormat {
    pub fn is_empty(&self) -> bool {
        self.bold.is_none()
            && self.italic.is_none()
            && self.underline.is_none()
            && self.font_name.is_none()
            && self.font_size.is_none()
    }
}

/// A span of text sharing one formatting profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub format: RunFormat,
    /// Complete `w:rPr` as read from the package, if any.
    ///
    /// When present it is written back verbatim; otherwise `format` is
    /// rendered into a fresh `w:rPr`.
    pub properties: Option<Element>,
}

impl Run {
    /// A run with default formatting.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// A run with the given formatting attributes and no raw properties.
    pub fn styled(text: impl Into<String>, format: RunFormat) -> Self {
        Self {
            text: text.into(),
            format,
            properties: None,
        }
    }

    /// Same complete properties as `self`, different text.
    pub fn restyled(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: self.format.clone(),
            properties: self.properties.clone(),
        }
    }
}

/// Anything holding an ordered sequence of runs.
pub trait TextContainer {
    fn runs(&self) -> &[Run];

    /// Replace every run. Marks the container as rewritten.
    fn replace_runs(&mut self, runs: Vec<Run>);

    fn set_alignment(&mut self, alignment: Alignment);

    /// Concatenated text of all runs.
    fn text(&self) -> String {
        self.runs().iter().map(|r| r.text.as_str()).collect()
    }
}

/// A paragraph: the only text container in the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    runs: Vec<Run>,
    alignment: Option<Alignment>,
    modified: bool,
}

impl Paragraph {
    /// Paragraph as read from a package (not modified).
    pub fn from_runs(runs: Vec<Run>, alignment: Option<Alignment>) -> Self {
        Self {
            runs,
            alignment,
            modified: false,
        }
    }

    pub fn alignment(&self) -> Option<Alignment> {
        self.alignment
    }

    /// Whether the engine rewrote this paragraph.
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

impl TextContainer for Paragraph {
    fn runs(&self) -> &[Run] {
        &self.runs
    }

    fn replace_runs(&mut self, runs: Vec<Run>) {
        self.runs = runs;
        self.modified = true;
    }

    fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = Some(alignment);
        self.modified = true;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCell {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

/// A body-level or cell-level block.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

impl Block {
    /// Visible text, paragraphs separated by newlines.
    pub fn text(&self) -> String {
        match self {
            Block::Paragraph(p) => p.text(),
            Block::Table(t) => t
                .rows
                .iter()
                .flat_map(|row| row.cells.iter())
                .flat_map(|cell| cell.blocks.iter())
                .map(Block::text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub(crate) fn is_modified(&self) -> bool {
        match self {
            Block::Paragraph(p) => p.is_modified(),
            Block::Table(t) => t
                .rows
                .iter()
                .flat_map(|row| row.cells.iter())
                .any(|cell| cell.blocks.iter().any(Block::is_modified)),
        }
    }
}

/// A header or footer part.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Package part name, e.g. `word/header1.xml`.
    pub part: String,
    /// `default`, `first` or `even`.
    pub kind: String,
    pub blocks: Vec<Block>,
}

/// A document section with its header and footer regions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub headers: Vec<Region>,
    pub footers: Vec<Region>,
}

/// The whole document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub body: Vec<Block>,
    pub sections: Vec<Section>,
}

impl Document {
    /// Visible body text, one line per block.
    pub fn body_text(&self) -> String {
        self.body
            .iter()
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every region (headers first, then footers) in section order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.sections
            .iter()
            .flat_map(|s| s.headers.iter())
            .chain(self.sections.iter().flat_map(|s| s.footers.iter()))
    }
}
