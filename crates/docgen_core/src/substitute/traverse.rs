//! Applying the engine to every paragraph of a document.

use super::engine::{substitute, SubstitutionMode};
use super::replacements::ReplacementMap;
use crate::document::{Block, Document, Paragraph, Table};

/// Containers visited and rewritten during one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalReport {
    pub visited: usize,
    pub changed: usize,
}

/// Visit body paragraphs, then body tables (recursively), then every
/// section's headers, then every section's footers.
pub fn substitute_document(
    document: &mut Document,
    map: &ReplacementMap,
    mode: SubstitutionMode,
) -> TraversalReport {
    let mut walker = Walker {
        map,
        mode,
        report: TraversalReport::default(),
    };

    for block in &mut document.body {
        if let Block::Paragraph(p) = block {
            walker.paragraph(p, "body");
        }
    }
    for block in &mut document.body {
        if let Block::Table(t) = block {
            walker.table(t);
        }
    }
    for section in &mut document.sections {
        for region in &mut section.headers {
            walker.blocks(&mut region.blocks, "header");
        }
    }
    for section in &mut document.sections {
        for region in &mut section.footers {
            walker.blocks(&mut region.blocks, "footer");
        }
    }

    walker.report
}

struct Walker<'a> {
    map: &'a ReplacementMap,
    mode: SubstitutionMode,
    report: TraversalReport,
}

impl Walker<'_> {
    fn paragraph(&mut self, paragraph: &mut Paragraph, location: &str) {
        self.report.visited += 1;
        if substitute(paragraph, self.map, self.mode) {
            self.report.changed += 1;
            tracing::trace!(location, "Substituted placeholders");
        }
    }

    fn table(&mut self, table: &mut Table) {
        for row in &mut table.rows {
            for cell in &mut row.cells {
                self.blocks(&mut cell.blocks, "table");
            }
        }
    }

    fn blocks(&mut self, blocks: &mut [Block], location: &str) {
        for block in blocks {
            match block {
                Block::Paragraph(p) => self.paragraph(p, location),
                Block::Table(t) => self.table(t),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Region, Run, Section, TableCell, TableRow, TextContainer};

    fn para(text: &str) -> Block {
        Block::Paragraph(Paragraph::from_runs(vec![Run::new(text)], None))
    }

    fn table(blocks: Vec<Block>) -> Block {
        Block::Table(Table {
            rows: vec![TableRow {
                cells: vec![TableCell { blocks }],
            }],
        })
    }

    fn map() -> ReplacementMap {
        let mut map = ReplacementMap::new();
        map.insert("{N}", "Ivanov");
        map
    }

    #[test]
    fn reaches_every_container() {
        let mut doc = Document {
            body: vec![
                para("body {N}"),
                table(vec![para("cell {N}"), table(vec![para("nested {N}")])]),
                para("plain"),
            ],
            sections: vec![Section {
                headers: vec![Region {
                    part: "word/header1.xml".into(),
                    kind: "default".into(),
                    blocks: vec![para("head {N}")],
                }],
                footers: vec![Region {
                    part: "word/footer1.xml".into(),
                    kind: "default".into(),
                    blocks: vec![table(vec![para("foot {N}")])],
                }],
            }],
        };

        let report = substitute_document(&mut doc, &map(), SubstitutionMode::Segments);
        assert_eq!(report, TraversalReport { visited: 6, changed: 5 });

        let all: Vec<String> = doc
            .body
            .iter()
            .map(Block::text)
            .chain(doc.regions().flat_map(|r| r.blocks.iter().map(Block::text)))
            .collect();
        assert!(all.iter().all(|t| !t.contains("{N}")));
        assert_eq!(all[1], "cell Ivanov\nnested Ivanov");
    }

    #[test]
    fn untouched_paragraphs_stay_unmodified() {
        let mut doc = Document {
            body: vec![para("no tokens here")],
            sections: Vec::new(),
        };
        let report = substitute_document(&mut doc, &map(), SubstitutionMode::Collapse);
        assert_eq!(report.changed, 0);
        let Block::Paragraph(p) = &doc.body[0] else {
            panic!("expected paragraph");
        };
        assert!(!p.is_modified());
        assert_eq!(p.text(), "no tokens here");
    }
}
