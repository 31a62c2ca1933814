//! In-memory DOCX fixtures for tests.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const NAMESPACES: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#
);

/// One run of a fixture paragraph.
pub(crate) struct FixtureRun<'a> {
    pub text: &'a str,
    pub bold: bool,
}

impl<'a> FixtureRun<'a> {
    pub fn plain(text: &'a str) -> Self {
        Self { text, bold: false }
    }

    pub fn bold(text: &'a str) -> Self {
        Self { text, bold: true }
    }
}

/// `<w:p>` with the given runs.
pub(crate) fn paragraph(runs: &[FixtureRun]) -> String {
    let mut xml = String::from("<w:p>");
    for run in runs {
        xml.push_str("<w:r>");
        if run.bold {
            xml.push_str("<w:rPr><w:b/></w:rPr>");
        }
        xml.push_str(r#"<w:t xml:space="preserve">"#);
        xml.push_str(&escape(run.text));
        xml.push_str("</w:t></w:r>");
    }
    xml.push_str("</w:p>");
    xml
}

/// `<w:tbl>` from rows of cells, each cell given as its inner block XML.
pub(crate) fn table(rows: &[&[&str]]) -> String {
    let mut xml = String::from("<w:tbl><w:tblPr/>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in row.iter() {
            xml.push_str("<w:tc><w:tcPr/>");
            xml.push_str(cell);
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

/// A minimal package with the given body XML and optional header/footer
/// content (one section referencing both).
pub(crate) fn docx_bytes(body: &str, header: Option<&str>, footer: Option<&str>) -> Vec<u8> {
    let mut references = String::new();
    let mut relationships = String::new();
    let mut overrides = String::new();
    let mut extra_parts: Vec<(String, String)> = Vec::new();

    if let Some(content) = header {
        references.push_str(r#"<w:headerReference w:type="default" r:id="rIdHeader1"/>"#);
        relationships.push_str(
            r#"<Relationship Id="rIdHeader1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>"#,
        );
        overrides.push_str(
            r#"<Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/>"#,
        );
        extra_parts.push((
            "word/header1.xml".into(),
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr {NAMESPACES}>{content}</w:hdr>"#),
        ));
    }
    if let Some(content) = footer {
        references.push_str(r#"<w:footerReference w:type="default" r:id="rIdFooter1"/>"#);
        relationships.push_str(
            r#"<Relationship Id="rIdFooter1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer" Target="footer1.xml"/>"#,
        );
        overrides.push_str(
            r#"<Override PartName="/word/footer1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.footer+xml"/>"#,
        );
        extra_parts.push((
            "word/footer1.xml".into(),
            format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:ftr {NAMESPACES}>{content}</w:ftr>"#),
        ));
    }

    let content_types = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>{overrides}</Types>"#
    );
    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#.to_string();
    let document_rels = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#
    );
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {NAMESPACES}><w:body>{body}<w:sectPr>{references}<w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#
    );

    let mut parts: Vec<(String, String)> = vec![
        ("[Content_Types].xml".into(), content_types),
        ("_rels/.rels".into(), root_rels),
        ("word/document.xml".into(), document),
        ("word/_rels/document.xml.rels".into(), document_rels),
    ];
    parts.extend(extra_parts);

    let borrowed: Vec<(&str, &str)> = parts
        .iter()
        .map(|(n, c)| (n.as_str(), c.as_str()))
        .collect();
    zip_bytes(&borrowed)
}

/// A zip archive holding the given text parts.
pub(crate) fn zip_bytes(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Text of one part of a package.
pub(crate) fn part_text(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    text
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
