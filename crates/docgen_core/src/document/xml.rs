//! Owned XML element tree for DOCX parts.
//!
//! Parsing goes through `quick-xml` events. Serialization is hand-written so
//! element order, attribute order and namespace prefixes come back out exactly
//! as they were read.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Errors raised while reading an XML part.
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("Unbalanced XML: {0}")]
    Unbalanced(String),

    #[error("XML document has no root element")]
    NoRoot,
}

/// Result type for XML operations.
pub type XmlResult<T> = Result<T, XmlError>;

/// A node inside an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    Instruction(String),
}

/// An XML element with qualified name, attributes and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Qualified name, e.g. `w:p`.
    pub name: String,
    /// Attributes in document order (qualified key, unescaped value).
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute (builder pattern).
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Add a child element (builder pattern).
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Add a text node (builder pattern).
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Check the qualified name.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    /// Get an attribute value by qualified key.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Iterate over child elements, skipping text and other nodes.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.is(name))
    }

    /// First child element with the given name (mutable).
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(e) if e.is(name) => Some(e),
            _ => None,
        })
    }

    /// Concatenated text and CDATA content of direct children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                _ => {}
            }
        }
        out
    }

    /// Serialize this element (and its subtree) into `out`.
    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            escape_attr(value, out);
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        for node in &self.children {
            match node {
                Node::Element(e) => e.write_to(out),
                Node::Text(t) => escape_text(t, out),
                Node::CData(c) => {
                    out.push_str("<![CDATA[");
                    out.push_str(c);
                    out.push_str("]]>");
                }
                Node::Comment(c) => {
                    out.push_str("<!--");
                    out.push_str(c);
                    out.push_str("-->");
                }
                Node::Instruction(p) => {
                    out.push_str("<?");
                    out.push_str(p);
                    out.push_str("?>");
                }
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// Parse an XML document and return its root element.
///
/// The XML declaration, doctype and anything outside the root are dropped;
/// `to_document_string` writes a standard declaration back.
pub fn parse(xml: &str) -> XmlResult<Element> {
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            XmlError::Parse(format!("at position {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(start) => {
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(end) => {
                let element = stack.pop().ok_or_else(|| {
                    XmlError::Unbalanced(format!(
                        "closing tag </{}> without opening tag",
                        String::from_utf8_lossy(end.name().as_ref())
                    ))
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let value = text
                        .unescape()
                        .map_err(|e| XmlError::Parse(e.to_string()))?;
                    parent.children.push(Node::Text(value.into_owned()));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Node::CData(String::from_utf8_lossy(&data).into_owned()));
                }
            }
            Event::Comment(comment) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(Node::Comment(String::from_utf8_lossy(&comment).into_owned()));
                }
            }
            Event::PI(instruction) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Instruction(
                        String::from_utf8_lossy(&instruction).into_owned(),
                    ));
                }
            }
            Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Unbalanced(format!("<{}> is never closed", open.name)));
    }

    root.ok_or(XmlError::NoRoot)
}

/// Serialize a root element as a standalone XML document.
pub fn to_document_string(root: &Element) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n");
    root.write_to(&mut out);
    out
}

fn element_from_start(start: &BytesStart) -> XmlResult<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::Parse(e.to_string()))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> XmlResult<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlError::Unbalanced(format!(
            "second root element <{}>",
            element.name
        ))),
    }
}

fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let xml = r#"<?xml version="1.0"?><w:p w:rsidR="00A1"><w:r><w:t xml:space="preserve"> Hi </w:t></w:r></w:p>"#;
        let root = parse(xml).unwrap();

        assert!(root.is("w:p"));
        assert_eq!(root.attr("w:rsidR"), Some("00A1"));
        let t = root.child("w:r").and_then(|r| r.child("w:t")).unwrap();
        assert_eq!(t.text(), " Hi ");
        assert_eq!(t.attr("xml:space"), Some("preserve"));
    }

    #[test]
    fn round_trips_escaped_content() {
        let xml = r#"<a k="x &amp; &quot;y&quot;">1 &lt; 2 &amp; 3<b/><!-- note --></a>"#;
        let root = parse(xml).unwrap();
        assert_eq!(root.attr("k"), Some("x & \"y\""));
        assert_eq!(root.text(), "1 < 2 & 3");

        let mut out = String::new();
        root.write_to(&mut out);
        assert_eq!(out, xml);
    }

    #[test]
    fn unbalanced_document_fails() {
        assert!(matches!(parse("<a><b></a>"), Err(XmlError::Parse(_))));
        assert!(matches!(parse("<a><b>"), Err(XmlError::Unbalanced(_))));
        assert!(matches!(parse(""), Err(XmlError::NoRoot)));
    }

    #[test]
    fn set_attr_replaces_in_place() {
        let mut e = Element::new("w:jc").with_attr("w:val", "left");
        e.set_attr("w:val", "center");
        assert_eq!(e.attributes.len(), 1);
        assert_eq!(e.attr("w:val"), Some("center"));
    }

    #[test]
    fn document_string_has_declaration() {
        let doc = to_document_string(&Element::new("root"));
        assert!(doc.starts_with("<?xml"));
        assert!(doc.ends_with("<root/>"));
    }
}
