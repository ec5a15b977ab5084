//! Capella-style XML serializer.
//!
//! Generic XML writers produce output that differs wildly from what Capella
//! itself writes, which turns every save into a huge diff. This serializer
//! reproduces Capella's layout: two-space indentation, attributes wrapped
//! onto continuation lines once a line gets too long, and Capella's
//! particular choice of escaped characters.

use std::io::{self, Write};

use tracing::trace;

use super::tree::{Document, NodeId, NodeKind};
use crate::error::ModelError;

/// Line separator used between nodes.
pub const LINESEP: &str = "\n";
/// One level of indentation.
pub const INDENT: &str = "  ";
/// Default line length after which attributes wrap.
pub const LINE_LENGTH: usize = 80;
/// Tags that are never written as self-closing elements.
pub const ALWAYS_EXPANDED_TAGS: &[&str] = &["bodies", "semanticResources"];

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serializer options
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Number of characters after which attributes move to a new line
    pub line_length: usize,
    /// Also write the siblings (comments, processing instructions) of the node
    pub siblings: bool,
    /// Start with an XML declaration
    pub declare_encoding: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            line_length: LINE_LENGTH,
            siblings: false,
            declare_encoding: false,
        }
    }
}

impl SerializeOptions {
    /// Options for writing a whole file: siblings and declaration included.
    pub fn file() -> Self {
        Self {
            siblings: true,
            declare_encoding: true,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy)]
enum EscapeMode {
    Text,
    Attribute,
    Comment,
}

fn is_escaped_control(c: char) -> bool {
    matches!(c, '\x00'..='\x08' | '\x0A'..='\x1F' | '\x7F')
}

fn escape(out: &mut String, input: &str, mode: EscapeMode) {
    for c in input.chars() {
        match (mode, c) {
            (EscapeMode::Text | EscapeMode::Attribute, '"') => out.push_str("&quot;"),
            (EscapeMode::Text | EscapeMode::Attribute, '&') => out.push_str("&amp;"),
            (EscapeMode::Text | EscapeMode::Attribute, '<') => out.push_str("&lt;"),
            (EscapeMode::Attribute, '\t') => out.push_str("&#x9;"),
            (EscapeMode::Comment, '>') => out.push_str("&gt;"),
            (_, c) if is_escaped_control(c) => {
                out.push_str(&format!("&#x{:X};", c as u32));
            }
            (_, c) => out.push(c),
        }
    }
}

/// Escape character data.
pub fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    escape(&mut out, input, EscapeMode::Text);
    out
}

/// Escape an attribute value.
pub fn escape_attribute(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    escape(&mut out, input, EscapeMode::Attribute);
    out
}

/// Escape comment content.
pub fn escape_comment(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    escape(&mut out, input, EscapeMode::Comment);
    out
}

/// Writer that remembers the current column.
struct ColumnWriter<W> {
    inner: W,
    column: usize,
}

impl<W: Write> ColumnWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, column: 0 }
    }

    fn put(&mut self, s: &str) -> io::Result<()> {
        match s.rfind('\n') {
            Some(pos) => self.column = s[pos + 1..].chars().count(),
            None => self.column += s.chars().count(),
        }
        self.inner.write_all(s.as_bytes())
    }

    fn indent(&mut self, level: usize) -> io::Result<()> {
        self.put(LINESEP)?;
        for _ in 0..level {
            self.put(INDENT)?;
        }
        Ok(())
    }
}

/// Deterministic Capella-style XML writer.
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    options: SerializeOptions,
}

impl Serializer {
    pub fn new(options: SerializeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SerializeOptions {
        &self.options
    }

    /// Serialize `node` into a byte vector.
    pub fn to_vec(&self, doc: &Document, node: NodeId) -> Result<Vec<u8>, ModelError> {
        let mut out = Vec::new();
        self.write_to(doc, node, &mut out)?;
        Ok(out)
    }

    /// Serialize `node` into a string.
    pub fn to_string(&self, doc: &Document, node: NodeId) -> Result<String, ModelError> {
        let bytes = self.to_vec(doc, node)?;
        String::from_utf8(bytes).map_err(|e| ModelError::xml(e.to_string()))
    }

    /// Serialize `node` into `sink`.
    ///
    /// A document node is written as its root element with all siblings,
    /// regardless of [`SerializeOptions::siblings`].
    pub fn write_to<W: Write>(
        &self,
        doc: &Document,
        node: NodeId,
        sink: W,
    ) -> Result<(), ModelError> {
        let (node, siblings) = match doc.kind(node) {
            NodeKind::Document => match doc.root_element(node) {
                Some(root) => (root, true),
                None => return Err(ModelError::xml("Document has no root element")),
            },
            _ => (node, self.options.siblings),
        };
        trace!(node = %node, siblings, "serializing");

        let mut w = ColumnWriter::new(sink);
        let mut wrote_anything = false;

        if self.options.declare_encoding {
            w.put(DECLARATION)?;
            wrote_anything = true;
        }

        let (before, after) = if siblings {
            doc.siblings(node)
        } else {
            (&[][..], &[][..])
        };

        for &sibling in before {
            w.put(LINESEP)?;
            self.write_node(&mut w, doc, sibling, 0)?;
            wrote_anything = true;
        }

        if wrote_anything {
            w.put(LINESEP)?;
        }
        self.write_node(&mut w, doc, node, 0)?;

        for &sibling in after {
            w.put(LINESEP)?;
            self.write_node(&mut w, doc, sibling, 0)?;
        }
        w.put(LINESEP)?;
        w.inner.flush()?;
        Ok(())
    }

    fn write_node<W: Write>(
        &self,
        w: &mut ColumnWriter<W>,
        doc: &Document,
        node: NodeId,
        depth: usize,
    ) -> io::Result<()> {
        match doc.kind(node) {
            NodeKind::Element { tag, attributes } => {
                w.put("<")?;
                w.put(tag)?;
                for (i, (key, value)) in attributes.iter().enumerate() {
                    if i > 0 && w.column > self.options.line_length {
                        w.indent(depth + 2)?;
                    } else {
                        w.put(" ")?;
                    }
                    w.put(key)?;
                    w.put("=\"")?;
                    w.put(&escape_attribute(value))?;
                    w.put("\"")?;
                }

                let children = doc.children(node);
                let text = doc.text(node);
                if children.is_empty() && text.is_none() {
                    if ALWAYS_EXPANDED_TAGS.contains(&&**tag) {
                        w.put("></")?;
                        w.put(tag)?;
                        w.put(">")?;
                    } else {
                        w.put("/>")?;
                    }
                    return Ok(());
                }

                w.put(">")?;
                if let Some(text) = text {
                    w.put(&escape_text(text))?;
                }
                for &child in children {
                    w.indent(depth + 1)?;
                    self.write_node(w, doc, child, depth + 1)?;
                    if let Some(tail) = doc.tail(child) {
                        w.put(&escape_text(tail))?;
                    }
                }
                if !children.is_empty() {
                    w.indent(depth)?;
                }
                w.put("</")?;
                w.put(tag)?;
                w.put(">")
            }
            NodeKind::Comment(text) => {
                w.put("<!--")?;
                w.put(&escape_comment(text))?;
                w.put("-->")
            }
            NodeKind::ProcessingInstruction { target, content } => {
                w.put("<?")?;
                w.put(target)?;
                if !content.is_empty() {
                    w.put(" ")?;
                    w.put(content)?;
                }
                w.put("?>")
            }
            NodeKind::Document => {
                for (i, &child) in doc.children(node).iter().enumerate() {
                    if i > 0 {
                        w.put(LINESEP)?;
                    }
                    self.write_node(w, doc, child, depth)?;
                }
                Ok(())
            }
        }
    }
}
