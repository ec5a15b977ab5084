//! XML reader building a [`Document`] subtree from bytes.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::tree::{Document, NodeId};
use crate::error::ModelError;

/// Parse `input` into a new document node of `doc`.
///
/// Whitespace-only text is discarded, CDATA sections become plain text and
/// the XML declaration is dropped (the serializer writes its own).
pub fn parse_into(doc: &mut Document, input: &[u8]) -> Result<NodeId, ModelError> {
    let document = doc.create_document();
    let mut reader = Reader::from_reader(input);

    let mut stack: Vec<NodeId> = vec![document];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let node = start_element(doc, e)?;
                attach(doc, &stack, node);
                stack.push(node);
            }
            Ok(Event::Empty(ref e)) => {
                let node = start_element(doc, e)?;
                attach(doc, &stack, node);
            }
            Ok(Event::End(_)) => {
                if stack.len() <= 1 {
                    return Err(ModelError::xml(format!(
                        "Unbalanced end tag at position {}",
                        reader.buffer_position()
                    )));
                }
                stack.pop();
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| ModelError::xml(format!("Text decoding error: {e}")))?;
                add_text(doc, &stack, &text);
            }
            Ok(Event::CData(ref e)) => {
                let text = std::str::from_utf8(e)
                    .map_err(|e| ModelError::xml(format!("CDATA decoding error: {e}")))?;
                add_text(doc, &stack, text);
            }
            Ok(Event::Comment(ref e)) => {
                let text = std::str::from_utf8(e)
                    .map_err(|e| ModelError::xml(format!("Comment decoding error: {e}")))?;
                let node = doc.create_comment(text);
                attach(doc, &stack, node);
            }
            Ok(Event::PI(ref e)) => {
                let raw = std::str::from_utf8(e)
                    .map_err(|e| ModelError::xml(format!("Processing instruction error: {e}")))?;
                let (target, content) = match raw.split_once(char::is_whitespace) {
                    Some((target, content)) => (target, content.trim_start()),
                    None => (raw, ""),
                };
                let node = doc.create_pi(target, content);
                attach(doc, &stack, node);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ModelError::xml(format!(
                    "XML parse error at position {}: {e}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if stack.len() != 1 {
        return Err(ModelError::xml("Unexpected end of input: unclosed elements"));
    }
    if doc.root_element(document).is_none() {
        return Err(ModelError::xml("Document has no root element"));
    }
    Ok(document)
}

/// Parse `input` into a fresh standalone document.
pub fn parse(input: &[u8]) -> Result<(Document, NodeId), ModelError> {
    let mut doc = Document::new();
    let node = parse_into(&mut doc, input)?;
    Ok((doc, node))
}

fn start_element(doc: &mut Document, e: &BytesStart<'_>) -> Result<NodeId, ModelError> {
    let name = e.name();
    let tag = std::str::from_utf8(name.as_ref())
        .map_err(|e| ModelError::xml(format!("Invalid tag name: {e}")))?;
    let node = doc.create_element(tag);

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(|e| ModelError::xml(format!("Attribute error: {e}")))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| ModelError::xml(format!("Attribute key error: {e}")))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ModelError::xml(format!("Attribute value error: {e}")))?;
        doc.set_attr(node, key, value.into_owned());
    }
    Ok(node)
}

fn attach(doc: &mut Document, stack: &[NodeId], node: NodeId) {
    if let Some(&parent) = stack.last() {
        doc.append_child(parent, node);
    }
}

/// Text goes into the parent's `text` before its first child, and into the
/// previous sibling's `tail` afterwards.
fn add_text(doc: &mut Document, stack: &[NodeId], text: &str) {
    if text.chars().all(char::is_whitespace) {
        return;
    }
    let Some(&parent) = stack.last() else {
        return;
    };
    if stack.len() == 1 {
        // Text outside the root element is not well-formed; quick-xml
        // reports most cases, the rest is dropped.
        return;
    }
    match doc.children(parent).last().copied() {
        Some(prev) => {
            let tail = format!("{}{text}", doc.tail(prev).unwrap_or_default());
            doc.set_tail(prev, Some(tail));
        }
        None => {
            let joined = format!("{}{text}", doc.text(parent).unwrap_or_default());
            doc.set_text(parent, Some(joined));
        }
    }
}
