//! In-memory XML and the Capella-flavoured reader/writer around it.

mod parse;
mod serialize;
mod tree;

pub use parse::{parse, parse_into};
pub use serialize::{
    ALWAYS_EXPANDED_TAGS, INDENT, LINE_LENGTH, LINESEP, SerializeOptions, Serializer,
    escape_attribute, escape_comment, escape_text,
};
pub use tree::{Document, NodeId, NodeKind, split_qname};

/// The XML Schema instance namespace, home of `xsi:type`.
pub const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// The XMI namespace.
pub const NS_XMI: &str = "http://www.omg.org/XMI";
