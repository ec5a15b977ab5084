//! Arena-backed XML document.
//!
//! All nodes of all resources of a model live in one [`Document`] and are
//! addressed by [`NodeId`]. Detaching a node only unlinks it from its parent;
//! the slot stays in the arena and is simply no longer reachable.

use std::fmt;

use indexmap::IndexMap;

use crate::base::{IStr, Interner};

/// Handle to a node inside a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Container for the top-level nodes of one file.
    Document,
    /// An element with its raw, possibly prefixed, tag name.
    Element {
        tag: IStr,
        /// Attributes in document order, keyed by raw qualified name.
        attributes: IndexMap<IStr, String>,
    },
    /// `<!--...-->`
    Comment(String),
    /// `<?target content?>`
    ProcessingInstruction { target: String, content: String },
}

#[derive(Clone, Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    text: Option<String>,
    tail: Option<String>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            text: None,
            tail: None,
        }
    }
}

/// An XML node arena.
#[derive(Clone, Debug, Default)]
pub struct Document {
    nodes: Vec<NodeData>,
    names: Interner,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.index()]
    }

    fn data_mut(&mut self, node: NodeId) -> &mut NodeData {
        &mut self.nodes[node.index()]
    }

    /// Intern a tag or attribute name.
    pub fn intern(&mut self, name: &str) -> IStr {
        self.names.intern(name)
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Create a new, empty document node.
    pub fn create_document(&mut self) -> NodeId {
        self.push(NodeData::new(NodeKind::Document))
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let tag = self.intern(tag);
        self.push(NodeData::new(NodeKind::Element {
            tag,
            attributes: IndexMap::new(),
        }))
    }

    /// Create a detached comment.
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::new(NodeKind::Comment(text.into())))
    }

    /// Create a detached processing instruction.
    pub fn create_pi(&mut self, target: impl Into<String>, content: impl Into<String>) -> NodeId {
        self.push(NodeData::new(NodeKind::ProcessingInstruction {
            target: target.into(),
            content: content.into(),
        }))
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Whether `node` is a handle into this arena.
    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    pub fn kind(&self, node: NodeId) -> &NodeKind {
        &self.data(node).kind
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.data(node).kind, NodeKind::Element { .. })
    }

    /// Raw tag name of an element.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.data(node).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Change the tag of an element. Ignored for other nodes.
    pub fn set_tag(&mut self, node: NodeId, new_tag: &str) {
        let new_tag = self.intern(new_tag);
        if let NodeKind::Element { tag, .. } = &mut self.data_mut(node).kind {
            *tag = new_tag;
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.data(node).children
    }

    /// Child elements, skipping comments and processing instructions.
    pub fn element_children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(node)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
    }

    /// Child elements with the given tag.
    pub fn children_by_tag<'a>(
        &'a self,
        node: NodeId,
        tag: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.element_children(node)
            .filter(move |&c| self.tag(c) == Some(tag))
    }

    /// First element child of a document node.
    pub fn root_element(&self, document: NodeId) -> Option<NodeId> {
        self.element_children(document).next()
    }

    /// The document node containing `node`, if it is attached to one.
    pub fn document_of(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            if matches!(self.data(current).kind, NodeKind::Document) {
                return Some(current);
            }
            current = self.parent(current)?;
        }
    }

    /// Siblings before and after `node`, in document order.
    pub fn siblings(&self, node: NodeId) -> (&[NodeId], &[NodeId]) {
        let Some(parent) = self.parent(node) else {
            return (&[], &[]);
        };
        let children = self.children(parent);
        match children.iter().position(|&c| c == node) {
            Some(pos) => (&children[..pos], &children[pos + 1..]),
            None => (&[], &[]),
        }
    }

    /// All descendants of `node` in document order, excluding `node` itself.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Unlink `node` from its parent.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.data_mut(node).parent.take() {
            self.data_mut(parent).children.retain(|&c| c != node);
        }
    }

    /// Append `child` as the last child of `parent`, moving it if attached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.data_mut(child).parent = Some(parent);
        self.data_mut(parent).children.push(child);
    }

    /// Insert `child` at `index` among the children of `parent`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self.data_mut(child).parent = Some(parent);
        let children = &mut self.data_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Reorder the children of `parent` with the given tag so they follow
    /// `order`. Children with other tags keep their positions.
    pub fn reorder_children(&mut self, parent: NodeId, tag: &str, order: &[NodeId]) {
        let slots: Vec<usize> = self
            .children(parent)
            .iter()
            .enumerate()
            .filter(|&(_, &c)| self.tag(c) == Some(tag))
            .map(|(i, _)| i)
            .collect();
        let children = &mut self.data_mut(parent).children;
        for (slot, &node) in slots.into_iter().zip(order) {
            children[slot] = node;
        }
    }

    // ========================================================================
    // Attributes and text
    // ========================================================================

    /// Attributes of an element in document order.
    pub fn attributes(&self, node: NodeId) -> impl Iterator<Item = (&str, &str)> {
        let attrs = match &self.data(node).kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            _ => None,
        };
        attrs
            .into_iter()
            .flat_map(|a| a.iter().map(|(k, v)| (&**k, v.as_str())))
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.data(node).kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// Set an attribute. New attributes are appended; existing ones keep
    /// their position. Ignored for non-element nodes.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        let key = self.intern(name);
        if let NodeKind::Element { attributes, .. } = &mut self.data_mut(node).kind {
            attributes.insert(key, value.into());
        }
    }

    /// Remove an attribute, preserving the order of the remaining ones.
    pub fn remove_attr(&mut self, node: NodeId, name: &str) -> Option<String> {
        match &mut self.data_mut(node).kind {
            NodeKind::Element { attributes, .. } => attributes.shift_remove(name),
            _ => None,
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.data(node).text.as_deref()
    }

    pub fn set_text(&mut self, node: NodeId, text: Option<String>) {
        self.data_mut(node).text = text;
    }

    /// Text following the node's end tag, before the next sibling.
    pub fn tail(&self, node: NodeId) -> Option<&str> {
        self.data(node).tail.as_deref()
    }

    pub fn set_tail(&mut self, node: NodeId, tail: Option<String>) {
        self.data_mut(node).tail = tail;
    }

    // ========================================================================
    // Namespaces
    // ========================================================================

    /// Resolve a namespace prefix through the `xmlns:*` declarations on
    /// `node` and its ancestors. An empty prefix looks up the default
    /// namespace.
    pub fn lookup_namespace(&self, node: NodeId, prefix: &str) -> Option<&str> {
        let key = if prefix.is_empty() {
            "xmlns".to_owned()
        } else {
            format!("xmlns:{prefix}")
        };
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(uri) = self.attr(n, &key) {
                return Some(uri);
            }
            current = self.parent(n);
        }
        None
    }
}

/// Split a raw qualified name into prefix and local name.
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}
