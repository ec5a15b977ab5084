//! Borrowed views over model elements.

use std::fmt;
use std::sync::Arc;

use super::{ElementList, Model};
use crate::error::ModelError;
use crate::namespace::ClassDef;
use crate::xml::NodeId;

/// A borrowed view over one model element.
///
/// Navigation methods return further views, so user code rarely needs to
/// handle raw [`NodeId`]s.
#[derive(Clone, Copy)]
pub struct ElementView<'m> {
    node: NodeId,
    model: &'m Model,
}

impl<'m> ElementView<'m> {
    pub fn new(node: NodeId, model: &'m Model) -> Self {
        Self { node, model }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    // ── Identity ────────────────────────────────────────────────────

    /// The element's unique ID.
    pub fn id(&self) -> Option<&'m str> {
        self.model.id_of(self.node)
    }

    /// The `name` attribute.
    pub fn name(&self) -> Option<&'m str> {
        self.attr("name")
    }

    /// Raw XML tag, i.e. the role the element is contained in.
    pub fn tag(&self) -> Option<&'m str> {
        self.model.document().tag(self.node)
    }

    pub fn class(&self) -> Result<Arc<ClassDef>, ModelError> {
        self.model.class_of(self.node)
    }

    pub fn attr(&self, name: &str) -> Option<&'m str> {
        self.model.document().attr(self.node, name)
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Closest ancestor that is a model element.
    pub fn parent(&self) -> Option<ElementView<'m>> {
        let doc = self.model.document();
        let mut current = doc.parent(self.node);
        while let Some(node) = current {
            if self.model.id_of(node).is_some() {
                return Some(ElementView::new(node, self.model));
            }
            current = doc.parent(node);
        }
        None
    }

    /// Model elements directly below this one, in document order.
    pub fn children(&self) -> Vec<ElementView<'m>> {
        self.model
            .document()
            .element_children(self.node)
            .filter(|&c| self.model.id_of(c).is_some())
            .map(|c| ElementView::new(c, self.model))
            .collect()
    }

    /// Live list of the relation `attr`.
    pub fn relation(&self, attr: &str) -> Result<ElementList, ModelError> {
        self.model.relation(self.node, attr)
    }

    /// Current targets of the relation `attr`.
    pub fn related(&self, attr: &str) -> Result<Vec<ElementView<'m>>, ModelError> {
        self.relation(attr)?.elements(self.model)
    }

    /// Scalar value of a `single_attr` relation.
    pub fn scalar(&self, attr: &str) -> Result<Option<String>, ModelError> {
        self.model.scalar(self.node, attr)
    }
}

impl PartialEq for ElementView<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && std::ptr::eq(self.model, other.model)
    }
}

impl Eq for ElementView<'_> {}

impl fmt::Debug for ElementView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementView")
            .field("node", &self.node)
            .field("id", &self.id())
            .field("tag", &self.tag())
            .finish()
    }
}

impl fmt::Display for ElementView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let class = self
            .class()
            .map(|c| c.qualified_name())
            .unwrap_or_else(|_| "<unknown class>".to_owned());
        match (self.name(), self.id()) {
            (Some(name), Some(id)) => write!(f, "<{class} {name:?} ({id})>"),
            (None, Some(id)) => write!(f, "<{class} ({id})>"),
            _ => write!(f, "<{class} at {}>", self.node),
        }
    }
}
