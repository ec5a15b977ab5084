//! Values accepted when writing a relation.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::ElementView;
use crate::namespace::ClassRef;
use crate::xml::NodeId;

/// One item of a relation assignment.
#[derive(Clone, Debug)]
pub enum Value {
    /// An existing element, by ID.
    Id(String),
    /// An existing element, by node.
    Element(NodeId),
    /// An element to be created.
    New(NewObject),
}

impl From<&str> for Value {
    fn from(id: &str) -> Self {
        Self::Id(id.to_owned())
    }
}

impl From<String> for Value {
    fn from(id: String) -> Self {
        Self::Id(id)
    }
}

impl From<NodeId> for Value {
    fn from(node: NodeId) -> Self {
        Self::Element(node)
    }
}

impl From<ElementView<'_>> for Value {
    fn from(view: ElementView<'_>) -> Self {
        Self::Element(view.node())
    }
}

impl From<NewObject> for Value {
    fn from(spec: NewObject) -> Self {
        Self::New(spec)
    }
}

/// Where a new element referenced through an association is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    /// The future parent.
    pub parent: NodeId,
    /// Name of the parent's containment relation to insert into.
    pub relation: SmolStr,
}

/// Specification of an element to create.
#[derive(Clone, Debug, Default)]
pub struct NewObject {
    /// Class to instantiate. Falls back to the relation's `alternate`, then
    /// to its declared class.
    pub class: Option<ClassRef>,
    /// Attributes to set, in order. An `id` here replaces the generated one.
    pub attributes: IndexMap<String, String>,
    /// Required when the object is assigned through an association.
    pub placement: Option<Placement>,
}

impl NewObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_class(class: ClassRef) -> Self {
        Self {
            class: Some(class),
            ..Self::default()
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn placed(mut self, parent: NodeId, relation: impl Into<SmolStr>) -> Self {
        self.placement = Some(Placement {
            parent,
            relation: relation.into(),
        });
        self
    }
}
