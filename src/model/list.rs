//! Live element lists returned by relation reads.

use std::sync::Arc;

use smol_str::SmolStr;

use super::relation::{Accessor, Relation};
use super::{ElementView, Model, Value};
use crate::error::ModelError;
use crate::xml::NodeId;

/// The targets of one relation of one element.
///
/// The list holds no borrow of the model: every method recomputes from the
/// document it is given, so changes made through other handles are always
/// visible.
#[derive(Clone, Debug)]
pub struct ElementList {
    owner: NodeId,
    relation: Arc<Relation>,
}

impl ElementList {
    pub fn new(owner: NodeId, relation: Arc<Relation>) -> Self {
        Self { owner, relation }
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn relation(&self) -> &Arc<Relation> {
        &self.relation
    }

    // ── Reading ─────────────────────────────────────────────────────

    /// Current target nodes.
    pub fn nodes(&self, model: &Model) -> Result<Vec<NodeId>, ModelError> {
        self.relation.read(model, self.owner)
    }

    /// Current targets as views.
    pub fn elements<'m>(&self, model: &'m Model) -> Result<Vec<ElementView<'m>>, ModelError> {
        Ok(self
            .nodes(model)?
            .into_iter()
            .map(|node| ElementView::new(node, model))
            .collect())
    }

    /// IDs of the current targets.
    pub fn ids(&self, model: &Model) -> Result<Vec<String>, ModelError> {
        Ok(self
            .nodes(model)?
            .into_iter()
            .filter_map(|node| model.id_of(node).map(str::to_owned))
            .collect())
    }

    pub fn len(&self, model: &Model) -> Result<usize, ModelError> {
        Ok(self.nodes(model)?.len())
    }

    pub fn is_empty(&self, model: &Model) -> Result<bool, ModelError> {
        Ok(self.nodes(model)?.is_empty())
    }

    pub fn get<'m>(
        &self,
        model: &'m Model,
        index: usize,
    ) -> Result<Option<ElementView<'m>>, ModelError> {
        Ok(self
            .nodes(model)?
            .get(index)
            .map(|&node| ElementView::new(node, model)))
    }

    pub fn contains(&self, model: &Model, node: NodeId) -> Result<bool, ModelError> {
        Ok(self.nodes(model)?.contains(&node))
    }

    /// Targets whose attribute `attr` equals `value`.
    pub fn by_attr<'m>(
        &self,
        model: &'m Model,
        attr: &str,
        value: &str,
    ) -> Result<Vec<ElementView<'m>>, ModelError> {
        Ok(self
            .elements(model)?
            .into_iter()
            .filter(|e| e.attr(attr) == Some(value))
            .collect())
    }

    // ── Writing ─────────────────────────────────────────────────────

    /// Replace all targets.
    pub fn set(&self, model: &mut Model, values: Vec<Value>) -> Result<(), ModelError> {
        self.relation.write(model, self.owner, values)
    }

    pub fn clear(&self, model: &mut Model) -> Result<(), ModelError> {
        self.relation.clear(model, self.owner)
    }

    /// Append one value.
    pub fn push(&self, model: &mut Model, value: impl Into<Value>) -> Result<(), ModelError> {
        let len = self.len(model)?;
        self.insert(model, len, value)
    }

    /// Insert one value at `index`, clamped to the list length.
    pub fn insert(
        &self,
        model: &mut Model,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<(), ModelError> {
        let mut values: Vec<Value> = self.nodes(model)?.into_iter().map(Value::Element).collect();
        let index = index.min(values.len());
        values.insert(index, value.into());
        self.set(model, values)
    }

    /// Remove `node` from the list. Contained elements are deleted.
    pub fn remove(&self, model: &mut Model, node: NodeId) -> Result<(), ModelError> {
        let current = self.nodes(model)?;
        if !current.contains(&node) {
            return Err(ModelError::UnknownElement(
                model
                    .id_of(node)
                    .map_or_else(|| node.to_string(), str::to_owned),
            ));
        }
        let values = current
            .into_iter()
            .filter(|&n| n != node)
            .map(Value::Element)
            .collect();
        self.set(model, values)
    }

    /// A view keyed by the relation's `mapkey`.
    pub fn mapped(&self) -> Result<MappedView, ModelError> {
        let Some(mapkey) = self.relation.mapkey() else {
            return Err(ModelError::read_only(
                self.relation.name(),
                "relation has no mapkey",
            ));
        };
        Ok(MappedView {
            list: self.clone(),
            mapkey: SmolStr::new(mapkey),
            mapvalue: self.relation.mapvalue().map(SmolStr::new),
        })
    }
}

/// What a [`MappedView`] yields for a key.
#[derive(Clone, Copy, Debug)]
pub enum MappedItem<'m> {
    /// The element itself, when the relation has no `mapvalue`.
    Element(ElementView<'m>),
    /// The `mapvalue` attribute of the element.
    Value(Option<&'m str>),
}

/// Dictionary-like projection of an [`ElementList`].
#[derive(Clone, Debug)]
pub struct MappedView {
    list: ElementList,
    mapkey: SmolStr,
    mapvalue: Option<SmolStr>,
}

impl MappedView {
    pub fn list(&self) -> &ElementList {
        &self.list
    }

    /// Key values in list order. Elements without the key are skipped.
    pub fn keys<'m>(&self, model: &'m Model) -> Result<Vec<&'m str>, ModelError> {
        Ok(self
            .list
            .nodes(model)?
            .into_iter()
            .filter_map(|node| model.document().attr(node, &self.mapkey))
            .collect())
    }

    fn find(&self, model: &Model, key: &str) -> Result<Option<NodeId>, ModelError> {
        Ok(self
            .list
            .nodes(model)?
            .into_iter()
            .find(|&node| model.document().attr(node, &self.mapkey) == Some(key)))
    }

    /// The item for `key`, if any element carries it.
    pub fn get<'m>(
        &self,
        model: &'m Model,
        key: &str,
    ) -> Result<Option<MappedItem<'m>>, ModelError> {
        let Some(node) = self.find(model, key)? else {
            return Ok(None);
        };
        Ok(Some(match &self.mapvalue {
            Some(attr) => MappedItem::Value(model.document().attr(node, attr)),
            None => MappedItem::Element(ElementView::new(node, model)),
        }))
    }

    /// Rewrite the `mapvalue` attribute of the element with `key`.
    pub fn set(&self, model: &mut Model, key: &str, value: &str) -> Result<(), ModelError> {
        let Some(attr) = &self.mapvalue else {
            return Err(ModelError::read_only(
                self.list.relation().name(),
                "mapped assignment needs a mapvalue",
            ));
        };
        let Some(node) = self.find(model, key)? else {
            return Err(ModelError::UnknownElement(key.to_owned()));
        };
        model.document_mut().set_attr(node, attr, value);
        Ok(())
    }
}
