use smol_str::SmolStr;
use tracing::trace;

use super::{Accessor, Binding, Relation};
use crate::error::ModelError;
use crate::model::{Model, Value};
use crate::namespace::ClassRef;
use crate::xml::NodeId;

/// Elements of a class that point at the owner through any of `attrs`.
///
/// Computed by scanning the model on every read; there is no reverse index
/// to keep up to date.
#[derive(Clone, Debug)]
pub struct Backref {
    pub(super) class: ClassRef,
    pub(super) attrs: Vec<SmolStr>,
    pub(super) mapkey: Option<SmolStr>,
    pub(super) mapvalue: Option<SmolStr>,
    sort_by: Option<SmolStr>,
    pub(super) binding: Binding,
}

impl Backref {
    pub fn new<I, S>(class: ClassRef, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            class,
            attrs: attrs.into_iter().map(Into::into).collect(),
            mapkey: None,
            mapvalue: None,
            sort_by: None,
            binding: Binding::default(),
        }
    }

    pub fn mapkey(mut self, key: impl Into<SmolStr>) -> Self {
        self.mapkey = Some(key.into());
        self
    }

    pub fn mapvalue(mut self, value: impl Into<SmolStr>) -> Self {
        self.mapvalue = Some(value.into());
        self
    }

    /// Order results by this attribute instead of document order.
    pub fn sort_by(mut self, attr: impl Into<SmolStr>) -> Self {
        self.sort_by = Some(attr.into());
        self
    }

    pub fn attrs(&self) -> impl Iterator<Item = &str> {
        self.attrs.iter().map(SmolStr::as_str)
    }

    pub(super) fn inherit_from(&mut self, parent: &Backref) {
        if !self.attrs.is_empty() {
            return;
        }
        self.attrs = parent.attrs.clone();
        if self.mapkey.is_none() {
            self.mapkey = parent.mapkey.clone();
            if self.mapvalue.is_none() {
                self.mapvalue = parent.mapvalue.clone();
            }
        }
    }

    fn refuse(&self, action: &str) -> ModelError {
        let attrs: Vec<&str> = self.attrs().collect();
        ModelError::read_only(
            self.binding.describe(),
            format!(
                "cannot {action} a back-reference, modify {attrs:?} of {} instead",
                self.class
            ),
        )
    }
}

impl Accessor for Backref {
    fn read(&self, model: &Model, owner: NodeId) -> Result<Vec<NodeId>, ModelError> {
        model.require_node(owner)?;
        let target = self.class.resolve(model.registry())?;
        let mut found = Vec::new();

        for candidate in model.element_nodes() {
            let Ok(class) = model.class_of(candidate) else {
                continue;
            };
            if !class.is_subclass_of(&target) {
                continue;
            }
            for attr in &self.attrs {
                let Some(relation) = class.relation(attr) else {
                    continue;
                };
                if matches!(relation.as_ref(), Relation::Backref(_)) {
                    continue;
                }
                if relation.read(model, candidate)?.contains(&owner) {
                    found.push(candidate);
                    break;
                }
            }
        }

        if let Some(key) = &self.sort_by {
            let doc = model.document();
            found.sort_by(|&a, &b| doc.attr(a, key).cmp(&doc.attr(b, key)));
        }
        trace!(relation = %self.binding.describe(), count = found.len(), "backref read");
        Ok(found)
    }

    fn write(
        &self,
        _model: &mut Model,
        _owner: NodeId,
        _values: Vec<Value>,
    ) -> Result<(), ModelError> {
        Err(self.refuse("set"))
    }

    fn clear(&self, _model: &mut Model, _owner: NodeId) -> Result<(), ModelError> {
        Err(self.refuse("delete"))
    }
}
