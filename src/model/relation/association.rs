use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::debug;

use super::{
    Accessor, Binding, Relation, check_length, check_new_ids, check_unique, class_for_new,
    resolve_existing,
};
use crate::error::ModelError;
use crate::loader::relative_path;
use crate::model::{Model, Value};
use crate::namespace::{ClassDef, ClassRef};
use crate::xml::NodeId;

/// References stored as a space-separated list of `#id` links in an
/// attribute of the owner.
#[derive(Clone, Debug)]
pub struct Association {
    pub(super) role: Option<SmolStr>,
    pub(super) class: ClassRef,
    pub(super) alternate: Option<ClassRef>,
    pub(super) mapkey: Option<SmolStr>,
    pub(super) mapvalue: Option<SmolStr>,
    pub(super) fixed_length: usize,
    pub(super) binding: Binding,
}

impl Association {
    pub fn new(role: impl Into<SmolStr>, class: ClassRef) -> Self {
        Self {
            role: Some(role.into()),
            ..Self::inherited(class)
        }
    }

    /// A redeclaration that takes its role from the superclass.
    pub fn inherited(class: ClassRef) -> Self {
        Self {
            role: None,
            class,
            alternate: None,
            mapkey: None,
            mapvalue: None,
            fixed_length: 0,
            binding: Binding::default(),
        }
    }

    /// Class to instantiate when a new object names none.
    pub fn alternate(mut self, class: ClassRef) -> Self {
        self.alternate = Some(class);
        self
    }

    pub fn mapkey(mut self, key: impl Into<SmolStr>) -> Self {
        self.mapkey = Some(key.into());
        self
    }

    pub fn mapvalue(mut self, value: impl Into<SmolStr>) -> Self {
        self.mapvalue = Some(value.into());
        self
    }

    pub fn fixed_length(mut self, len: usize) -> Self {
        self.fixed_length = len;
        self
    }

    pub(super) fn inherit_from(&mut self, parent: &Association) {
        if self.role.is_some() {
            return;
        }
        self.role = parent.role.clone();
        if self.fixed_length == 0 {
            self.fixed_length = parent.fixed_length;
        }
        if self.mapkey.is_none() {
            self.mapkey = parent.mapkey.clone();
            if self.mapvalue.is_none() {
                self.mapvalue = parent.mapvalue.clone();
            }
        }
    }

    fn require_role(&self) -> Result<&str, ModelError> {
        self.role
            .as_deref()
            .ok_or_else(|| ModelError::definition(format!("{} has no role", self.binding.describe())))
    }

    /// Target IDs of `owner`'s links that name no element in the model.
    pub(crate) fn dangling(&self, model: &Model, owner: NodeId) -> Vec<String> {
        let Some(raw) = self.role().and_then(|role| model.document().attr(owner, role)) else {
            return Vec::new();
        };
        raw.split_whitespace()
            .map(link_target)
            .filter(|id| model.node_by_id(id).is_none())
            .map(str::to_owned)
            .collect()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Link token for `target`: `#id` within one resource, otherwise the
    /// path of the target's resource relative to the owner's.
    fn link_token(model: &Model, owner: NodeId, target: NodeId, id: &str) -> String {
        match (model.resource_of(owner), model.resource_of(target)) {
            (Some(from), Some(to)) if from != to => format!("{}#{id}", relative_path(from, to)),
            _ => format!("#{id}"),
        }
    }
}

/// The ID part of a link token: `#abc` and `other.capellafragment#abc`
/// both name `abc`.
pub(crate) fn link_target(token: &str) -> &str {
    token.rsplit_once('#').map_or(token, |(_, id)| id)
}

enum Planned {
    Existing(NodeId),
    New {
        parent: NodeId,
        role: SmolStr,
        class: Arc<ClassDef>,
        attributes: IndexMap<String, String>,
    },
}

impl Accessor for Association {
    fn read(&self, model: &Model, owner: NodeId) -> Result<Vec<NodeId>, ModelError> {
        let role = self.require_role()?;
        model.require_node(owner)?;
        let Some(raw) = model.document().attr(owner, role) else {
            return Ok(Vec::new());
        };
        let mut targets = Vec::new();
        for token in raw.split_whitespace() {
            let id = link_target(token);
            match model.node_by_id(id) {
                Some(node) => targets.push(node),
                None => debug!(relation = %self.binding.describe(), id, "dangling reference skipped"),
            }
        }
        Ok(targets)
    }

    fn write(
        &self,
        model: &mut Model,
        owner: NodeId,
        values: Vec<Value>,
    ) -> Result<(), ModelError> {
        let name = self.binding.describe();
        let role = self.require_role()?;
        model.require_node(owner)?;
        check_length(&name, self.fixed_length, values.len())?;
        let target = self.class.resolve(model.registry())?;

        let mut pending: FxHashMap<(NodeId, SmolStr), usize> = FxHashMap::default();
        let mut plan = Vec::with_capacity(values.len());
        for value in values {
            let item = match value {
                Value::New(spec) => {
                    let Some(placement) = spec.placement.clone() else {
                        return Err(ModelError::invalid_value(
                            &name,
                            "new objects need a placement to be referenced",
                        ));
                    };
                    let class =
                        class_for_new(model, &name, &spec, self.alternate.as_ref(), &target)?;
                    let parent = model.require_node(placement.parent)?;
                    let parent_class = model.class_of(parent)?;
                    let relation = parent_class.require_relation(&placement.relation)?;
                    let Relation::Containment(containment) = relation.as_ref() else {
                        return Err(ModelError::invalid_value(
                            &name,
                            format!("{} is not a containment", relation.name()),
                        ));
                    };
                    let count = pending
                        .entry((parent, placement.relation.clone()))
                        .or_default();
                    *count += 1;
                    containment.check_insert(model, parent, &class, *count)?;
                    Planned::New {
                        parent,
                        role: SmolStr::new(containment.require_role()?),
                        class,
                        attributes: spec.attributes,
                    }
                }
                other => Planned::Existing(resolve_existing(model, &name, &other, &target)?),
            };
            plan.push(item);
        }

        let existing: Vec<NodeId> = plan
            .iter()
            .filter_map(|p| match p {
                Planned::Existing(node) => Some(*node),
                Planned::New { .. } => None,
            })
            .collect();
        check_unique(&name, &existing)?;
        check_new_ids(
            &name,
            plan.iter().filter_map(|p| match p {
                Planned::New { attributes, .. } => attributes.get("id").map(String::as_str),
                Planned::Existing(_) => None,
            }),
        )?;

        // Keep the original form of links that stay, e.g. fragment-qualified ones.
        let previous: FxHashMap<String, String> = model
            .document()
            .attr(owner, role)
            .map(|raw| {
                raw.split_whitespace()
                    .map(|t| (link_target(t).to_owned(), t.to_owned()))
                    .collect()
            })
            .unwrap_or_default();

        // Validation done; from here on the document is modified.
        let mut tokens = Vec::with_capacity(plan.len());
        for item in plan {
            let node = match item {
                Planned::Existing(node) => node,
                Planned::New {
                    parent,
                    role: child_role,
                    class,
                    attributes,
                } => model.create_element(parent, &child_role, &class, attributes)?,
            };
            let id = model
                .id_of(node)
                .map(str::to_owned)
                .ok_or_else(|| ModelError::UnknownElement(node.to_string()))?;
            let token = match previous.get(&id) {
                Some(token) => token.clone(),
                None => Self::link_token(model, owner, node, &id),
            };
            tokens.push(token);
        }

        if tokens.is_empty() {
            model.document_mut().remove_attr(owner, role);
        } else {
            model.document_mut().set_attr(owner, role, tokens.join(" "));
        }
        debug!(relation = %name, count = tokens.len(), "association written");
        Ok(())
    }

    fn clear(&self, model: &mut Model, owner: NodeId) -> Result<(), ModelError> {
        let name = self.binding.describe();
        let role = self.require_role()?;
        model.require_node(owner)?;
        check_length(&name, self.fixed_length, 0)?;
        model.document_mut().remove_attr(owner, role);
        debug!(relation = %name, "association cleared");
        Ok(())
    }
}
