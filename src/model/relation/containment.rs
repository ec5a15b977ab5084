use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::{debug, trace};

use super::{
    Accessor, Binding, Relation, check_deletions, check_length, check_new_ids, check_unique,
    class_for_new, resolve_existing,
};
use crate::error::ModelError;
use crate::model::{Model, Value};
use crate::namespace::{ClassDef, ClassRef};
use crate::xml::NodeId;

/// Elements owned as XML children of the owner, tagged with the role.
#[derive(Clone, Debug)]
pub struct Containment {
    pub(super) role: Option<SmolStr>,
    pub(super) class: ClassRef,
    pub(super) alternate: Option<ClassRef>,
    pub(super) mapkey: Option<SmolStr>,
    pub(super) mapvalue: Option<SmolStr>,
    pub(super) single_attr: Option<SmolStr>,
    pub(super) fixed_length: usize,
    type_hints: IndexMap<SmolStr, ClassRef>,
    pub(super) binding: Binding,
}

impl Containment {
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
            single_attr: None,
            fixed_length: 0,
            type_hints: IndexMap::new(),
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

    pub fn single_attr(mut self, attr: impl Into<SmolStr>) -> Self {
        self.single_attr = Some(attr.into());
        self
    }

    pub fn fixed_length(mut self, len: usize) -> Self {
        self.fixed_length = len;
        self
    }

    /// Interpret children whose raw `xsi:type` is `discriminator` as `class`.
    pub fn type_hint(mut self, discriminator: impl Into<SmolStr>, class: ClassRef) -> Self {
        self.type_hints.insert(discriminator.into(), class);
        self
    }

    /// The class hinted for a raw `xsi:type` value.
    pub fn hinted_class(&self, discriminator: &str) -> Option<&ClassRef> {
        self.type_hints.get(discriminator)
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub(super) fn inherit_from(&mut self, parent: &Containment) {
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
        if self.single_attr.is_none() {
            self.single_attr = parent.single_attr.clone();
        }
    }

    pub(super) fn require_role(&self) -> Result<&str, ModelError> {
        self.role
            .as_deref()
            .ok_or_else(|| ModelError::definition(format!("{} has no role", self.binding.describe())))
    }

    /// Check that one more child can be added, for elements created
    /// elsewhere (association placements).
    pub(crate) fn check_insert(
        &self,
        model: &Model,
        parent: NodeId,
        class: &ClassDef,
        pending: usize,
    ) -> Result<(), ModelError> {
        let target = self.class.resolve(model.registry())?;
        if !class.is_subclass_of(&target) {
            return Err(ModelError::wrong_class(
                target.qualified_name(),
                class.qualified_name(),
            ));
        }
        let current = self.read(model, parent)?.len();
        check_length(&self.binding.describe(), self.fixed_length, current + pending)
    }

    /// Elements moved in from elsewhere must not shrink a fixed-length
    /// containment they leave.
    fn check_moves(
        &self,
        model: &Model,
        owner: NodeId,
        role: &str,
        moved: &[NodeId],
    ) -> Result<(), ModelError> {
        let doc = model.document();
        let mut leaving: FxHashMap<(NodeId, &str), usize> = FxHashMap::default();
        for &node in moved {
            let (Some(parent), Some(tag)) = (doc.parent(node), doc.tag(node)) else {
                continue;
            };
            if parent == owner && tag == role {
                continue;
            }
            *leaving.entry((parent, tag)).or_default() += 1;
        }

        for ((parent, tag), count) in leaving {
            if model.id_of(parent).is_none() {
                continue;
            }
            let Ok(class) = model.class_of(parent) else {
                continue;
            };
            for rel in class.all_relations().values() {
                let Relation::Containment(source) = rel.as_ref() else {
                    continue;
                };
                if source.fixed_length == 0 || source.role() != Some(tag) {
                    continue;
                }
                let current = doc.children_by_tag(parent, tag).count();
                check_length(&rel.name(), source.fixed_length, current.saturating_sub(count))?;
            }
        }
        Ok(())
    }
}

enum Planned {
    Existing(NodeId),
    New(Arc<ClassDef>, IndexMap<String, String>),
}

impl Accessor for Containment {
    fn read(&self, model: &Model, owner: NodeId) -> Result<Vec<NodeId>, ModelError> {
        let role = self.require_role()?;
        model.require_node(owner)?;
        let children: Vec<_> = model.document().children_by_tag(owner, role).collect();
        trace!(relation = %self.binding.describe(), count = children.len(), "containment read");
        Ok(children)
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

        let mut plan = Vec::with_capacity(values.len());
        for value in values {
            let item = match value {
                Value::New(spec) => {
                    let class =
                        class_for_new(model, &name, &spec, self.alternate.as_ref(), &target)?;
                    Planned::New(class, spec.attributes)
                }
                other => {
                    let node = resolve_existing(model, &name, &other, &target)?;
                    if model.document().is_ancestor_or_self(node, owner) {
                        return Err(ModelError::invalid_value(
                            &name,
                            format!("cannot move {node} into its own subtree"),
                        ));
                    }
                    Planned::Existing(node)
                }
            };
            plan.push(item);
        }

        let kept: Vec<NodeId> = plan
            .iter()
            .filter_map(|p| match p {
                Planned::Existing(node) => Some(*node),
                Planned::New(..) => None,
            })
            .collect();
        check_unique(&name, &kept)?;
        check_new_ids(
            &name,
            plan.iter().filter_map(|p| match p {
                Planned::New(_, attributes) => attributes.get("id").map(String::as_str),
                Planned::Existing(_) => None,
            }),
        )?;

        self.check_moves(model, owner, role, &kept)?;
        let kept_set: FxHashSet<NodeId> = kept.iter().copied().collect();
        let removed: Vec<NodeId> = self
            .read(model, owner)?
            .into_iter()
            .filter(|child| !kept_set.contains(child))
            .collect();
        check_deletions(model, &removed, &kept_set)?;

        // Validation done; from here on the document is modified.
        for &node in &kept {
            model.move_element(node, owner, role);
        }
        for child in removed {
            model.delete_subtree(child);
        }

        let mut order = Vec::with_capacity(plan.len());
        for item in plan {
            let node = match item {
                Planned::Existing(node) => node,
                Planned::New(class, attributes) => {
                    model.create_element(owner, role, &class, attributes)?
                }
            };
            order.push(node);
        }
        model.document_mut().reorder_children(owner, role, &order);
        debug!(relation = %name, count = order.len(), "containment written");
        Ok(())
    }

    fn clear(&self, model: &mut Model, owner: NodeId) -> Result<(), ModelError> {
        let name = self.binding.describe();
        check_length(&name, self.fixed_length, 0)?;
        let children = self.read(model, owner)?;
        check_deletions(model, &children, &FxHashSet::default())?;
        for child in children {
            model.delete_subtree(child);
        }
        debug!(relation = %name, "containment cleared");
        Ok(())
    }
}
