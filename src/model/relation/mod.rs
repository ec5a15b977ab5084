//! Relations between model elements.
//!
//! A relation is declared once per attribute on a [`ClassDef`] and
//! translates between the XML encoding of a relationship and a list of
//! elements:
//!
//! - [`Containment`] - children of the owner with the role as tag name
//! - [`Association`] - an attribute on the owner holding `#id` links
//! - [`Backref`] - derived, read-only inverse of other relations
//!
//! All three implement [`Accessor`]. Writes validate every value before
//! touching the document, so a failed write leaves the model unchanged.

mod association;
mod backref;
mod containment;

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use super::{Model, NewObject, Value};
use crate::error::ModelError;
use crate::namespace::{ClassDef, ClassRef};
use crate::xml::NodeId;

pub use association::Association;
pub use backref::Backref;
pub use containment::Containment;

/// Read/write access to one relation of one element.
pub trait Accessor {
    /// Current targets, in order.
    fn read(&self, model: &Model, owner: NodeId) -> Result<Vec<NodeId>, ModelError>;

    /// Replace the whole relationship.
    fn write(&self, model: &mut Model, owner: NodeId, values: Vec<Value>)
    -> Result<(), ModelError>;

    /// Remove the whole relationship.
    fn clear(&self, model: &mut Model, owner: NodeId) -> Result<(), ModelError>;
}

/// Which kind of relation this is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Containment,
    Association,
    Backref,
}

/// The class and attribute a relation was declared under.
#[derive(Clone, Debug, Default)]
pub(crate) struct Binding {
    owner: SmolStr,
    attr: SmolStr,
}

impl Binding {
    pub(crate) fn describe(&self) -> String {
        if self.attr.is_empty() {
            "<unbound relation>".to_owned()
        } else {
            format!("{}.{}", self.owner, self.attr)
        }
    }
}

/// A relation declared on a class.
#[derive(Clone, Debug)]
pub enum Relation {
    Containment(Containment),
    Association(Association),
    Backref(Backref),
}

impl Relation {
    pub fn kind(&self) -> RelationKind {
        match self {
            Self::Containment(_) => RelationKind::Containment,
            Self::Association(_) => RelationKind::Association,
            Self::Backref(_) => RelationKind::Backref,
        }
    }

    /// `Class.attribute`, for messages.
    pub fn name(&self) -> String {
        self.binding().describe()
    }

    /// The attribute name the relation is declared under.
    pub fn attr_name(&self) -> &str {
        &self.binding().attr
    }

    fn binding(&self) -> &Binding {
        match self {
            Self::Containment(r) => &r.binding,
            Self::Association(r) => &r.binding,
            Self::Backref(r) => &r.binding,
        }
    }

    /// Child tag or attribute name. Backrefs have none.
    pub fn role(&self) -> Option<&str> {
        match self {
            Self::Containment(r) => r.role.as_deref(),
            Self::Association(r) => r.role.as_deref(),
            Self::Backref(_) => None,
        }
    }

    /// Class of the targets.
    pub fn class(&self) -> &ClassRef {
        match self {
            Self::Containment(r) => &r.class,
            Self::Association(r) => &r.class,
            Self::Backref(r) => &r.class,
        }
    }

    pub fn mapkey(&self) -> Option<&str> {
        match self {
            Self::Containment(r) => r.mapkey.as_deref(),
            Self::Association(r) => r.mapkey.as_deref(),
            Self::Backref(r) => r.mapkey.as_deref(),
        }
    }

    pub fn mapvalue(&self) -> Option<&str> {
        match self {
            Self::Containment(r) => r.mapvalue.as_deref(),
            Self::Association(r) => r.mapvalue.as_deref(),
            Self::Backref(r) => r.mapvalue.as_deref(),
        }
    }

    /// Required number of targets; 0 means unconstrained.
    pub fn fixed_length(&self) -> usize {
        match self {
            Self::Containment(r) => r.fixed_length,
            Self::Association(r) => r.fixed_length,
            Self::Backref(_) => 0,
        }
    }

    pub fn single_attr(&self) -> Option<&str> {
        match self {
            Self::Containment(r) => r.single_attr.as_deref(),
            _ => None,
        }
    }

    /// Fill unset settings from the superclass relation of the same name.
    pub(crate) fn inherit_from(&mut self, parent: &Relation) {
        match (self, parent) {
            (Self::Containment(r), Self::Containment(p)) => r.inherit_from(p),
            (Self::Association(r), Self::Association(p)) => r.inherit_from(p),
            (Self::Backref(r), Self::Backref(p)) => r.inherit_from(p),
            _ => {}
        }
    }

    /// Attach the relation to its class and check it is complete.
    pub(crate) fn bind(&mut self, owner: &str, attr: &str) -> Result<(), ModelError> {
        let binding = Binding {
            owner: SmolStr::new(owner),
            attr: SmolStr::new(attr),
        };
        let complete = match self {
            Self::Containment(r) => {
                r.binding = binding;
                r.role.is_some()
            }
            Self::Association(r) => {
                r.binding = binding;
                r.role.is_some()
            }
            Self::Backref(r) => {
                r.binding = binding;
                !r.attrs.is_empty()
            }
        };
        if complete {
            Ok(())
        } else {
            Err(ModelError::definition(format!(
                "{:?} '{owner}.{attr}' requires a role, but none was given and no superclass declares one",
                self.kind()
            )))
        }
    }

    /// Value of the `single_attr` attribute of the sole target.
    pub fn read_scalar(&self, model: &Model, owner: NodeId) -> Result<Option<String>, ModelError> {
        let Some(attr) = self.single_attr() else {
            return Err(ModelError::read_only(
                self.name(),
                "relation has no single_attr",
            ));
        };
        let targets = self.read(model, owner)?;
        Ok(targets
            .first()
            .and_then(|&node| model.document().attr(node, attr))
            .map(str::to_owned))
    }

    /// Replace the relationship with one new element carrying `value` in
    /// its `single_attr` attribute.
    pub fn write_scalar(
        &self,
        model: &mut Model,
        owner: NodeId,
        value: &str,
    ) -> Result<(), ModelError> {
        let (Self::Containment(_), Some(attr)) = (self, self.single_attr()) else {
            return Err(ModelError::read_only(
                self.name(),
                "scalar assignment needs a containment with single_attr",
            ));
        };
        let spec = NewObject::new().attr(attr, value);
        self.write(model, owner, vec![Value::New(spec)])
    }
}

impl Accessor for Relation {
    fn read(&self, model: &Model, owner: NodeId) -> Result<Vec<NodeId>, ModelError> {
        match self {
            Self::Containment(r) => r.read(model, owner),
            Self::Association(r) => r.read(model, owner),
            Self::Backref(r) => r.read(model, owner),
        }
    }

    fn write(
        &self,
        model: &mut Model,
        owner: NodeId,
        values: Vec<Value>,
    ) -> Result<(), ModelError> {
        match self {
            Self::Containment(r) => r.write(model, owner, values),
            Self::Association(r) => r.write(model, owner, values),
            Self::Backref(r) => r.write(model, owner, values),
        }
    }

    fn clear(&self, model: &mut Model, owner: NodeId) -> Result<(), ModelError> {
        match self {
            Self::Containment(r) => r.clear(model, owner),
            Self::Association(r) => r.clear(model, owner),
            Self::Backref(r) => r.clear(model, owner),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role() {
            Some(role) => write!(
                f,
                "<{:?} '{}' of {} in {role}>",
                self.kind(),
                self.name(),
                self.class()
            ),
            None => write!(f, "<{:?} '{}' to {}>", self.kind(), self.name(), self.class()),
        }
    }
}

impl From<Containment> for Relation {
    fn from(r: Containment) -> Self {
        Self::Containment(r)
    }
}

impl From<Association> for Relation {
    fn from(r: Association) -> Self {
        Self::Association(r)
    }
}

impl From<Backref> for Relation {
    fn from(r: Backref) -> Self {
        Self::Backref(r)
    }
}

// ============================================================================
// Shared validation
// ============================================================================

fn check_length(relation: &str, fixed_length: usize, actual: usize) -> Result<(), ModelError> {
    if fixed_length != 0 && actual != fixed_length {
        return Err(ModelError::Cardinality {
            relation: relation.to_owned(),
            expected: fixed_length,
            actual,
        });
    }
    Ok(())
}

/// Resolve an existing element and check it conforms to `target`.
fn resolve_existing(
    model: &Model,
    relation: &str,
    value: &Value,
    target: &ClassDef,
) -> Result<NodeId, ModelError> {
    let node = match value {
        Value::Id(id) => model.require(id)?,
        Value::Element(node) => model.require_node(*node)?,
        Value::New(_) => {
            return Err(ModelError::invalid_value(
                relation,
                "expected an existing element",
            ));
        }
    };
    model.check_conforms(node, target)?;
    Ok(node)
}

/// Decide the class of a new element and check it can be created.
fn class_for_new(
    model: &Model,
    relation: &str,
    spec: &NewObject,
    alternate: Option<&ClassRef>,
    target: &Arc<ClassDef>,
) -> Result<Arc<ClassDef>, ModelError> {
    let class = match (&spec.class, alternate) {
        (Some(class), _) => class.resolve(model.registry())?,
        (None, Some(alternate)) => alternate.resolve(model.registry())?,
        (None, None) => Arc::clone(target),
    };
    if !class.is_subclass_of(target) {
        return Err(ModelError::wrong_class(
            target.qualified_name(),
            class.qualified_name(),
        ));
    }
    if class.is_abstract() {
        return Err(ModelError::AbstractClass(class.qualified_name()));
    }
    model.registry().namespace(class.alias())?;
    if let Some(id) = spec.attributes.get("id") {
        if model.node_by_id(id).is_some() {
            return Err(ModelError::invalid_value(
                relation,
                format!("id {id:?} is already in use"),
            ));
        }
    }
    Ok(class)
}

/// Reject values that name the same element twice.
fn check_unique(relation: &str, nodes: &[NodeId]) -> Result<(), ModelError> {
    let mut seen = FxHashSet::default();
    for node in nodes {
        if !seen.insert(*node) {
            return Err(ModelError::invalid_value(
                relation,
                format!("element {node} is listed more than once"),
            ));
        }
    }
    Ok(())
}

/// Deleting the subtrees at `roots` must not take targets away from a
/// fixed-length association that survives the deletion. Subtrees rooted at
/// `kept` nodes are moved, not deleted.
fn check_deletions(
    model: &Model,
    roots: &[NodeId],
    kept: &FxHashSet<NodeId>,
) -> Result<(), ModelError> {
    if roots.is_empty() {
        return Ok(());
    }
    let doc = model.document();
    let mut removed = FxHashSet::default();
    let mut stack: Vec<NodeId> = roots.to_vec();
    while let Some(node) = stack.pop() {
        if kept.contains(&node) {
            continue;
        }
        removed.insert(node);
        stack.extend(doc.children(node).iter().copied());
    }

    for holder in model.element_nodes() {
        if removed.contains(&holder) {
            continue;
        }
        let Ok(class) = model.class_of(holder) else {
            continue;
        };
        for rel in class.all_relations().values() {
            let Relation::Association(association) = rel.as_ref() else {
                continue;
            };
            if association.fixed_length == 0 {
                continue;
            }
            let targets = association.read(model, holder)?;
            let lost = targets.iter().filter(|t| removed.contains(*t)).count();
            if lost > 0 {
                return Err(ModelError::Cardinality {
                    relation: rel.name(),
                    expected: association.fixed_length,
                    actual: targets.len() - lost,
                });
            }
        }
    }
    Ok(())
}

/// Explicit IDs of new objects must be distinct from each other.
fn check_new_ids<'a>(
    relation: &str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), ModelError> {
    let mut seen = FxHashSet::default();
    for id in ids {
        if !seen.insert(id) {
            return Err(ModelError::invalid_value(
                relation,
                format!("id {id:?} is used twice"),
            ));
        }
    }
    Ok(())
}
