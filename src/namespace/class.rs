//! Class definitions and deferred class references.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use smol_str::SmolStr;
use tracing::trace;

use super::{Namespace, NamespaceRegistry};
use crate::base::Version;
use crate::error::ModelError;
use crate::model::relation::Relation;

/// A metamodel class: the type of a model element.
///
/// Classes are identified by their namespace URI and name; versions only
/// decide which definition a namespace hands out for a given model.
#[derive(Debug)]
pub struct ClassDef {
    namespace_uri: SmolStr,
    alias: SmolStr,
    name: SmolStr,
    is_abstract: bool,
    superclass: Option<Arc<ClassDef>>,
    relations: IndexMap<SmolStr, Arc<Relation>>,
}

impl ClassDef {
    /// Start defining a class that belongs to `namespace`.
    pub fn builder(namespace: &Namespace, name: impl Into<SmolStr>) -> ClassBuilder {
        ClassBuilder {
            namespace_uri: SmolStr::new(namespace.uri()),
            alias: SmolStr::new(namespace.alias()),
            name: name.into(),
            is_abstract: false,
            superclass: None,
            relations: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// URI template of the owning namespace.
    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    /// Alias of the owning namespace.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// `alias:Name`, the form used in `xsi:type`.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.alias, self.name)
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn superclass(&self) -> Option<&Arc<ClassDef>> {
        self.superclass.as_ref()
    }

    /// Same namespace and name.
    pub fn same_class(&self, other: &ClassDef) -> bool {
        self.name == other.name && self.namespace_uri == other.namespace_uri
    }

    /// Whether `self` is `other` or inherits from it.
    pub fn is_subclass_of(&self, other: &ClassDef) -> bool {
        let mut current = Some(self);
        while let Some(cls) = current {
            if cls.same_class(other) {
                return true;
            }
            current = cls.superclass.as_deref();
        }
        false
    }

    /// Look up a relation declared on this class or inherited.
    pub fn relation(&self, name: &str) -> Option<&Arc<Relation>> {
        let mut current = Some(self);
        while let Some(cls) = current {
            if let Some(rel) = cls.relations.get(name) {
                return Some(rel);
            }
            current = cls.superclass.as_deref();
        }
        None
    }

    /// Like [`relation`](Self::relation), but a missing relation is an error.
    pub fn require_relation(&self, name: &str) -> Result<&Arc<Relation>, ModelError> {
        self.relation(name)
            .ok_or_else(|| ModelError::UnknownRelation {
                class: self.qualified_name(),
                name: name.to_owned(),
            })
    }

    /// Relations declared directly on this class, in declaration order.
    pub fn own_relations(&self) -> impl Iterator<Item = (&str, &Arc<Relation>)> {
        self.relations.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// All relations including inherited ones. Redeclared relations appear
    /// at the position of the superclass declaration.
    pub fn all_relations(&self) -> IndexMap<SmolStr, Arc<Relation>> {
        let mut out = match &self.superclass {
            Some(sup) => sup.all_relations(),
            None => IndexMap::new(),
        };
        for (name, rel) in &self.relations {
            out.insert(name.clone(), Arc::clone(rel));
        }
        out
    }
}

impl fmt::Display for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.alias, self.name)
    }
}

impl PartialEq for ClassDef {
    fn eq(&self, other: &Self) -> bool {
        self.same_class(other)
    }
}

impl Eq for ClassDef {}

/// Builder for [`ClassDef`].
#[derive(Debug)]
pub struct ClassBuilder {
    namespace_uri: SmolStr,
    alias: SmolStr,
    name: SmolStr,
    is_abstract: bool,
    superclass: Option<Arc<ClassDef>>,
    relations: IndexMap<SmolStr, Relation>,
}

impl ClassBuilder {
    pub fn abstract_class(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    pub fn superclass(mut self, superclass: Arc<ClassDef>) -> Self {
        self.superclass = Some(superclass);
        self
    }

    /// Declare a relation under the attribute `name`.
    pub fn relation(mut self, name: impl Into<SmolStr>, relation: impl Into<Relation>) -> Self {
        self.relations.insert(name.into(), relation.into());
        self
    }

    /// Finish the class. Redeclared relations inherit unset settings from
    /// the superclass relation of the same kind and name.
    pub fn build(self) -> Result<Arc<ClassDef>, ModelError> {
        let owner = format!("{}:{}", self.alias, self.name);
        let mut relations = IndexMap::with_capacity(self.relations.len());
        for (attr, mut relation) in self.relations {
            if let Some(parent) = self.superclass.as_ref().and_then(|s| s.relation(&attr)) {
                relation.inherit_from(parent);
            }
            relation.bind(&owner, &attr)?;
            relations.insert(attr, Arc::new(relation));
        }
        trace!(class = %owner, relations = relations.len(), "class defined");
        Ok(Arc::new(ClassDef {
            namespace_uri: self.namespace_uri,
            alias: self.alias,
            name: self.name,
            is_abstract: self.is_abstract,
            superclass: self.superclass,
            relations,
        }))
    }
}

/// A reference to a class by namespace alias and name, resolved on first
/// use against a [`NamespaceRegistry`].
///
/// Relations name their target classes this way so that classes can refer
/// to each other regardless of definition order.
#[derive(Clone, Debug)]
pub struct ClassRef {
    alias: SmolStr,
    name: SmolStr,
    version: Option<Version>,
    resolved: OnceCell<Arc<ClassDef>>,
}

impl ClassRef {
    /// A deferred reference.
    pub fn new(alias: impl Into<SmolStr>, name: impl Into<SmolStr>) -> Self {
        Self {
            alias: alias.into(),
            name: name.into(),
            version: None,
            resolved: OnceCell::new(),
        }
    }

    /// Parse `alias:Name`.
    pub fn parse(qualified: &str) -> Result<Self, ModelError> {
        match qualified.split_once(':') {
            Some((alias, name)) if !alias.is_empty() && !name.is_empty() => {
                Ok(Self::new(alias, name))
            }
            _ => Err(ModelError::definition(format!(
                "Class reference must be of the form 'alias:Name', got {qualified:?}"
            ))),
        }
    }

    /// Pin the reference to a specific namespace version.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// An already-resolved reference.
    pub fn to_class(class: &Arc<ClassDef>) -> Self {
        Self {
            alias: SmolStr::new(class.alias()),
            name: SmolStr::new(class.name()),
            version: None,
            resolved: OnceCell::with_value(Arc::clone(class)),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Resolve the reference, memoizing the result.
    pub fn resolve(&self, registry: &NamespaceRegistry) -> Result<Arc<ClassDef>, ModelError> {
        self.resolved
            .get_or_try_init(|| {
                trace!(alias = %self.alias, name = %self.name, "resolving class reference");
                registry.resolve(&self.alias, &self.name, self.version.as_ref())
            })
            .cloned()
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.alias, self.name)
    }
}

impl From<&Arc<ClassDef>> for ClassRef {
    fn from(class: &Arc<ClassDef>) -> Self {
        Self::to_class(class)
    }
}
