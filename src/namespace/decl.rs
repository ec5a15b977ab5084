//! Declarative metamodel definitions.
//!
//! A [`SchemaDecl`] describes namespaces, their classes and relations as
//! plain data. With the `serde` feature it can be read from YAML or JSON:
//!
//! ```yaml
//! namespaces:
//!   - uri: http://www.polarsys.org/capella/core/la/{VERSION}
//!     alias: org.polarsys.capella.core.data.la
//!     viewpoint: org.polarsys.capella.core.viewpoint
//!     maxver: 7.0.0
//!     version_precision: 2
//!     classes:
//!       - name: LogicalComponent
//!         superclass: org.polarsys.capella.core.data.cs:Component
//!         relations:
//!           ownedLogicalComponents:
//!             kind: containment
//!             role: ownedLogicalComponents
//!             class: org.polarsys.capella.core.data.la:LogicalComponent
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::{ClassDef, ClassRef, Namespace, NamespaceRegistry};
use crate::error::ModelError;
use crate::model::relation::{Association, Backref, Containment, Relation};

fn default_precision() -> usize {
    1
}

/// A whole metamodel.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaDecl {
    #[cfg_attr(feature = "serde", serde(default))]
    pub namespaces: Vec<NamespaceDecl>,
}

/// One namespace and the classes it defines.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NamespaceDecl {
    /// URI, possibly containing `{VERSION}`.
    pub uri: String,
    pub alias: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub viewpoint: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub maxver: Option<String>,
    #[cfg_attr(feature = "serde", serde(default = "default_precision"))]
    pub version_precision: usize,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Vec::is_empty"))]
    pub classes: Vec<ClassDecl>,
}

impl NamespaceDecl {
    pub fn new(uri: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            alias: alias.into(),
            viewpoint: None,
            maxver: None,
            version_precision: default_precision(),
            classes: Vec::new(),
        }
    }
}

/// A class, registered for `minver..=maxver`.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassDecl {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default, rename = "abstract"))]
    pub is_abstract: bool,
    /// Qualified `alias:Name` of the superclass.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub superclass: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub minver: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub maxver: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "IndexMap::is_empty"))]
    pub relations: IndexMap<String, RelationDecl>,
}

/// A relation on a class. Class names are qualified `alias:Name` strings.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum RelationDecl {
    Containment {
        #[cfg_attr(feature = "serde", serde(default))]
        role: Option<String>,
        class: String,
        #[cfg_attr(feature = "serde", serde(default))]
        alternate: Option<String>,
        #[cfg_attr(feature = "serde", serde(default))]
        mapkey: Option<String>,
        #[cfg_attr(feature = "serde", serde(default))]
        mapvalue: Option<String>,
        #[cfg_attr(feature = "serde", serde(default))]
        fixed_length: usize,
        #[cfg_attr(feature = "serde", serde(default))]
        single_attr: Option<String>,
        #[cfg_attr(feature = "serde", serde(default))]
        type_hints: IndexMap<String, String>,
    },
    Association {
        #[cfg_attr(feature = "serde", serde(default))]
        role: Option<String>,
        class: String,
        #[cfg_attr(feature = "serde", serde(default))]
        alternate: Option<String>,
        #[cfg_attr(feature = "serde", serde(default))]
        mapkey: Option<String>,
        #[cfg_attr(feature = "serde", serde(default))]
        mapvalue: Option<String>,
        #[cfg_attr(feature = "serde", serde(default))]
        fixed_length: usize,
    },
    Backref {
        class: String,
        #[cfg_attr(feature = "serde", serde(default))]
        attrs: Vec<String>,
        #[cfg_attr(feature = "serde", serde(default))]
        mapkey: Option<String>,
        #[cfg_attr(feature = "serde", serde(default))]
        mapvalue: Option<String>,
        #[cfg_attr(feature = "serde", serde(default))]
        sort_by: Option<String>,
    },
}

impl RelationDecl {
    /// Build the relation. Class references stay unresolved.
    pub fn to_relation(&self) -> Result<Relation, ModelError> {
        let relation = match self {
            Self::Containment {
                role,
                class,
                alternate,
                mapkey,
                mapvalue,
                fixed_length,
                single_attr,
                type_hints,
            } => {
                let class = ClassRef::parse(class)?;
                let mut r = match role {
                    Some(role) => Containment::new(role.as_str(), class),
                    None => Containment::inherited(class),
                };
                if let Some(alt) = alternate {
                    r = r.alternate(ClassRef::parse(alt)?);
                }
                if let Some(key) = mapkey {
                    r = r.mapkey(key.as_str());
                }
                if let Some(value) = mapvalue {
                    r = r.mapvalue(value.as_str());
                }
                if let Some(attr) = single_attr {
                    r = r.single_attr(attr.as_str());
                }
                for (discriminator, hinted) in type_hints {
                    r = r.type_hint(discriminator.as_str(), ClassRef::parse(hinted)?);
                }
                r.fixed_length(*fixed_length).into()
            }
            Self::Association {
                role,
                class,
                alternate,
                mapkey,
                mapvalue,
                fixed_length,
            } => {
                let class = ClassRef::parse(class)?;
                let mut r = match role {
                    Some(role) => Association::new(role.as_str(), class),
                    None => Association::inherited(class),
                };
                if let Some(alt) = alternate {
                    r = r.alternate(ClassRef::parse(alt)?);
                }
                if let Some(key) = mapkey {
                    r = r.mapkey(key.as_str());
                }
                if let Some(value) = mapvalue {
                    r = r.mapvalue(value.as_str());
                }
                r.fixed_length(*fixed_length).into()
            }
            Self::Backref {
                class,
                attrs,
                mapkey,
                mapvalue,
                sort_by,
            } => {
                let mut r = Backref::new(ClassRef::parse(class)?, attrs.iter().map(String::as_str));
                if let Some(key) = mapkey {
                    r = r.mapkey(key.as_str());
                }
                if let Some(value) = mapvalue {
                    r = r.mapvalue(value.as_str());
                }
                if let Some(attr) = sort_by {
                    r = r.sort_by(attr.as_str());
                }
                r.into()
            }
        };
        Ok(relation)
    }
}

// ============================================================================
// Registry construction
// ============================================================================

impl NamespaceRegistry {
    /// Build a registry from declarations.
    ///
    /// All namespaces are added first. Classes are then defined in
    /// declaration order, deferring those whose superclass is not defined
    /// yet; a superclass that never appears is a definition error.
    pub fn from_schema(schema: &SchemaDecl) -> Result<Self, ModelError> {
        let mut registry = Self::new();
        let mut pending: Vec<(Arc<Namespace>, &ClassDecl)> = Vec::new();
        for decl in &schema.namespaces {
            let ns = registry.add(Namespace::try_from(decl)?)?;
            pending.extend(decl.classes.iter().map(|c| (Arc::clone(&ns), c)));
        }

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for (ns, decl) in pending {
                let superclass = match decl.superclass.as_deref() {
                    Some(qualified) => match registry.resolve_qualified(qualified, None) {
                        Ok(class) => Some(class),
                        Err(ModelError::MissingClass { .. }) => {
                            deferred.push((ns, decl));
                            continue;
                        }
                        Err(e) => return Err(e),
                    },
                    None => None,
                };
                define_class(&ns, decl, superclass)?;
            }
            if deferred.len() == before {
                let names: Vec<String> = deferred
                    .iter()
                    .map(|(ns, decl)| format!("{}:{}", ns.alias(), decl.name))
                    .collect();
                return Err(ModelError::definition(format!(
                    "superclasses not found for {}",
                    names.join(", ")
                )));
            }
            pending = deferred;
        }

        debug!(namespaces = registry.len(), "registry built from schema");
        Ok(registry)
    }

    /// Build a registry from a YAML [`SchemaDecl`].
    #[cfg(feature = "serde")]
    pub fn from_yaml(source: &str) -> Result<Self, ModelError> {
        let schema: SchemaDecl =
            serde_yaml::from_str(source).map_err(|e| ModelError::config(e.to_string()))?;
        Self::from_schema(&schema)
    }

    /// Build a registry from a JSON [`SchemaDecl`].
    #[cfg(feature = "serde")]
    pub fn from_json(source: &str) -> Result<Self, ModelError> {
        let schema: SchemaDecl =
            serde_json::from_str(source).map_err(|e| ModelError::config(e.to_string()))?;
        Self::from_schema(&schema)
    }
}

fn define_class(
    ns: &Namespace,
    decl: &ClassDecl,
    superclass: Option<Arc<ClassDef>>,
) -> Result<(), ModelError> {
    let mut builder = ClassDef::builder(ns, decl.name.as_str()).abstract_class(decl.is_abstract);
    if let Some(superclass) = superclass {
        builder = builder.superclass(superclass);
    }
    for (attr, relation) in &decl.relations {
        builder = builder.relation(attr.as_str(), relation.to_relation()?);
    }
    ns.register(
        builder.build()?,
        decl.minver.as_deref(),
        decl.maxver.as_deref(),
    )
}
