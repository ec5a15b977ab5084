//! Collection of namespaces making up a metamodel.

use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::{debug, trace};

use super::{ClassDef, Namespace, UriMatch, Viewpoints};
use crate::base::Version;
use crate::error::ModelError;

/// All namespaces known to a model, by alias.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    namespaces: IndexMap<SmolStr, Arc<Namespace>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace. Aliases and URIs must be unique.
    pub fn add(&mut self, namespace: Namespace) -> Result<Arc<Namespace>, ModelError> {
        if self.namespaces.contains_key(namespace.alias()) {
            return Err(ModelError::definition(format!(
                "Duplicate namespace alias {:?}",
                namespace.alias()
            )));
        }
        if self.namespaces.values().any(|ns| ns.uri() == namespace.uri()) {
            return Err(ModelError::definition(format!(
                "Duplicate namespace URI {}",
                namespace.uri()
            )));
        }
        debug!(alias = namespace.alias(), uri = namespace.uri(), "namespace added");
        let namespace = Arc::new(namespace);
        self.namespaces
            .insert(SmolStr::new(namespace.alias()), Arc::clone(&namespace));
        Ok(namespace)
    }

    pub fn get(&self, alias: &str) -> Option<&Arc<Namespace>> {
        self.namespaces.get(alias)
    }

    /// Like [`get`](Self::get), but an unknown alias is an error.
    pub fn namespace(&self, alias: &str) -> Result<&Arc<Namespace>, ModelError> {
        self.get(alias)
            .ok_or_else(|| ModelError::UnknownNamespace(alias.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Namespace>> {
        self.namespaces.values()
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Find the namespace a concrete URI belongs to.
    ///
    /// Namespaces bound to a viewpoint are only considered when that
    /// viewpoint is activated. A versioned URI without a usable version
    /// takes the version of the activated viewpoint, if any.
    pub fn match_uri(
        &self,
        uri: &str,
        viewpoints: &Viewpoints,
    ) -> Option<(Arc<Namespace>, Option<Version>)> {
        for ns in self.namespaces.values() {
            let activated = match ns.viewpoint() {
                Some(vp) => match viewpoints.get(vp) {
                    Some(v) => Some(v),
                    None => continue,
                },
                None => None,
            };
            let version = match ns.match_uri(uri) {
                UriMatch::NoMatch => continue,
                UriMatch::Matched => None,
                UriMatch::Unspecified => activated.map(|v| v.trimmed(ns.version_precision())),
                UriMatch::Versioned(v) => Some(v),
            };
            trace!(uri, alias = ns.alias(), version = ?version.as_ref().map(ToString::to_string), "uri matched");
            return Some((Arc::clone(ns), version));
        }
        None
    }

    /// Resolve `alias:name` at `version`.
    pub fn resolve(
        &self,
        alias: &str,
        name: &str,
        version: Option<&Version>,
    ) -> Result<Arc<ClassDef>, ModelError> {
        self.namespace(alias)?.get_class(name, version)
    }

    /// Resolve a qualified `alias:Name` string.
    pub fn resolve_qualified(
        &self,
        qualified: &str,
        version: Option<&Version>,
    ) -> Result<Arc<ClassDef>, ModelError> {
        let Some((alias, name)) = qualified.split_once(':') else {
            return Err(ModelError::definition(format!(
                "Expected 'alias:Name', got {qualified:?}"
            )));
        };
        self.resolve(alias, name, version)
    }
}
