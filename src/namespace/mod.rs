//! Versioned metamodel namespaces.
//!
//! A [`Namespace`] maps class names to [`ClassDef`]s, optionally per version
//! range. Capella encodes the metamodel version in the namespace URI
//! (`http://www.polarsys.org/capella/core/la/6.0.0`), so versioned
//! namespaces use a URI template with a `{VERSION}` placeholder and
//! [`Namespace::match_uri`] extracts the version from a concrete URI.

mod class;
mod decl;
mod registry;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::trace;

use crate::base::Version;
use crate::error::ModelError;

pub use class::{ClassBuilder, ClassDef, ClassRef};
pub use decl::{ClassDecl, NamespaceDecl, RelationDecl, SchemaDecl};
pub use registry::NamespaceRegistry;

/// Placeholder for the version in a namespace URI template.
pub const VERSION_PLACEHOLDER: &str = "{VERSION}";

/// Activated viewpoints of a model, by name.
pub type Viewpoints = IndexMap<SmolStr, Version>;

/// Result of matching a concrete URI against a namespace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UriMatch {
    /// The URI belongs to a different namespace.
    NoMatch,
    /// Exact match of an unversioned namespace.
    Matched,
    /// Versioned namespace, but the URI carries no usable version.
    Unspecified,
    /// Versioned namespace; the version is already trimmed.
    Versioned(Version),
}

impl UriMatch {
    pub fn is_match(&self) -> bool {
        !matches!(self, Self::NoMatch)
    }
}

#[derive(Debug)]
struct ClassEntry {
    class: Arc<ClassDef>,
    minver: Version,
    maxver: Option<Version>,
    seq: usize,
}

/// A metamodel namespace.
pub struct Namespace {
    uri: SmolStr,
    alias: SmolStr,
    viewpoint: Option<SmolStr>,
    maxver: Option<Version>,
    version_precision: usize,
    classes: RwLock<FxHashMap<SmolStr, Vec<ClassEntry>>>,
}

impl Namespace {
    /// An unversioned namespace.
    pub fn new(uri: impl Into<SmolStr>, alias: impl Into<SmolStr>) -> Result<Self, ModelError> {
        Self::create(uri.into(), alias.into(), None, None, 1)
    }

    /// A versioned namespace whose URI contains `{VERSION}`.
    pub fn versioned(
        uri: impl Into<SmolStr>,
        alias: impl Into<SmolStr>,
        maxver: &str,
        version_precision: usize,
    ) -> Result<Self, ModelError> {
        Self::create(
            uri.into(),
            alias.into(),
            None,
            Some(maxver),
            version_precision,
        )
    }

    /// Restrict the namespace to models that activate `viewpoint`.
    pub fn with_viewpoint(mut self, viewpoint: impl Into<SmolStr>) -> Self {
        self.viewpoint = Some(viewpoint.into());
        self
    }

    fn create(
        uri: SmolStr,
        alias: SmolStr,
        viewpoint: Option<SmolStr>,
        maxver: Option<&str>,
        version_precision: usize,
    ) -> Result<Self, ModelError> {
        if version_precision < 1 {
            return Err(ModelError::definition(
                "Version precision must be greater than zero",
            ));
        }
        if alias.is_empty() || alias.contains(':') {
            return Err(ModelError::definition(format!(
                "Invalid namespace alias {alias:?}"
            )));
        }

        let is_versioned = uri.contains(VERSION_PLACEHOLDER);
        let maxver = match (is_versioned, maxver) {
            (true, None) => {
                return Err(ModelError::definition(format!(
                    "Versioned namespace {uri} must declare its supported 'maxver'"
                )));
            }
            (false, Some(_)) => {
                return Err(ModelError::definition(format!(
                    "Unversioned namespace {uri} cannot declare a supported 'maxver'"
                )));
            }
            (true, Some(v)) => Some(Version::parse(v)?.trimmed(version_precision)),
            (false, None) => None,
        };

        Ok(Self {
            uri,
            alias,
            viewpoint,
            maxver,
            version_precision,
            classes: RwLock::new(FxHashMap::default()),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn viewpoint(&self) -> Option<&str> {
        self.viewpoint.as_deref()
    }

    pub fn maxver(&self) -> Option<&Version> {
        self.maxver.as_ref()
    }

    /// Number of significant version components.
    pub fn version_precision(&self) -> usize {
        self.version_precision
    }

    pub fn is_versioned(&self) -> bool {
        self.uri.contains(VERSION_PLACEHOLDER)
    }

    /// Names of all registered classes, sorted.
    pub fn class_names(&self) -> Vec<SmolStr> {
        let mut names: Vec<_> = self.classes.read().keys().cloned().collect();
        names.sort();
        names
    }

    // ========================================================================
    // Versions and URIs
    // ========================================================================

    /// Keep only the significant components of a version string.
    ///
    /// With a precision of 2, `"5.2.1"` becomes `"5.2"`. Shorter versions
    /// are returned unchanged.
    pub fn trim_version(&self, version: &str) -> String {
        version
            .split('.')
            .take(self.version_precision)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Match a concrete URI against this namespace.
    pub fn match_uri(&self, uri: &str) -> UriMatch {
        let Some((prefix, suffix)) = self.uri.split_once(VERSION_PLACEHOLDER) else {
            return if uri == self.uri {
                UriMatch::Matched
            } else {
                UriMatch::NoMatch
            };
        };

        if uri.len() < prefix.len() + suffix.len()
            || !uri.starts_with(prefix)
            || !uri.ends_with(suffix)
        {
            return UriMatch::NoMatch;
        }

        let captured = &uri[prefix.len()..uri.len() - suffix.len()];
        if captured.contains('/') {
            return UriMatch::NoMatch;
        }
        if captured.is_empty() || captured == VERSION_PLACEHOLDER {
            return UriMatch::Unspecified;
        }
        match Version::parse(&self.trim_version(captured)) {
            Ok(v) => UriMatch::Versioned(v),
            Err(_) => UriMatch::Unspecified,
        }
    }

    /// The concrete URI for `version`, or for `maxver` if none is given.
    ///
    /// The version is trimmed to the namespace precision and padded back
    /// with zeros, so `1.2.3` at precision 2 becomes `1.2.0`. Unversioned
    /// namespaces return their URI unchanged.
    pub fn qualified_uri(&self, version: Option<&Version>) -> String {
        if !self.is_versioned() {
            return self.uri.to_string();
        }
        let version = match (version, &self.maxver) {
            (Some(v), _) => v,
            (None, Some(max)) => max,
            (None, None) => return self.uri.to_string(),
        };
        let len = version.parts().len();
        let concrete = version.trimmed(self.version_precision).padded(len);
        self.uri.replace(VERSION_PLACEHOLDER, &concrete.to_string())
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Register `class` for the versions `minver..=maxver`.
    ///
    /// `minver` defaults to `0` and an absent `maxver` leaves the range open.
    pub fn register(
        &self,
        class: Arc<ClassDef>,
        minver: Option<&str>,
        maxver: Option<&str>,
    ) -> Result<(), ModelError> {
        if class.namespace_uri() != self.uri {
            return Err(ModelError::definition(format!(
                "Cannot register class {} in namespace {} because it belongs to {}",
                class.name(),
                self.uri,
                class.namespace_uri()
            )));
        }

        let minver = match minver {
            Some(v) => Version::parse(v)?.trimmed(self.version_precision),
            None => Version::zero(),
        };
        let maxver = maxver
            .map(|v| Version::parse(v).map(|v| v.trimmed(self.version_precision)))
            .transpose()?;

        trace!(
            namespace = %self.alias,
            class = class.name(),
            %minver,
            maxver = ?maxver.as_ref().map(ToString::to_string),
            "registering class"
        );

        let mut classes = self.classes.write();
        let seq = classes.values().map(Vec::len).sum();
        classes
            .entry(SmolStr::new(class.name()))
            .or_default()
            .push(ClassEntry {
                class,
                minver,
                maxver,
                seq,
            });
        Ok(())
    }

    /// Build a class in this namespace and register it for all versions.
    pub fn define(&self, builder: ClassBuilder) -> Result<Arc<ClassDef>, ModelError> {
        let class = builder.build()?;
        self.register(Arc::clone(&class), None, None)?;
        Ok(class)
    }

    /// Look up the class `name` for `version`.
    ///
    /// Without a version, versioned namespaces use their `maxver` and
    /// unversioned ones consider every registration. When several ranges
    /// cover the version, the one with the highest minimum wins, and among
    /// equal minimums the most recent registration.
    pub fn get_class(
        &self,
        name: &str,
        version: Option<&Version>,
    ) -> Result<Arc<ClassDef>, ModelError> {
        let version = match version {
            Some(v) => Some(v.trimmed(self.version_precision)),
            None => self.maxver.clone(),
        };

        let classes = self.classes.read();
        let Some(entries) = classes.get(name) else {
            return Err(ModelError::MissingClass {
                namespace: self.uri.to_string(),
                name: name.to_owned(),
            });
        };

        let best = entries
            .iter()
            .filter(|e| match &version {
                None => true,
                Some(v) => e.minver <= *v && e.maxver.as_ref().is_none_or(|max| v <= max),
            })
            .max_by(|a, b| a.minver.cmp(&b.minver).then(a.seq.cmp(&b.seq)));

        match best {
            Some(entry) => Ok(Arc::clone(&entry.class)),
            None => Err(ModelError::UnsupportedVersion {
                namespace: self.uri.to_string(),
                name: name.to_owned(),
                version: version.map(|v| v.to_string()).unwrap_or_default(),
            }),
        }
    }

    /// Whether a class of this name was ever registered, in any version.
    pub fn contains(&self, name: &str) -> bool {
        self.classes.read().contains_key(name)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("uri", &self.uri)
            .field("alias", &self.alias)
            .field("viewpoint", &self.viewpoint)
            .field("maxver", &self.maxver.as_ref().map(ToString::to_string))
            .field("version_precision", &self.version_precision)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.alias, self.uri)
    }
}

impl TryFrom<&NamespaceDecl> for Namespace {
    type Error = ModelError;

    fn try_from(decl: &NamespaceDecl) -> Result<Self, Self::Error> {
        Self::create(
            SmolStr::new(&decl.uri),
            SmolStr::new(&decl.alias),
            decl.viewpoint.as_deref().map(SmolStr::new),
            decl.maxver.as_deref(),
            decl.version_precision,
        )
    }
}
