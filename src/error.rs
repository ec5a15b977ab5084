//! Error types for registry, relation and model operations.

use thiserror::Error;

/// Coarse classification of a [`ModelError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Something named could not be found.
    Lookup,
    /// No registration covers the requested version, or a version is malformed.
    Version,
    /// The operation is not supported by the relation or class.
    Capability,
    /// A fixed-length relation was given the wrong number of values.
    Cardinality,
    /// A value does not conform to the declared class.
    Conformance,
    /// A schema declaration is inconsistent.
    Definition,
    /// Reading, parsing or writing files failed.
    Io,
}

/// Errors that can occur while working with namespaces and models.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Class name never registered in the namespace.
    #[error("No class {name:?} in namespace {namespace}")]
    MissingClass { namespace: String, name: String },

    /// Namespace alias or URI not known to the registry.
    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    /// No element with this ID in the model.
    #[error("No element with id {0:?}")]
    UnknownElement(String),

    /// Class has no relation with this name.
    #[error("Class {class} has no relation {name:?}")]
    UnknownRelation { class: String, name: String },

    /// Class exists, but no registration covers the version.
    #[error("Class {name:?} in namespace {namespace} is not available in version {version}")]
    UnsupportedVersion {
        namespace: String,
        name: String,
        version: String,
    },

    /// Malformed version string.
    #[error("Invalid version: {0:?}")]
    InvalidVersion(String),

    /// The relation cannot be modified this way.
    #[error("Cannot modify {relation}: {reason}")]
    ReadOnly { relation: String, reason: String },

    /// Attempt to instantiate an abstract class.
    #[error("Cannot instantiate abstract class {0}")]
    AbstractClass(String),

    /// Wrong number of values for a fixed-length relation.
    #[error("{relation} requires exactly {expected} values, got {actual}")]
    Cardinality {
        relation: String,
        expected: usize,
        actual: usize,
    },

    /// Value is not an instance of the expected class.
    #[error("Expected an instance of {expected}, got {actual}")]
    WrongClass { expected: String, actual: String },

    /// Value cannot be assigned to the relation.
    #[error("Invalid value for {relation}: {reason}")]
    InvalidValue { relation: String, reason: String },

    /// Inconsistent namespace or class declaration.
    #[error("Invalid definition: {0}")]
    Definition(String),

    /// XML parsing or structure error.
    #[error("XML error: {0}")]
    Xml(String),

    /// Declaration file could not be deserialized.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Model has inconsistencies that make saving unsafe.
    #[error("Model is corrupt: {0}")]
    Corrupt(String),
}

impl ModelError {
    /// Create an XML error.
    pub fn xml(message: impl Into<String>) -> Self {
        Self::Xml(message.into())
    }

    /// Create a definition error.
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition(message.into())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a read-only error for a relation.
    pub fn read_only(relation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ReadOnly {
            relation: relation.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-value error for a relation.
    pub fn invalid_value(relation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            relation: relation.into(),
            reason: reason.into(),
        }
    }

    /// Create a wrong-class error.
    pub fn wrong_class(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::WrongClass {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingClass { .. }
            | Self::UnknownNamespace(_)
            | Self::UnknownElement(_)
            | Self::UnknownRelation { .. } => ErrorKind::Lookup,
            Self::UnsupportedVersion { .. } | Self::InvalidVersion(_) => ErrorKind::Version,
            Self::ReadOnly { .. } | Self::AbstractClass(_) => ErrorKind::Capability,
            Self::Cardinality { .. } => ErrorKind::Cardinality,
            Self::WrongClass { .. } | Self::InvalidValue { .. } => ErrorKind::Conformance,
            Self::Definition(_) | Self::Config(_) => ErrorKind::Definition,
            Self::Xml(_) | Self::Io(_) | Self::Corrupt(_) => ErrorKind::Io,
        }
    }
}
