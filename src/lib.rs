//! # arcadia-model
//!
//! Versioned metamodel namespaces and typed relation accessors over
//! Capella/Arcadia XML models.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! loader    → FileHandler, ModelLoader (entrypoint + fragments)
//!   ↓
//! model     → Model, ID index, ElementView, relations (Containment,
//!   ↓         Association, Backref), ElementList / MappedView
//! namespace → Namespace, ClassDef, ClassRef, NamespaceRegistry, schema decls
//!   ↓
//! xml       → Arena Document, quick-xml reader, Capella-style serializer
//!   ↓
//! base      → Primitives (Version, string interning)
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use arcadia::model::relation::Containment;
//! use arcadia::{ClassDef, ClassRef, Model, Namespace, NamespaceRegistry, NewObject};
//!
//! let mut registry = NamespaceRegistry::new();
//! let ns = registry.add(Namespace::new("http://example.com/demo", "demo")?)?;
//! ns.define(
//!     ClassDef::builder(&ns, "Package")
//!         .relation("packages", Containment::new("ownedPackages", ClassRef::new("demo", "Package"))),
//! )?;
//!
//! let mut model = Model::new(Arc::new(registry));
//! let doc = model.new_resource("demo.capella", &ClassRef::new("demo", "Package"))?;
//! let root = model.document().root_element(doc).unwrap();
//! model.set(root, "packages", vec![NewObject::new().attr("name", "Sub").into()])?;
//! assert_eq!(model.relation(root, "packages")?.len(&model)?, 1);
//! # Ok::<(), arcadia::ModelError>(())
//! ```

// ============================================================================
// MODULES (dependency order: base → xml → namespace → model → loader)
// ============================================================================

/// Foundation types: versions, string interning
pub mod base;

/// Error type shared by all modules
pub mod error;

/// XML tree, reader and serializer
pub mod xml;

/// Namespaces, classes and the registry
pub mod namespace;

/// Models, elements and relations
pub mod model;

/// File handlers and the multi-file loader
pub mod loader;

// Re-export foundation types
pub use base::Version;
pub use error::{ErrorKind, ModelError};

// Re-export the main API
pub use loader::{FileHandler, LoaderOptions, LocalFileHandler, MemoryFileHandler, ModelLoader};
pub use model::relation::{Accessor, Association, Backref, Containment, Relation, RelationKind};
pub use model::{ElementList, ElementView, MappedItem, MappedView, Model, NewObject, Value};
pub use namespace::{
    ClassDef, ClassRef, Namespace, NamespaceDecl, NamespaceRegistry, SchemaDecl, Viewpoints,
};
pub use xml::{SerializeOptions, Serializer};
