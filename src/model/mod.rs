//! Loaded models: the XML tree, the ID index and relation access.
//!
//! A [`Model`] owns one [`Document`] arena holding every resource (the
//! main file plus fragments), an index from element ID to node, and the
//! [`NamespaceRegistry`] used to give each element a class. Relations are
//! reached through [`Model::relation`] or [`ElementView::relation`].

mod element;
mod list;
pub mod relation;
mod value;

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::base::Version;
use crate::error::ModelError;
use crate::loader::FileHandler;
use crate::namespace::{ClassDef, ClassRef, NamespaceRegistry, Viewpoints};
use crate::xml::{
    Document, NS_XMI, NS_XSI, NodeId, SerializeOptions, Serializer, parse_into, split_qname,
};

pub use element::ElementView;
pub use list::{ElementList, MappedItem, MappedView};
pub use value::{NewObject, Placement, Value};

use relation::Accessor;

/// Attribute holding the class discriminator of an element.
pub const XSI_TYPE: &str = "xsi:type";

/// An in-memory model made of one or more resources.
#[derive(Debug)]
pub struct Model {
    doc: Document,
    resources: IndexMap<String, NodeId>,
    id_index: FxHashMap<String, NodeId>,
    registry: Arc<NamespaceRegistry>,
    viewpoints: Viewpoints,
    corrupt: bool,
}

impl Model {
    pub fn new(registry: Arc<NamespaceRegistry>) -> Self {
        Self {
            doc: Document::new(),
            resources: IndexMap::new(),
            id_index: FxHashMap::default(),
            registry,
            viewpoints: Viewpoints::new(),
            corrupt: false,
        }
    }

    pub fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// Parse `bytes` as a new resource called `name` and index its elements.
    ///
    /// Duplicate IDs are reported and mark the model as corrupt; the
    /// element read last wins.
    pub fn add_resource(&mut self, name: &str, bytes: &[u8]) -> Result<NodeId, ModelError> {
        if self.resources.contains_key(name) {
            return Err(ModelError::config(format!(
                "resource {name:?} is already loaded"
            )));
        }
        let document = parse_into(&mut self.doc, bytes)?;
        let root = self
            .doc
            .root_element(document)
            .ok_or_else(|| ModelError::xml(format!("{name}: no root element")))?;

        let mut indexed = 0usize;
        for node in std::iter::once(root).chain(self.doc.descendants(root)) {
            let Some(id) = self.id_of(node).map(str::to_owned) else {
                continue;
            };
            if self.id_index.insert(id.clone(), node).is_some() {
                warn!(resource = name, id = %id, "duplicate ID");
                self.corrupt = true;
            }
            indexed += 1;
        }
        self.resources.insert(name.to_owned(), document);
        debug!(resource = name, elements = indexed, "resource added");
        Ok(document)
    }

    /// Create an empty resource whose root element is an instance of
    /// `root_class`.
    pub fn new_resource(&mut self, name: &str, root_class: &ClassRef) -> Result<NodeId, ModelError> {
        if self.resources.contains_key(name) {
            return Err(ModelError::config(format!(
                "resource {name:?} is already loaded"
            )));
        }
        let class = root_class.resolve(&self.registry)?;
        if class.is_abstract() {
            return Err(ModelError::AbstractClass(class.qualified_name()));
        }
        let uri = self.namespace_uri_for(&class)?;

        let document = self.doc.create_document();
        let root = self.doc.create_element(&class.qualified_name());
        self.doc.set_attr(root, "xmi:version", "2.0");
        self.doc.set_attr(root, "xmlns:xmi", NS_XMI);
        self.doc.set_attr(root, "xmlns:xsi", NS_XSI);
        self.doc.set_attr(root, &format!("xmlns:{}", class.alias()), uri);
        let id = Uuid::new_v4().to_string();
        self.doc.set_attr(root, "id", id.clone());
        self.doc.append_child(document, root);

        self.id_index.insert(id, root);
        self.resources.insert(name.to_owned(), document);
        debug!(resource = name, class = %class, "resource created");
        Ok(document)
    }

    /// Resource names and their document nodes, in load order.
    pub fn resources(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.resources.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Root element of the resource `name`.
    pub fn root(&self, name: &str) -> Result<NodeId, ModelError> {
        let document = self
            .resources
            .get(name)
            .ok_or_else(|| ModelError::config(format!("no resource named {name:?}")))?;
        self.doc
            .root_element(*document)
            .ok_or_else(|| ModelError::xml(format!("{name}: no root element")))
    }

    // ========================================================================
    // Viewpoints
    // ========================================================================

    pub fn viewpoints(&self) -> &Viewpoints {
        &self.viewpoints
    }

    /// Activate `name` at `version`, making viewpoint-bound namespaces
    /// visible to class resolution.
    pub fn activate_viewpoint(&mut self, name: &str, version: &str) -> Result<(), ModelError> {
        let version = Version::parse(version)?;
        debug!(viewpoint = name, version = %version, "viewpoint activated");
        self.viewpoints.insert(SmolStr::new(name), version);
        Ok(())
    }

    // ========================================================================
    // Elements
    // ========================================================================

    /// The ID of `node`, from `id` or `xmi:id`.
    pub fn id_of(&self, node: NodeId) -> Option<&str> {
        if !self.doc.contains(node) {
            return None;
        }
        self.doc
            .attr(node, "id")
            .or_else(|| self.doc.attr(node, "xmi:id"))
    }

    pub fn node_by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    /// Like [`node_by_id`](Self::node_by_id), failing for unknown IDs.
    pub fn require(&self, id: &str) -> Result<NodeId, ModelError> {
        self.node_by_id(id)
            .ok_or_else(|| ModelError::UnknownElement(id.to_owned()))
    }

    /// Check that `node` is a live, indexed model element.
    pub fn require_node(&self, node: NodeId) -> Result<NodeId, ModelError> {
        if !self.doc.contains(node) {
            return Err(ModelError::UnknownElement(node.to_string()));
        }
        match self.id_of(node) {
            Some(id) if self.node_by_id(id) == Some(node) => Ok(node),
            Some(id) => Err(ModelError::UnknownElement(id.to_owned())),
            None => Err(ModelError::UnknownElement(node.to_string())),
        }
    }

    /// View of the live model element `node`.
    pub fn element(&self, node: NodeId) -> Result<ElementView<'_>, ModelError> {
        Ok(ElementView::new(self.require_node(node)?, self))
    }

    /// The element with ID `id`.
    pub fn by_id(&self, id: &str) -> Result<ElementView<'_>, ModelError> {
        Ok(ElementView::new(self.require(id)?, self))
    }

    /// Name of the resource holding `node`.
    pub fn resource_of(&self, node: NodeId) -> Option<&str> {
        if !self.doc.contains(node) {
            return None;
        }
        let document = self.doc.document_of(node)?;
        self.resources
            .iter()
            .find(|&(_, &d)| d == document)
            .map(|(name, _)| name.as_str())
    }

    /// All indexed model elements, resource by resource in document order.
    pub fn element_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.id_index.len());
        for &document in self.resources.values() {
            let Some(root) = self.doc.root_element(document) else {
                continue;
            };
            for node in std::iter::once(root).chain(self.doc.descendants(root)) {
                if self
                    .id_of(node)
                    .is_some_and(|id| self.node_by_id(id) == Some(node))
                {
                    out.push(node);
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.id_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_index.is_empty()
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Determine the class of `node`.
    ///
    /// In order: a type hint of the parent's containment for this role,
    /// the `xsi:type` attribute, and finally a prefixed tag name (used by
    /// resource roots). Prefixes are resolved through the in-scope
    /// `xmlns:*` declarations, the version coming from the namespace URI.
    pub fn class_of(&self, node: NodeId) -> Result<Arc<ClassDef>, ModelError> {
        if !self.doc.contains(node) {
            return Err(ModelError::UnknownElement(node.to_string()));
        }
        let tag = self
            .doc
            .tag(node)
            .ok_or_else(|| ModelError::UnknownElement(node.to_string()))?;

        let qname = match self.doc.attr(node, XSI_TYPE) {
            Some(xtype) => {
                if let Some(class) = self.hinted_class(node, tag, xtype)? {
                    return Ok(class);
                }
                xtype
            }
            None if tag.contains(':') => tag,
            None => return self.declared_class(node, tag),
        };
        self.resolve_qname(node, qname)
    }

    /// Class declared by the parent's containment for `tag`, for children
    /// written without `xsi:type`.
    fn declared_class(&self, node: NodeId, tag: &str) -> Result<Arc<ClassDef>, ModelError> {
        let untyped = || {
            ModelError::UnknownElement(format!(
                "{} has no type information",
                self.id_of(node).unwrap_or(tag)
            ))
        };
        let parent = self.doc.parent(node).ok_or_else(untyped)?;
        if self.id_of(parent).is_none() {
            return Err(untyped());
        }
        let parent_class = self.class_of(parent)?;
        let declared = parent_class
            .all_relations()
            .values()
            .find_map(|rel| match rel.as_ref() {
                relation::Relation::Containment(c) if c.role() == Some(tag) => {
                    Some(rel.class().clone())
                }
                _ => None,
            })
            .ok_or_else(untyped)?;
        let class = declared.resolve(&self.registry)?;
        if class.is_abstract() {
            return Err(ModelError::AbstractClass(class.qualified_name()));
        }
        Ok(class)
    }

    fn hinted_class(
        &self,
        node: NodeId,
        tag: &str,
        xtype: &str,
    ) -> Result<Option<Arc<ClassDef>>, ModelError> {
        let Some(parent) = self.doc.parent(node) else {
            return Ok(None);
        };
        if self.id_of(parent).is_none() {
            return Ok(None);
        }
        let Ok(parent_class) = self.class_of(parent) else {
            return Ok(None);
        };
        for rel in parent_class.all_relations().values() {
            let relation::Relation::Containment(containment) = rel.as_ref() else {
                continue;
            };
            if containment.role() != Some(tag) {
                continue;
            }
            if let Some(hint) = containment.hinted_class(xtype) {
                trace!(xtype, class = %hint, "type hint applied");
                return hint.resolve(&self.registry).map(Some);
            }
        }
        Ok(None)
    }

    fn resolve_qname(&self, node: NodeId, qname: &str) -> Result<Arc<ClassDef>, ModelError> {
        let (prefix, name) = split_qname(qname);
        let prefix = prefix.unwrap_or("");

        if let Some(uri) = self.doc.lookup_namespace(node, prefix) {
            let Some((ns, version)) = self.registry.match_uri(uri, &self.viewpoints) else {
                return Err(ModelError::UnknownNamespace(uri.to_owned()));
            };
            trace!(qname, alias = ns.alias(), "class resolved through uri");
            return ns.get_class(name, version.as_ref());
        }
        // Undeclared prefixes are taken as registry aliases.
        let ns = self.registry.namespace(prefix)?;
        ns.get_class(name, self.active_version(ns.viewpoint()))
    }

    /// Fail with a conformance error unless `node` is an instance of
    /// `class` or one of its subclasses.
    pub fn check_conforms(&self, node: NodeId, class: &ClassDef) -> Result<(), ModelError> {
        let actual = self.class_of(node)?;
        if actual.is_subclass_of(class) {
            Ok(())
        } else {
            Err(ModelError::wrong_class(
                class.qualified_name(),
                actual.qualified_name(),
            ))
        }
    }

    fn active_version(&self, viewpoint: Option<&str>) -> Option<&Version> {
        viewpoint.and_then(|vp| self.viewpoints.get(vp))
    }

    fn namespace_uri_for(&self, class: &ClassDef) -> Result<String, ModelError> {
        let ns = self.registry.namespace(class.alias())?;
        Ok(ns.qualified_uri(self.active_version(ns.viewpoint())))
    }

    // ========================================================================
    // Relations
    // ========================================================================

    /// Live list of the relation `attr` of `node`.
    pub fn relation(&self, node: NodeId, attr: &str) -> Result<ElementList, ModelError> {
        let class = self.class_of(node)?;
        let relation = class.require_relation(attr)?;
        Ok(ElementList::new(node, Arc::clone(relation)))
    }

    /// Replace the targets of `attr` on `node`.
    pub fn set(&mut self, node: NodeId, attr: &str, values: Vec<Value>) -> Result<(), ModelError> {
        let list = self.relation(node, attr)?;
        list.relation().write(self, node, values)
    }

    pub fn clear(&mut self, node: NodeId, attr: &str) -> Result<(), ModelError> {
        let list = self.relation(node, attr)?;
        list.relation().clear(self, node)
    }

    /// Scalar value of the `single_attr` relation `attr`.
    pub fn scalar(&self, node: NodeId, attr: &str) -> Result<Option<String>, ModelError> {
        self.relation(node, attr)?
            .relation()
            .read_scalar(self, node)
    }

    pub fn set_scalar(&mut self, node: NodeId, attr: &str, value: &str) -> Result<(), ModelError> {
        let list = self.relation(node, attr)?;
        list.relation().write_scalar(self, node, value)
    }

    /// Association links naming no loaded element, as
    /// `(owner, relation, target ID)`.
    pub fn dangling_references(&self) -> Vec<(NodeId, String, String)> {
        let mut out = Vec::new();
        for node in self.element_nodes() {
            let Ok(class) = self.class_of(node) else {
                continue;
            };
            for (name, rel) in class.all_relations() {
                if let relation::Relation::Association(association) = rel.as_ref() {
                    for id in association.dangling(self, node) {
                        out.push((node, name.to_string(), id));
                    }
                }
            }
        }
        out
    }

    /// Mapped view over the relation `attr`.
    pub fn mapped(&self, node: NodeId, attr: &str) -> Result<MappedView, ModelError> {
        self.relation(node, attr)?.mapped()
    }

    // ========================================================================
    // Tree mutation (used by relations)
    // ========================================================================

    /// Create an instance of `class` as a child of `parent` with tag `tag`.
    ///
    /// `xsi:type` comes first, then the ID (generated unless `attributes`
    /// carries one), then the remaining attributes. Missing namespace
    /// declarations are added to the resource root.
    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        class: &Arc<ClassDef>,
        mut attributes: IndexMap<String, String>,
    ) -> Result<NodeId, ModelError> {
        let uri = self.namespace_uri_for(class)?;
        if let Some(root) = self.resource_root(parent) {
            self.declare_namespace(root, "xsi", NS_XSI);
            self.declare_namespace(root, class.alias(), &uri);
        }

        let node = self.doc.create_element(tag);
        self.doc.set_attr(node, XSI_TYPE, class.qualified_name());
        let id = attributes
            .shift_remove("id")
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.doc.set_attr(node, "id", id.clone());
        for (key, value) in attributes {
            self.doc.set_attr(node, &key, value);
        }
        self.doc.append_child(parent, node);
        self.id_index.insert(id, node);
        trace!(class = %class, %node, "element created");
        Ok(node)
    }

    /// Move `node` under `parent` as `tag`, keeping its subtree.
    pub(crate) fn move_element(&mut self, node: NodeId, parent: NodeId, tag: &str) {
        if self.doc.parent(node) == Some(parent) && self.doc.tag(node) == Some(tag) {
            return;
        }
        let source_root = self.resource_root(node);
        let target_root = self.resource_root(parent);

        // Carry namespace declarations over when crossing resources.
        let mut carried = Vec::new();
        if let (Some(source), Some(target)) = (source_root, target_root) {
            if source != target {
                for n in std::iter::once(node).chain(self.doc.descendants(node)) {
                    let Some(xtype) = self.doc.attr(n, XSI_TYPE) else {
                        continue;
                    };
                    let (Some(prefix), _) = split_qname(xtype) else {
                        continue;
                    };
                    if let Some(uri) = self.doc.lookup_namespace(n, prefix) {
                        carried.push((prefix.to_owned(), uri.to_owned()));
                    }
                }
            }
        }

        self.doc.set_tag(node, tag);
        self.doc.append_child(parent, node);
        if let Some(root) = target_root {
            for (prefix, uri) in carried {
                self.declare_namespace(root, &prefix, &uri);
            }
        }
    }

    /// Detach `node` and drop it and its descendants from the ID index.
    pub(crate) fn delete_subtree(&mut self, node: NodeId) {
        for n in std::iter::once(node).chain(self.doc.descendants(node)) {
            let Some(id) = self.id_of(n).map(str::to_owned) else {
                continue;
            };
            if self.id_index.get(&id) == Some(&n) {
                self.id_index.remove(&id);
            }
        }
        self.doc.detach(node);
    }

    fn resource_root(&self, node: NodeId) -> Option<NodeId> {
        let document = self.doc.document_of(node)?;
        self.doc.root_element(document)
    }

    fn declare_namespace(&mut self, root: NodeId, prefix: &str, uri: &str) {
        let key = format!("xmlns:{prefix}");
        if self.doc.attr(root, &key).is_none() {
            debug!(prefix, uri, "namespace declared");
            self.doc.set_attr(root, &key, uri);
        }
    }

    // ========================================================================
    // Saving
    // ========================================================================

    /// Whether duplicate IDs were found while loading.
    pub fn is_corrupt(&self) -> bool {
        self.corrupt
    }

    pub fn mark_corrupt(&mut self) {
        self.corrupt = true;
    }

    /// Serialize the resource `name` as a file.
    pub fn to_bytes(&self, name: &str) -> Result<Vec<u8>, ModelError> {
        let document = self
            .resources
            .get(name)
            .ok_or_else(|| ModelError::config(format!("no resource named {name:?}")))?;
        Serializer::new(SerializeOptions::file()).to_vec(&self.doc, *document)
    }

    /// Write every resource through `handler`. Corrupt models are refused.
    pub fn save(&self, handler: &dyn FileHandler) -> Result<(), ModelError> {
        if self.corrupt {
            return Err(ModelError::Corrupt(
                "refusing to save a model with duplicate IDs".to_owned(),
            ));
        }
        for name in self.resources.keys() {
            let bytes = self.to_bytes(name)?;
            handler.write(name, &bytes)?;
            debug!(resource = %name, bytes = bytes.len(), "resource saved");
        }
        Ok(())
    }
}
