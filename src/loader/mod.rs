//! Loading and saving models made of several files.
//!
//! A Capella model is an entrypoint (`.capella`, `.aird`, ...) plus any
//! number of `.capellafragment` files it links to. [`ModelLoader`] reads
//! the entrypoint through a [`FileHandler`], follows fragment links and
//! builds one [`Model`] from all of them.

mod handler;

use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::model::Model;
use crate::namespace::NamespaceRegistry;

pub use handler::{FileHandler, LocalFileHandler, MemoryFileHandler};

/// Extension of fragment files.
pub const FRAGMENT_EXTENSION: &str = "capellafragment";

fn default_extensions() -> Vec<String> {
    ["capella", "aird", "melodymodeller"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Loader settings.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LoaderOptions {
    /// Accepted entrypoint extensions, without the dot.
    pub entrypoint_extensions: Vec<String>,
    /// Fragments to load in addition to the linked ones, relative to the
    /// entrypoint's directory.
    pub fragments: Vec<String>,
    /// Follow `*.capellafragment#id` links found in attributes.
    pub discover_fragments: bool,
    /// Viewpoints to activate, name to version.
    pub viewpoints: IndexMap<String, String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            entrypoint_extensions: default_extensions(),
            fragments: Vec::new(),
            discover_fragments: true,
            viewpoints: IndexMap::new(),
        }
    }
}

impl LoaderOptions {
    #[cfg(feature = "serde")]
    pub fn from_yaml(source: &str) -> Result<Self, ModelError> {
        serde_yaml::from_str(source).map_err(|e| ModelError::config(e.to_string()))
    }

    #[cfg(feature = "serde")]
    pub fn from_json(source: &str) -> Result<Self, ModelError> {
        serde_json::from_str(source).map_err(|e| ModelError::config(e.to_string()))
    }
}

/// Reads and writes models through a [`FileHandler`].
#[derive(Debug)]
pub struct ModelLoader<H: FileHandler> {
    handler: H,
    registry: Arc<NamespaceRegistry>,
    options: LoaderOptions,
}

impl<H: FileHandler> ModelLoader<H> {
    pub fn new(handler: H, registry: Arc<NamespaceRegistry>) -> Self {
        Self {
            handler,
            registry,
            options: LoaderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Load `entrypoint` and every fragment reachable from it.
    pub fn load(&self, entrypoint: &str) -> Result<Model, ModelError> {
        let extension = entrypoint.rsplit_once('.').map(|(_, ext)| ext);
        if !extension.is_some_and(|ext| self.options.entrypoint_extensions.iter().any(|e| e == ext))
        {
            return Err(ModelError::config(format!(
                "{entrypoint}: unsupported entrypoint, expected one of {:?}",
                self.options.entrypoint_extensions
            )));
        }

        let mut model = Model::new(Arc::clone(&self.registry));
        for (name, version) in &self.options.viewpoints {
            model.activate_viewpoint(name, version)?;
        }

        let base = parent_dir(entrypoint);
        let mut seen: IndexSet<String> = IndexSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        seen.insert(entrypoint.to_owned());
        queue.push_back(entrypoint.to_owned());
        for fragment in &self.options.fragments {
            let path = join_path(base, fragment);
            if seen.insert(path.clone()) {
                queue.push_back(path);
            }
        }

        while let Some(path) = queue.pop_front() {
            let bytes = self.handler.read(&path)?;
            let document = model.add_resource(&path, &bytes)?;
            if !self.options.discover_fragments {
                continue;
            }
            for link in fragment_links(&model, document) {
                let target = join_path(parent_dir(&path), &link);
                if seen.insert(target.clone()) {
                    debug!(from = %path, fragment = %target, "fragment discovered");
                    queue.push_back(target);
                }
            }
        }

        if model.is_corrupt() {
            warn!(entrypoint, "model contains duplicate IDs and cannot be saved");
        }
        for (owner, relation, target) in model.dangling_references() {
            warn!(
                element = model.id_of(owner).unwrap_or_default(),
                relation = %relation,
                target = %target,
                "dangling reference"
            );
        }
        debug!(
            entrypoint,
            resources = seen.len(),
            elements = model.len(),
            "model loaded"
        );
        Ok(model)
    }

    /// Write all resources of `model` back through the handler.
    pub fn save(&self, model: &Model) -> Result<(), ModelError> {
        model.save(&self.handler)
    }
}

/// Fragment paths named by link tokens in the attributes of `document`.
fn fragment_links(model: &Model, document: crate::xml::NodeId) -> Vec<String> {
    let doc = model.document();
    let suffix = format!(".{FRAGMENT_EXTENSION}");
    let mut links = IndexSet::new();
    for node in doc.descendants(document) {
        for (_, value) in doc.attributes(node) {
            for token in value.split_whitespace() {
                let Some((file, _)) = token.split_once('#') else {
                    continue;
                };
                if file.ends_with(&suffix) {
                    links.insert(file.to_owned());
                }
            }
        }
    }
    links.into_iter().collect()
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Join `relative` onto `base`, collapsing `.` and `..` components.
fn join_path(base: &str, relative: &str) -> String {
    let mut parts: Vec<&str> = base.split('/').filter(|p| !p.is_empty()).collect();
    for part in relative.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Path of the resource `to` as seen from the directory of resource `from`.
pub(crate) fn relative_path(from: &str, to: &str) -> String {
    let from_dir: Vec<&str> = parent_dir(from).split('/').filter(|p| !p.is_empty()).collect();
    let to_parts: Vec<&str> = to.split('/').filter(|p| !p.is_empty()).collect();
    let common = from_dir
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count()
        .min(to_parts.len().saturating_sub(1));
    let mut parts = vec![".."; from_dir.len() - common];
    parts.extend(&to_parts[common..]);
    parts.join("/")
}
