//! Byte-level access to model files.

use std::io;
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::error::ModelError;

/// Reads and writes resources by their path relative to the model root.
///
/// Paths use `/` as separator regardless of platform.
pub trait FileHandler {
    fn read(&self, path: &str) -> Result<Vec<u8>, ModelError>;

    fn write(&self, path: &str, data: &[u8]) -> Result<(), ModelError>;

    fn exists(&self, path: &str) -> bool;
}

impl<H: FileHandler + ?Sized> FileHandler for &H {
    fn read(&self, path: &str) -> Result<Vec<u8>, ModelError> {
        (**self).read(path)
    }

    fn write(&self, path: &str, data: &[u8]) -> Result<(), ModelError> {
        (**self).write(path, data)
    }

    fn exists(&self, path: &str) -> bool {
        (**self).exists(path)
    }
}

/// Files below a directory on the local file system.
#[derive(Clone, Debug)]
pub struct LocalFileHandler {
    root: PathBuf,
}

impl LocalFileHandler {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `path` onto the root. Paths leaving the root are rejected.
    fn resolve(&self, path: &str) -> Result<PathBuf, ModelError> {
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(ModelError::Io(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("{path}: path leaves the model directory"),
                    )));
                }
            }
        }
        Ok(resolved)
    }
}

impl FileHandler for LocalFileHandler {
    fn read(&self, path: &str) -> Result<Vec<u8>, ModelError> {
        Ok(std::fs::read(self.resolve(path)?)?)
    }

    fn write(&self, path: &str, data: &[u8]) -> Result<(), ModelError> {
        let target = self.resolve(path)?;
        if let Some(dir) = target.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(target, data)?;
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|p| p.is_file())
    }
}

/// Files kept in memory, for tests and generated models.
#[derive(Debug, Default)]
pub struct MemoryFileHandler {
    files: RwLock<IndexMap<String, Vec<u8>>>,
}

impl MemoryFileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any previous content.
    pub fn with_file(self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.files.write().insert(path.into(), data.into());
        self
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.read().keys().cloned().collect()
    }
}

impl FileHandler for MemoryFileHandler {
    fn read(&self, path: &str) -> Result<Vec<u8>, ModelError> {
        self.files.read().get(path).cloned().ok_or_else(|| {
            ModelError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{path}: no such file"),
            ))
        })
    }

    fn write(&self, path: &str, data: &[u8]) -> Result<(), ModelError> {
        self.files.write().insert(path.to_owned(), data.to_vec());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }
}
