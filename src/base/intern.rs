//! String interner for XML tag and attribute names.
//!
//! Model files repeat the same handful of names (`ownedFunctions`, `id`,
//! `xsi:type`) hundreds of thousands of times. Interning them as `Arc<str>`
//! makes every node share one allocation per distinct name.

use std::sync::Arc;

use rustc_hash::FxHashSet;

/// An interned string - cheap to clone (just an Arc increment)
pub type IStr = Arc<str>;

/// String interner that deduplicates strings.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    strings: FxHashSet<Arc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning a cheap-to-clone reference.
    pub fn intern(&mut self, s: &str) -> IStr {
        if let Some(existing) = self.strings.get(s) {
            Arc::clone(existing)
        } else {
            let rc: Arc<str> = Arc::from(s);
            self.strings.insert(Arc::clone(&rc));
            rc
        }
    }

    /// Get an interned string if it exists, without creating it.
    pub fn get(&self, s: &str) -> Option<IStr> {
        self.strings.get(s).cloned()
    }

    /// Number of unique strings interned.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
