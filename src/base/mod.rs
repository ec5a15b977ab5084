//! Foundation types shared by every other module.
//!
//! - [`Version`] - dotted version numbers with zero-padded comparison
//! - [`Interner`] - deduplicated `Arc<str>` names for the XML tree
//!
//! This module has NO dependencies on other arcadia modules besides the
//! error type.

mod intern;
mod version;

pub use intern::{IStr, Interner};
pub use version::{Version, VersionPart};
