//! Loader tests
//!
//! Multi-file loading through local and in-memory file handlers, fragment
//! discovery, saving and corruption handling.

pub mod tests_loader;
