//! Filesystem definition loader.
//!
//! Scans a directory tree for YAML definition files, validates them and keeps
//! them in an in-memory map keyed by definition id. Serves as the read-only
//! adapter for the persistence boundary.

mod core;
mod error;


pub use self::core::DefinitionLoader;
pub use self::error::{DefinitionError, LoadResult, LoadStatus, Result};
