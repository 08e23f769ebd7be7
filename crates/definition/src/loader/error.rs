//! Error types and load result structures for the definition loader.

use std::path::PathBuf;

/// Errors that can occur while loading or looking up definitions.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse/deserialization error.
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Definition validation error (e.g. empty id, duplicate parameters).
    #[error("Validation error: {0}")]
    Validation(String),

    /// No definition is stored under the requested id.
    #[error("Definition not found: {0}")]
    NotFound(String),
}

/// Result alias for definition operations.
pub type Result<T> = std::result::Result<T, DefinitionError>;

/// Outcome of loading a single definition file.
#[derive(Debug)]
pub struct LoadResult {
    /// Path to the file that was loaded.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    /// Definition was successfully loaded.
    Loaded { definition_id: String },
    /// File was skipped (dotfile, non-YAML, etc.).
    Skipped { reason: String },
    /// Parse or validation error occurred.
    Failed { error: String },
}
