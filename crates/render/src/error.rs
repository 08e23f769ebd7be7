use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    /// Nothing to render: no data set collection was supplied.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown order policy '{0}' (expected 'sorted' or 'insertion')")]
    UnknownOrderPolicy(String),

    #[error("Unknown chart layout '{0}' (expected 'density' or 'fixed')")]
    UnknownLayout(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
