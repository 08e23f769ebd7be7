use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TabulaError {
    #[error("Column not declared on data set: {0}")]
    UnknownColumn(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, TabulaError>;
