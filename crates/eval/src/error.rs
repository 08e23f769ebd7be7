//! Error taxonomy for definition evaluation.

use tabula_core::ValueType;
use tabula_definition::DefinitionFamily;

/// Errors surfaced to callers of the evaluation engine.
///
/// Configuration errors (`UnsupportedDefinitionType`) and
/// resolution errors are raised before any evaluator runs. Evaluator
/// failures are wrapped in `Evaluation` with the original cause preserved.
/// Nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// No evaluator registered for the definition's family/type, or a typed
    /// service was handed a definition of another family.
    #[error("no evaluator registered for family '{family}'{}", type_suffix(.definition_type))]
    UnsupportedDefinitionType {
        family: DefinitionFamily,
        definition_type: Option<String>,
    },

    /// A required parameter was neither mapped, supplied by the context, nor defaulted.
    #[error("definition '{definition}' is missing required parameter '{parameter}'")]
    MissingRequiredParameter { definition: String, parameter: String },

    /// A mapping names a parameter the definition does not declare.
    #[error("definition '{definition}' has no parameter named '{parameter}'")]
    UnknownParameter { definition: String, parameter: String },

    /// A resolved value does not fit the slot's declared type.
    #[error("parameter '{parameter}' of definition '{definition}' expects a {expected} value")]
    InvalidParameterValue {
        definition: String,
        parameter: String,
        expected: ValueType,
    },

    /// The evaluator (or the persistence boundary behind it) failed.
    #[error("evaluation of definition '{definition}' failed: {source}")]
    Evaluation {
        definition: String,
        #[source]
        source: anyhow::Error,
    },

    /// A definition (transitively) requires its own result.
    #[error("circular definition: {chain}")]
    CircularDefinition { chain: String },

    /// Nested evaluation went deeper than the configured limit.
    #[error("evaluation of '{definition}' exceeds the maximum nesting depth of {max_depth}")]
    DepthLimitExceeded { definition: String, max_depth: usize },
}

impl EvalError {
    /// Configuration-level failure, as opposed to a failure of the data or the evaluator.
    pub fn is_configuration(&self) -> bool {
        matches!(self, EvalError::UnsupportedDefinitionType { .. })
    }
}

fn type_suffix(definition_type: &Option<String>) -> String {
    match definition_type {
        Some(t) => format!(" (type '{}')", t),
        None => String::new(),
    }
}

/// Result alias for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;
