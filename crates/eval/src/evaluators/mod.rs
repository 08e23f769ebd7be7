//! Built-in evaluators.
//!
//! - `dataset/inline`: rows declared in the definition's config
//! - `column/constant`: one parameter-supplied value per subject in scope
//! - `report/union`: rows of every nested data set parameter, concatenated

mod constant;
mod inline;
mod union;

use tabula_definition::DefinitionFamily;

use crate::registry::{EvaluatorRegistry, RegistryError};

pub use constant::ConstantColumn;
pub use inline::InlineDataSet;
pub use union::UnionReport;

/// Name of the subject column the built-in evaluators read and write.
pub const SUBJECT_COLUMN: &str = "subject";

/// Install the built-in evaluators into `registry`.
///
/// Fails if the registry already holds one of the built-in types.
pub fn register_builtins(registry: &mut EvaluatorRegistry) -> Result<(), RegistryError> {
    registry.register_type(DefinitionFamily::DataSet, "inline", InlineDataSet)?;
    registry.register_type(DefinitionFamily::Column, "constant", ConstantColumn)?;
    registry.register_type(DefinitionFamily::Report, "union", UnionReport)?;
    Ok(())
}
