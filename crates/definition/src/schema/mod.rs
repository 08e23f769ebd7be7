//! Definition schema types with serde deserialization.
//!
//! Defines the type hierarchy for definition documents:
//! - `DefinitionFamily`: the family tag used for evaluator dispatch
//! - `Definition`: metadata, ordered parameter schema, evaluator config
//! - `Mapped`: a definition plus parameter bindings

mod definition;
mod family;
mod mapped;
mod metadata;
mod parameter;

pub use definition::*;
pub use family::*;
pub use mapped::*;
pub use metadata::*;
pub use parameter::*;
