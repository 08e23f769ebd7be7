//! The `Definition` document.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{DefinitionFamily, DefinitionMetadata, Parameter};
use crate::loader::DefinitionError;

fn default_api_version() -> String {
    "v1".to_string()
}

/// A named, typed description of a computation.
///
/// Definitions are shared as `Arc<Definition>` once loaded and are never
/// mutated during evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Definition {
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: String,
    pub family: DefinitionFamily,
    /// Concrete evaluator strategy within the family (e.g. `inline`).
    #[serde(default, rename = "type")]
    pub definition_type: Option<String>,
    pub metadata: DefinitionMetadata,
    /// Ordered parameter schema.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Evaluator-specific settings, interpreted only by the evaluator.
    #[serde(default)]
    pub config: serde_yaml::Value,
}

impl Definition {
    pub fn new(family: DefinitionFamily, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            api_version: default_api_version(),
            family,
            definition_type: None,
            metadata: DefinitionMetadata::new(id, name),
            parameters: Vec::new(),
            config: serde_yaml::Value::Null,
        }
    }

    pub fn with_type(mut self, definition_type: impl Into<String>) -> Self {
        self.definition_type = Some(definition_type.into());
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_config(mut self, config: serde_yaml::Value) -> Self {
        self.config = config;
        self
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Deserialize the evaluator config into a typed struct.
    ///
    /// A missing config reads as an empty mapping.
    pub fn config_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_yaml::Error> {
        if self.config.is_null() {
            return serde_yaml::from_value(serde_yaml::Value::Mapping(Default::default()));
        }
        serde_yaml::from_value(self.config.clone())
    }

    /// Structural checks applied when a definition enters a repository.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.metadata.id.trim().is_empty() {
            return Err(DefinitionError::Validation(
                "definition metadata.id must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for param in &self.parameters {
            if param.name.trim().is_empty() {
                return Err(DefinitionError::Validation(format!(
                    "definition '{}' declares a parameter without a name",
                    self.metadata.id
                )));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(DefinitionError::Validation(format!(
                    "definition '{}' declares parameter '{}' more than once",
                    self.metadata.id, param.name
                )));
            }
            if let Some(default) = &param.default {
                if !param.value_type.accepts(default) {
                    return Err(DefinitionError::Validation(format!(
                        "default for parameter '{}' of definition '{}' is not a {}",
                        param.name, self.metadata.id, param.value_type
                    )));
                }
            }
        }

        Ok(())
    }
}
