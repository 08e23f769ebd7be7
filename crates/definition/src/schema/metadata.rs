//! Identity metadata shared by all definitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a definition.
///
/// `id` is the stable lookup key; `uuid` identifies one concrete version of
/// the definition and is regenerated whenever a file is loaded without one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DefinitionMetadata {
    pub id: String,
    pub name: String,
    #[serde(default = "Uuid::new_v4")]
    pub uuid: Uuid,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl DefinitionMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            uuid: Uuid::new_v4(),
            description: None,
            tags: None,
        }
    }
}
