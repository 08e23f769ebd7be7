//! Definition family tag used for evaluator dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Family a definition belongs to.
///
/// The four built-in families cover row-level visit data, per-subject columns,
/// whole data sets and reports. `Custom` keeps the set open for extensions
/// that register their own evaluators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DefinitionFamily {
    VisitData,
    Column,
    DataSet,
    Report,
    Custom(String),
}

impl DefinitionFamily {
    pub fn as_str(&self) -> &str {
        match self {
            DefinitionFamily::VisitData => "visit_data",
            DefinitionFamily::Column => "column",
            DefinitionFamily::DataSet => "dataset",
            DefinitionFamily::Report => "report",
            DefinitionFamily::Custom(name) => name,
        }
    }
}

impl fmt::Display for DefinitionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefinitionFamily {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("definition family must not be empty".to_string()),
            "visit_data" | "visit-data" => Ok(DefinitionFamily::VisitData),
            "column" => Ok(DefinitionFamily::Column),
            "dataset" | "data_set" => Ok(DefinitionFamily::DataSet),
            "report" => Ok(DefinitionFamily::Report),
            other => Ok(DefinitionFamily::Custom(other.to_string())),
        }
    }
}

impl TryFrom<String> for DefinitionFamily {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DefinitionFamily> for String {
    fn from(family: DefinitionFamily) -> Self {
        family.as_str().to_string()
    }
}
