//! `dataset/inline`: rows declared directly in the definition.
//!
//! ```yaml
//! family: dataset
//! type: inline
//! config:
//!   columns:
//!     - { name: visit_type, type: text, label: Visit type }
//!   rows:
//!     - { subject: 1, visit_type: Outpatient }
//! ```
//!
//! Rows are restricted to the context scope through the subject column
//! (`subject` unless `subject_column` says otherwise). Rows without a
//! subject are only kept for an unrestricted scope. An optional integer
//! `limit` parameter caps the number of rows returned.

use anyhow::Context as _;
use serde::Deserialize;
use tabula_core::{DataSet, DataSetColumn, DataSetRow, Value, ValueType};
use tabula_definition::Definition;

use super::SUBJECT_COLUMN;
use crate::context::{EvaluationContext, Parameters, Scope};
use crate::engine::Engine;
use crate::registry::Evaluator;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InlineConfig {
    #[serde(default = "default_subject_column")]
    subject_column: String,
    #[serde(default)]
    columns: Vec<DataSetColumn>,
    #[serde(default)]
    rows: Vec<DataSetRow>,
}

fn default_subject_column() -> String {
    SUBJECT_COLUMN.to_string()
}

pub struct InlineDataSet;

impl Evaluator for InlineDataSet {
    fn evaluate(
        &self,
        definition: &Definition,
        parameters: &Parameters,
        context: &EvaluationContext,
        _engine: &Engine,
    ) -> anyhow::Result<DataSet> {
        let config: InlineConfig = definition
            .config_as()
            .with_context(|| format!("invalid inline config for '{}'", definition.id()))?;

        let mut data = DataSet::default();
        data.add_column(DataSetColumn::new(&config.subject_column, ValueType::Integer))?;
        for column in config.columns {
            if column.name != config.subject_column {
                data.add_column(column)?;
            }
        }

        let limit = match parameters.get("limit") {
            Some(Value::Integer(n)) if *n >= 0 => Some(*n as usize),
            _ => None,
        };

        for row in config.rows {
            if limit.is_some_and(|n| data.len() >= n) {
                break;
            }
            let in_scope = match (row.value(&config.subject_column), context.scope()) {
                (_, Scope::All) => true,
                (Some(Value::Integer(subject)), scope) => scope.includes(*subject),
                _ => false,
            };
            if in_scope {
                data.push_row(row)?;
            }
        }

        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tabula_definition::DefinitionFamily;

    use super::*;
    use crate::registry::EvaluatorRegistry;

    fn definition(config: &str) -> Definition {
        Definition::new(DefinitionFamily::DataSet, "visits", "Visits")
            .with_type("inline")
            .with_config(serde_yaml::from_str(config).unwrap())
    }

    const CONFIG: &str = r#"
columns:
  - { name: visit_type, type: text }
rows:
  - { subject: 1, visit_type: Outpatient }
  - { subject: 2, visit_type: Inpatient }
  - { subject: 3, visit_type: Outpatient }
  - { visit_type: Unknown }
"#;

    fn run(def: &Definition, ctx: &EvaluationContext, params: &Parameters) -> anyhow::Result<DataSet> {
        let engine = Engine::new(Arc::new(EvaluatorRegistry::new()));
        InlineDataSet.evaluate(def, params, ctx, &engine)
    }

    #[test]
    fn all_rows_for_unrestricted_scope() {
        let data = run(&definition(CONFIG), &EvaluationContext::new(Scope::All), &Parameters::new()).unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data.columns()[0].name, "subject");
        assert_eq!(data.columns()[1].name, "visit_type");
    }

    #[test]
    fn rows_are_restricted_to_scope() {
        let ctx = EvaluationContext::new(Scope::subjects([1, 3]));
        let data = run(&definition(CONFIG), &ctx, &Parameters::new()).unwrap();
        let subjects: Vec<_> = data.column_values("subject").cloned().collect();
        assert_eq!(subjects, vec![Value::Integer(1), Value::Integer(3)]);
    }

    #[test]
    fn limit_caps_rows() {
        let mut params = Parameters::new();
        params.insert("limit".to_string(), Value::Integer(2));
        let data = run(&definition(CONFIG), &EvaluationContext::new(Scope::All), &params).unwrap();
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn undeclared_row_columns_fail() {
        let config = "columns: []\nrows:\n  - { subject: 1, extra: x }\n";
        let err = run(&definition(config), &EvaluationContext::new(Scope::All), &Parameters::new()).unwrap_err();
        assert!(err.to_string().contains("extra"));
    }

    #[test]
    fn malformed_config_is_reported() {
        let err = run(&definition("rows: 5"), &EvaluationContext::new(Scope::All), &Parameters::new()).unwrap_err();
        assert!(err.to_string().contains("invalid inline config"));
    }
}
