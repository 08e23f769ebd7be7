//! `column/constant`: the same value for every subject in scope.
//!
//! The value comes from the resolved `value` parameter. For an explicit
//! scope the rows follow its members; for an unrestricted scope they follow
//! the `subjects` listed in the config.

use anyhow::{anyhow, Context as _};
use serde::Deserialize;
use tabula_core::{DataSet, DataSetColumn, DataSetRow, SubjectId, ValueType};
use tabula_definition::Definition;

use super::SUBJECT_COLUMN;
use crate::context::{EvaluationContext, Parameters, Scope};
use crate::engine::Engine;
use crate::registry::Evaluator;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstantConfig {
    /// Output column; defaults to the definition id.
    #[serde(default)]
    column: Option<DataSetColumn>,
    #[serde(default)]
    subjects: Vec<SubjectId>,
}

pub struct ConstantColumn;

impl Evaluator for ConstantColumn {
    fn evaluate(
        &self,
        definition: &Definition,
        parameters: &Parameters,
        context: &EvaluationContext,
        _engine: &Engine,
    ) -> anyhow::Result<DataSet> {
        let config: ConstantConfig = definition
            .config_as()
            .with_context(|| format!("invalid constant config for '{}'", definition.id()))?;
        let value = parameters
            .get("value")
            .ok_or_else(|| anyhow!("constant column '{}' has no 'value' parameter", definition.id()))?;

        let column = config.column.unwrap_or_else(|| {
            DataSetColumn::new(definition.id(), value.value_type()).with_label(definition.name())
        });
        let column_name = column.name.clone();

        let subjects: Vec<SubjectId> = match context.scope() {
            Scope::Subjects(cohort) => cohort.members.iter().copied().collect(),
            Scope::All => config.subjects,
        };

        let mut data = DataSet::new(vec![
            DataSetColumn::new(SUBJECT_COLUMN, ValueType::Integer),
            column,
        ])?;
        for subject in subjects {
            data.push_row(
                DataSetRow::new()
                    .with(SUBJECT_COLUMN, subject)
                    .with(column_name.as_str(), value.clone()),
            )?;
        }
        Ok(data)
    }
}
