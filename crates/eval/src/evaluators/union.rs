//! `report/union`: concatenation of nested data sets.
//!
//! Every resolved parameter holding a data set contributes its rows, in the
//! order the parameters are declared. Columns are the union of all inputs in
//! order of first appearance; rows stay sparse.

use tabula_core::{DataSet, Value};
use tabula_definition::Definition;
use tracing::debug;

use crate::context::{EvaluationContext, Parameters};
use crate::engine::Engine;
use crate::registry::Evaluator;

pub struct UnionReport;

impl Evaluator for UnionReport {
    fn evaluate(
        &self,
        definition: &Definition,
        parameters: &Parameters,
        _context: &EvaluationContext,
        _engine: &Engine,
    ) -> anyhow::Result<DataSet> {
        let mut report = DataSet::default();

        for slot in &definition.parameters {
            let Some(Value::Data(part)) = parameters.get(&slot.name) else {
                continue;
            };
            debug!(
                definition_id = %definition.id(),
                parameter = %slot.name,
                rows = part.len(),
                "appending data set to report"
            );
            for column in part.columns() {
                report.ensure_column(column.clone());
            }
            for row in part.rows() {
                report.push_row(row.clone())?;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tabula_core::{DataSetColumn, DataSetRow, ValueType};
    use tabula_definition::{DefinitionFamily, Parameter};

    use super::*;
    use crate::context::Scope;
    use crate::registry::EvaluatorRegistry;

    fn part(column: &str, values: &[&str]) -> Value {
        let mut data = DataSet::new(vec![
            DataSetColumn::new("subject", ValueType::Integer),
            DataSetColumn::new(column, ValueType::Text),
        ])
        .unwrap();
        for (i, v) in values.iter().enumerate() {
            data.push_row(DataSetRow::new().with("subject", i as i64).with(column, *v))
                .unwrap();
        }
        Value::from(data)
    }

    #[test]
    fn concatenates_in_declaration_order() {
        let def = Definition::new(DefinitionFamily::Report, "r", "R")
            .with_type("union")
            .with_parameter(Parameter::required("first", ValueType::DataSet))
            .with_parameter(Parameter::optional("note", ValueType::Text))
            .with_parameter(Parameter::required("second", ValueType::DataSet));

        let mut params = Parameters::new();
        params.insert("second".to_string(), part("sex", &["F"]));
        params.insert("first".to_string(), part("site", &["north", "south"]));
        params.insert("note".to_string(), Value::from("ignored"));

        let engine = Engine::new(Arc::new(EvaluatorRegistry::new()));
        let data = UnionReport
            .evaluate(&def, &params, &EvaluationContext::new(Scope::All), &engine)
            .unwrap();

        let columns: Vec<_> = data.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(columns, vec!["subject", "site", "sex"]);
        assert_eq!(data.len(), 3);
        assert_eq!(data.rows()[2].value("sex"), Some(&Value::from("F")));
        assert_eq!(data.rows()[2].value("site"), None);
    }
}
