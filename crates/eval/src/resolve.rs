//! Mapped-parameter resolution.
//!
//! Each declared slot of a mapped definition is resolved, in declaration
//! order, from the first source that yields a value:
//!
//! 1. a literal binding
//! 2. an `${name}` binding found in the context's global parameters
//! 3. a nested mapped definition, evaluated eagerly into `Value::Data`
//! 4. the context's global parameter of the same name
//! 5. the slot's declared default
//!
//! A required slot left unresolved fails with `MissingRequiredParameter`;
//! an optional one is left unbound.

use std::collections::HashMap;

use tabula_core::Value;
use tabula_definition::{parse_expression, Mapped, MappedValue, Parameter};
use tracing::trace;

use crate::context::{EvaluationContext, Parameters};
use crate::engine::Engine;
use crate::error::{EvalError, Result};

/// Nested results already computed in the current pass, by structure key.
pub(crate) type Memo = HashMap<String, Value>;

/// Resolve every declared parameter of `mapped` against `context`.
///
/// Nested mapped definitions are evaluated through `engine` (and therefore
/// through the context's cache). Within one call the same nested mapping is
/// evaluated at most once, even when caching is disabled.
pub fn resolve(engine: &Engine, mapped: &Mapped, context: &EvaluationContext) -> Result<Parameters> {
    let mut memo = Memo::new();
    resolve_with(engine, mapped, context, &mut memo)
}

pub(crate) fn resolve_with(
    engine: &Engine,
    mapped: &Mapped,
    context: &EvaluationContext,
    memo: &mut Memo,
) -> Result<Parameters> {
    let definition = &mapped.definition;

    if let Some(name) = mapped.unknown_parameters().next() {
        return Err(EvalError::UnknownParameter {
            definition: definition.id().to_string(),
            parameter: name.to_string(),
        });
    }

    let mut resolved = Parameters::new();
    for slot in &definition.parameters {
        let bound = match mapped.get(&slot.name) {
            Some(MappedValue::Literal(value)) => Some(value.clone()),
            Some(MappedValue::Expression(expr)) => {
                context.parameter(parse_expression(expr)).cloned()
            }
            Some(MappedValue::Nested(nested)) => Some(evaluate_nested(engine, nested, context, memo)?),
            None => None,
        };

        let value = bound
            .or_else(|| context.parameter(&slot.name).cloned())
            .or_else(|| slot.default.clone());

        match value {
            Some(value) => {
                check_type(definition.id(), slot, &value)?;
                resolved.insert(slot.name.clone(), value);
            }
            None if slot.required => {
                return Err(EvalError::MissingRequiredParameter {
                    definition: definition.id().to_string(),
                    parameter: slot.name.clone(),
                });
            }
            None => {}
        }
    }

    Ok(resolved)
}

fn evaluate_nested(
    engine: &Engine,
    nested: &Mapped,
    context: &EvaluationContext,
    memo: &mut Memo,
) -> Result<Value> {
    let structure = nested.structure_key();
    if let Some(value) = memo.get(&structure) {
        trace!(definition_id = %nested.definition.id(), "reusing nested result from this pass");
        return Ok(value.clone());
    }

    let (entry, _) = engine.evaluate_mapped_with(nested, context, memo)?;
    let value = Value::Data(entry.data.clone());
    memo.insert(structure, value.clone());
    Ok(value)
}

fn check_type(definition: &str, slot: &Parameter, value: &Value) -> Result<()> {
    if slot.value_type.accepts(value) {
        Ok(())
    } else {
        Err(EvalError::InvalidParameterValue {
            definition: definition.to_string(),
            parameter: slot.name.clone(),
            expected: slot.value_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tabula_core::{DataSet, DataSetColumn, DataSetRow, ValueType};
    use tabula_definition::{Definition, DefinitionFamily};

    use super::*;
    use crate::cache::EvaluationCache;
    use crate::context::Scope;
    use crate::registry::EvaluatorRegistry;

    fn slots() -> Arc<Definition> {
        Arc::new(
            Definition::new(DefinitionFamily::Column, "age", "Age")
                .with_parameter(Parameter::required("p", ValueType::Integer).with_default(5i64))
                .with_parameter(Parameter::optional("start", ValueType::Date)),
        )
    }

    fn ctx() -> EvaluationContext {
        EvaluationContext::new(Scope::All)
    }

    fn engine() -> Engine {
        Engine::new(Arc::new(EvaluatorRegistry::new()))
    }

    #[test]
    fn literal_beats_default() {
        let mapped = Mapped::new(slots()).literal("p", 7i64);
        let params = resolve(&engine(), &mapped, &ctx()).unwrap();
        assert_eq!(params.get("p"), Some(&Value::Integer(7)));
    }

    #[test]
    fn default_applies_when_unmapped() {
        let params = resolve(&engine(), &Mapped::new(slots()), &ctx()).unwrap();
        assert_eq!(params.get("p"), Some(&Value::Integer(5)));
        assert!(!params.contains_key("start"));
    }

    #[test]
    fn context_global_beats_default() {
        let ctx = ctx().with_parameter("p", 9i64);
        let params = resolve(&engine(), &Mapped::new(slots()), &ctx).unwrap();
        assert_eq!(params.get("p"), Some(&Value::Integer(9)));
    }

    #[test]
    fn expression_reads_context_parameter() {
        let ctx = ctx().with_parameter("threshold", 11i64);
        let mapped = Mapped::new(slots()).expression("p", "${threshold}");
        let params = resolve(&engine(), &mapped, &ctx).unwrap();
        assert_eq!(params.get("p"), Some(&Value::Integer(11)));
    }

    #[test]
    fn unresolvable_expression_falls_back_to_default() {
        let mapped = Mapped::new(slots()).expression("p", "${absent}");
        let params = resolve(&engine(), &mapped, &ctx()).unwrap();
        assert_eq!(params.get("p"), Some(&Value::Integer(5)));
    }

    #[test]
    fn required_without_source_is_missing() {
        let def = Arc::new(
            Definition::new(DefinitionFamily::Column, "age", "Age")
                .with_parameter(Parameter::required("q", ValueType::Any)),
        );
        let err = resolve(&engine(), &Mapped::new(def), &ctx()).unwrap_err();
        assert!(matches!(
            err,
            EvalError::MissingRequiredParameter { ref parameter, ref definition } if parameter == "q" && definition == "age"
        ));
    }

    #[test]
    fn unknown_mapping_is_rejected() {
        let mapped = Mapped::new(slots()).literal("bogus", 1i64);
        let err = resolve(&engine(), &mapped, &ctx()).unwrap_err();
        assert!(matches!(err, EvalError::UnknownParameter { ref parameter, .. } if parameter == "bogus"));
    }

    #[test]
    fn mistyped_value_is_rejected() {
        let mapped = Mapped::new(slots()).literal("p", "seven");
        let err = resolve(&engine(), &mapped, &ctx()).unwrap_err();
        assert!(matches!(
            err,
            EvalError::InvalidParameterValue { expected: ValueType::Integer, .. }
        ));
    }

    #[test]
    fn identical_nested_mappings_evaluate_once_per_pass() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut registry = EvaluatorRegistry::new();
        registry
            .register(
                DefinitionFamily::DataSet,
                move |_: &Definition, params: &Parameters, _: &EvaluationContext, _: &Engine| -> anyhow::Result<DataSet> {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let n = params.get("n").cloned().unwrap_or(Value::Null);
                    Ok(DataSet::new(vec![DataSetColumn::new("n", ValueType::Integer)])?
                        .with_row(DataSetRow::new().with("n", n))?)
                },
            )
            .unwrap();
        let engine = Engine::new(Arc::new(registry));

        let inner = Arc::new(
            Definition::new(DefinitionFamily::DataSet, "inner", "Inner")
                .with_parameter(Parameter::required("n", ValueType::Integer)),
        );
        let outer = Arc::new(
            Definition::new(DefinitionFamily::Report, "outer", "Outer")
                .with_parameter(Parameter::required("left", ValueType::DataSet))
                .with_parameter(Parameter::required("right", ValueType::DataSet)),
        );
        let nested = Mapped::new(inner).literal("n", 3i64);
        let mapped = Mapped::new(outer)
            .nested("left", nested.clone())
            .nested("right", nested);

        let ctx = EvaluationContext::with_cache(Scope::All, Arc::new(EvaluationCache::disabled()));
        let params = resolve(&engine, &mapped, &ctx).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let left = params["left"].as_data().unwrap();
        let right = params["right"].as_data().unwrap();
        assert!(Arc::ptr_eq(left, right));
        assert_eq!(left.rows()[0].value("n"), Some(&Value::Integer(3)));
    }
}
