//! End-to-end evaluation behavior: caching, parameter precedence, nested
//! memoization, dispatch failures, concurrency and cycles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tabula_core::{DataSet, DataSetColumn, DataSetRow, Value, ValueType};
use tabula_definition::{
    Definition, DefinitionFamily, DefinitionLoader, DefinitionRepository, Mapped, MemoryRepository,
    Parameter,
};
use tabula_eval::{
    ColumnDefinitionService, DataSetDefinitionService, Engine, EvalError, EvaluationCache,
    EvaluationContext, EvaluatorRegistry, Parameters, ReportDefinitionService, Scope,
};

// ── Helpers ─────────────────────────────────────────────────────────

/// Registry whose column evaluator echoes parameter `p` and counts calls.
fn counting_registry(calls: Arc<AtomicUsize>, delay: Duration) -> EvaluatorRegistry {
    let mut registry = EvaluatorRegistry::new();
    registry
        .register(
            DefinitionFamily::Column,
            move |_: &Definition, params: &Parameters, _: &EvaluationContext, _: &Engine| -> anyhow::Result<DataSet> {
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(delay);
                let p = params.get("p").cloned().unwrap_or(Value::Null);
                Ok(DataSet::new(vec![DataSetColumn::new("p", ValueType::Any)])?
                    .with_row(DataSetRow::new().with("p", p))?)
            },
        )
        .unwrap();
    registry
        .register(
            DefinitionFamily::DataSet,
            |_: &Definition, params: &Parameters, _: &EvaluationContext, _: &Engine| -> anyhow::Result<DataSet> {
                let p = params.get("p").cloned().unwrap_or(Value::Null);
                Ok(DataSet::new(vec![DataSetColumn::new("p", ValueType::Any)])?
                    .with_row(DataSetRow::new().with("p", p))?)
            },
        )
        .unwrap();
    registry
}

fn column_with_default() -> Arc<Definition> {
    Arc::new(
        Definition::new(DefinitionFamily::Column, "threshold", "Threshold")
            .with_parameter(Parameter::required("p", ValueType::Integer).with_default(5i64)),
    )
}

fn first_p(data: &DataSet) -> Option<&Value> {
    data.rows().first().and_then(|row| row.value("p"))
}

fn definitions_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/definitions")
}

// ── Caching ─────────────────────────────────────────────────────────

#[test]
fn repeated_evaluation_invokes_evaluator_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(Engine::new(Arc::new(counting_registry(calls.clone(), Duration::ZERO))));
    let service = ColumnDefinitionService::new(engine);
    let ctx = EvaluationContext::new(Scope::All);
    let def = column_with_default();

    let first = service.evaluate(&def, &ctx).unwrap();
    let second = service.evaluate(&def, &ctx).unwrap();
    let third = service
        .evaluate_mapped(&Mapped::new(def.clone()).literal("p", 5i64), &ctx)
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!first.was_cached());
    assert!(second.was_cached());
    assert!(third.was_cached());
    assert_eq!(first.key(), second.key());
    assert_eq!(ctx.cache().stats().hits, 2);
}

#[test]
fn shared_cache_outlives_a_single_context() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(Engine::new(Arc::new(counting_registry(calls.clone(), Duration::ZERO))));
    let service = ColumnDefinitionService::new(engine);
    let cache = Arc::new(EvaluationCache::new(16));
    let def = column_with_default();

    for _ in 0..3 {
        let ctx = EvaluationContext::with_cache(Scope::All, cache.clone());
        service.evaluate(&def, &ctx).unwrap();
    }
    let fresh = EvaluationContext::new(Scope::All);
    service.evaluate(&def, &fresh).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// ── Parameter precedence ────────────────────────────────────────────

#[test]
fn literal_then_default_then_missing() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(Engine::new(Arc::new(counting_registry(calls, Duration::ZERO))));
    let service = ColumnDefinitionService::new(engine);
    let ctx = EvaluationContext::new(Scope::All);
    let def = column_with_default();

    let literal = service
        .evaluate_mapped(&Mapped::new(def.clone()).literal("p", 7i64), &ctx)
        .unwrap();
    assert_eq!(first_p(literal.data()), Some(&Value::Integer(7)));
    assert_eq!(literal.parameters().get("p"), Some(&Value::Integer(7)));

    let defaulted = service.evaluate_mapped(&Mapped::new(def), &ctx).unwrap();
    assert_eq!(first_p(defaulted.data()), Some(&Value::Integer(5)));

    let strict = Arc::new(
        Definition::new(DefinitionFamily::Column, "strict", "Strict")
            .with_parameter(Parameter::required("q", ValueType::Any)),
    );
    let err = service.evaluate_mapped(&Mapped::new(strict), &ctx).unwrap_err();
    assert!(matches!(
        err,
        EvalError::MissingRequiredParameter { ref parameter, .. } if parameter == "q"
    ));
}

// ── Nested memoization ──────────────────────────────────────────────

#[test]
fn nested_mapping_used_twice_is_evaluated_once_without_cache() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = counting_registry(calls.clone(), Duration::ZERO);
    tabula_eval::register_builtins(&mut registry).unwrap();
    let engine = Arc::new(Engine::new(Arc::new(registry)));
    let service = ReportDefinitionService::new(engine);

    let report = Arc::new(
        Definition::new(DefinitionFamily::Report, "both", "Both")
            .with_type("union")
            .with_parameter(Parameter::required("a", ValueType::DataSet))
            .with_parameter(Parameter::required("b", ValueType::DataSet)),
    );
    let nested = Mapped::new(column_with_default()).literal("p", 7i64);
    let mapped = Mapped::new(report)
        .nested("a", nested.clone())
        .nested("b", nested);

    let ctx = EvaluationContext::with_cache(Scope::All, Arc::new(EvaluationCache::disabled()));
    let result = service.evaluate_mapped(&mapped, &ctx).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.data().len(), 2);
}

// ── Dispatch failures ───────────────────────────────────────────────

#[test]
fn unregistered_family_fails_without_populating_the_cache() {
    let engine = Arc::new(Engine::new(Arc::new(EvaluatorRegistry::with_builtins())));
    let service = DataSetDefinitionService::new(engine);
    let ctx = EvaluationContext::new(Scope::All);
    let def = Arc::new(Definition::new(DefinitionFamily::DataSet, "raw", "Raw").with_type("sql"));

    let err = service.evaluate(&def, &ctx).unwrap_err();

    assert!(matches!(err, EvalError::UnsupportedDefinitionType { .. }));
    assert!(err.is_configuration());
    assert!(ctx.cache().is_empty());
    assert_eq!(ctx.cache().stats().misses, 0);
}

// ── Concurrency ─────────────────────────────────────────────────────

#[test]
fn concurrent_evaluations_of_one_key_run_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(Engine::new(Arc::new(counting_registry(
        calls.clone(),
        Duration::from_millis(25),
    ))));
    let service = ColumnDefinitionService::new(engine);
    let ctx = EvaluationContext::new(Scope::All);
    let def = column_with_default();

    thread::scope(|s| {
        for _ in 0..6 {
            s.spawn(|| {
                let result = service.evaluate(&def, &ctx).unwrap();
                assert_eq!(first_p(result.data()), Some(&Value::Integer(5)));
            });
        }
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn evaluate_all_keeps_input_order() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = Arc::new(Engine::new(Arc::new(counting_registry(
        calls.clone(),
        Duration::from_millis(5),
    ))));
    let service = ColumnDefinitionService::new(engine);
    let ctx = EvaluationContext::new(Scope::All);
    let def = column_with_default();

    let mapped: Vec<Mapped> = [3i64, 1, 3, 2, 3]
        .iter()
        .map(|p| Mapped::new(def.clone()).literal("p", *p))
        .collect();
    let results = service.evaluate_all(&mapped, &ctx).unwrap();

    let values: Vec<_> = results.iter().map(|r| first_p(r.data()).cloned()).collect();
    assert_eq!(
        values,
        vec![
            Some(Value::Integer(3)),
            Some(Value::Integer(1)),
            Some(Value::Integer(3)),
            Some(Value::Integer(2)),
            Some(Value::Integer(3)),
        ]
    );
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

// ── Cycles ──────────────────────────────────────────────────────────

#[test]
fn mutually_dependent_definitions_report_a_cycle() {
    let repository = Arc::new(MemoryRepository::new());
    let lookup = repository.clone();

    let mut registry = EvaluatorRegistry::new();
    registry
        .register_type(
            DefinitionFamily::Report,
            "alias",
            move |def: &Definition, _: &Parameters, ctx: &EvaluationContext, engine: &Engine| -> anyhow::Result<DataSet> {
                let target = def
                    .config
                    .get("target")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| anyhow::anyhow!("alias without target"))?;
                let target = lookup.load(target)?;
                Ok(engine.evaluate(&target, ctx)?.as_ref().clone())
            },
        )
        .unwrap();

    for (id, target) in [("a", "b"), ("b", "a")] {
        let config = serde_yaml::from_str(&format!("target: {target}")).unwrap();
        repository
            .insert(
                Definition::new(DefinitionFamily::Report, id, id)
                    .with_type("alias")
                    .with_config(config),
            )
            .unwrap();
    }

    let engine = Arc::new(Engine::new(Arc::new(registry)));
    let service = ReportDefinitionService::new(engine);
    let ctx = EvaluationContext::new(Scope::All);

    let err = service
        .evaluate_stored("a", repository.as_ref(), &ctx)
        .unwrap_err();

    match err {
        EvalError::CircularDefinition { chain } => assert_eq!(chain, "a -> b -> a"),
        other => panic!("expected a cycle, got {other}"),
    }
    assert!(ctx.cache().is_empty());
}

// ── Built-in evaluators over the shipped definitions ────────────────

#[test]
fn shipped_definitions_evaluate_with_builtins() {
    let loader = DefinitionLoader::new(definitions_dir());
    loader.load_all().unwrap();
    let engine = Arc::new(Engine::new(Arc::new(EvaluatorRegistry::with_builtins())));
    let ctx = EvaluationContext::new(Scope::subjects([1, 2, 3]));

    let types = DataSetDefinitionService::new(engine.clone())
        .evaluate_stored("visit-types", &loader, &ctx)
        .unwrap();
    assert_eq!(types.data().len(), 3);

    let site = ColumnDefinitionService::new(engine.clone())
        .evaluate_stored("study-site", &loader, &ctx)
        .unwrap();
    assert_eq!(site.data().len(), 3);
    assert_eq!(
        site.data().rows()[0].value("site"),
        Some(&Value::from("North"))
    );

    let overview = loader.load("visit-overview").unwrap();
    let mapped = Mapped::new(overview)
        .nested("types", Mapped::new(loader.load("visit-types").unwrap()))
        .nested("locations", Mapped::new(loader.load("visit-locations").unwrap()));
    let report = ReportDefinitionService::new(engine)
        .evaluate_mapped(&mapped, &ctx)
        .unwrap();

    let columns: Vec<_> = report.data().columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, vec!["subject", "visit_type", "location"]);
    assert_eq!(report.data().len(), 6);
    // The nested visit-types evaluation was served from the cache.
    assert!(ctx.cache().stats().hits >= 1);
}

#[test]
fn nested_data_sets_with_equal_rows_but_different_columns_are_cached_apart() {
    let loader = DefinitionLoader::new(definitions_dir());
    loader.load_all().unwrap();
    let engine = Arc::new(Engine::new(Arc::new(EvaluatorRegistry::with_builtins())));
    // No shipped row belongs to subject 99, so both nested data sets are empty.
    let ctx = EvaluationContext::new(Scope::subjects([99]));
    let reports = ReportDefinitionService::new(engine);

    let overview = loader.load("visit-overview").unwrap();
    let by_type = Mapped::new(overview.clone())
        .nested("types", Mapped::new(loader.load("visit-types").unwrap()));
    let by_location = Mapped::new(overview)
        .nested("types", Mapped::new(loader.load("visit-locations").unwrap()));

    let a = reports.evaluate_mapped(&by_type, &ctx).unwrap();
    let b = reports.evaluate_mapped(&by_location, &ctx).unwrap();

    assert_ne!(a.key(), b.key());
    assert!(!b.was_cached());
    let columns = |data: &DataSet| -> Vec<String> {
        data.columns().iter().map(|c| c.name.clone()).collect()
    };
    assert_eq!(columns(a.data()), vec!["subject", "visit_type"]);
    assert_eq!(columns(b.data()), vec!["subject", "location"]);
    // visit-types, visit-locations and one entry per report mapping.
    assert_eq!(ctx.cache().len(), 4);
}
