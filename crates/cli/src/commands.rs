//! Subcommand implementations.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tabula_core::config::Config;
use tabula_core::Value;
use tabula_definition::{DefinitionLoader, DefinitionRepository, LoadStatus, Mapped};
use tabula_eval::{
    Engine, EvaluationCache, EvaluationContext, EvaluatorRegistry, Scope,
};
use tabula_render::{ChartRenderer, ReportData};
use tracing::{info, warn};

use crate::cli::{BindingArgs, OutputFormat};

/// Loaded definitions plus an engine wired to the builtin evaluators.
pub struct Workspace {
    loader: DefinitionLoader,
    engine: Engine,
    cache: Arc<EvaluationCache>,
    config: Config,
}

impl Workspace {
    pub fn open(config: Config) -> Result<Self> {
        let loader = DefinitionLoader::new(config.definitions.dir.clone());
        let results = loader
            .load_all()
            .with_context(|| format!("failed to scan {}", config.definitions.dir.display()))?;
        for result in &results {
            if let LoadStatus::Failed { error } = &result.status {
                warn!(path = %result.path.display(), %error, "definition failed to load");
            }
        }
        info!(definitions = loader.len(), "definitions loaded");

        let registry = Arc::new(EvaluatorRegistry::with_builtins());
        let engine = Engine::from_config(registry, &config.evaluation);
        let cache = Arc::new(EvaluationCache::from_config(&config.evaluation));
        Ok(Self {
            loader,
            engine,
            cache,
            config,
        })
    }

    /// `id  family/type  name`, one line per definition.
    pub fn list(&self) -> Result<()> {
        for id in self.loader.ids() {
            let definition = self.loader.load(&id)?;
            let kind = match &definition.definition_type {
                Some(t) => format!("{}/{}", definition.family, t),
                None => definition.family.to_string(),
            };
            println!("{:<24} {:<20} {}", id, kind, definition.name());
        }
        Ok(())
    }

    pub fn eval(&self, id: &str, bindings: &BindingArgs, compact: bool) -> Result<()> {
        let context = self.context(bindings)?;
        let mapped = self.mapped(id, &bindings.maps)?;
        let data = self
            .engine
            .evaluate_mapped(&mapped, &context)
            .with_context(|| format!("failed to evaluate '{id}'"))?;

        let json = if compact {
            serde_json::to_string(data.as_ref())?
        } else {
            serde_json::to_string_pretty(data.as_ref())?
        };
        println!("{json}");
        Ok(())
    }

    pub fn chart(&self, ids: &[String], bindings: &BindingArgs, chart: ChartArgs) -> Result<()> {
        let context = self.context(bindings)?;

        let mut renderer = ChartRenderer::from_config(&self.config.chart)?;
        if let Some(order) = chart.order {
            renderer = renderer.with_order(order.parse()?);
        }
        if let Some(title) = chart.title {
            renderer = renderer.with_title(title);
        }
        if !chart.columns.is_empty() {
            renderer = renderer.with_columns(chart.columns);
        }

        let mut report: Option<ReportData> = None;
        for id in ids {
            let mapped = self.mapped(id, &bindings.maps)?;
            let data = self
                .engine
                .evaluate_mapped(&mapped, &context)
                .with_context(|| format!("failed to evaluate '{id}'"))?;
            let name = mapped.definition.name().to_string();
            report
                .get_or_insert_with(|| ReportData::new(name.clone()))
                .insert(name, data);
        }
        let report = report.ok_or_else(|| anyhow!("no definitions to chart"))?;

        let payload = renderer.render(&report)?;
        let out = match chart.format {
            OutputFormat::Json => payload.to_json_pretty()?,
            OutputFormat::Script => payload.to_script()?,
        };
        println!("{out}");

        let stats = self.cache.stats();
        info!(hits = stats.hits, misses = stats.misses, "chart rendered");
        Ok(())
    }

    fn context(&self, bindings: &BindingArgs) -> Result<EvaluationContext> {
        let scope = if bindings.scope.is_empty() {
            Scope::All
        } else {
            Scope::subjects(bindings.scope.iter().copied())
        };
        let mut context = EvaluationContext::with_cache(scope, Arc::clone(&self.cache));
        for raw in &bindings.params {
            let (name, value) = split_pair(raw)?;
            context = context.with_parameter(name, Value::parse_literal(value));
        }
        if let Some(date) = bindings.date {
            context = context.with_evaluation_date(date);
        }
        Ok(context)
    }

    fn mapped(&self, id: &str, maps: &[String]) -> Result<Mapped> {
        let definition = self.loader.load(id)?;
        let mut mapped = Mapped::new(definition);
        for raw in maps {
            let (slot, binding) = split_pair(raw)?;
            mapped = match parse_binding(binding) {
                Binding::Definition(target) => {
                    let nested = Mapped::new(self.loader.load(target)?);
                    mapped.nested(slot, nested)
                }
                Binding::Expression(expr) => mapped.expression(slot, expr),
                Binding::Literal(value) => mapped.literal(slot, value),
            };
        }
        if let Some(unknown) = mapped.unknown_parameters().next() {
            bail!("'{}' has no parameter '{}'", id, unknown);
        }
        Ok(mapped)
    }
}

/// Chart-only options.
pub struct ChartArgs {
    pub order: Option<String>,
    pub title: Option<String>,
    pub columns: Vec<String>,
    pub format: OutputFormat,
}

#[derive(Debug, PartialEq)]
enum Binding<'a> {
    Definition(&'a str),
    Expression(&'a str),
    Literal(Value),
}

fn parse_binding(raw: &str) -> Binding<'_> {
    let trimmed = raw.trim();
    if let Some(id) = trimmed.strip_prefix('@') {
        Binding::Definition(id.trim())
    } else if trimmed.starts_with("${") && trimmed.ends_with('}') {
        Binding::Expression(trimmed)
    } else {
        Binding::Literal(Value::parse_literal(raw))
    }
}

fn split_pair(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("empty name in '{raw}'");
    }
    Ok((name, value))
}
