//! Family-agnostic evaluation engine.

use std::sync::Arc;
use std::time::Instant;

use tabula_core::config::EvaluationConfig;
use tabula_core::DataSet;
use tabula_definition::{Definition, Mapped};
use tracing::{debug, info};

use crate::cache::{CacheKey, CachedEvaluation};
use crate::context::{EvaluationContext, Parameters};
use crate::error::{EvalError, Result};
use crate::fingerprint;
use crate::registry::{Evaluator, EvaluatorRegistry};
use crate::resolve::{resolve_with, Memo};

/// Default limit on nested evaluations within one call chain.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Dispatches definitions to evaluators and caches their results.
///
/// For one evaluation the engine:
/// 1. looks up the evaluator (unsupported definitions fail before anything
///    else happens, so they never touch the cache)
/// 2. resolves the mapped parameters
/// 3. derives the cache key and checks the call chain for cycles
/// 4. runs the evaluator through the context's cache
pub struct Engine {
    registry: Arc<EvaluatorRegistry>,
    max_depth: usize,
}

impl Engine {
    pub fn new(registry: Arc<EvaluatorRegistry>) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn from_config(registry: Arc<EvaluatorRegistry>, config: &EvaluationConfig) -> Self {
        Self::new(registry).with_max_depth(config.max_depth)
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &Arc<EvaluatorRegistry> {
        &self.registry
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Evaluate a definition with parameters taken from the context's
    /// globals and the declared defaults.
    pub fn evaluate(&self, definition: &Arc<Definition>, context: &EvaluationContext) -> Result<Arc<DataSet>> {
        self.evaluate_mapped(&Mapped::new(Arc::clone(definition)), context)
    }

    /// Evaluate a mapped definition and return its data.
    pub fn evaluate_mapped(&self, mapped: &Mapped, context: &EvaluationContext) -> Result<Arc<DataSet>> {
        let (entry, _) = self.evaluate_entry(mapped, context)?;
        Ok(Arc::clone(&entry.data))
    }

    /// Evaluate a mapped definition and return the cache entry, plus whether
    /// it was served from the cache.
    pub fn evaluate_entry(
        &self,
        mapped: &Mapped,
        context: &EvaluationContext,
    ) -> Result<(Arc<CachedEvaluation>, bool)> {
        let mut memo = Memo::new();
        self.evaluate_mapped_with(mapped, context, &mut memo)
    }

    pub(crate) fn evaluate_mapped_with(
        &self,
        mapped: &Mapped,
        context: &EvaluationContext,
        memo: &mut Memo,
    ) -> Result<(Arc<CachedEvaluation>, bool)> {
        let definition = &mapped.definition;
        let evaluator = self.registry.lookup(definition)?;
        let parameters = resolve_with(self, mapped, context, memo)?;
        self.run(definition, evaluator.as_ref(), parameters, context)
    }

    fn run(
        &self,
        definition: &Arc<Definition>,
        evaluator: &dyn Evaluator,
        parameters: Parameters,
        context: &EvaluationContext,
    ) -> Result<(Arc<CachedEvaluation>, bool)> {
        let key = CacheKey {
            definition_id: definition.id().to_string(),
            parameters: fingerprint::parameters(&parameters),
            scope: context.scope_fingerprint(),
        };

        // Checked before the slot is locked: re-entering a slot held further
        // up the same call chain would block forever.
        if context.lineage().contains(&key) {
            let mut chain: Vec<&str> = context
                .lineage()
                .iter()
                .map(|k| k.definition_id.as_str())
                .collect();
            chain.push(definition.id());
            return Err(EvalError::CircularDefinition {
                chain: chain.join(" -> "),
            });
        }
        if context.depth() >= self.max_depth {
            return Err(EvalError::DepthLimitExceeded {
                definition: definition.id().to_string(),
                max_depth: self.max_depth,
            });
        }

        let derived = context.derive(&parameters).enter(key.clone());

        context.cache().get_or_compute(&key, definition, || {
            let started = Instant::now();
            debug!(
                definition_id = %definition.id(),
                family = %definition.family,
                depth = derived.depth(),
                "running evaluator"
            );

            let data = evaluator
                .evaluate(definition, &parameters, &derived, self)
                .map_err(|source| wrap_failure(definition.id(), source))?;

            info!(
                definition_id = %definition.id(),
                rows = data.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "evaluated definition"
            );

            Ok(CachedEvaluation {
                key: key.clone(),
                definition: Arc::clone(definition),
                parameters: parameters.clone(),
                data: Arc::new(data),
            })
        })
    }
}

/// Wrap an evaluator failure. Cycle and depth errors raised by nested
/// evaluations pass through unchanged so callers see the structural cause.
fn wrap_failure(definition: &str, source: anyhow::Error) -> EvalError {
    match source.downcast::<EvalError>() {
        Ok(inner @ (EvalError::CircularDefinition { .. } | EvalError::DepthLimitExceeded { .. })) => inner,
        Ok(inner) => EvalError::Evaluation {
            definition: definition.to_string(),
            source: inner.into(),
        },
        Err(source) => EvalError::Evaluation {
            definition: definition.to_string(),
            source,
        },
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("evaluators", &self.registry.len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
