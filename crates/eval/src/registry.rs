use std::collections::HashMap;
use std::sync::Arc;

use tabula_core::DataSet;
use tabula_definition::{Definition, DefinitionFamily};

use crate::context::{EvaluationContext, Parameters};
use crate::engine::Engine;
use crate::error::EvalError;
use crate::evaluators;

/// Strategy that turns one definition into a data set.
///
/// Evaluators receive the definition, its resolved parameters, a context
/// whose globals are already overlaid with those parameters, and the engine
/// so they can evaluate further definitions through the shared cache.
/// Failures are reported as `anyhow::Error` and wrapped by the engine.
pub trait Evaluator: Send + Sync {
    fn evaluate(
        &self,
        definition: &Definition,
        parameters: &Parameters,
        context: &EvaluationContext,
        engine: &Engine,
    ) -> anyhow::Result<DataSet>;
}

impl<F> Evaluator for F
where
    F: Fn(&Definition, &Parameters, &EvaluationContext, &Engine) -> anyhow::Result<DataSet>
        + Send
        + Sync,
{
    fn evaluate(
        &self,
        definition: &Definition,
        parameters: &Parameters,
        context: &EvaluationContext,
        engine: &Engine,
    ) -> anyhow::Result<DataSet> {
        self(definition, parameters, context, engine)
    }
}

/// Maps definition families (and optionally concrete types) to evaluators.
///
/// Lookup prefers an evaluator registered for the exact `(family, type)`
/// pair and falls back to the family-wide evaluator. The registry is built
/// once and shared read-only behind an `Arc`.
pub struct EvaluatorRegistry {
    by_family: HashMap<DefinitionFamily, Arc<dyn Evaluator>>,
    by_type: HashMap<(DefinitionFamily, String), Arc<dyn Evaluator>>,
}

impl EvaluatorRegistry {
    pub fn new() -> Self {
        Self {
            by_family: HashMap::new(),
            by_type: HashMap::new(),
        }
    }

    /// Registry with the built-in evaluators installed.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        if let Err(e) = evaluators::register_builtins(&mut registry) {
            // Unreachable on an empty registry.
            tracing::warn!(error = %e, "built-in evaluators not registered");
        }
        registry
    }

    /// Register the evaluator for every definition of `family` without a
    /// more specific registration. Returns error if one is already registered.
    pub fn register(
        &mut self,
        family: DefinitionFamily,
        evaluator: impl Evaluator + 'static,
    ) -> Result<(), RegistryError> {
        if self.by_family.contains_key(&family) {
            return Err(RegistryError::DuplicateRegistration {
                family,
                definition_type: None,
            });
        }
        self.by_family.insert(family, Arc::new(evaluator));
        Ok(())
    }

    /// Register the evaluator for definitions of `family` with the given `type`.
    pub fn register_type(
        &mut self,
        family: DefinitionFamily,
        definition_type: impl Into<String>,
        evaluator: impl Evaluator + 'static,
    ) -> Result<(), RegistryError> {
        let key = (family, definition_type.into());
        if self.by_type.contains_key(&key) {
            let (family, definition_type) = key;
            return Err(RegistryError::DuplicateRegistration {
                family,
                definition_type: Some(definition_type),
            });
        }
        self.by_type.insert(key, Arc::new(evaluator));
        Ok(())
    }

    /// Find the evaluator for a definition.
    pub fn lookup(&self, definition: &Definition) -> Result<Arc<dyn Evaluator>, EvalError> {
        let family = &definition.family;
        if let Some(t) = &definition.definition_type {
            if let Some(evaluator) = self.by_type.get(&(family.clone(), t.clone())) {
                return Ok(Arc::clone(evaluator));
            }
        }
        self.by_family
            .get(family)
            .cloned()
            .ok_or_else(|| EvalError::UnsupportedDefinitionType {
                family: family.clone(),
                definition_type: definition.definition_type.clone(),
            })
    }

    pub fn supports(&self, definition: &Definition) -> bool {
        self.lookup(definition).is_ok()
    }

    /// Number of registrations (family-wide and typed).
    pub fn len(&self) -> usize {
        self.by_family.len() + self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("an evaluator is already registered for family '{family}'{}", type_note(.definition_type))]
    DuplicateRegistration {
        family: DefinitionFamily,
        definition_type: Option<String>,
    },
}

fn type_note(definition_type: &Option<String>) -> String {
    match definition_type {
        Some(t) => format!(" type '{}'", t),
        None => String::new(),
    }
}
