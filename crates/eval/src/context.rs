//! Ambient state threaded through every evaluation call.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use tabula_core::{Cohort, SubjectId, Value};

use crate::cache::{CacheKey, EvaluationCache};
use crate::fingerprint;

/// Parameter values by name. Ordered so fingerprints are deterministic.
pub type Parameters = BTreeMap<String, Value>;

/// The population an evaluation is restricted to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Scope {
    /// No restriction.
    #[default]
    All,
    /// Only the members of this cohort.
    Subjects(Cohort),
}

impl Scope {
    pub fn subjects(ids: impl IntoIterator<Item = SubjectId>) -> Self {
        Scope::Subjects(Cohort::new(ids))
    }

    pub fn includes(&self, subject: SubjectId) -> bool {
        match self {
            Scope::All => true,
            Scope::Subjects(cohort) => cohort.contains(subject),
        }
    }
}

/// State shared by one logical evaluation request.
///
/// Contexts are never mutated once handed to the engine: parameter overlays
/// and lineage tracking produce derived copies that stay local to the call.
/// The cache handle is the only shared piece; cloning a context shares it.
///
/// Evaluation is read-only. Hosts that keep definitions or source data in a
/// transactional store must run evaluations inside a read-only transaction;
/// the engine itself does not open or check one.
#[derive(Clone)]
pub struct EvaluationContext {
    scope: Scope,
    parameters: Parameters,
    evaluation_date: Option<NaiveDate>,
    cache: Arc<EvaluationCache>,
    /// Keys being evaluated on the current call chain, outermost first.
    lineage: Vec<CacheKey>,
}

impl EvaluationContext {
    /// A context with its own cache; results live as long as the context
    /// (and its clones).
    pub fn new(scope: Scope) -> Self {
        Self::with_cache(scope, Arc::new(EvaluationCache::unbounded()))
    }

    /// A context sharing a longer-lived cache.
    pub fn with_cache(scope: Scope, cache: Arc<EvaluationCache>) -> Self {
        Self {
            scope,
            parameters: Parameters::new(),
            evaluation_date: None,
            cache,
            lineage: Vec::new(),
        }
    }

    /// Builder: set a global parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Builder: set the evaluation date (part of the cache scope).
    pub fn with_evaluation_date(mut self, date: NaiveDate) -> Self {
        self.evaluation_date = Some(date);
        self
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn evaluation_date(&self) -> Option<NaiveDate> {
        self.evaluation_date
    }

    pub fn cache(&self) -> &Arc<EvaluationCache> {
        &self.cache
    }

    /// Fingerprint of scope and evaluation date, used in cache keys.
    pub fn scope_fingerprint(&self) -> String {
        fingerprint::scope(&self.scope, self.evaluation_date)
    }

    /// Copy of this context restricted to another scope, sharing the cache.
    pub fn with_scope(&self, scope: Scope) -> Self {
        Self {
            scope,
            ..self.clone()
        }
    }

    /// Copy of this context with `overlay` layered over the global
    /// parameters. Overlay values win on name collision.
    pub fn derive(&self, overlay: &Parameters) -> Self {
        let mut parameters = self.parameters.clone();
        for (name, value) in overlay {
            parameters.insert(name.clone(), value.clone());
        }
        Self {
            parameters,
            ..self.clone()
        }
    }

    pub(crate) fn enter(mut self, key: CacheKey) -> Self {
        self.lineage.push(key);
        self
    }

    pub(crate) fn lineage(&self) -> &[CacheKey] {
        &self.lineage
    }

    /// Number of evaluations enclosing this context.
    pub fn depth(&self) -> usize {
        self.lineage.len()
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("scope", &self.scope)
            .field("parameters", &self.parameters)
            .field("evaluation_date", &self.evaluation_date)
            .field("depth", &self.lineage.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_overlays_without_touching_the_original() {
        let ctx = EvaluationContext::new(Scope::All)
            .with_parameter("p", 1i64)
            .with_parameter("q", "keep");

        let mut overlay = Parameters::new();
        overlay.insert("p".to_string(), Value::Integer(7));
        overlay.insert("r".to_string(), Value::Bool(true));
        let derived = ctx.derive(&overlay);

        assert_eq!(derived.parameter("p"), Some(&Value::Integer(7)));
        assert_eq!(derived.parameter("q"), Some(&Value::from("keep")));
        assert_eq!(derived.parameter("r"), Some(&Value::Bool(true)));
        assert_eq!(ctx.parameter("p"), Some(&Value::Integer(1)));
        assert_eq!(ctx.parameter("r"), None);
        assert!(Arc::ptr_eq(ctx.cache(), derived.cache()));
    }

    #[test]
    fn scope_membership() {
        let scope = Scope::subjects([1, 2]);
        assert!(scope.includes(1));
        assert!(!scope.includes(3));
        assert!(Scope::All.includes(3));
    }

    #[test]
    fn evaluation_date_changes_scope_fingerprint() {
        let a = EvaluationContext::new(Scope::All);
        let b = EvaluationContext::new(Scope::All)
            .with_evaluation_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_ne!(a.scope_fingerprint(), b.scope_fingerprint());
    }
}
