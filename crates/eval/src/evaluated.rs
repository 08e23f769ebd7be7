use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tabula_core::DataSet;
use tabula_definition::Definition;

use crate::cache::{CacheKey, CachedEvaluation};
use crate::context::Parameters;

/// Result of evaluating a definition of family `F`.
///
/// Wraps the shared cache entry, so cloning is cheap and callers holding a
/// result keep it alive after the cache evicts it.
pub struct Evaluated<F> {
    entry: Arc<CachedEvaluation>,
    cached: bool,
    _family: PhantomData<fn() -> F>,
}

impl<F> Evaluated<F> {
    pub(crate) fn new(entry: Arc<CachedEvaluation>, cached: bool) -> Self {
        Self {
            entry,
            cached,
            _family: PhantomData,
        }
    }

    pub fn definition(&self) -> &Arc<Definition> {
        &self.entry.definition
    }

    /// Parameters the evaluator ran with.
    pub fn parameters(&self) -> &Parameters {
        &self.entry.parameters
    }

    pub fn data(&self) -> &DataSet {
        &self.entry.data
    }

    pub fn data_arc(&self) -> Arc<DataSet> {
        Arc::clone(&self.entry.data)
    }

    pub fn key(&self) -> &CacheKey {
        &self.entry.key
    }

    /// Fingerprint of the scope the data was computed for.
    pub fn scope_fingerprint(&self) -> &str {
        &self.entry.key.scope
    }

    /// Whether this result was served from the cache.
    pub fn was_cached(&self) -> bool {
        self.cached
    }
}

impl<F> Clone for Evaluated<F> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.entry), self.cached)
    }
}

impl<F> fmt::Debug for Evaluated<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluated")
            .field("definition", &self.entry.definition.id())
            .field("key", &self.entry.key)
            .field("rows", &self.entry.data.len())
            .field("cached", &self.cached)
            .finish()
    }
}
