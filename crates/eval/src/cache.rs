//! Compute-once evaluation cache.
//!
//! The cache maps a [`CacheKey`] to a per-key slot. Callers hold the map lock
//! only long enough to fetch or create the slot, then lock the slot itself:
//! the first caller computes and stores the result, concurrent callers for
//! the same key block on the slot and observe the stored result. Failed
//! computations leave nothing behind.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use serde::Serialize;
use tabula_core::config::EvaluationConfig;
use tabula_core::DataSet;
use tabula_definition::Definition;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::Parameters;
use crate::error::Result;

/// Identity of one evaluation: definition, resolved parameters and scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    pub definition_id: String,
    /// Fingerprint of the resolved parameter values.
    pub parameters: String,
    /// Fingerprint of the scope and evaluation date.
    pub scope: String,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}/{}]",
            self.definition_id,
            short(&self.parameters),
            short(&self.scope)
        )
    }
}

fn short(fingerprint: &str) -> &str {
    fingerprint.get(..8).unwrap_or(fingerprint)
}

/// A stored evaluation result.
#[derive(Debug)]
pub struct CachedEvaluation {
    pub key: CacheKey,
    /// The definition version that produced the data.
    pub definition: Arc<Definition>,
    /// Resolved parameters the evaluator ran with.
    pub parameters: Parameters,
    pub data: Arc<DataSet>,
}

impl CachedEvaluation {
    fn check(&self, key: &CacheKey, definition: &Definition) -> std::result::Result<(), CacheInconsistency> {
        if self.key != *key {
            return Err(CacheInconsistency::KeyMismatch {
                expected: key.to_string(),
                found: self.key.to_string(),
            });
        }
        if self.definition.metadata.uuid != definition.metadata.uuid {
            return Err(CacheInconsistency::DefinitionChanged {
                definition: definition.metadata.id.clone(),
                cached: self.definition.metadata.uuid,
                requested: definition.metadata.uuid,
            });
        }
        Ok(())
    }
}

/// A stored entry that does not belong to the key it was found under.
///
/// Never surfaced to callers: the entry is discarded and recomputed.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CacheInconsistency {
    #[error("entry stored under {expected} carries key {found}")]
    KeyMismatch { expected: String, found: String },

    #[error("entry for '{definition}' was computed from version {cached}, requested {requested}")]
    DefinitionChanged {
        definition: String,
        cached: Uuid,
        requested: Uuid,
    },
}

type Slot = Arc<Mutex<Option<Arc<CachedEvaluation>>>>;

/// Counters reported by [`EvaluationCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inconsistencies: u64,
    pub entries: usize,
}

/// Shared, thread-safe evaluation cache.
pub struct EvaluationCache {
    /// `None` when caching is disabled.
    slots: Option<Mutex<LruCache<CacheKey, Slot>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    inconsistencies: AtomicU64,
}

impl EvaluationCache {
    /// Bounded cache holding at most `capacity` keys (least recently used
    /// keys are evicted). A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        match NonZeroUsize::new(capacity) {
            Some(cap) => Self::with_slots(Some(LruCache::new(cap))),
            None => Self::disabled(),
        }
    }

    pub fn unbounded() -> Self {
        Self::with_slots(Some(LruCache::unbounded()))
    }

    /// A cache that stores nothing; every lookup computes.
    pub fn disabled() -> Self {
        Self::with_slots(None)
    }

    pub fn from_config(config: &EvaluationConfig) -> Self {
        Self::new(config.cache_capacity)
    }

    fn with_slots(slots: Option<LruCache<CacheKey, Slot>>) -> Self {
        Self {
            slots: slots.map(Mutex::new),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inconsistencies: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.slots.is_some()
    }

    /// Return the entry stored for `key`, or run `compute` and store its
    /// result. The boolean is `true` when the entry came from the cache.
    ///
    /// `compute` runs at most once per key while an entry is stored; an
    /// error from `compute` is returned as-is and leaves the key absent.
    /// Must not be re-entered for the same key on the same thread.
    pub fn get_or_compute<F>(
        &self,
        key: &CacheKey,
        definition: &Definition,
        compute: F,
    ) -> Result<(Arc<CachedEvaluation>, bool)>
    where
        F: FnOnce() -> Result<CachedEvaluation>,
    {
        let Some(slots) = &self.slots else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return compute().map(|entry| (Arc::new(entry), false));
        };

        let slot = {
            let mut map = slots.lock().expect("cache map lock poisoned");
            match map.get(key) {
                Some(slot) => Arc::clone(slot),
                None => {
                    let slot: Slot = Arc::new(Mutex::new(None));
                    map.put(key.clone(), Arc::clone(&slot));
                    slot
                }
            }
        };

        // A panicking evaluator poisons the slot while it is still empty;
        // the next caller simply computes again.
        let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = guard.as_ref() {
            match entry.check(key, definition) {
                Ok(()) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "evaluation cache hit");
                    return Ok((Arc::clone(entry), true));
                }
                Err(inconsistency) => {
                    self.inconsistencies.fetch_add(1, Ordering::Relaxed);
                    warn!(key = %key, error = %inconsistency, "discarding inconsistent cache entry");
                    *guard = None;
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "evaluation cache miss");

        match compute() {
            Ok(entry) => {
                let entry = Arc::new(entry);
                *guard = Some(Arc::clone(&entry));
                Ok((entry, false))
            }
            Err(e) => {
                drop(guard);
                self.discard_empty(slots, key, &slot);
                Err(e)
            }
        }
    }

    /// Remove `slot` from the map if it is still the slot for `key` and
    /// nobody has filled or claimed it since.
    fn discard_empty(&self, slots: &Mutex<LruCache<CacheKey, Slot>>, key: &CacheKey, slot: &Slot) {
        let mut map = slots.lock().expect("cache map lock poisoned");
        let still_empty = match map.peek(key) {
            Some(current) if Arc::ptr_eq(current, slot) => {
                matches!(current.try_lock().as_deref(), Ok(None))
            }
            _ => false,
        };
        if still_empty {
            map.pop(key);
        }
    }

    /// Whether a computed entry is stored for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        let Some(slots) = &self.slots else {
            return false;
        };
        let map = slots.lock().expect("cache map lock poisoned");
        map.peek(key)
            .map(|slot| matches!(slot.try_lock().as_deref(), Ok(Some(_))))
            .unwrap_or(false)
    }

    /// Number of computed entries. Entries still being computed are not
    /// counted.
    pub fn len(&self) -> usize {
        let Some(slots) = &self.slots else {
            return 0;
        };
        let map = slots.lock().expect("cache map lock poisoned");
        map.iter()
            .filter(|(_, slot)| matches!(slot.try_lock().as_deref(), Ok(Some(_))))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Some(slots) = &self.slots {
            slots.lock().expect("cache map lock poisoned").clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inconsistencies: self.inconsistencies.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

impl Default for EvaluationCache {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl fmt::Debug for EvaluationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationCache")
            .field("enabled", &self.is_enabled())
            .field("stats", &self.stats())
            .finish()
    }
}
