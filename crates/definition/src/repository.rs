//! Persistence boundary for definitions.
//!
//! Evaluation only ever reads definitions. Saving and retiring belong to the
//! host application and are not part of this trait.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::loader::{DefinitionError, Result};
use crate::schema::Definition;

/// Read-only source of definitions, keyed by id.
///
/// Implementations may block (database, remote store); callers treat `load`
/// as a synchronous call.
pub trait DefinitionRepository: Send + Sync {
    /// Fetch a definition by id.
    fn load(&self, id: &str) -> Result<Arc<Definition>>;

    /// All known definition ids, sorted.
    fn ids(&self) -> Vec<String>;
}

/// In-memory repository, mostly for tests and embedding.
#[derive(Default)]
pub struct MemoryRepository {
    definitions: RwLock<HashMap<String, Arc<Definition>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a definition, replacing any previous version.
    pub fn insert(&self, definition: Definition) -> Result<Arc<Definition>> {
        definition.validate()?;
        let definition = Arc::new(definition);
        self.definitions
            .write()
            .expect("definitions lock poisoned")
            .insert(definition.metadata.id.clone(), Arc::clone(&definition));
        Ok(definition)
    }
}

impl DefinitionRepository for MemoryRepository {
    fn load(&self, id: &str) -> Result<Arc<Definition>> {
        self.definitions
            .read()
            .expect("definitions lock poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| DefinitionError::NotFound(id.to_string()))
    }

    fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .definitions
            .read()
            .expect("definitions lock poisoned")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DefinitionFamily;

    #[test]
    fn insert_then_load() {
        let repo = MemoryRepository::new();
        repo.insert(Definition::new(DefinitionFamily::Column, "age", "Age"))
            .unwrap();
        assert_eq!(repo.load("age").unwrap().name(), "Age");
        assert_eq!(repo.ids(), vec!["age".to_string()]);
    }

    #[test]
    fn missing_id_is_not_found() {
        let repo = MemoryRepository::new();
        assert!(matches!(repo.load("nope"), Err(DefinitionError::NotFound(id)) if id == "nope"));
    }

    #[test]
    fn invalid_definitions_are_not_stored() {
        let repo = MemoryRepository::new();
        assert!(repo
            .insert(Definition::new(DefinitionFamily::Column, "", "Blank"))
            .is_err());
        assert!(repo.ids().is_empty());
    }
}
