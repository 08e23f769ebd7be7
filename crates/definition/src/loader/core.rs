//! Core [`DefinitionLoader`] struct: filesystem-backed definition loading.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::repository::DefinitionRepository;
use crate::schema::Definition;

use super::error::{DefinitionError, LoadResult, LoadStatus, Result};

/// Filesystem-backed definition loader.
///
/// Scans a directory (recursively) for `*.yml` / `*.yaml` files, deserializes
/// them into [`Definition`] instances and maintains an in-memory map keyed by
/// definition id. Loaded definitions are immutable; reloading a file replaces
/// the stored `Arc` rather than mutating it.
pub struct DefinitionLoader {
    /// Root directory containing definition YAML files.
    definitions_dir: PathBuf,
    /// In-memory store of all definitions keyed by `metadata.id`.
    definitions: Arc<RwLock<HashMap<String, Arc<Definition>>>>,
    /// Which file each definition id came from.
    sources: RwLock<HashMap<String, PathBuf>>,
}

impl DefinitionLoader {
    /// Create a new loader for the given directory.
    pub fn new(definitions_dir: PathBuf) -> Self {
        if !definitions_dir.exists() {
            warn!(path = %definitions_dir.display(), "definitions directory does not exist");
        }
        Self {
            definitions_dir,
            definitions: Arc::new(RwLock::new(HashMap::new())),
            sources: RwLock::new(HashMap::new()),
        }
    }

    /// Root directory this loader scans.
    pub fn definitions_dir(&self) -> &Path {
        &self.definitions_dir
    }

    /// Recursively scan the definitions directory and load all YAML files.
    ///
    /// Dotfiles (filenames starting with `.`) and non-YAML files are skipped.
    /// Parse errors are reported per-file but do not abort the scan.
    pub fn load_all(&self) -> Result<Vec<LoadResult>> {
        let mut results = Vec::new();
        self.scan_dir_recursive(&self.definitions_dir, &mut results)?;
        Ok(results)
    }

    /// Recursively scan a directory for YAML definition files.
    fn scan_dir_recursive(&self, dir: &Path, results: &mut Vec<LoadResult>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "failed to read directory");
                return Ok(());
            }
        };

        // Sorted so duplicate-id resolution does not depend on directory order.
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        paths.sort();

        for path in paths {
            // Skip dotfiles/dotdirs
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    if path.is_file() {
                        results.push(LoadResult {
                            path,
                            status: LoadStatus::Skipped {
                                reason: "dotfile".to_string(),
                            },
                        });
                    }
                    continue;
                }
            }

            if path.is_dir() {
                self.scan_dir_recursive(&path, results)?;
                continue;
            }

            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yml" || e == "yaml")
                .unwrap_or(false);

            if !is_yaml {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped {
                        reason: "not a YAML file".to_string(),
                    },
                });
                continue;
            }

            let status = match self.load_file(&path).and_then(|def| self.insert_from(def, &path)) {
                Ok(definition_id) => {
                    info!(definition_id = %definition_id, path = %path.display(), "loaded definition");
                    LoadStatus::Loaded { definition_id }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load definition file");
                    LoadStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.push(LoadResult { path, status });
        }

        Ok(())
    }

    /// Parse and validate a single YAML file.
    pub fn load_file(&self, path: &Path) -> Result<Definition> {
        let contents = fs::read_to_string(path)?;
        let definition: Definition = serde_yaml::from_str(&contents)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Store a definition loaded from `path`.
    ///
    /// A second file claiming an id already owned by a different file is
    /// rejected; reloading the owning file replaces the stored version.
    fn insert_from(&self, definition: Definition, path: &Path) -> Result<String> {
        let id = definition.metadata.id.clone();
        let mut sources = self.sources.write().expect("sources lock poisoned");
        if let Some(owner) = sources.get(&id) {
            if owner != path {
                return Err(DefinitionError::Validation(format!(
                    "duplicate definition id '{}' (already loaded from {})",
                    id,
                    owner.display()
                )));
            }
        }
        sources.insert(id.clone(), path.to_path_buf());
        self.definitions
            .write()
            .expect("definitions lock poisoned")
            .insert(id.clone(), Arc::new(definition));
        Ok(id)
    }

    /// Insert a definition that did not come from a file.
    pub fn insert(&self, definition: Definition) -> Result<()> {
        definition.validate()?;
        self.definitions
            .write()
            .expect("definitions lock poisoned")
            .insert(definition.metadata.id.clone(), Arc::new(definition));
        Ok(())
    }

    /// Get a handle to the shared definitions map.
    pub fn definitions(&self) -> Arc<RwLock<HashMap<String, Arc<Definition>>>> {
        Arc::clone(&self.definitions)
    }

    /// Look up a single definition by id.
    pub fn get(&self, id: &str) -> Option<Arc<Definition>> {
        self.definitions
            .read()
            .expect("definitions lock poisoned")
            .get(id)
            .cloned()
    }

    /// Number of loaded definitions.
    pub fn len(&self) -> usize {
        self.definitions
            .read()
            .expect("definitions lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DefinitionRepository for DefinitionLoader {
    fn load(&self, id: &str) -> Result<Arc<Definition>> {
        self.get(id)
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
