//! Schema loader for reading model definitions from disk
//!
//! - One model per `*.json` file in the schema directory
//! - Files are read in name order so errors are reproducible
//! - A missing directory or malformed file fails the load

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{DomainError, DomainResult};

use super::registry::Registry;
use super::types::ModelDef;

/// Reads model files into a [`Registry`]
pub struct SchemaLoader {
    schema_dir: PathBuf,
    registry: Registry,
}

impl SchemaLoader {
    pub fn new(schema_dir: impl AsRef<Path>) -> Self {
        Self {
            schema_dir: schema_dir.as_ref().to_path_buf(),
            registry: Registry::new(),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads every model file, then validates cross-model references.
    pub fn load_all(&mut self) -> DomainResult<()> {
        if !self.schema_dir.is_dir() {
            return Err(DomainError::schema(format!(
                "schema directory {} does not exist",
                self.schema_dir.display()
            )));
        }

        let entries = fs::read_dir(&self.schema_dir).map_err(|e| {
            DomainError::schema(format!(
                "failed to read {}: {}",
                self.schema_dir.display(),
                e
            ))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                DomainError::schema(format!("failed to read directory entry: {}", e))
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            self.load_model_file(path)?;
        }
        self.registry.validate()
    }

    /// Loads a single model file.
    pub fn load_model_file(&mut self, path: &Path) -> DomainResult<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            DomainError::schema(format!("{}: failed to read file: {}", path.display(), e))
        })?;
        let model: ModelDef = serde_json::from_str(&content).map_err(|e| {
            DomainError::schema(format!("{}: invalid JSON: {}", path.display(), e))
        })?;
        self.registry
            .register_model(model)
            .map_err(|e| DomainError::schema(format!("{}: {}", path.display(), e)))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }
}
