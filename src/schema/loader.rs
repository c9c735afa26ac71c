//! Schema loader for loading resource schemas from disk at startup
//!
//! - One file per resource: `<schema_dir>/<resource>.json`
//! - Malformed files and duplicate resources are FATAL
//! - References between resources are resolved when the registry is
//!   compiled, through the `id` field of the target resource

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::validators::Validator;

use super::compiler::{CompiledSchema, ReferenceChecker};
use super::definition::SchemaDef;
use super::errors::CompileError;
use super::types::Schema;

/// Name of the field other resources reference.
pub const ID_FIELD: &str = "id";

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("malformed schema {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("resource already registered: {0}")]
    DuplicateResource(String),

    #[error("resource {resource}: {source}")]
    Compile {
        resource: String,
        #[source]
        source: CompileError,
    },
}

pub type LoaderResult<T> = Result<T, LoaderError>;

/// Loads resource schemas and keeps them in a registry until compiled.
pub struct SchemaLoader {
    schema_dir: PathBuf,
    config: EngineConfig,
    resources: BTreeMap<String, Schema>,
}

impl SchemaLoader {
    /// Creates a loader reading `<schema_dir>/*.json`.
    pub fn new(schema_dir: &Path) -> Self {
        Self {
            schema_dir: schema_dir.to_path_buf(),
            config: EngineConfig::default(),
            resources: BTreeMap::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads every `*.json` file of the schema directory.
    ///
    /// A missing directory holds no resources.
    pub fn load_all(&mut self) -> LoaderResult<()> {
        if !self.schema_dir.exists() {
            return Ok(());
        }

        let io_err = |path: &Path| {
            let path = path.display().to_string();
            move |source: io::Error| LoaderError::Io { path, source }
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.schema_dir).map_err(io_err(&self.schema_dir))? {
            let path = entry.map_err(io_err(&self.schema_dir))?.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            self.load_schema_file(&path)?;
        }
        Ok(())
    }

    fn load_schema_file(&mut self, path: &Path) -> LoaderResult<()> {
        let content = fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.load_str(&name, &content).map_err(|e| {
            warn!("failed to load schema {}: {}", path.display(), e);
            match e {
                LoaderError::Malformed { source, .. } => LoaderError::Malformed {
                    path: path.display().to_string(),
                    source,
                },
                other => other,
            }
        })
    }

    /// Parses a JSON schema definition and registers it under `name`.
    pub fn load_str(&mut self, name: &str, json: &str) -> LoaderResult<()> {
        let def: SchemaDef = serde_json::from_str(json).map_err(|source| LoaderError::Malformed {
            path: name.to_string(),
            source,
        })?;
        self.register(name, def.build(&self.config))
    }

    /// Registers a schema built in code.
    pub fn register(&mut self, name: &str, schema: Schema) -> LoaderResult<()> {
        if self.resources.contains_key(name) {
            return Err(LoaderError::DuplicateResource(name.to_string()));
        }
        debug!("registered resource {} ({} fields)", name, schema.fields.len());
        self.resources.insert(name.to_string(), schema);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.resources.get(name)
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Compiles every resource, resolving references against this registry.
    pub fn compile(self) -> LoaderResult<BTreeMap<String, CompiledSchema>> {
        let mut compiled = BTreeMap::new();
        for (name, schema) in &self.resources {
            let schema = schema.clone().into_compiled(&self).map_err(|source| {
                warn!("failed to compile resource {}: {}", name, source);
                LoaderError::Compile {
                    resource: name.clone(),
                    source,
                }
            })?;
            compiled.insert(name.clone(), schema);
        }
        Ok(compiled)
    }
}

impl ReferenceChecker for SchemaLoader {
    fn reference_checker(&self, path: &str) -> Option<Validator> {
        self.resources
            .get(path)?
            .field(ID_FIELD)?
            .validator
            .clone()
    }
}
