//! JSON-Schema validation and the pluggable schema-provider seam.
//!
//! The validator only ever consumes a resolved schema document. Where the
//! schema comes from is a provider concern: the core ships a local-file
//! provider (`.json`, or YAML parsed as JSON); generate-on-demand providers
//! can be plugged in behind the same trait.

use crate::config::{GeneratedSchema, SchemaSpec};
use crate::error::{ErrorKind, TestFailure};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read schema {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse schema {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("schema generation for type '{type_name}' requires a generator provider")]
    GenerationUnsupported { type_name: String },
}

/// Resolves a schema reference into a schema document.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn resolve(&self, spec: &SchemaSpec) -> Result<Value, SchemaError>;
}

/// Provider that only reads schemas from the local filesystem. For a
/// structured spec it loads the pre-generated `target` file when present and
/// reports generation as unsupported otherwise.
#[derive(Debug, Default, Clone)]
pub struct LocalSchemaProvider;

#[async_trait]
impl SchemaProvider for LocalSchemaProvider {
    async fn resolve(&self, spec: &SchemaSpec) -> Result<Value, SchemaError> {
        match spec {
            SchemaSpec::Path(path) => load_schema_file(path),
            SchemaSpec::Generated(generated) => self.resolve_generated(generated),
        }
    }
}

impl LocalSchemaProvider {
    fn resolve_generated(&self, spec: &GeneratedSchema) -> Result<Value, SchemaError> {
        if let Some(target) = &spec.target {
            if target.exists() {
                return load_schema_file(target);
            }
        }
        Err(SchemaError::GenerationUnsupported {
            type_name: spec.type_name.clone(),
        })
    }
}

fn load_schema_file(path: &Path) -> Result<Value, SchemaError> {
    if !path.exists() {
        return Err(SchemaError::NotFound(path.to_path_buf()));
    }
    let contents = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    // Schemas may be stored as JSON or as YAML carrying the same structure.
    if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&contents).map_err(|e| SchemaError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    } else {
        serde_yaml::from_str(&contents).map_err(|e| SchemaError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Validate an instance against a schema document (draft 2020-12).
///
/// The failure message carries the failing instance path, the violated
/// validator keyword, and the expected constraint value.
pub fn validate_document(instance: &Value, schema: &Value) -> Result<(), TestFailure> {
    let validator = jsonschema::draft202012::new(schema).map_err(|e| {
        TestFailure::new(
            ErrorKind::SchemaValidationFailure,
            format!("invalid schema document: {}", e),
        )
    })?;

    let Some(error) = validator.iter_errors(instance).next() else {
        return Ok(());
    };

    let instance_path = error.instance_path.to_string();
    let trimmed = instance_path.trim_start_matches('/');
    let display_path = if trimmed.is_empty() {
        "<root>".to_string()
    } else {
        trimmed.replace('/', ".")
    };
    let schema_path = error.schema_path.to_string();
    let keyword = schema_path.rsplit('/').next().unwrap_or("");
    let constraint = schema
        .pointer(&schema_path)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<unknown>".to_string());

    Err(TestFailure::new(
        ErrorKind::SchemaValidationFailure,
        format!(
            "{} at path '{}' (validator: {}, expected: {})",
            error, display_path, keyword, constraint
        ),
    ))
}
