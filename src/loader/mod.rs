//! Loaders for model definitions and datasets.
//!
//! - **Model** (.toml) - fact tables, metrics and label lookups
//! - **Dataset** (.json) - an object mapping table names to arrays of rows
//!
//! # Example
//!
//! ```rust,ignore
//! use metrica::loader::{load_dataset_file, load_model_file};
//! use metrica::context::TimeKeys;
//! use std::path::Path;
//!
//! let model = load_model_file(Path::new("model.toml"), TimeKeys::default())?;
//! let database = load_dataset_file(Path::new("sales.json"))?;
//! ```

mod definition;

use std::fs;
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::context::TimeKeys;
use crate::database::Database;
use crate::semantic::{LabelLookup, MetricError, MetricRegistry};

pub use definition::{FactTableDef, MeasureDef, MetricDef, ModelFile};

/// Errors that can occur when loading a model or dataset.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// Unsupported file extension
    #[error("Unsupported file extension for {kind}: {extension}. Supported: .{expected}")]
    UnsupportedExtension {
        kind: &'static str,
        extension: String,
        expected: &'static str,
    },

    /// IO error reading file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML syntax or shape error in a model file
    #[error("Model parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON syntax or shape error in a dataset file
    #[error("Dataset parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid model definition
    #[error("Invalid {kind} '{name}': {message}")]
    InvalidDefinition {
        kind: &'static str,
        name: String,
        message: String,
    },

    /// Missing required field
    #[error("Missing required field '{field}' in {context}")]
    MissingField { field: &'static str, context: String },

    /// Registry construction failed
    #[error(transparent)]
    Metric(#[from] MetricError),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// A loaded model: the registry plus the label lookups it declares.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub registry: MetricRegistry,
    pub labels: Vec<LabelLookup>,
}

/// Load a model from TOML text.
///
/// The built-in time transforms are registered for `time_keys`.
pub fn load_model(content: &str, time_keys: TimeKeys) -> LoadResult<Model> {
    let file: ModelFile = toml::from_str(content)?;
    let model = file.into_model(time_keys)?;
    debug!(
        "Loaded model: {} metrics, {} fact tables, {} label lookups",
        model.registry.metric_names().len(),
        model.registry.fact_tables().len(),
        model.labels.len()
    );
    Ok(model)
}

/// Load a model from a `.toml` file.
pub fn load_model_file(path: &Path, time_keys: TimeKeys) -> LoadResult<Model> {
    let content = read_with_extension(path, "model", "toml")?;
    load_model(&content, time_keys)
}

/// Load a dataset from JSON text.
pub fn load_dataset(content: &str) -> LoadResult<Database> {
    let database: Database = serde_json::from_str(content)?;
    debug!("Loaded dataset: tables {:?}", database.table_names());
    Ok(database)
}

/// Load a dataset from a `.json` file.
pub fn load_dataset_file(path: &Path) -> LoadResult<Database> {
    let content = read_with_extension(path, "dataset", "json")?;
    load_dataset(&content)
}

fn read_with_extension(path: &Path, kind: &'static str, expected: &'static str) -> LoadResult<String> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !extension.eq_ignore_ascii_case(expected) {
        return Err(LoadError::UnsupportedExtension {
            kind,
            extension: extension.to_string(),
            expected,
        });
    }

    Ok(fs::read_to_string(path)?)
}
