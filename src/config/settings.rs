//! TOML-based configuration for Metrica.
//!
//! Supports a config file (metrica.toml) with environment variable expansion
//! in file paths.
//!
//! Example configuration:
//! ```toml
//! [data]
//! model = "${METRICA_HOME}/model.toml"
//! dataset = "./data/sales.json"
//!
//! [time]
//! year_key = "fiscalYear"
//! period_key = "fiscalMonth"
//!
//! [format]
//! currency_symbol = "€"
//! decimals = 2
//! percent_decimals = 1
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::context::TimeKeys;
use crate::format::FormatSettings;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Default model and dataset files.
    pub data: DataSettings,

    /// Keys read by the built-in time transforms.
    pub time: TimeKeys,

    /// Display formatting.
    pub format: FormatSettings,
}

/// Default input files.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DataSettings {
    /// Model definition file (supports ${ENV_VAR} expansion).
    pub model: Option<String>,

    /// Dataset file (supports ${ENV_VAR} expansion).
    pub dataset: Option<String>,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `METRICA_CONFIG`
    /// 2. `./metrica.toml`
    /// 3. `~/.config/metrica/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("METRICA_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("metrica.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("metrica").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.time.year_key.is_empty() || self.time.period_key.is_empty() {
            return Err(SettingsError::InvalidConfig(
                "time.year_key and time.period_key must not be empty".to_string(),
            ));
        }
        if self.time.year_key == self.time.period_key {
            return Err(SettingsError::InvalidConfig(format!(
                "time.year_key and time.period_key are both '{}'",
                self.time.year_key
            )));
        }
        Ok(())
    }

    /// The model file path with environment variables expanded.
    pub fn model_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        resolve_path(self.data.model.as_deref())
    }

    /// The dataset file path with environment variables expanded.
    pub fn dataset_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        resolve_path(self.data.dataset.as_deref())
    }
}

fn resolve_path(path: Option<&str>) -> Result<Option<PathBuf>, SettingsError> {
    path.map(|p| expand_env_vars(p).map(PathBuf::from)).transpose()
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.next_if_eq(&'{').is_some() {
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            // $VAR ends at the first non-alphanumeric/underscore
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
