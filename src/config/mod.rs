//! Configuration module for Metrica.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{expand_env_vars, DataSettings, Settings, SettingsError};
