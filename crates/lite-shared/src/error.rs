//! Error types for configuration handling

use thiserror::Error;

/// A configuration value that is present but unusable
#[derive(Debug, Error)]
#[error("Invalid value for '{field}' in '{section}': {reason}")]
pub struct InvalidConfigError {
    pub section: String,
    pub field: String,
    pub reason: String,
}

/// General configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Invalid(#[from] InvalidConfigError),

    #[error("Unsupported configuration format '{0}' (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
