mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str, load_rules, ConfigPaths};
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("No {kind} named '{name}' in configuration")]
    Missing { kind: &'static str, name: String },

    #[error("Unsupported {kind} type: {backend}")]
    UnsupportedBackend { kind: &'static str, backend: String },
}

impl ConfigError {
    pub fn missing(kind: &'static str, name: impl Into<String>) -> Self {
        Self::Missing {
            kind,
            name: name.into(),
        }
    }

    pub fn unsupported(kind: &'static str, backend: impl Into<String>) -> Self {
        Self::UnsupportedBackend {
            kind,
            backend: backend.into(),
        }
    }
}
