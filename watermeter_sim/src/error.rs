//! Error types for the simulator runtime.

use std::path::PathBuf;
use thiserror::Error;
use watermeter_core::MeterError;

/// Failures loading or validating the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing config key '{0}'")]
    MissingKey(&'static str),

    #[error("Config key '{key}' must be {expected}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
    },

    #[error("Config key '{key}' out of range: {reason}")]
    OutOfRange { key: &'static str, reason: String },

    #[error("Invalid simulation parameters: {0}")]
    Meter(#[from] MeterError),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn out_of_range(key: &'static str, reason: impl Into<String>) -> Self {
        Self::OutOfRange {
            key,
            reason: reason.into(),
        }
    }
}

/// Errors raised by the periodic tasks and sinks.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Meter(#[from] MeterError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
