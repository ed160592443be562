//! Error types for lhci-core

use std::path::PathBuf;
use thiserror::Error;

/// Problems with the action inputs, detected before any stage runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither `urls` nor `staticDistDir` was provided
    #[error("either `urls` or `staticDistDir` must be set")]
    MissingTarget,

    /// Both `urls` and `staticDistDir` were provided
    #[error("`urls` and `staticDistDir` cannot be used together")]
    ConflictingTargets,

    /// `runs` is not a positive integer
    #[error("`runs` must be a positive integer, got {0:?}")]
    InvalidRuns(String),

    /// A boolean input holds something other than true/false
    #[error("input `{input}` must be `true` or `false`, got {value:?}")]
    InvalidBool { input: String, value: String },

    /// `serverToken` was given without a server to talk to
    #[error("`serverBaseUrl` is required when `serverToken` is set")]
    MissingServerBaseUrl,
}

/// Errors raised while reading results or writing workflow outputs.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write workflow command: {0}")]
    Output(#[from] std::io::Error),
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        CoreError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Result type for lhci-core operations
pub type Result<T> = std::result::Result<T, CoreError>;
