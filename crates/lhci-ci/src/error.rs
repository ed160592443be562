//! Error types for stage orchestration

use lhci_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CiError {
    /// A fatal stage exited non-zero
    #[error("{cause} (`lhci {command}` exited with status {status})")]
    StageExecution {
        cause: &'static str,
        command: &'static str,
        status: i32,
    },

    /// The lhci executable could not be started
    #[error("Failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Posting the summary comment failed
    #[error("Publish error: {0}")]
    Publish(String),

    /// Copying the results to the artifact store failed
    #[error("Artifact upload failed: {0}")]
    Artifact(String),

    /// Setting outputs or annotations failed
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<reqwest::Error> for CiError {
    fn from(err: reqwest::Error) -> Self {
        CiError::Publish(err.to_string())
    }
}

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, CiError>;
