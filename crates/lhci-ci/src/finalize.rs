//! Last step of a run: step outputs and failing-assertion annotations.

use crate::error::{CiError, Result};
use async_trait::async_trait;
use lhci_core::{set_annotations, set_output, WorkflowCommands};
use std::path::Path;
use tracing::info;

/// Publishes run results to the host pipeline.
#[async_trait]
pub trait Finalizer: Send + Sync {
    async fn finalize(&self, results_dir: &Path) -> Result<()>;
}

/// Writes GitHub Actions outputs and annotations.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActionsFinalizer;

#[async_trait]
impl Finalizer for ActionsFinalizer {
    async fn finalize(&self, results_dir: &Path) -> Result<()> {
        let mut commands = WorkflowCommands::from_env();

        set_output(results_dir, &mut commands)
            .map_err(|e| CiError::Collaborator(format!("setting outputs: {e}")))?;
        let annotations = set_annotations(results_dir, &mut commands)
            .map_err(|e| CiError::Collaborator(format!("setting annotations: {e}")))?;

        info!(annotations, "Outputs and annotations set");
        Ok(())
    }
}
