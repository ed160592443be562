//! Stage execution through the `lhci` executable.

use crate::error::{CiError, Result};
use crate::stage::StageConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, error, info};

/// Capability to run one `lhci` subcommand and report its exit status.
///
/// Implementations block until the subprocess finishes.
#[async_trait]
pub trait StageInvoker: Send + Sync {
    async fn invoke(&self, command: &str, args: &[String]) -> i32;
}

/// Result of a stage execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    /// Stage name.
    pub stage_name: String,

    /// Exit status (0 = success).
    pub exit_status: i32,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl StageResult {
    /// Whether this stage passed (exit status 0).
    pub fn passed(&self) -> bool {
        self.exit_status == 0
    }
}

/// Runs `lhci <command> <args>` with inherited stdio.
#[derive(Debug, Clone)]
pub struct LhciRunner {
    program: String,
}

impl LhciRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn spawn(&self, command: &str, args: &[String]) -> Result<i32> {
        let status = Command::new(&self.program)
            .arg(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| CiError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Killed by a signal: no code, report as failure.
        Ok(status.code().unwrap_or(-1))
    }
}

impl Default for LhciRunner {
    fn default() -> Self {
        Self::new("lhci")
    }
}

#[async_trait]
impl StageInvoker for LhciRunner {
    async fn invoke(&self, command: &str, args: &[String]) -> i32 {
        match self.spawn(command, args).await {
            Ok(status) => status,
            Err(e) => {
                error!(command, error = %e, "lhci could not be started");
                -1
            }
        }
    }
}

/// Executes stages through a [`StageInvoker`].
pub struct CiRunner;

impl CiRunner {
    /// Execute a single stage and return the result.
    pub async fn execute_stage(invoker: &dyn StageInvoker, config: &StageConfig) -> StageResult {
        let start = Instant::now();
        let stage_name = config.stage.name();

        debug!(stage = stage_name, args = ?config.redacted_args(), "Invoking lhci");
        let exit_status = invoker.invoke(config.stage.command(), &config.args).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(stage = stage_name, exit_status, duration_ms, "Stage finished");

        StageResult {
            stage_name: stage_name.to_string(),
            exit_status,
            duration_ms,
        }
    }
}
