//! Stage orchestration for one Lighthouse CI run.
//!
//! The run is a small state machine:
//!
//! ```text
//! Collecting ─┬─> Asserting ─┬─> UploadingRemote ─┬─> UploadingFilesystem ─> Publishing ─> Finalizing ─> Done
//!             └──────────────┴────────────────────┘
//! ```
//!
//! Collect and both uploads are fatal: a non-zero exit ends the run at once.
//! An assert failure is stored as the pending verdict and only turns into
//! the run's outcome in `Done`, after uploads and the comment have happened.

use crate::artifacts::ArtifactStore;
use crate::error::{CiError, Result};
use crate::finalize::Finalizer;
use crate::publish::{create_comment, CommentPublisher};
use crate::runner::{CiRunner, StageInvoker, StageResult};
use crate::stage::{Stage, StageConfig};
use chrono::{DateTime, Utc};
use lhci_core::{RunConfiguration, WorkflowCommands};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// States of a run, in the order they can be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Collecting,
    Asserting,
    UploadingRemote,
    UploadingFilesystem,
    Publishing,
    Finalizing,
    Done,
}

impl PipelineState {
    /// Log group title shown by the host pipeline.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Collecting => "Collecting",
            PipelineState::Asserting => "Asserting",
            PipelineState::UploadingRemote => "Uploading to remote target",
            PipelineState::UploadingFilesystem => "Uploading to filesystem",
            PipelineState::Publishing => "Writing comment",
            PipelineState::Finalizing => "Setting outputs",
            PipelineState::Done => "Done",
        }
    }
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExitOutcome {
    Success,
    Failure { cause: String, exit_status: i32 },
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }

    /// Process exit code: 0 on success, the failing status when it fits in
    /// `1..=255`, otherwise 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            ExitOutcome::Success => 0,
            ExitOutcome::Failure { exit_status, .. } => u8::try_from(*exit_status)
                .ok()
                .filter(|code| *code != 0)
                .unwrap_or(1),
        }
    }
}

/// What happened to the summary comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    /// No publishing credential was configured, or the run ended earlier.
    Skipped,
    Posted,
    Failed,
}

/// Record of a complete run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: ExitOutcome,
    /// Stages that were actually invoked, in order.
    pub stages: Vec<StageResult>,
    /// States visited, in order.
    pub states: Vec<PipelineState>,
    pub publish: PublishOutcome,
}

impl PipelineReport {
    /// Number of stages that passed.
    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.passed()).count()
    }

    /// Number of stages that failed.
    pub fn failed_count(&self) -> usize {
        self.stages.iter().filter(|s| !s.passed()).count()
    }

    /// How many times the named stage was invoked.
    pub fn invocations(&self, stage: Stage) -> usize {
        self.stages
            .iter()
            .filter(|s| s.stage_name == stage.name())
            .count()
    }
}

/// Accumulator carried from state to state.
#[derive(Debug)]
struct RunProgress {
    stages: Vec<StageResult>,
    /// Set by `Asserting`, read only in `Done`.
    pending_verdict: Option<StageResult>,
    publish: PublishOutcome,
}

/// Stage orchestrator.
pub struct AuditPipeline {
    invoker: Arc<dyn StageInvoker>,
    artifacts: Arc<dyn ArtifactStore>,
    publisher: Arc<dyn CommentPublisher>,
    finalizer: Arc<dyn Finalizer>,
    log_groups: bool,
}

impl AuditPipeline {
    pub fn new(
        invoker: Arc<dyn StageInvoker>,
        artifacts: Arc<dyn ArtifactStore>,
        publisher: Arc<dyn CommentPublisher>,
        finalizer: Arc<dyn Finalizer>,
    ) -> Self {
        Self {
            invoker,
            artifacts,
            publisher,
            finalizer,
            log_groups: false,
        }
    }

    /// Wrap each state's log output in `::group::` markers.
    pub fn with_log_groups(mut self, enabled: bool) -> Self {
        self.log_groups = enabled;
        self
    }

    /// Run every applicable stage for `config` and report the outcome.
    pub async fn run(&self, config: &RunConfiguration) -> PipelineReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        info!(run_id = %run_id, runs = config.runs, "Starting Lighthouse CI run");

        let mut progress = RunProgress {
            stages: Vec::new(),
            pending_verdict: None,
            publish: PublishOutcome::Skipped,
        };
        let mut states = Vec::new();
        let mut state = PipelineState::Collecting;

        let outcome = loop {
            states.push(state);
            if state == PipelineState::Done {
                break Self::verdict(&progress);
            }

            self.open_group(state);
            let next = self.step(state, config, &mut progress).await;
            self.close_group();

            match next {
                Ok(next) => state = next,
                Err(e) => {
                    error!(run_id = %run_id, state = ?state, error = %e, "Run aborted");
                    break ExitOutcome::Failure {
                        cause: e.to_string(),
                        exit_status: 1,
                    };
                }
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            ExitOutcome::Success => {
                info!(run_id = %run_id, duration_ms, "Lighthouse CI run completed successfully")
            }
            ExitOutcome::Failure { cause, .. } => {
                info!(run_id = %run_id, duration_ms, cause = %cause, "Lighthouse CI run failed")
            }
        }

        PipelineReport {
            run_id,
            started_at,
            duration_ms,
            outcome,
            stages: progress.stages,
            states,
            publish: progress.publish,
        }
    }

    async fn step(
        &self,
        state: PipelineState,
        config: &RunConfiguration,
        progress: &mut RunProgress,
    ) -> Result<PipelineState> {
        match state {
            PipelineState::Collecting => {
                self.run_fatal(StageConfig::collect(config), progress)
                    .await?;
                Ok(if config.assertion.is_some() {
                    PipelineState::Asserting
                } else {
                    Self::after_assert(config)
                })
            }

            PipelineState::Asserting => {
                if let Some(source) = &config.assertion {
                    let result = self.run_stage(StageConfig::assert(source), progress).await;
                    if !result.passed() {
                        warn!(
                            exit_status = result.exit_status,
                            "Assertions failed, run will fail after upload"
                        );
                        progress.pending_verdict = Some(result);
                    }
                }
                Ok(Self::after_assert(config))
            }

            PipelineState::UploadingRemote => {
                if let Some(artifact) = &config.artifacts {
                    if let Err(e) = self
                        .artifacts
                        .upload(&artifact.name, &config.results_dir)
                        .await
                    {
                        warn!(artifact = %artifact.name, error = %e, "Artifact upload failed");
                    }
                }

                if let Some(remote) = &config.remote {
                    let upload = StageConfig::upload_remote(
                        remote,
                        config.basic_auth.as_ref(),
                        config.config_path.as_deref(),
                    );
                    self.run_fatal(upload, progress).await?;
                }
                Ok(PipelineState::UploadingFilesystem)
            }

            PipelineState::UploadingFilesystem => {
                self.run_fatal(StageConfig::upload_filesystem(&config.results_dir), progress)
                    .await?;
                Ok(PipelineState::Publishing)
            }

            PipelineState::Publishing => {
                progress.publish = match &config.github_token {
                    Some(token) => {
                        let status =
                            create_comment(self.publisher.as_ref(), token, &config.results_dir)
                                .await;
                        if status == 0 {
                            PublishOutcome::Posted
                        } else {
                            warn!(status, "Summary comment was not posted");
                            PublishOutcome::Failed
                        }
                    }
                    None => {
                        info!("GitHub token not set, skipping comment");
                        PublishOutcome::Skipped
                    }
                };
                Ok(PipelineState::Finalizing)
            }

            PipelineState::Finalizing => {
                self.finalizer
                    .finalize(&config.results_dir)
                    .await
                    .map_err(|e| match e {
                        CiError::Collaborator(_) => e,
                        other => CiError::Collaborator(other.to_string()),
                    })?;
                Ok(PipelineState::Done)
            }

            PipelineState::Done => Ok(PipelineState::Done),
        }
    }

    /// Remote upload only runs when there is somewhere to send results.
    fn after_assert(config: &RunConfiguration) -> PipelineState {
        if config.remote.is_some() || config.artifacts.is_some() {
            PipelineState::UploadingRemote
        } else {
            PipelineState::UploadingFilesystem
        }
    }

    fn verdict(progress: &RunProgress) -> ExitOutcome {
        match &progress.pending_verdict {
            Some(assert) => ExitOutcome::Failure {
                cause: format!(
                    "{} (exit status {})",
                    Stage::Assert.failure_cause(),
                    assert.exit_status
                ),
                exit_status: assert.exit_status,
            },
            None => ExitOutcome::Success,
        }
    }

    async fn run_stage(&self, config: StageConfig, progress: &mut RunProgress) -> StageResult {
        let result = CiRunner::execute_stage(self.invoker.as_ref(), &config).await;
        progress.stages.push(result.clone());
        result
    }

    async fn run_fatal(&self, config: StageConfig, progress: &mut RunProgress) -> Result<()> {
        let stage = config.stage;
        let result = self.run_stage(config, progress).await;
        if result.passed() {
            Ok(())
        } else {
            Err(CiError::StageExecution {
                cause: stage.failure_cause(),
                command: stage.command(),
                status: result.exit_status,
            })
        }
    }

    fn open_group(&self, state: PipelineState) {
        if self.log_groups {
            WorkflowCommands::new(std::io::stdout(), None)
                .group(state.label())
                .ok();
        }
    }

    fn close_group(&self) {
        if self.log_groups {
            WorkflowCommands::new(std::io::stdout(), None)
                .end_group()
                .ok();
        }
    }
}
