//! lhci-ci - Lighthouse CI stage orchestration
//!
//! Runs a Lighthouse CI audit inside a build pipeline:
//! - `lhci collect`, then `lhci assert` when assertions are configured
//! - `lhci upload` to an LHCI server or temporary public storage, then to the
//!   local filesystem
//! - a score summary comment on the pull request
//! - step outputs and failing-assertion annotations

pub mod artifacts;
pub mod error;
pub mod fakes;
pub mod finalize;
pub mod pipeline;
pub mod publish;
pub mod runner;
pub mod stage;

// Re-export key types
pub use artifacts::{ArtifactStore, FsArtifactStore};
pub use error::{CiError, Result};
pub use finalize::{ActionsFinalizer, Finalizer};
pub use pipeline::{AuditPipeline, ExitOutcome, PipelineReport, PipelineState, PublishOutcome};
pub use publish::{create_comment, CommentPublisher, GithubCommentPublisher, GithubContext};
pub use runner::{CiRunner, LhciRunner, StageInvoker, StageResult};
pub use stage::{Stage, StageConfig};
