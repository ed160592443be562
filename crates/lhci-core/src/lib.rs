//! lhci-core - building blocks for the Lighthouse CI action
//!
//! - Resolving raw action inputs into an immutable [`RunConfiguration`]
//! - Reading the manifest, links and assertion results `lhci` writes
//! - Rendering the pull-request score summary
//! - Writing GitHub Actions outputs, annotations and log groups

pub mod annotations;
pub mod config;
pub mod error;
pub mod manifest;
pub mod outputs;
pub mod summary;
pub mod telemetry;
pub mod workflow;

pub use annotations::{build_annotations, set_annotations, Annotation};
pub use config::{
    has_assert_config, ActionInputs, ArtifactUpload, AssertionSource, AuditTarget, BasicAuth,
    RemoteTarget, RunConfiguration, Secret, RESULTS_DIR_NAME,
};
pub use error::{ConfigError, CoreError, Result};
pub use manifest::{AssertionResult, CategoryScores, LinksMap, PageReport, ReportManifest};
pub use outputs::set_output;
pub use summary::{emoji_score, format_score, summarize, SummaryDocument};
pub use telemetry::init_tracing;
pub use workflow::{AnnotationLevel, WorkflowCommands};
