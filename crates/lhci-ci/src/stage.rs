//! Stage definitions and their `lhci` argument lists.

use lhci_core::{AssertionSource, AuditTarget, BasicAuth, RemoteTarget, RunConfiguration};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The `lhci` invocations a run can make.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// lhci collect
    Collect,

    /// lhci assert
    Assert,

    /// lhci upload --target=lhci|temporary-public-storage
    UploadRemote,

    /// lhci upload --target=filesystem
    UploadFilesystem,
}

impl Stage {
    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Collect => "collect",
            Stage::Assert => "assert",
            Stage::UploadRemote => "upload_remote",
            Stage::UploadFilesystem => "upload_filesystem",
        }
    }

    /// The lhci subcommand this stage runs.
    pub fn command(&self) -> &'static str {
        match self {
            Stage::Collect => "collect",
            Stage::Assert => "assert",
            Stage::UploadRemote | Stage::UploadFilesystem => "upload",
        }
    }

    /// Human-readable cause reported when the stage exits non-zero.
    pub fn failure_cause(&self) -> &'static str {
        match self {
            Stage::Collect => "collect failed",
            Stage::Assert => "assert failed",
            Stage::UploadRemote => "upload to remote target failed",
            Stage::UploadFilesystem => "upload to filesystem failed",
        }
    }

    /// Whether a non-zero exit aborts the run. Assert failures are deferred.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Stage::Assert)
    }
}

/// A stage together with the arguments it will be invoked with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    pub stage: Stage,
    pub args: Vec<String>,
}

impl StageConfig {
    /// `collect --numberOfRuns=<n> [--static-dist-dir=<dir> | --url=<u>...] [--config=<path>]`
    pub fn collect(config: &RunConfiguration) -> Self {
        let mut args = vec![format!("--numberOfRuns={}", config.runs)];

        match &config.target {
            AuditTarget::StaticDist(dir) => {
                args.push(format!("--static-dist-dir={}", dir.display()));
            }
            AuditTarget::Urls(urls) => {
                args.extend(urls.iter().map(|url| format!("--url={url}")));
            }
        }

        if let Some(path) = &config.config_path {
            args.push(format!("--config={}", path.display()));
        }

        Self {
            stage: Stage::Collect,
            args,
        }
    }

    /// `assert --budgetsFile=<path>` or `assert --config=<path>`
    pub fn assert(source: &AssertionSource) -> Self {
        let arg = match source {
            AssertionSource::Budget(path) => format!("--budgetsFile={}", path.display()),
            AssertionSource::RcConfig(path) => format!("--config={}", path.display()),
        };
        Self {
            stage: Stage::Assert,
            args: vec![arg],
        }
    }

    /// Upload to an LHCI server or temporary public storage.
    ///
    /// The server target always carries `--ignoreDuplicateBuildFailure` so a
    /// rerun on the same commit does not fail.
    pub fn upload_remote(
        remote: &RemoteTarget,
        basic_auth: Option<&BasicAuth>,
        config_path: Option<&Path>,
    ) -> Self {
        let mut args = match remote {
            RemoteTarget::LhciServer { base_url, token } => vec![
                "--target=lhci".to_string(),
                format!("--serverBaseUrl={base_url}"),
                format!("--token={}", token.expose()),
                "--ignoreDuplicateBuildFailure".to_string(),
            ],
            RemoteTarget::TemporaryPublicStorage => {
                vec!["--target=temporary-public-storage".to_string()]
            }
        };

        if let Some(auth) = basic_auth {
            args.push(format!("--basicAuth.username={}", auth.username));
            args.push(format!("--basicAuth.password={}", auth.password.expose()));
        }

        if let Some(path) = config_path {
            args.push(format!("--config={}", path.display()));
        }

        Self {
            stage: Stage::UploadRemote,
            args,
        }
    }

    /// `upload --target=filesystem --outputDir=<resultsDir>`
    pub fn upload_filesystem(results_dir: &Path) -> Self {
        Self {
            stage: Stage::UploadFilesystem,
            args: vec![
                "--target=filesystem".to_string(),
                format!("--outputDir={}", results_dir.display()),
            ],
        }
    }

    /// Arguments with credentials masked, for logging.
    pub fn redacted_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                match ["--token=", "--basicAuth.password="]
                    .iter()
                    .find(|prefix| arg.starts_with(*prefix))
                {
                    Some(prefix) => format!("{prefix}***"),
                    None => arg.clone(),
                }
            })
            .collect()
    }
}
