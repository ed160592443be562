//! lhci-action - Lighthouse CI inside a build pipeline
//!
//! Audits URLs (or a static build) with Lighthouse CI in three stages:
//!
//! 1. `collect` - run Lighthouse against every URL
//! 2. `assert` - check results against budgets or LHCI assertions
//! 3. `upload` - send reports to an LHCI server or temporary public storage,
//!    then to the local filesystem
//!
//! and posts a score summary on the pull request when a GitHub token is set.
//! Every option can be given as a flag or through the GitHub Actions
//! `INPUT_*` variable of the same input.

use anyhow::{Context, Result};
use clap::Parser;
use lhci_ci::{
    ActionsFinalizer, AuditPipeline, ExitOutcome, FsArtifactStore, GithubCommentPublisher,
    LhciRunner,
};
use lhci_core::workflow::{annotation_command, AnnotationLevel};
use lhci_core::{ActionInputs, RunConfiguration};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info, Level};

#[derive(Parser, Debug)]
#[command(name = "lhci-action")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run Lighthouse CI collect/assert/upload and comment on the pull request", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// URLs to audit, one per line; `$VAR` references are expanded
    #[arg(long, env = "INPUT_URLS")]
    urls: Option<String>,

    /// Number of Lighthouse runs per URL
    #[arg(long, env = "INPUT_RUNS")]
    runs: Option<String>,

    /// Directory with a static build to serve and audit
    #[arg(long, env = "INPUT_STATICDISTDIR")]
    static_dist_dir: Option<String>,

    /// Path to a Lighthouse CI rc file
    #[arg(long, env = "INPUT_CONFIGPATH")]
    config_path: Option<String>,

    /// Path to a Lighthouse budgets file
    #[arg(long, env = "INPUT_BUDGETPATH")]
    budget_path: Option<String>,

    /// LHCI server base URL
    #[arg(long, env = "INPUT_SERVERBASEURL")]
    server_base_url: Option<String>,

    /// LHCI server build token
    #[arg(long, env = "INPUT_SERVERTOKEN", hide_env_values = true)]
    server_token: Option<String>,

    /// Upload to temporary public storage (true/false)
    #[arg(long, env = "INPUT_TEMPORARYPUBLICSTORAGE")]
    temporary_public_storage: Option<String>,

    /// Copy the results directory into --artifact-dir/<artifact name>
    /// (true/false). The copy stays on the runner's disk; point
    /// --artifact-dir at a path a later workflow step uploads to keep it
    /// after the job ends.
    #[arg(long, env = "INPUT_UPLOADARTIFACTS")]
    upload_artifacts: Option<String>,

    /// Artifact name
    #[arg(long, env = "INPUT_ARTIFACTNAME")]
    artifact_name: Option<String>,

    /// Basic auth user for the LHCI server
    #[arg(long, env = "INPUT_BASICAUTHUSERNAME")]
    basic_auth_username: Option<String>,

    /// Basic auth password for the LHCI server
    #[arg(long, env = "INPUT_BASICAUTHPASSWORD", hide_env_values = true)]
    basic_auth_password: Option<String>,

    /// Token used to comment on the pull request
    #[arg(long, env = "INPUT_GITHUBTOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// lhci executable
    #[arg(long, env = "LHCI_BIN", default_value = "lhci")]
    lhci_bin: String,

    /// Local directory artifacts are copied to (default:
    /// <workdir>/.lhci-artifacts)
    #[arg(long, env = "LHCI_ARTIFACT_DIR")]
    artifact_dir: Option<PathBuf>,

    /// Working directory (default: current directory)
    #[arg(long)]
    workdir: Option<PathBuf>,
}

impl Cli {
    fn inputs(&self) -> ActionInputs {
        ActionInputs {
            urls: self.urls.clone(),
            runs: self.runs.clone(),
            static_dist_dir: self.static_dist_dir.clone(),
            config_path: self.config_path.clone(),
            budget_path: self.budget_path.clone(),
            server_base_url: self.server_base_url.clone(),
            server_token: self.server_token.clone(),
            temporary_public_storage: self.temporary_public_storage.clone(),
            upload_artifacts: self.upload_artifacts.clone(),
            artifact_name: self.artifact_name.clone(),
            basic_auth_username: self.basic_auth_username.clone(),
            basic_auth_password: self.basic_auth_password.clone(),
            github_token: self.github_token.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    lhci_core::init_tracing(cli.json, level);

    match run(cli).await {
        Ok(outcome) => report_outcome(&outcome),
        Err(e) => {
            println!(
                "{}",
                annotation_command(AnnotationLevel::Error, None, &format!("{e:#}"))
            );
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitOutcome> {
    let workdir = match &cli.workdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let config = RunConfiguration::resolve(&cli.inputs(), &workdir)
        .context("Invalid action configuration")?;
    info!(
        "Input args: {}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| format!("{config:?}"))
    );

    let artifact_root = cli
        .artifact_dir
        .clone()
        .unwrap_or_else(|| workdir.join(".lhci-artifacts"));
    let publisher =
        GithubCommentPublisher::from_env().context("Failed to create GitHub client")?;
    let in_actions = std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true");
    debug!(lhci = %cli.lhci_bin, in_actions, "Collaborators ready");

    let pipeline = AuditPipeline::new(
        Arc::new(LhciRunner::new(cli.lhci_bin.clone())),
        Arc::new(FsArtifactStore::new(artifact_root)),
        Arc::new(publisher),
        Arc::new(ActionsFinalizer),
    )
    .with_log_groups(in_actions);

    let report = pipeline.run(&config).await;
    info!(
        run_id = %report.run_id,
        stages = report.stages.len(),
        passed = report.passed_count(),
        failed = report.failed_count(),
        duration_ms = report.duration_ms,
        "Run summary"
    );

    Ok(report.outcome)
}

fn report_outcome(outcome: &ExitOutcome) -> ExitCode {
    match outcome {
        ExitOutcome::Success => ExitCode::SUCCESS,
        ExitOutcome::Failure { cause, .. } => {
            println!("{}", annotation_command(AnnotationLevel::Error, None, cause));
            ExitCode::from(outcome.exit_code())
        }
    }
}
