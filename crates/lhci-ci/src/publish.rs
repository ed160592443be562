//! Posting the score summary on the pull request.
//!
//! [`create_comment`] reads the manifest, renders the summary and hands it to
//! a [`CommentPublisher`]. It reports a status code instead of an error: a
//! failed comment never changes the outcome of the run.

use crate::error::{CiError, Result};
use async_trait::async_trait;
use lhci_core::{summarize, ReportManifest, Secret, SummaryDocument};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, error, info};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Posts a summary as a single review comment.
#[async_trait]
pub trait CommentPublisher: Send + Sync {
    async fn publish(&self, token: &Secret, body: &SummaryDocument) -> Result<()>;
}

/// Where the comment goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubContext {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
}

impl GithubContext {
    /// Build from `GITHUB_API_URL`, `GITHUB_REPOSITORY`, `GITHUB_EVENT_PATH`
    /// and `GITHUB_REF`.
    pub fn from_env() -> Result<Self> {
        let repository = std::env::var("GITHUB_REPOSITORY")
            .map_err(|_| CiError::Publish("GITHUB_REPOSITORY is not set".to_string()))?;

        let event = match std::env::var_os("GITHUB_EVENT_PATH") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    CiError::Publish(format!("cannot read event payload {:?}: {}", path, e))
                })?;
                Some(
                    serde_json::from_str::<Value>(&raw)
                        .map_err(|e| CiError::Publish(format!("invalid event payload: {e}")))?,
                )
            }
            None => None,
        };

        Self::from_parts(
            std::env::var("GITHUB_API_URL").ok().as_deref(),
            &repository,
            event.as_ref(),
            std::env::var("GITHUB_REF").ok().as_deref(),
        )
    }

    /// Resolve the target issue from its parts.
    ///
    /// The issue number comes from the event payload (`pull_request.number`,
    /// `issue.number` or `number`), falling back to a `refs/pull/<n>/merge` ref.
    pub fn from_parts(
        api_url: Option<&str>,
        repository: &str,
        event: Option<&Value>,
        git_ref: Option<&str>,
    ) -> Result<Self> {
        let (owner, repo) = repository
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
            .ok_or_else(|| {
                CiError::Publish(format!("malformed repository name {repository:?}"))
            })?;

        let from_event = event.and_then(|e| {
            ["/pull_request/number", "/issue/number", "/number"]
                .iter()
                .find_map(|pointer| e.pointer(pointer).and_then(Value::as_u64))
        });
        let from_ref = git_ref.and_then(|r| {
            r.strip_prefix("refs/pull/")
                .and_then(|rest| rest.split('/').next())
                .and_then(|n| n.parse::<u64>().ok())
        });
        let issue_number = from_event.or(from_ref).ok_or_else(|| {
            CiError::Publish("not running for a pull request or issue".to_string())
        })?;

        Ok(Self {
            api_url: api_url
                .filter(|u| !u.is_empty())
                .unwrap_or(DEFAULT_GITHUB_API_URL)
                .trim_end_matches('/')
                .to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            issue_number,
        })
    }

    pub fn comments_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_url, self.owner, self.repo, self.issue_number
        )
    }
}

#[derive(Serialize)]
struct CreateCommentRequest<'a> {
    body: &'a str,
}

/// Publishes through the GitHub REST API.
pub struct GithubCommentPublisher {
    context: Option<GithubContext>,
    http_client: reqwest::Client,
}

impl GithubCommentPublisher {
    pub fn new(context: Option<GithubContext>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("lhci-action/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            context,
            http_client,
        })
    }

    /// Publisher for the pull request the workflow runs on.
    ///
    /// A missing or unusable context is logged here and turns every
    /// `publish` into an error.
    pub fn from_env() -> Result<Self> {
        let context = match GithubContext::from_env() {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                debug!(error = %e, "No pull request context for comments");
                None
            }
        };
        Self::new(context)
    }
}

#[async_trait]
impl CommentPublisher for GithubCommentPublisher {
    async fn publish(&self, token: &Secret, body: &SummaryDocument) -> Result<()> {
        let context = self.context.as_ref().ok_or_else(|| {
            CiError::Publish("no pull request to comment on".to_string())
        })?;

        let response = self
            .http_client
            .post(context.comments_url())
            .bearer_auth(token.expose())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(&CreateCommentRequest {
                body: body.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CiError::Publish(format!(
                "GitHub API returned {status}: {detail}"
            )));
        }

        info!(
            owner = %context.owner,
            repo = %context.repo,
            issue = context.issue_number,
            "Summary comment posted"
        );
        Ok(())
    }
}

/// Summarize the manifest in `results_dir` and publish it.
///
/// Returns 0 on success and -1 on any failure, which is logged.
pub async fn create_comment(
    publisher: &dyn CommentPublisher,
    token: &Secret,
    results_dir: &Path,
) -> i32 {
    let manifest = match ReportManifest::load(results_dir) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!(error = %e, "Cannot read manifest for summary comment");
            return -1;
        }
    };

    let body = summarize(&manifest);
    match publisher.publish(token, &body).await {
        Ok(()) => 0,
        Err(e) => {
            error!(error = %e, "Create comment failed");
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_context_from_pull_request_event() {
        let event = json!({ "pull_request": { "number": 17 }, "number": 99 });
        let ctx = GithubContext::from_parts(None, "octo/site", Some(&event), None).unwrap();

        assert_eq!(ctx.api_url, DEFAULT_GITHUB_API_URL);
        assert_eq!(ctx.issue_number, 17);
        assert_eq!(
            ctx.comments_url(),
            "https://api.github.com/repos/octo/site/issues/17/comments"
        );
    }

    #[test]
    fn test_context_from_ref() {
        let ctx = GithubContext::from_parts(
            Some("https://ghe.example.com/api/v3/"),
            "octo/site",
            Some(&json!({ "ref": "refs/heads/main" })),
            Some("refs/pull/256/merge"),
        )
        .unwrap();

        assert_eq!(ctx.issue_number, 256);
        assert_eq!(ctx.api_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_context_requires_pull_request() {
        let err =
            GithubContext::from_parts(None, "octo/site", None, Some("refs/heads/main")).unwrap_err();
        assert!(err.to_string().contains("pull request"));

        let err = GithubContext::from_parts(None, "not-a-repo", None, None).unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[tokio::test]
    async fn test_publish_without_context_fails() {
        let publisher = GithubCommentPublisher::new(None).unwrap();
        let body = summarize(&ReportManifest::default());

        let err = publisher
            .publish(&Secret::new("token"), &body)
            .await
            .unwrap_err();
        assert!(matches!(err, CiError::Publish(_)));
    }
}
