//! Action inputs and the resolved run configuration.
//!
//! Raw inputs arrive as loosely typed strings (flags or `INPUT_*`
//! environment variables). [`RunConfiguration::resolve`] turns them into a
//! value where every mutually exclusive choice is already a tagged variant,
//! so downstream code never has to re-check "both set" or "neither set".

use crate::error::ConfigError;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory (relative to the working directory) where lhci keeps its results.
pub const RESULTS_DIR_NAME: &str = ".lighthouseci";

/// Artifact name used when `artifactName` is not provided.
pub const DEFAULT_ARTIFACT_NAME: &str = "lighthouse-results";

/// Basic-auth user used when only a password is provided.
pub const DEFAULT_BASIC_AUTH_USERNAME: &str = "lighthouse";

/// A credential that never shows up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// The raw credential, for handing to the tool or API that needs it.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl Serialize for Secret {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

/// What the collector audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTarget {
    /// Serve a directory of built static files.
    StaticDist(PathBuf),
    /// Audit a non-empty list of URLs.
    Urls(Vec<String>),
}

/// Criteria handed to `lhci assert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionSource {
    /// A Lighthouse budgets file.
    Budget(PathBuf),
    /// An rc file that declares a `ci.assert` section.
    RcConfig(PathBuf),
}

/// Where `lhci upload` sends reports besides the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteTarget {
    LhciServer { base_url: String, token: Secret },
    TemporaryPublicStorage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BasicAuth {
    pub username: String,
    pub password: Secret,
}

/// Copy of the results directory kept as a build artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactUpload {
    pub name: String,
}

/// Raw action inputs, exactly as the host pipeline provided them.
///
/// Empty strings are treated the same as missing values.
#[derive(Debug, Clone, Default)]
pub struct ActionInputs {
    pub urls: Option<String>,
    pub runs: Option<String>,
    pub static_dist_dir: Option<String>,
    pub config_path: Option<String>,
    pub budget_path: Option<String>,
    pub server_base_url: Option<String>,
    pub server_token: Option<String>,
    pub temporary_public_storage: Option<String>,
    pub upload_artifacts: Option<String>,
    pub artifact_name: Option<String>,
    pub basic_auth_username: Option<String>,
    pub basic_auth_password: Option<String>,
    pub github_token: Option<String>,
}

/// Fully resolved, immutable options for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfiguration {
    pub runs: u32,
    pub target: AuditTarget,
    pub config_path: Option<PathBuf>,
    pub assertion: Option<AssertionSource>,
    pub remote: Option<RemoteTarget>,
    pub basic_auth: Option<BasicAuth>,
    pub artifacts: Option<ArtifactUpload>,
    pub github_token: Option<Secret>,
    pub results_dir: PathBuf,
}

impl RunConfiguration {
    /// Resolve inputs against the process environment.
    pub fn resolve(inputs: &ActionInputs, workdir: &Path) -> Result<Self, ConfigError> {
        Self::resolve_with(inputs, workdir, |name| std::env::var(name).ok())
    }

    /// Resolve inputs with an explicit environment lookup (used for `$VAR`
    /// interpolation in URLs).
    pub fn resolve_with<F>(
        inputs: &ActionInputs,
        workdir: &Path,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let runs = match non_empty(&inputs.runs) {
            None => 1,
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(ConfigError::InvalidRuns(raw.to_string())),
            },
        };

        let urls = non_empty(&inputs.urls)
            .map(|raw| parse_urls(raw, &lookup))
            .unwrap_or_default();
        let target = match (non_empty(&inputs.static_dist_dir), urls.is_empty()) {
            (Some(_), false) => return Err(ConfigError::ConflictingTargets),
            (Some(dir), true) => AuditTarget::StaticDist(PathBuf::from(dir)),
            (None, false) => AuditTarget::Urls(urls),
            (None, true) => return Err(ConfigError::MissingTarget),
        };

        let config_path = non_empty(&inputs.config_path).map(PathBuf::from);

        let assertion = match non_empty(&inputs.budget_path) {
            Some(budget) => Some(AssertionSource::Budget(PathBuf::from(budget))),
            None => config_path
                .as_ref()
                .filter(|path| has_assert_config(&workdir.join(path)))
                .map(|path| AssertionSource::RcConfig(path.clone())),
        };

        let temporary_public_storage =
            parse_bool("temporaryPublicStorage", &inputs.temporary_public_storage)?;
        let remote = match non_empty(&inputs.server_token) {
            Some(token) => {
                let base_url = non_empty(&inputs.server_base_url)
                    .ok_or(ConfigError::MissingServerBaseUrl)?;
                Some(RemoteTarget::LhciServer {
                    base_url: base_url.to_string(),
                    token: Secret::new(token),
                })
            }
            None if temporary_public_storage => Some(RemoteTarget::TemporaryPublicStorage),
            None => None,
        };

        let basic_auth = non_empty(&inputs.basic_auth_password).map(|password| BasicAuth {
            username: non_empty(&inputs.basic_auth_username)
                .unwrap_or(DEFAULT_BASIC_AUTH_USERNAME)
                .to_string(),
            password: Secret::new(password),
        });

        let artifacts = parse_bool("uploadArtifacts", &inputs.upload_artifacts)?.then(|| {
            ArtifactUpload {
                name: non_empty(&inputs.artifact_name)
                    .unwrap_or(DEFAULT_ARTIFACT_NAME)
                    .to_string(),
            }
        });

        Ok(RunConfiguration {
            runs,
            target,
            config_path,
            assertion,
            remote,
            basic_auth,
            artifacts,
            github_token: non_empty(&inputs.github_token).map(Secret::new),
            results_dir: workdir.join(RESULTS_DIR_NAME),
        })
    }
}

/// Whether the rc file at `path` declares an assertions section (`ci.assert`).
///
/// Only JSON rc files are understood; anything unreadable counts as "no".
pub fn has_assert_config(path: &Path) -> bool {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read lhci config");
            return false;
        }
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(rc) => {
            let found = rc.pointer("/ci/assert").is_some_and(Value::is_object);
            debug!(path = %path.display(), found, "Checked lhci config for assertions");
            found
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "lhci config is not JSON, ignoring assertions");
            false
        }
    }
}

/// Split the multi-line `urls` input, interpolating environment variables.
pub fn parse_urls<F>(raw: &str, lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| interpolate_env(line, &lookup))
        .collect()
}

/// Replace `$NAME` and `${NAME}` with values from `lookup`.
///
/// Unknown variables are left untouched.
pub fn interpolate_env<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) if is_var_name(&braced[..end]) => (&braced[..end], end + 2),
                _ => ("", 0),
            }
        } else {
            let end = after
                .char_indices()
                .find(|(i, c)| !(c.is_ascii_alphanumeric() || *c == '_') || (*i == 0 && c.is_ascii_digit()))
                .map(|(i, _)| i)
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match (consumed, lookup(name)) {
            (n, Some(value)) if n > 0 => {
                out.push_str(&value);
                rest = &after[consumed..];
            }
            _ => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bool(input: &str, value: &Option<String>) -> Result<bool, ConfigError> {
    match non_empty(value) {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(ConfigError::InvalidBool {
            input: input.to_string(),
            value: v.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn url_inputs() -> ActionInputs {
        ActionInputs {
            urls: Some("https://example.com/\nhttps://example.com/blog".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_for_url_run() {
        let config = RunConfiguration::resolve_with(&url_inputs(), Path::new("/work"), env(&[]))
            .expect("resolve");

        assert_eq!(config.runs, 1);
        assert_eq!(
            config.target,
            AuditTarget::Urls(vec![
                "https://example.com/".to_string(),
                "https://example.com/blog".to_string()
            ])
        );
        assert!(config.assertion.is_none());
        assert!(config.remote.is_none());
        assert!(config.artifacts.is_none());
        assert!(config.github_token.is_none());
        assert_eq!(config.results_dir, PathBuf::from("/work/.lighthouseci"));
    }

    #[test]
    fn test_missing_target_is_rejected() {
        let inputs = ActionInputs {
            urls: Some("  \n ".to_string()),
            static_dist_dir: Some(String::new()),
            ..Default::default()
        };
        let err = RunConfiguration::resolve_with(&inputs, Path::new("."), env(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingTarget);
    }

    #[test]
    fn test_conflicting_targets_are_rejected() {
        let inputs = ActionInputs {
            static_dist_dir: Some("./dist".to_string()),
            ..url_inputs()
        };
        let err = RunConfiguration::resolve_with(&inputs, Path::new("."), env(&[])).unwrap_err();
        assert_eq!(err, ConfigError::ConflictingTargets);
    }

    #[test]
    fn test_invalid_runs() {
        for bad in ["0", "-2", "three"] {
            let inputs = ActionInputs {
                runs: Some(bad.to_string()),
                ..url_inputs()
            };
            let err =
                RunConfiguration::resolve_with(&inputs, Path::new("."), env(&[])).unwrap_err();
            assert_eq!(err, ConfigError::InvalidRuns(bad.to_string()));
        }
    }

    #[test]
    fn test_budget_takes_precedence_over_rc_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lighthouserc.json"),
            r#"{"ci":{"assert":{"preset":"lighthouse:recommended"}}}"#,
        )
        .unwrap();

        let inputs = ActionInputs {
            config_path: Some("lighthouserc.json".to_string()),
            budget_path: Some("budget.json".to_string()),
            ..url_inputs()
        };
        let config = RunConfiguration::resolve_with(&inputs, dir.path(), env(&[])).unwrap();
        assert_eq!(
            config.assertion,
            Some(AssertionSource::Budget(PathBuf::from("budget.json")))
        );
    }

    #[test]
    fn test_rc_config_selected_only_with_assert_section() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("with.json"),
            r#"{"ci":{"collect":{},"assert":{"assertions":{}}}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("without.json"), r#"{"ci":{"collect":{}}}"#).unwrap();

        let with = ActionInputs {
            config_path: Some("with.json".to_string()),
            ..url_inputs()
        };
        let config = RunConfiguration::resolve_with(&with, dir.path(), env(&[])).unwrap();
        assert_eq!(
            config.assertion,
            Some(AssertionSource::RcConfig(PathBuf::from("with.json")))
        );

        let without = ActionInputs {
            config_path: Some("without.json".to_string()),
            ..url_inputs()
        };
        let config = RunConfiguration::resolve_with(&without, dir.path(), env(&[])).unwrap();
        assert!(config.assertion.is_none());
        assert_eq!(config.config_path, Some(PathBuf::from("without.json")));
    }

    #[test]
    fn test_has_assert_config_handles_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("lighthouserc.yml");
        std::fs::write(&yaml, "ci:\n  assert:\n    preset: x\n").unwrap();

        assert!(!has_assert_config(&yaml));
        assert!(!has_assert_config(&dir.path().join("missing.json")));
    }

    #[test]
    fn test_server_token_wins_over_temporary_storage() {
        let inputs = ActionInputs {
            server_token: Some("tok".to_string()),
            server_base_url: Some("https://lhci.example.com".to_string()),
            temporary_public_storage: Some("true".to_string()),
            ..url_inputs()
        };
        let config = RunConfiguration::resolve_with(&inputs, Path::new("."), env(&[])).unwrap();
        assert_eq!(
            config.remote,
            Some(RemoteTarget::LhciServer {
                base_url: "https://lhci.example.com".to_string(),
                token: Secret::new("tok"),
            })
        );
    }

    #[test]
    fn test_server_token_requires_base_url() {
        let inputs = ActionInputs {
            server_token: Some("tok".to_string()),
            ..url_inputs()
        };
        let err = RunConfiguration::resolve_with(&inputs, Path::new("."), env(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingServerBaseUrl);
    }

    #[test]
    fn test_temporary_public_storage_and_bool_parsing() {
        let inputs = ActionInputs {
            temporary_public_storage: Some("TRUE".to_string()),
            upload_artifacts: Some("false".to_string()),
            ..url_inputs()
        };
        let config = RunConfiguration::resolve_with(&inputs, Path::new("."), env(&[])).unwrap();
        assert_eq!(config.remote, Some(RemoteTarget::TemporaryPublicStorage));
        assert!(config.artifacts.is_none());

        let inputs = ActionInputs {
            upload_artifacts: Some("yes".to_string()),
            ..url_inputs()
        };
        let err = RunConfiguration::resolve_with(&inputs, Path::new("."), env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBool { .. }));
    }

    #[test]
    fn test_basic_auth_and_artifact_defaults() {
        let inputs = ActionInputs {
            basic_auth_password: Some("hunter2".to_string()),
            upload_artifacts: Some("true".to_string()),
            ..url_inputs()
        };
        let config = RunConfiguration::resolve_with(&inputs, Path::new("."), env(&[])).unwrap();

        let auth = config.basic_auth.expect("basic auth");
        assert_eq!(auth.username, DEFAULT_BASIC_AUTH_USERNAME);
        assert_eq!(auth.password.expose(), "hunter2");
        assert_eq!(
            config.artifacts,
            Some(ArtifactUpload {
                name: DEFAULT_ARTIFACT_NAME.to_string()
            })
        );
    }

    #[test]
    fn test_username_without_password_is_ignored() {
        let inputs = ActionInputs {
            basic_auth_username: Some("admin".to_string()),
            ..url_inputs()
        };
        let config = RunConfiguration::resolve_with(&inputs, Path::new("."), env(&[])).unwrap();
        assert!(config.basic_auth.is_none());
    }

    #[test]
    fn test_secrets_are_redacted() {
        let inputs = ActionInputs {
            github_token: Some("ghp_secret".to_string()),
            basic_auth_password: Some("hunter2".to_string()),
            ..url_inputs()
        };
        let config = RunConfiguration::resolve_with(&inputs, Path::new("."), env(&[])).unwrap();

        let debug = format!("{:?}", config);
        let json = serde_json::to_string(&config).unwrap();
        for rendered in [debug, json] {
            assert!(!rendered.contains("ghp_secret"));
            assert!(!rendered.contains("hunter2"));
        }
    }

    #[test]
    fn test_interpolate_env() {
        let lookup = env(&[("HOST", "preview.example.com"), ("PR", "42")]);

        assert_eq!(
            interpolate_env("https://$HOST/pr-${PR}/", &lookup),
            "https://preview.example.com/pr-42/"
        );
        assert_eq!(interpolate_env("https://$MISSING/", &lookup), "https://$MISSING/");
        assert_eq!(interpolate_env("cost: $5", &lookup), "cost: $5");
        assert_eq!(interpolate_env("${unterminated", &lookup), "${unterminated");
        assert_eq!(interpolate_env("trailing $", &lookup), "trailing $");
    }

    #[test]
    fn test_parse_urls_trims_and_interpolates() {
        let urls = parse_urls(
            "\n  http://localhost:3000/  \n\n$BASE/about\n",
            env(&[("BASE", "http://localhost:3000")]),
        );
        assert_eq!(
            urls,
            vec![
                "http://localhost:3000/".to_string(),
                "http://localhost:3000/about".to_string()
            ]
        );
    }
}
