//! Models for the files `lhci` leaves in the results directory.
//!
//! - `manifest.json`: one [`PageReport`] per collected run
//! - `links.json`: URL → hosted report link, written by remote upload
//! - `assertion-results.json`: failed assertions, written by `lhci assert`

use crate::error::{CoreError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const LINKS_FILE: &str = "links.json";
pub const ASSERTION_RESULTS_FILE: &str = "assertion-results.json";

/// Category scores in `[0, 1]`. Missing or `null` categories read as 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    #[serde(default, deserialize_with = "score_or_zero")]
    pub performance: f64,
    #[serde(default, deserialize_with = "score_or_zero")]
    pub accessibility: f64,
    #[serde(default, rename = "best-practices", deserialize_with = "score_or_zero")]
    pub best_practices: f64,
    #[serde(default, deserialize_with = "score_or_zero")]
    pub seo: f64,
    #[serde(default, deserialize_with = "score_or_zero")]
    pub pwa: f64,
}

fn score_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub url: String,
    #[serde(default)]
    pub summary: CategoryScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_representative_run: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,
}

/// Ordered per-URL audit results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportManifest(pub Vec<PageReport>);

impl ReportManifest {
    pub fn pages(&self) -> &[PageReport] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read `manifest.json` from `results_dir`; a missing file is an empty manifest.
    pub fn load(results_dir: &Path) -> Result<Self> {
        Ok(read_optional_json(&results_dir.join(MANIFEST_FILE))?.unwrap_or_default())
    }
}

/// Hosted report links keyed by audited URL.
pub type LinksMap = BTreeMap<String, String>;

/// Read `links.json`, if remote upload produced one.
pub fn load_links(results_dir: &Path) -> Result<Option<LinksMap>> {
    read_optional_json(&results_dir.join(LINKS_FILE))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionLevel {
    Error,
    Warn,
    Off,
}

/// A single entry of `assertion-results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResult {
    pub url: String,
    pub name: String,
    pub level: AssertionLevel,
    pub audit_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_documentation_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<serde_json::Value>,
    #[serde(default)]
    pub passed: bool,
}

/// Read `assertion-results.json`, if `lhci assert` ran.
///
/// Entries that do not fit [`AssertionResult`] are skipped with a warning;
/// only a file that is not a JSON array is an error.
pub fn load_assertion_results(results_dir: &Path) -> Result<Option<Vec<AssertionResult>>> {
    let path = results_dir.join(ASSERTION_RESULTS_FILE);
    let Some(entries) = read_optional_json::<Vec<Value>>(&path)? else {
        return Ok(None);
    };

    let results = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(index, error = %e, "Skipping unrecognized assertion result");
                None
            }
        })
        .collect();
    Ok(Some(results))
}

/// Read a JSON file as-is, without mapping it onto a model. `None` when the
/// file does not exist.
pub fn load_raw(path: &Path) -> Result<Option<Value>> {
    read_optional_json(path)
}

fn read_optional_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CoreError::io(path, e)),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| CoreError::json(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = ReportManifest::load(dir.path()).expect("load");
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_manifest_parses_lhci_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MANIFEST_FILE),
            r#"[{
                "url": "http://localhost:8080/",
                "isRepresentativeRun": true,
                "htmlPath": "/tmp/.lighthouseci/localhost-_-2024.html",
                "jsonPath": "/tmp/.lighthouseci/localhost-_-2024.json",
                "summary": {"performance": 0.98, "accessibility": 1, "best-practices": 0.93, "seo": 0.9, "pwa": null}
            }]"#,
        )
        .unwrap();

        let manifest = ReportManifest::load(dir.path()).expect("load");
        let page = &manifest.pages()[0];
        assert_eq!(page.url, "http://localhost:8080/");
        assert_eq!(page.is_representative_run, Some(true));
        assert_eq!(page.summary.best_practices, 0.93);
        assert_eq!(page.summary.accessibility, 1.0);
        assert_eq!(page.summary.pwa, 0.0);
    }

    #[test]
    fn test_malformed_manifest_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "{not json").unwrap();

        let err = ReportManifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::Json { .. }));
        assert!(err.to_string().contains(MANIFEST_FILE));
    }

    #[test]
    fn test_links_and_assertions_optional() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_links(dir.path()).unwrap().is_none());
        assert!(load_assertion_results(dir.path()).unwrap().is_none());

        std::fs::write(
            dir.path().join(LINKS_FILE),
            r#"{"http://localhost:8080/": "https://storage.googleapis.com/report.html"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join(ASSERTION_RESULTS_FILE),
            r#"[{"url":"http://localhost:8080/","name":"minScore","level":"error",
                "auditId":"categories.performance","expected":0.9,"actual":0.61,
                "operator":">=","passed":false}]"#,
        )
        .unwrap();

        let links = load_links(dir.path()).unwrap().unwrap();
        assert_eq!(links.len(), 1);
        let results = load_assertion_results(dir.path()).unwrap().unwrap();
        assert_eq!(results[0].level, AssertionLevel::Error);
        assert_eq!(results[0].audit_id, "categories.performance");
        assert!(!results[0].passed);
    }

    #[test]
    fn test_unrecognized_assertion_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(ASSERTION_RESULTS_FILE),
            r#"[{"url":"u","name":"maxNumericValue","level":"error","auditId":"lcp",
                "auditProperty":"numericValue","values":[3100],"passed":false},
               {"url":"u","level":"fatal"}]"#,
        )
        .unwrap();

        let results = load_assertion_results(dir.path()).unwrap().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].audit_id, "lcp");

        std::fs::write(dir.path().join(ASSERTION_RESULTS_FILE), r#"{"not":"a list"}"#).unwrap();
        assert!(load_assertion_results(dir.path()).is_err());
    }
}
