//! Failing-assertion annotations.
//!
//! `lhci assert` writes every failed assertion to `assertion-results.json`.
//! They are grouped per audited URL into a single annotation, raised as an
//! error when any assertion in the group is error-level and as a warning
//! otherwise.

use crate::error::Result;
use crate::manifest::{
    load_assertion_results, load_links, AssertionLevel, AssertionResult, LinksMap,
};
use crate::summary::display_url;
use crate::workflow::{AnnotationLevel, WorkflowCommands};
use serde_json::Value;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub level: AnnotationLevel,
    pub title: String,
    pub message: String,
}

fn render_value(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "?".to_string(),
    }
}

fn render_assertion(result: &AssertionResult) -> String {
    let level = match result.level {
        AssertionLevel::Error => "error",
        _ => "warn",
    };
    let audit = result.audit_title.as_deref().unwrap_or(&result.audit_id);
    let mut line = format!(
        "[{}] {} ({}): expected {} {}, found {}",
        level,
        audit,
        result.name,
        result.operator.as_deref().unwrap_or(""),
        render_value(&result.expected),
        render_value(&result.actual),
    );
    if let Some(doc) = &result.audit_documentation_link {
        line.push_str(&format!(" - {doc}"));
    }
    line
}

/// Group failed assertions by URL, keeping first-seen URL order.
pub fn build_annotations(results: &[AssertionResult], links: Option<&LinksMap>) -> Vec<Annotation> {
    let mut groups: Vec<(&str, Vec<&AssertionResult>)> = Vec::new();
    for result in results
        .iter()
        .filter(|r| !r.passed && r.level != AssertionLevel::Off)
    {
        match groups.iter_mut().find(|(url, _)| *url == result.url) {
            Some((_, failed)) => failed.push(result),
            None => groups.push((result.url.as_str(), vec![result])),
        }
    }

    groups
        .into_iter()
        .map(|(url, failed)| {
            let level = if failed.iter().any(|r| r.level == AssertionLevel::Error) {
                AnnotationLevel::Error
            } else {
                AnnotationLevel::Warning
            };

            let mut lines: Vec<String> = failed.iter().map(|r| render_assertion(r)).collect();
            if let Some(link) = links.and_then(|l| l.get(url)) {
                lines.push(format!("Report: {link}"));
            }

            Annotation {
                level,
                title: format!(
                    "Lighthouse CI: {} failed assertion(s) for {}",
                    failed.len(),
                    display_url(url)
                ),
                message: lines.join("\n"),
            }
        })
        .collect()
}

/// Emit one annotation per URL with failed assertions. Returns how many were written.
pub fn set_annotations<W: Write>(
    results_dir: &Path,
    commands: &mut WorkflowCommands<W>,
) -> Result<usize> {
    let Some(results) = load_assertion_results(results_dir)? else {
        return Ok(0);
    };
    let links = load_links(results_dir)?;

    let annotations = build_annotations(&results, links.as_ref());
    for annotation in &annotations {
        commands.annotate(annotation.level, Some(&annotation.title), &annotation.message)?;
    }
    Ok(annotations.len())
}
