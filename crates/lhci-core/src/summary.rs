//! Pull-request summary rendering.
//!
//! Turns a [`ReportManifest`] into the Markdown body posted on the pull
//! request: a fixed header, then one score table per page in manifest order.

use crate::manifest::{CategoryScores, PageReport, ReportManifest};
use std::fmt;

/// First line of every summary.
pub const SUMMARY_HEADER: &str = "## ⚡️🏠 Lighthouse report";

pub const GREEN: &str = "🟢";
pub const AMBER: &str = "🟠";
pub const RED: &str = "🔴";

/// Rendered summary body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryDocument(String);

impl SummaryDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SummaryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Traffic-light marker: green from 0.90, amber from 0.50, red below.
pub fn emoji_score(score: f64) -> &'static str {
    if score >= 0.9 {
        GREEN
    } else if score >= 0.5 {
        AMBER
    } else {
        RED
    }
}

/// Score as a whole percentage, rounding halves away from zero
/// (`0.005` → 1, `0.125` → 13).
pub fn format_score(score: f64) -> i64 {
    (score * 100.0).round() as i64
}

/// Drop an `http(s)://localhost:<port>` prefix so locally served pages
/// read as paths. Without the colon the URL is left alone.
pub fn display_url(url: &str) -> &str {
    let Some(rest) = url
        .strip_prefix("http://localhost:")
        .or_else(|| url.strip_prefix("https://localhost:"))
    else {
        return url;
    };

    let path = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    match path.chars().next() {
        None => "/",
        Some('/' | '?' | '#') => path,
        Some(_) => url,
    }
}

fn score_row(label: &str, score: f64) -> String {
    format!("| {} {} | {} |", emoji_score(score), label, format_score(score))
}

fn category_rows(summary: &CategoryScores) -> [(&'static str, f64); 5] {
    [
        ("Performance", summary.performance),
        ("Accessibility", summary.accessibility),
        ("Best practices", summary.best_practices),
        ("SEO", summary.seo),
        ("PWA", summary.pwa),
    ]
}

fn render_page(page: &PageReport) -> String {
    let rows = category_rows(&page.summary)
        .iter()
        .map(|(label, score)| score_row(label, *score))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "\n\n### {}\n\n| Category | Score |\n| -------- | ----- |\n{}\n",
        display_url(&page.url),
        rows
    )
}

/// Render the summary for `manifest`. An empty manifest yields the header alone.
pub fn summarize(manifest: &ReportManifest) -> SummaryDocument {
    let body = manifest
        .pages()
        .iter()
        .fold(String::from(SUMMARY_HEADER), |mut doc, page| {
            doc.push_str(&render_page(page));
            doc
        });
    SummaryDocument(body)
}
