use lhci_core::summary::{AMBER, GREEN, RED, SUMMARY_HEADER};
use lhci_core::{summarize, CategoryScores, PageReport, ReportManifest};

fn page(url: &str, scores: [f64; 5]) -> PageReport {
    let [performance, accessibility, best_practices, seo, pwa] = scores;
    PageReport {
        url: url.to_string(),
        summary: CategoryScores {
            performance,
            accessibility,
            best_practices,
            seo,
            pwa,
        },
        is_representative_run: None,
        html_path: None,
        json_path: None,
    }
}

fn table_rows(doc: &str) -> Vec<&str> {
    doc.lines()
        .filter(|l| l.starts_with("| ") && !l.starts_with("| Category") && !l.starts_with("| ---"))
        .collect()
}

#[test]
fn single_localhost_page_renders_relative_path_and_fixed_rows() {
    let manifest = ReportManifest(vec![page(
        "http://localhost:1234/page",
        [0.95, 0.88, 0.72, 0.40, 0.0],
    )]);

    let doc = summarize(&manifest);
    let text = doc.as_str();

    assert!(text.starts_with(SUMMARY_HEADER));
    assert!(text.contains("\n### /page\n"));
    assert!(!text.contains("localhost"));

    let rows = table_rows(text);
    assert_eq!(
        rows,
        vec![
            "| 🟢 Performance | 95 |",
            "| 🟠 Accessibility | 88 |",
            "| 🟠 Best practices | 72 |",
            "| 🔴 SEO | 40 |",
            "| 🔴 PWA | 0 |",
        ]
    );
    assert_eq!(text.matches(GREEN).count(), 1);
    assert_eq!(text.matches(AMBER).count(), 2);
    assert_eq!(text.matches(RED).count(), 2);
}

#[test]
fn pages_render_in_manifest_order() {
    let manifest = ReportManifest(vec![
        page("https://example.com/zeta", [1.0; 5]),
        page("http://localhost:8080/alpha", [0.5; 5]),
    ]);

    let doc = summarize(&manifest).into_string();

    let zeta = doc.find("### https://example.com/zeta").expect("zeta block");
    let alpha = doc.find("### /alpha").expect("alpha block");
    assert!(zeta < alpha);
    assert_eq!(doc.matches("| Category | Score |").count(), 2);
    assert_eq!(table_rows(&doc).len(), 10);
}

#[test]
fn empty_manifest_is_exactly_the_header() {
    let doc = summarize(&ReportManifest(Vec::new()));
    assert_eq!(doc.to_string(), SUMMARY_HEADER);
    assert!(table_rows(doc.as_str()).is_empty());
}

#[test]
fn summary_is_deterministic() {
    let manifest = ReportManifest(vec![page("http://localhost:1/", [0.873, 0.5, 0.9, 0.1, 0.005])]);
    let first = summarize(&manifest);
    let second = summarize(&manifest);
    assert_eq!(first, second);
    assert!(first.as_str().contains("| 🟠 Performance | 87 |"));
    assert!(first.as_str().contains("| 🔴 PWA | 1 |"));
}
