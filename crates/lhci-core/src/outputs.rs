//! Step outputs derived from the results directory.

use crate::error::{CoreError, Result};
use crate::manifest::{load_raw, ASSERTION_RESULTS_FILE, LINKS_FILE, MANIFEST_FILE};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::workflow::WorkflowCommands;

/// Publish `resultsPath`, `manifest`, `links` and `assertionResults`.
///
/// File contents are passed through as parsed, not mapped onto the report
/// models. `links` and `assertionResults` are only set when their files
/// exist; a missing manifest is published as `[]`.
pub fn set_output<W: Write>(results_dir: &Path, commands: &mut WorkflowCommands<W>) -> Result<()> {
    commands.set_output("resultsPath", &results_dir.to_string_lossy())?;

    let manifest_path = results_dir.join(MANIFEST_FILE);
    let manifest = load_raw(&manifest_path)?.unwrap_or_else(|| Value::Array(Vec::new()));
    commands.set_output("manifest", &compact(&manifest_path, &manifest)?)?;

    for (name, file) in [("links", LINKS_FILE), ("assertionResults", ASSERTION_RESULTS_FILE)] {
        let path = results_dir.join(file);
        if let Some(value) = load_raw(&path)? {
            commands.set_output(name, &compact(&path, &value)?)?;
        }
    }

    debug!(results = %results_dir.display(), "Outputs set");
    Ok(())
}

fn compact(path: &Path, value: &Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| CoreError::json(path, e))
}
