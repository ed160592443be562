//! Logging for `lhci-action`.
//!
//! Logs share the job console with `lhci`'s own output and with the
//! `::group::`/`::error::` workflow commands, which are written to stdout.
//! Log lines therefore go to stderr, uncoloured, so the runner shows them
//! verbatim and never mistakes one for a command.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber for the action.
///
/// `RUST_LOG` wins over `level` when it parses. With `json` set, each line
/// is a JSON object. A subscriber installed earlier in the process is kept.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let console = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(console.json()).try_init().ok();
    } else {
        registry.with(console).try_init().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
        tracing::info!("still logging after second init");
    }
}
