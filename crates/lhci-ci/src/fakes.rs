//! In-memory collaborators for exercising the pipeline without spawning
//! `lhci` or calling GitHub.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use lhci_core::{Secret, SummaryDocument};

use crate::artifacts::ArtifactStore;
use crate::error::{CiError, Result};
use crate::finalize::Finalizer;
use crate::publish::CommentPublisher;
use crate::runner::StageInvoker;

// ---------------------------------------------------------------------------
// ScriptedInvoker
// ---------------------------------------------------------------------------

/// Recorded `lhci` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: String,
    pub args: Vec<String>,
}

/// Invoker that returns scripted exit statuses and records every call.
///
/// Statuses are keyed by command, optionally narrowed by an argument the
/// call must contain (e.g. `--target=filesystem`). Unscripted calls exit 0.
#[derive(Debug, Default)]
pub struct ScriptedInvoker {
    statuses: Vec<(String, Option<String>, i32)>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit with `status` for every call to `command`.
    pub fn with_status(mut self, command: &str, status: i32) -> Self {
        self.statuses.push((command.to_string(), None, status));
        self
    }

    /// Exit with `status` for calls to `command` that include `arg`.
    pub fn with_status_for_arg(mut self, command: &str, arg: &str, status: i32) -> Self {
        self.statuses
            .push((command.to_string(), Some(arg.to_string()), status));
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Argument lists of every call to `command`, in call order.
    pub fn calls_for(&self, command: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.command == command)
            .map(|c| c.args)
            .collect()
    }
}

#[async_trait]
impl StageInvoker for ScriptedInvoker {
    async fn invoke(&self, command: &str, args: &[String]) -> i32 {
        self.calls.lock().unwrap().push(Invocation {
            command: command.to_string(),
            args: args.to_vec(),
        });

        // Argument-specific entries win over command-wide ones.
        let specific = self.statuses.iter().find(|(cmd, arg, _)| {
            cmd == command && arg.as_ref().is_some_and(|a| args.contains(a))
        });
        let general = self
            .statuses
            .iter()
            .find(|(cmd, arg, _)| cmd == command && arg.is_none());

        specific.or(general).map(|(_, _, status)| *status).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// RecordingPublisher
// ---------------------------------------------------------------------------

/// Publisher that stores bodies instead of posting them.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    fail: bool,
    bodies: Mutex<Vec<String>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every call fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommentPublisher for RecordingPublisher {
    async fn publish(&self, _token: &Secret, body: &SummaryDocument) -> Result<()> {
        self.bodies.lock().unwrap().push(body.as_str().to_string());
        if self.fail {
            return Err(CiError::Publish("scripted failure".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryArtifactStore
// ---------------------------------------------------------------------------

/// Artifact store that remembers upload requests.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    fail: bool,
    uploads: Mutex<HashMap<String, PathBuf>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> HashMap<String, PathBuf> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn upload(&self, name: &str, dir: &Path) -> Result<()> {
        if self.fail {
            return Err(CiError::Artifact("scripted failure".to_string()));
        }
        self.uploads
            .lock()
            .unwrap()
            .insert(name.to_string(), dir.to_path_buf());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingFinalizer
// ---------------------------------------------------------------------------

/// Finalizer that counts calls.
#[derive(Debug, Default)]
pub struct RecordingFinalizer {
    fail: bool,
    calls: Mutex<Vec<PathBuf>>,
}

impl RecordingFinalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Finalizer for RecordingFinalizer {
    async fn finalize(&self, results_dir: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(results_dir.to_path_buf());
        if self.fail {
            return Err(CiError::Collaborator("scripted failure".to_string()));
        }
        Ok(())
    }
}
