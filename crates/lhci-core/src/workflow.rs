//! GitHub Actions workflow commands.
//!
//! Annotations and log groups are written as `::command::` lines to stdout.
//! Outputs go to the file named by `GITHUB_OUTPUT` using the multi-line
//! `name<<delimiter` form, so JSON values with newlines survive intact.

use crate::error::{CoreError, Result};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Severity of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationLevel {
    Error,
    Warning,
}

impl AnnotationLevel {
    fn command(&self) -> &'static str {
        match self {
            AnnotationLevel::Error => "error",
            AnnotationLevel::Warning => "warning",
        }
    }
}

/// Escape the message part of a workflow command.
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escape a `key=value` property of a workflow command.
pub fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

/// Format an annotation command line (without trailing newline).
pub fn annotation_command(level: AnnotationLevel, title: Option<&str>, message: &str) -> String {
    match title {
        Some(title) => format!(
            "::{} title={}::{}",
            level.command(),
            escape_property(title),
            escape_data(message)
        ),
        None => format!("::{}::{}", level.command(), escape_data(message)),
    }
}

/// Writer for workflow commands and step outputs.
pub struct WorkflowCommands<W: Write> {
    out: W,
    output_file: Option<PathBuf>,
}

impl WorkflowCommands<io::Stdout> {
    /// Commands on stdout, outputs to `$GITHUB_OUTPUT` when it is set.
    pub fn from_env() -> Self {
        let output_file = std::env::var_os("GITHUB_OUTPUT")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::new(io::stdout(), output_file)
    }
}

impl<W: Write> WorkflowCommands<W> {
    pub fn new(out: W, output_file: Option<PathBuf>) -> Self {
        Self { out, output_file }
    }

    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }

    /// Set a step output.
    ///
    /// Without an output file the legacy `::set-output` command is printed.
    pub fn set_output(&mut self, name: &str, value: &str) -> Result<()> {
        match &self.output_file {
            Some(path) => {
                let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
                let mut file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| CoreError::io(path, e))?;
                write!(file, "{name}<<{delimiter}\n{value}\n{delimiter}\n")
                    .map_err(|e| CoreError::io(path, e))?;
            }
            None => {
                writeln!(
                    self.out,
                    "::set-output name={}::{}",
                    escape_property(name),
                    escape_data(value)
                )?;
            }
        }
        Ok(())
    }

    pub fn annotate(
        &mut self,
        level: AnnotationLevel,
        title: Option<&str>,
        message: &str,
    ) -> Result<()> {
        writeln!(self.out, "{}", annotation_command(level, title, message))?;
        Ok(())
    }

    /// Start a collapsible log group.
    pub fn group(&mut self, name: &str) -> Result<()> {
        writeln!(self.out, "::group::{}", escape_data(name))?;
        self.out.flush()?;
        Ok(())
    }

    pub fn end_group(&mut self) -> Result<()> {
        writeln!(self.out, "::endgroup::")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
