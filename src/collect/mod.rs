//! Metric collectors.
//!
//! Each collector runs one or more package-manager commands and turns their
//! line-oriented output into typed records. Malformed lines are skipped and
//! counted, never fatal: the `Coverage` that comes back with the data says
//! how many lines made it.

pub mod cache;
pub mod dependencies;
pub mod orphans;
pub mod packages;
pub mod parse;
pub mod updates;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AnalysisConfig;
use crate::exec::{display_command, CommandOutput, CommandRunner};

/// How much of a command's output was understood.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    pub parsed: usize,
    pub total: usize,
}

impl Coverage {
    pub fn record(&mut self, parsed: bool) {
        self.total += 1;
        if parsed {
            self.parsed += 1;
        }
    }

    pub fn merge(self, other: Coverage) -> Coverage {
        Coverage {
            parsed: self.parsed + other.parsed,
            total: self.total + other.total,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.parsed == self.total
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collected<T> {
    pub data: T,
    pub coverage: Coverage,
}

/// Why a category could not be collected. Stored in the snapshot, not raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    #[error("{command}: could not run ({reason})")]
    Unavailable { command: String, reason: String },

    #[error("{command} exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("{command}: none of {total} output lines could be parsed")]
    Unparseable { command: String, total: usize },

    #[error("{0} does not exist")]
    Missing(PathBuf),
}

pub trait Collector {
    type Output;

    fn name(&self) -> &'static str;
    fn enabled(&self, analysis: &AnalysisConfig) -> bool;
    fn collect(
        &self,
        runner: &dyn CommandRunner,
        analysis: &AnalysisConfig,
    ) -> Result<Collected<Self::Output>, CollectionError>;
}

/// Runs a command and treats any exit code outside `accepted` as a failure.
pub(crate) fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
    accepted: &[i32],
) -> Result<CommandOutput, CollectionError> {
    let command = display_command(program, args);

    let output = runner
        .run(program, args)
        .map_err(|e| CollectionError::Unavailable {
            command: command.clone(),
            reason: e.to_string(),
        })?;

    match output.exit_code {
        Some(code) if accepted.contains(&code) => Ok(output),
        code => Err(CollectionError::CommandFailed {
            command,
            status: code
                .map(|c| format!("exit code {c}"))
                .unwrap_or_else(|| "signal".to_string()),
            stderr: first_line(&output.stderr),
        }),
    }
}

/// A command that produced data lines but none we could read is a failure,
/// not an empty result.
pub(crate) fn ensure_parsed(
    program: &str,
    args: &[&str],
    coverage: Coverage,
) -> Result<(), CollectionError> {
    if coverage.total > 0 && coverage.parsed == 0 {
        return Err(CollectionError::Unparseable {
            command: display_command(program, args),
            total: coverage.total,
        });
    }
    Ok(())
}

/// First non-blank stderr line, for error messages.
pub(crate) fn first_line(stderr: &str) -> String {
    stderr
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no error output")
        .to_string()
}
