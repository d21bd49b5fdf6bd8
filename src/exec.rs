//! Command execution.
//!
//! Collectors never touch `std::process` directly; they go through a
//! `CommandRunner` so the parsing can be driven from canned output.

use std::process::Command;

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// None when the child was terminated by a signal
    pub exit_code: Option<i32>,
}

pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CommandOutput>;
}

/// Runs commands on the host, blocking until the child exits.
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CommandOutput> {
        debug!(program, ?args, "running command");

        let output = Command::new(program).args(args).output()?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };

        debug!(
            program,
            exit_code = ?result.exit_code,
            stdout_bytes = result.stdout.len(),
            "command finished"
        );

        Ok(result)
    }
}

/// Renders a command line for diagnostics, e.g. `dnf check-update --quiet`.
pub fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
