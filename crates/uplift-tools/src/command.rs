use std::process::Command;

use anyhow::{Context, Result};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Stderr when the tool wrote any, stdout otherwise.
    pub fn diagnostic(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

/// Executes external commands. A non-zero exit is reported through
/// [`CommandOutput::status`]; only launch failures are errors.
pub trait CommandRunner {
    fn run(&self, command: &mut Command) -> Result<CommandOutput>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, command: &mut Command) -> Result<CommandOutput> {
        (**self).run(command)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &mut Command) -> Result<CommandOutput> {
        let rendered = render_command(command);
        debug!(command = %rendered, "running");
        let output = command
            .output()
            .with_context(|| format!("{rendered}: command failed to start"))?;
        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(command = %rendered, status = ?result.status, "finished");
        Ok(result)
    }
}

/// Program and arguments joined with spaces, for messages and logs.
pub fn render_command(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}
