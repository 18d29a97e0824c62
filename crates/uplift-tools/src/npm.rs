use std::path::PathBuf;
use std::process::Command;

use anyhow::Result;
use tracing::warn;
use uplift_core::report::extract_patch_failures;
use uplift_core::{ScriptOutcome, ToolFailure};

use crate::command::{CommandOutput, CommandRunner};

/// Package scripts of the downstream repository.
pub trait PackageScripts {
    /// Syncs the source tree and applies the patch stack.
    fn init(&self) -> Result<ScriptOutcome>;
    /// Regenerates patch files from the source tree.
    fn update_patches(&self) -> Result<ScriptOutcome>;
    fn rebase_l10n(&self) -> Result<ScriptOutcome>;
    /// Applies the patch stack. Failures carry the structured report when the
    /// script printed one.
    fn apply_patches(&self, extra_flags: &[&str]) -> Result<ScriptOutcome>;
}

#[derive(Debug, Clone)]
pub struct NpmScripts<R> {
    repo_root: PathBuf,
    runner: R,
}

impl<R: CommandRunner> NpmScripts<R> {
    pub fn new(repo_root: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            repo_root: repo_root.into(),
            runner,
        }
    }

    fn run_script(&self, script: &str, extra_flags: &[&str]) -> Result<CommandOutput> {
        let mut command = Command::new("npm");
        command.current_dir(&self.repo_root).arg("run").arg(script);
        if !extra_flags.is_empty() {
            command.arg("--").args(extra_flags);
        }
        self.runner.run(&mut command)
    }
}

fn outcome_from(output: CommandOutput) -> ScriptOutcome {
    if output.success() {
        return ScriptOutcome::Succeeded;
    }
    ScriptOutcome::Failed(ToolFailure {
        exit_status: output.status,
        structured_failures: None,
        raw_output: output.diagnostic().to_string(),
    })
}

impl<R: CommandRunner> PackageScripts for NpmScripts<R> {
    fn init(&self) -> Result<ScriptOutcome> {
        self.run_script("init", &[]).map(outcome_from)
    }

    fn update_patches(&self) -> Result<ScriptOutcome> {
        self.run_script("update_patches", &[]).map(outcome_from)
    }

    fn rebase_l10n(&self) -> Result<ScriptOutcome> {
        self.run_script("chromium_rebase_l10n", &[]).map(outcome_from)
    }

    fn apply_patches(&self, extra_flags: &[&str]) -> Result<ScriptOutcome> {
        let output = self.run_script("apply_patches", extra_flags)?;
        if output.success() {
            return Ok(ScriptOutcome::Succeeded);
        }

        let structured_failures = match extract_patch_failures(&output.stdout) {
            Ok(failures) => failures,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "ignoring unreadable patch failure report");
                None
            }
        };
        Ok(ScriptOutcome::Failed(ToolFailure {
            exit_status: output.status,
            structured_failures,
            raw_output: output.diagnostic().to_string(),
        }))
    }
}
