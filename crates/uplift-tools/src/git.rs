use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use uplift_core::report::{parse_short_status, parse_unmerged_paths, StatusEntry};
use uplift_core::UpgradeError;

use crate::command::{render_command, CommandOutput, CommandRunner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub revision: String,
    pub summary: String,
}

/// Version-control operations on the downstream repository.
pub trait VersionControl {
    /// Upstream of the current branch, `None` when no upstream is configured.
    fn upstream_branch(&self) -> Result<Option<String>>;
    fn read_file_at_revision(&self, revision: &str, path: &str) -> Result<String>;
    fn status(&self) -> Result<Vec<StatusEntry>>;
    /// Stages paths or glob pathspecs, including untracked matches.
    fn stage(&self, pathspecs: &[String]) -> Result<()>;
    /// Stages modifications and deletions of already tracked matches only.
    fn stage_tracked(&self, pathspecs: &[String]) -> Result<()>;
    fn staged_files(&self) -> Result<Vec<String>>;
    fn unstage(&self, path: &str) -> Result<()>;
    /// Commits the index. Returns `None` without committing when nothing is
    /// staged.
    fn commit(&self, message: &str) -> Result<Option<CommitSummary>>;
    /// Clears whatever is staged in the working copy at `repo_dir`.
    fn reset_index(&self, repo_dir: &Path) -> Result<()>;
    fn diff(&self, path: &str) -> Result<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyResult {
    pub success: bool,
    /// Paths relative to the target working copy, in reported order.
    pub conflicted_paths: Vec<String>,
    pub stderr: String,
}

/// Three-way patch application scoped to one working copy.
pub trait PatchApplier {
    fn apply_three_way(&self, repo_dir: &Path, patches: &[PathBuf]) -> Result<ApplyResult>;
}

#[derive(Debug, Clone)]
pub struct GitClient<R> {
    repo_root: PathBuf,
    runner: R,
}

impl<R: CommandRunner> GitClient<R> {
    pub fn new(repo_root: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            repo_root: repo_root.into(),
            runner,
        }
    }

    fn git(&self) -> Command {
        let mut command = base_git_command();
        command.current_dir(&self.repo_root);
        command
    }

    fn run(&self, mut command: Command) -> Result<CommandOutput> {
        self.runner.run(&mut command)
    }

    /// Runs `command` and returns its trimmed stdout, failing on non-zero
    /// exit.
    fn run_checked(&self, mut command: Command) -> Result<String> {
        let output = self.runner.run(&mut command)?;
        if !output.success() {
            return Err(UpgradeError::tool_failure(
                render_command(&command),
                output.status,
                output.diagnostic(),
            )
            .into());
        }
        Ok(output.stdout.trim().to_string())
    }
}

pub(crate) fn base_git_command() -> Command {
    let mut command = Command::new("git");
    command
        .arg("-c")
        .arg("core.quotepath=false")
        .arg("-c")
        .arg("color.ui=never");
    command
}

impl<R: CommandRunner> VersionControl for GitClient<R> {
    fn upstream_branch(&self) -> Result<Option<String>> {
        let mut command = self.git();
        command
            .arg("rev-parse")
            .arg("--abbrev-ref")
            .arg("--symbolic-full-name")
            .arg("@{upstream}");
        let output = self.run(command)?;
        let upstream = output.stdout.trim();
        if !output.success() || upstream.is_empty() {
            return Ok(None);
        }
        Ok(Some(upstream.to_string()))
    }

    fn read_file_at_revision(&self, revision: &str, path: &str) -> Result<String> {
        let mut command = self.git();
        command.arg("show").arg(format!("{revision}:{path}"));
        let mut command_output = self.run(command)?;
        if !command_output.success() {
            return Err(UpgradeError::tool_failure(
                format!("git show {revision}:{path}"),
                command_output.status,
                command_output.diagnostic(),
            )
            .into());
        }
        Ok(std::mem::take(&mut command_output.stdout))
    }

    fn status(&self) -> Result<Vec<StatusEntry>> {
        let mut command = self.git();
        command.arg("status").arg("--short");
        let output = self.run_checked(command)?;
        Ok(parse_short_status(&output))
    }

    fn stage(&self, pathspecs: &[String]) -> Result<()> {
        if pathspecs.is_empty() {
            return Ok(());
        }
        let mut command = self.git();
        command.arg("add").arg("--").args(pathspecs);
        self.run_checked(command).map(|_| ())
    }

    fn stage_tracked(&self, pathspecs: &[String]) -> Result<()> {
        if pathspecs.is_empty() {
            return Ok(());
        }
        let mut command = self.git();
        command.arg("add").arg("-u").arg("--").args(pathspecs);
        self.run_checked(command).map(|_| ())
    }

    fn staged_files(&self) -> Result<Vec<String>> {
        let mut command = self.git();
        command.arg("diff").arg("--cached").arg("--name-only");
        let output = self.run_checked(command)?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn unstage(&self, path: &str) -> Result<()> {
        let mut command = self.git();
        command.arg("reset").arg("-q").arg("HEAD").arg("--").arg(path);
        self.run_checked(command).map(|_| ())
    }

    fn commit(&self, message: &str) -> Result<Option<CommitSummary>> {
        if self.staged_files()?.is_empty() {
            return Ok(None);
        }

        let mut command = self.git();
        command.arg("commit").arg("-m").arg(message);
        self.run_checked(command)?;

        let mut command = self.git();
        command
            .arg("log")
            .arg("-1")
            .arg("--pretty=format:%h %s");
        let line = self.run_checked(command)?;
        let (revision, summary) = line
            .split_once(' ')
            .with_context(|| format!("unexpected git log output: '{line}'"))?;
        Ok(Some(CommitSummary {
            revision: revision.to_string(),
            summary: summary.to_string(),
        }))
    }

    fn reset_index(&self, repo_dir: &Path) -> Result<()> {
        let mut command = base_git_command();
        command.arg("-C").arg(repo_dir).arg("reset").arg("-q").arg("HEAD");
        self.run_checked(command).map(|_| ())
    }

    fn diff(&self, path: &str) -> Result<String> {
        let mut command = self.git();
        command.arg("diff").arg("--").arg(path);
        self.run_checked(command)
    }
}

impl<R: CommandRunner> PatchApplier for GitClient<R> {
    fn apply_three_way(&self, repo_dir: &Path, patches: &[PathBuf]) -> Result<ApplyResult> {
        if patches.is_empty() {
            return Ok(ApplyResult {
                success: true,
                ..ApplyResult::default()
            });
        }

        let mut command = base_git_command();
        command
            .arg("-C")
            .arg(repo_dir)
            .arg("apply")
            .arg("--3way")
            .arg("--ignore-space-change")
            .arg("--ignore-whitespace")
            .args(patches);
        let output = self.run(command)?;
        Ok(ApplyResult {
            success: output.success(),
            conflicted_paths: parse_unmerged_paths(&output.stderr),
            stderr: output.stderr,
        })
    }
}
