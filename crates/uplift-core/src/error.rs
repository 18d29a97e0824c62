use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpgradeError {
    #[error("malformed-version: '{value}' is not four dot-separated non-negative integers")]
    MalformedVersion { value: String },

    #[error("not-an-upgrade: cannot upgrade version from {from} to {to}")]
    NotAnUpgrade { from: String, to: String },

    #[error("already-started: it looks like upgrading to {target} has already started; rerun with --continue")]
    AlreadyStarted { target: String },

    #[error("missing-base-branch: cannot determine the upstream; provide --previous or set an upstream branch")]
    MissingBaseBranch,

    #[error("no-continuation: no continuation record at {}", path.display())]
    NoContinuation { path: PathBuf },

    #[error("stale-continuation: {} {reason}; remove it and start the upgrade over", path.display())]
    StaleContinuation { path: PathBuf, reason: String },

    #[error("malformed-patch-path: '{path}' has no '{marker}' segment")]
    MalformedPatchPath { path: String, marker: String },

    #[error("dirty-patch-state: {}", describe_dirty_patches(deleted, untracked))]
    DirtyPatchState {
        deleted: Vec<String>,
        untracked: Vec<String>,
    },

    #[error("tool-failure: {operation} failed{}\n{output}", format_exit_status(*exit_status))]
    ToolFailure {
        operation: String,
        exit_status: Option<i32>,
        output: String,
    },

    #[error("nothing-to-commit: nothing has been staged to commit conflict-resolved patches")]
    NothingToCommit,

    #[error("auth-required: GitHub CLI is not logged in")]
    AuthRequired,

    #[error(transparent)]
    Other(anyhow::Error),
}

/// Recovers a typed error that travelled through `anyhow`, so collaborator
/// failures keep their code.
impl From<anyhow::Error> for UpgradeError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<UpgradeError>() {
            Ok(typed) => typed,
            Err(other) => Self::Other(other),
        }
    }
}

impl UpgradeError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedVersion { .. } => "malformed-version",
            Self::NotAnUpgrade { .. } => "not-an-upgrade",
            Self::AlreadyStarted { .. } => "already-started",
            Self::MissingBaseBranch => "missing-base-branch",
            Self::NoContinuation { .. } => "no-continuation",
            Self::StaleContinuation { .. } => "stale-continuation",
            Self::MalformedPatchPath { .. } => "malformed-patch-path",
            Self::DirtyPatchState { .. } => "dirty-patch-state",
            Self::ToolFailure { .. } => "tool-failure",
            Self::NothingToCommit => "nothing-to-commit",
            Self::AuthRequired => "auth-required",
            Self::Other(_) => "internal",
        }
    }

    /// Halts the operator is expected to act on. These are reported as a
    /// single message without an error chain.
    pub fn is_expected_halt(&self) -> bool {
        matches!(
            self,
            Self::DirtyPatchState { .. }
                | Self::NothingToCommit
                | Self::AlreadyStarted { .. }
                | Self::NotAnUpgrade { .. }
                | Self::StaleContinuation { .. }
                | Self::NoContinuation { .. }
                | Self::AuthRequired
                | Self::MissingBaseBranch
        )
    }

    pub fn tool_failure(
        operation: impl Into<String>,
        exit_status: Option<i32>,
        output: impl Into<String>,
    ) -> Self {
        Self::ToolFailure {
            operation: operation.into(),
            exit_status,
            output: output.into(),
        }
    }
}

fn describe_dirty_patches(deleted: &[String], untracked: &[String]) -> String {
    let mut parts = Vec::new();
    if !deleted.is_empty() {
        parts.push(format!(
            "deleted patches detected, commit them as their own changes: {}",
            deleted.join(", ")
        ));
    }
    if !untracked.is_empty() {
        parts.push(format!(
            "untracked patch files detected, commit them as their own changes: {}",
            untracked.join(", ")
        ));
    }
    parts.join("; ")
}

fn format_exit_status(exit_status: Option<i32>) -> String {
    exit_status
        .map(|code| format!(" (exit status {code})"))
        .unwrap_or_default()
}
