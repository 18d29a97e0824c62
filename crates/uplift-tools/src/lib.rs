mod command;
mod git;
mod github;
mod npm;

pub use command::{render_command, CommandOutput, CommandRunner, SystemRunner};
pub use git::{ApplyResult, CommitSummary, GitClient, PatchApplier, VersionControl};
pub use github::{GhCli, IssueSummary, IssueTracker, NewIssue};
pub use npm::{NpmScripts, PackageScripts};
