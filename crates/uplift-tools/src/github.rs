use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;
use uplift_core::UpgradeError;

use crate::command::{render_command, CommandRunner};

const LOGGED_IN_MARKER: &str = "Logged in to github.com";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

pub trait IssueTracker {
    fn is_authenticated(&self) -> Result<bool>;
    fn search_open_issues(&self, title_query: &str) -> Result<Vec<IssueSummary>>;
    /// Returns the URL of the created issue.
    fn create_issue(&self, issue: &NewIssue) -> Result<String>;
    fn edit_issue(&self, number: u64, body: &str) -> Result<()>;
}

/// Issue tracker backed by the `gh` CLI.
#[derive(Debug, Clone)]
pub struct GhCli<R> {
    repo: String,
    runner: R,
}

impl<R: CommandRunner> GhCli<R> {
    pub fn new(repo: impl Into<String>, runner: R) -> Self {
        Self {
            repo: repo.into(),
            runner,
        }
    }

    fn issue_command(&self, action: &str) -> Command {
        let mut command = Command::new("gh");
        command.arg("issue").arg(action).arg("--repo").arg(&self.repo);
        command
    }

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

impl<R: CommandRunner> IssueTracker for GhCli<R> {
    fn is_authenticated(&self) -> Result<bool> {
        let mut command = Command::new("gh");
        command.arg("auth").arg("status");
        let output = match self.runner.run(&mut command) {
            Ok(output) => output,
            Err(_) => return Ok(false),
        };
        // Older gh releases print the status to stderr.
        Ok(output.success()
            && (output.stdout.contains(LOGGED_IN_MARKER)
                || output.stderr.contains(LOGGED_IN_MARKER)))
    }

    fn search_open_issues(&self, title_query: &str) -> Result<Vec<IssueSummary>> {
        let mut command = self.issue_command("list");
        command
            .arg("--search")
            .arg(title_query)
            .arg("--state")
            .arg("open")
            .arg("--json")
            .arg("number,title,url,body");
        let output = self.run_checked(command)?;
        if output.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&output).context("failed parsing gh issue list output")
    }

    fn create_issue(&self, issue: &NewIssue) -> Result<String> {
        let mut command = self.issue_command("create");
        command
            .arg("--title")
            .arg(&issue.title)
            .arg("--body")
            .arg(&issue.body);
        for label in &issue.labels {
            command.arg("--label").arg(label);
        }
        for assignee in &issue.assignees {
            command.arg("--assignee").arg(assignee);
        }
        self.run_checked(command)
    }

    fn edit_issue(&self, number: u64, body: &str) -> Result<()> {
        let mut command = self.issue_command("edit");
        command.arg(number.to_string()).arg("--body").arg(body);
        self.run_checked(command).map(|_| ())
    }
}
