use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Context;
use tracing::{info, warn};
use uplift_core::{RepoLayout, UpgradeError, UpliftConfig, Version, CONFIG_FILE_NAME};
use uplift_flow::{
    IssueSync, RunOptions, RunOutcome, SystemClock, UpgradeContext, UpgradeMachine,
    UpgradeRequest,
};
use uplift_tools::{CommandRunner, GhCli, GitClient, NpmScripts, SystemRunner};

use crate::render::TerminalRenderer;
use crate::Cli;

pub(crate) fn run_cli(cli: &Cli, renderer: &TerminalRenderer) -> Result<(), UpgradeError> {
    let repo_root = resolve_repo_root(cli.repo.as_deref())?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| repo_root.join(CONFIG_FILE_NAME));
    let config = UpliftConfig::load_or_default(&config_path)?;
    let target = Version::parse(&cli.to)?;

    let layout = RepoLayout::new(repo_root.clone(), &config);
    let git = GitClient::new(repo_root.clone(), SystemRunner);
    let scripts = NpmScripts::new(repo_root.clone(), SystemRunner);
    let issues = GhCli::new(config.github.repo.clone(), SystemRunner);
    let ctx = UpgradeContext {
        config: &config,
        layout: &layout,
        vcs: &git,
        scripts: &scripts,
        applier: &git,
        issues: &issues,
        clock: &SystemClock,
        reporter: renderer,
    };

    let request = UpgradeRequest::resolve(&ctx, target, cli.previous.as_deref())?;
    info!(base_branch = %request.base_branch, base = %request.base, %target, "starting");
    let mut machine = UpgradeMachine::new(ctx, request);

    if cli.github_issue_only {
        let sync = machine.issue_only()?;
        renderer.print_issue_sync(&sync);
        return Ok(());
    }

    if cli.update_patches_only {
        machine.regenerate_only()?;
        renderer.print_done(&format!(
            "Regenerated patches and strings for {} {target}",
            config.product
        ));
        return Ok(());
    }

    let outcome = machine.run(RunOptions {
        continuation: cli.continuation,
        no_conflict_change: cli.no_conflict_change,
        with_github: cli.with_github,
    })?;
    match outcome {
        RunOutcome::Done { issue } => {
            renderer.print_done(&format!("Upgraded to {} {target}", config.product));
            match issue {
                Some(Ok(sync)) => renderer.print_issue_sync(&sync),
                Some(Err(message)) => {
                    renderer.print_warning(&format!("GitHub issue sync failed: {message}"))
                }
                None => {}
            }
        }
        RunOutcome::ConflictsPending {
            conflicted_files,
            removed_source_patches,
        } => {
            renderer.print_conflicts_pending(
                &conflicted_files,
                &removed_source_patches,
                &resume_command(&target, cli.previous.as_deref()),
            );
            if cli.vscode && !conflicted_files.is_empty() {
                open_in_editor(&SystemRunner, &repo_root, &conflicted_files, renderer);
            }
        }
    }
    Ok(())
}

fn resolve_repo_root(repo: Option<&Path>) -> Result<PathBuf, UpgradeError> {
    let repo = repo.unwrap_or_else(|| Path::new("."));
    let root = repo
        .canonicalize()
        .with_context(|| format!("failed resolving repository root {}", repo.display()))?;
    Ok(root)
}

/// Resume command for failures that leave a continuation record behind.
pub(crate) fn resume_hint(cli: &Cli, err: &UpgradeError) -> Option<String> {
    if !matches!(err, UpgradeError::DirtyPatchState { .. })
        || cli.update_patches_only
        || cli.github_issue_only
    {
        return None;
    }
    let target = Version::parse(&cli.to).ok()?;
    Some(resume_command(&target, cli.previous.as_deref()))
}

/// Command line that resumes the halted upgrade.
pub(crate) fn resume_command(target: &Version, previous: Option<&str>) -> String {
    match previous {
        Some(previous) => format!("uplift --to {target} --previous {previous} --continue"),
        None => format!("uplift --to {target} --continue"),
    }
}

pub(crate) fn editor_command(repo_root: &Path, files: &[String]) -> Command {
    let mut command = Command::new("code");
    command.args(files).current_dir(repo_root);
    command
}

fn open_in_editor(
    runner: &dyn CommandRunner,
    repo_root: &Path,
    files: &[String],
    renderer: &TerminalRenderer,
) {
    let mut command = editor_command(repo_root, files);
    match runner.run(&mut command) {
        Ok(output) if output.success() => {}
        Ok(output) => {
            warn!(status = ?output.status, "editor exited unsuccessfully");
            renderer.print_warning(&format!(
                "could not open conflicted files in VS Code: {}",
                output.diagnostic()
            ));
        }
        Err(err) => {
            warn!(error = %err, "editor launch failed");
            renderer.print_warning(&format!("could not open conflicted files in VS Code: {err}"));
        }
    }
}

pub(crate) fn describe_issue_sync(sync: &IssueSync) -> String {
    match sync {
        IssueSync::Created { url } => format!("Created upgrade issue {url}"),
        IssueSync::Updated { url } => format!("Updated history link in {url}"),
        IssueSync::UpToDate { url } => format!("Upgrade issue {url} is up to date"),
    }
}
