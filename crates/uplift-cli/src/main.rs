use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod dispatch;
mod render;

use dispatch::{resume_hint, run_cli};
use render::TerminalRenderer;

const LOG_ENV: &str = "UPLIFT_LOG";

#[derive(Parser, Debug)]
#[command(name = "uplift")]
#[command(
    about = "Upgrade a downstream browser repository to a new upstream version",
    long_about = None
)]
struct Cli {
    /// Upstream version to upgrade to, e.g. 131.0.6778.33.
    #[arg(long, value_name = "VERSION")]
    to: String,
    /// Branch whose pinned version the upgrade starts from. Defaults to the
    /// current branch's upstream.
    #[arg(long, value_name = "REF")]
    previous: Option<String>,
    /// Resume after resolving conflicts by hand.
    #[arg(long = "continue")]
    continuation: bool,
    /// Conflict-resolved patches were already committed by hand.
    #[arg(long, requires = "continuation")]
    no_conflict_change: bool,
    /// Only regenerate and commit patches and strings.
    #[arg(long, conflicts_with_all = ["continuation", "github_issue_only"])]
    update_patches_only: bool,
    /// Create or update the upgrade issue once the upgrade is done.
    #[arg(long)]
    with_github: bool,
    /// Only create or update the upgrade issue.
    #[arg(long, conflicts_with = "continuation")]
    github_issue_only: bool,
    /// Open conflicted files in VS Code when the upgrade halts.
    #[arg(long)]
    vscode: bool,
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Downstream repository root.
    #[arg(long, value_name = "DIR")]
    repo: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let renderer = TerminalRenderer::current();
    match run_cli(&cli, &renderer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            renderer.print_failure(&err);
            if let Some(command) = resume_hint(&cli, &err) {
                renderer.print_resume_hint(&command);
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests;
