use super::*;
use clap::error::ErrorKind;
use uplift_core::{UpgradeError, Version};
use uplift_flow::IssueSync;

use crate::dispatch::{describe_issue_sync, editor_command, resume_command, resume_hint};
use crate::render::{
    render_list, render_resume_instructions, render_status_line, OutputStyle,
};

#[test]
fn cli_parses_fresh_upgrade() {
    let cli = Cli::try_parse_from(["uplift", "--to", "131.0.6778.33"]).expect("must parse");
    assert_eq!(cli.to, "131.0.6778.33");
    assert!(cli.previous.is_none());
    assert!(!cli.continuation);
    assert!(!cli.with_github);
}

#[test]
fn cli_parses_continuation_flags() {
    let cli = Cli::try_parse_from([
        "uplift",
        "--to",
        "131.0.6778.33",
        "--previous",
        "origin/1.73.x",
        "--continue",
        "--no-conflict-change",
        "--vscode",
        "--repo",
        "/src/brave",
    ])
    .expect("must parse");
    assert!(cli.continuation);
    assert!(cli.no_conflict_change);
    assert!(cli.vscode);
    assert_eq!(cli.previous.as_deref(), Some("origin/1.73.x"));
    assert_eq!(cli.repo, Some(PathBuf::from("/src/brave")));
}

#[test]
fn cli_requires_target_version() {
    let err = Cli::try_parse_from(["uplift", "--continue"]).expect_err("must require --to");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn cli_no_conflict_change_requires_continue() {
    let err = Cli::try_parse_from(["uplift", "--to", "131.0.6778.33", "--no-conflict-change"])
        .expect_err("must require --continue");
    assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
}

#[test]
fn cli_rejects_conflicting_modes() {
    for args in [
        ["uplift", "--to", "131.0.6778.33", "--update-patches-only", "--continue"],
        ["uplift", "--to", "131.0.6778.33", "--update-patches-only", "--github-issue-only"],
        ["uplift", "--to", "131.0.6778.33", "--github-issue-only", "--continue"],
    ] {
        let err = Cli::try_parse_from(args).expect_err("modes must conflict");
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }
}

#[test]
fn resume_command_carries_previous_ref() {
    let target = Version::parse("131.0.6778.33").expect("version");
    assert_eq!(
        resume_command(&target, None),
        "uplift --to 131.0.6778.33 --continue"
    );
    assert_eq!(
        resume_command(&target, Some("origin/1.73.x")),
        "uplift --to 131.0.6778.33 --previous origin/1.73.x --continue"
    );
}

#[test]
fn resume_instructions_name_files_and_command() {
    let lines = render_resume_instructions(
        &["../ui/views/controls/button.cc".to_string()],
        &["patches/chrome-browser-removed.cc.patch".to_string()],
        "uplift --to 131.0.6778.33 --continue",
    );
    assert_eq!(
        lines,
        vec![
            "Resolve the conflicts in these files, then run update_patches:",
            "  - ../ui/views/controls/button.cc",
            "Delete these patches; their sources no longer exist:",
            "  - patches/chrome-browser-removed.cc.patch",
            "When done, resume with: uplift --to 131.0.6778.33 --continue",
        ]
    );
}

#[test]
fn resume_instructions_skip_empty_sections() {
    let lines = render_resume_instructions(&[], &[], "uplift --to 1.2.3.4 --continue");
    assert_eq!(lines, vec!["When done, resume with: uplift --to 1.2.3.4 --continue"]);
}

#[test]
fn render_list_indents_items() {
    assert_eq!(
        render_list("Patch files set to be deleted:", &["patches/a.patch".to_string()]),
        vec!["Patch files set to be deleted:", "  - patches/a.patch"]
    );
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "Upgraded to Chromium 131.0.6778.33"),
        "Upgraded to Chromium 131.0.6778.33"
    );
}

#[test]
fn render_status_line_rich_includes_ascii_badge() {
    assert_eq!(
        render_status_line(OutputStyle::Rich, "ok", "Upgraded to Chromium 131.0.6778.33"),
        "[OK] Upgraded to Chromium 131.0.6778.33"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "warn", "GitHub issue sync failed"),
        "[WARN] GitHub issue sync failed"
    );
    assert_eq!(
        render_status_line(OutputStyle::Rich, "..", "Running init"),
        "[..] Running init"
    );
}

#[test]
fn issue_sync_descriptions_include_url() {
    let url = "https://github.com/brave/brave-browser/issues/42".to_string();
    assert_eq!(
        describe_issue_sync(&IssueSync::Updated { url: url.clone() }),
        format!("Updated history link in {url}")
    );
    assert!(describe_issue_sync(&IssueSync::UpToDate { url }).ends_with("is up to date"));
}

#[test]
fn editor_command_opens_files_from_repo_root() {
    let command = editor_command(
        std::path::Path::new("/src/brave"),
        &["../ui/views/controls/button.cc".to_string()],
    );
    assert_eq!(command.get_program(), "code");
    assert_eq!(
        command.get_args().collect::<Vec<_>>(),
        vec!["../ui/views/controls/button.cc"]
    );
    assert_eq!(command.get_current_dir(), Some(std::path::Path::new("/src/brave")));
}

#[test]
fn expected_halts_render_without_chain() {
    let err = UpgradeError::NothingToCommit;
    assert!(err.is_expected_halt());
    assert!(err.to_string().starts_with("nothing-to-commit: "));
}

#[test]
fn dirty_patch_halt_names_resume_command() {
    let cli = Cli::try_parse_from(["uplift", "--to", "131.0.6778.33", "--previous", "origin/1.73.x"])
        .expect("must parse");
    let dirty = UpgradeError::DirtyPatchState {
        deleted: vec!["patches/chrome-browser-gone.cc.patch".to_string()],
        untracked: Vec::new(),
    };
    assert_eq!(
        resume_hint(&cli, &dirty).as_deref(),
        Some("uplift --to 131.0.6778.33 --previous origin/1.73.x --continue")
    );
    assert_eq!(resume_hint(&cli, &UpgradeError::NothingToCommit), None);

    let regenerate = Cli::try_parse_from(["uplift", "--to", "131.0.6778.33", "--update-patches-only"])
        .expect("must parse");
    assert_eq!(resume_hint(&regenerate, &dirty), None);
}
