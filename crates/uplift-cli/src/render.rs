use std::cell::RefCell;
use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};
use uplift_core::UpgradeError;
use uplift_flow::{IssueSync, Reporter};
use uplift_tools::CommitSummary;

use crate::dispatch::describe_issue_sync;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn current_output_style() -> OutputStyle {
    let no_color = std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty());
    if no_color || !std::io::stdout().is_terminal() {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

/// Console output for a run. Transient statuses go to a spinner in rich
/// mode; everything else is printed as a badge line.
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
    spinner: RefCell<Option<ProgressBar>>,
}

impl TerminalRenderer {
    pub(crate) fn from_style(style: OutputStyle) -> Self {
        Self {
            style,
            spinner: RefCell::new(None),
        }
    }

    pub(crate) fn current() -> Self {
        Self::from_style(current_output_style())
    }

    fn print_status(&self, status: &str, message: &str) {
        self.clear_spinner();
        let line = match self.style {
            OutputStyle::Plain => render_status_line(self.style, status, message),
            OutputStyle::Rich => format!(
                "{} {message}",
                colorize(badge_style(status), status_badge(status))
            ),
        };
        if status == "warn" || status == "err" {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    fn print_lines(&self, lines: &[String]) {
        self.clear_spinner();
        for line in lines {
            println!("{line}");
        }
    }

    pub(crate) fn print_done(&self, message: &str) {
        self.print_status("ok", message);
    }

    pub(crate) fn print_warning(&self, message: &str) {
        self.print_status("warn", message);
    }

    pub(crate) fn print_issue_sync(&self, sync: &IssueSync) {
        self.print_status("ok", &describe_issue_sync(sync));
    }

    pub(crate) fn print_conflicts_pending(
        &self,
        conflicted_files: &[String],
        removed_source_patches: &[String],
        resume_command: &str,
    ) {
        self.print_status("warn", "Upgrade halted for manual conflict resolution");
        self.print_lines(&render_resume_instructions(
            conflicted_files,
            removed_source_patches,
            resume_command,
        ));
    }

    /// Expected halts are a single line; anything else gets its full cause
    /// chain.
    pub(crate) fn print_failure(&self, err: &UpgradeError) {
        let message = if err.is_expected_halt() {
            err.to_string()
        } else {
            format!("{err:#}")
        };
        self.print_status("err", &message);
    }

    pub(crate) fn print_resume_hint(&self, resume_command: &str) {
        self.print_lines(&render_resume_instructions(&[], &[], resume_command));
    }

    fn clear_spinner(&self) {
        if let Some(spinner) = self.spinner.borrow_mut().take() {
            spinner.finish_and_clear();
        }
    }

    fn spinner(&self) -> ProgressBar {
        let mut slot = self.spinner.borrow_mut();
        slot.get_or_insert_with(|| {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan.bold} {msg} {elapsed}") {
                spinner.set_style(style.tick_chars("|/-\\ "));
            }
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        })
        .clone()
    }
}

impl Reporter for TerminalRenderer {
    fn task(&self, message: &str) {
        self.print_status("ok", message);
    }

    fn list(&self, heading: &str, items: &[String]) {
        self.print_lines(&render_list(heading, items));
    }

    fn warn(&self, message: &str) {
        self.print_status("warn", message);
    }

    fn status(&self, message: &str) {
        match self.style {
            OutputStyle::Plain => println!("{}", render_status_line(self.style, "..", message)),
            OutputStyle::Rich => self.spinner().set_message(message.to_string()),
        }
    }

    fn committed(&self, commit: &CommitSummary) {
        self.print_status("ok", &format!("Committed {} {}", commit.revision, commit.summary));
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        self.clear_spinner();
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => format!("{} {message}", status_badge(status)),
    }
}

pub(crate) fn render_list(heading: &str, items: &[String]) -> Vec<String> {
    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(heading.to_string());
    lines.extend(items.iter().map(|item| format!("  - {item}")));
    lines
}

pub(crate) fn render_resume_instructions(
    conflicted_files: &[String],
    removed_source_patches: &[String],
    resume_command: &str,
) -> Vec<String> {
    let mut lines = Vec::new();
    if !conflicted_files.is_empty() {
        lines.extend(render_list(
            "Resolve the conflicts in these files, then run update_patches:",
            conflicted_files,
        ));
    }
    if !removed_source_patches.is_empty() {
        lines.extend(render_list(
            "Delete these patches; their sources no longer exist:",
            removed_source_patches,
        ));
    }
    lines.push(format!("When done, resume with: {resume_command}"));
    lines
}

fn status_badge(status: &str) -> &'static str {
    match status {
        "ok" => "[OK]",
        "warn" => "[WARN]",
        "err" => "[ERR]",
        _ => "[..]",
    }
}

fn badge_style(status: &str) -> Style {
    let color = match status {
        "ok" => AnsiColor::BrightGreen,
        "warn" => AnsiColor::BrightYellow,
        "err" => AnsiColor::BrightRed,
        _ => AnsiColor::BrightBlue,
    };
    Style::new()
        .fg_color(Some(color.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
