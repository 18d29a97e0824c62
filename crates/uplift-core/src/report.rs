//! Parsers for the semi-structured text printed by external tools.
//!
//! Grammar handled here:
//!
//! * patch-apply script: the last non-empty stderr line contains
//!   [`PATCH_FAILURE_SENTINEL`] when the script stopped because patches did not
//!   apply. Its `--print-patch-failures-in-json` mode prints, somewhere in
//!   stdout, a JSON array of `{"patchPath": ..., "reason": ...}` objects.
//! * `git apply --3way`: stderr lines of the form `U <path>` name files left
//!   with conflict markers.
//! * `git status --short`: `XY <path>` lines.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::{PatchFailure, RawPatchFailure};

pub const PATCH_FAILURE_SENTINEL: &str = "Exiting as not all patches were successful!";

/// Outcome of an external script invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    Succeeded,
    Failed(ToolFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    pub exit_status: Option<i32>,
    /// Present when the tool reported patch-apply failures in machine
    /// readable form.
    pub structured_failures: Option<Vec<PatchFailure>>,
    pub raw_output: String,
}

pub fn reports_patch_failures(stderr: &str) -> bool {
    stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .is_some_and(|line| line.contains(PATCH_FAILURE_SENTINEL))
}

fn failure_array_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)\[\s*\{.*?\}\s*\]").expect("patch failure array pattern is valid")
    })
}

/// Extracts the first JSON array of failure records embedded in `output`.
/// Returns `Ok(None)` when no array is present.
pub fn extract_patch_failures(output: &str) -> Result<Option<Vec<PatchFailure>>> {
    let Some(found) = failure_array_pattern().find(output) else {
        return Ok(None);
    };

    let raw: Vec<RawPatchFailure> = serde_json::from_str(found.as_str())
        .context("patch-report-invalid: failed parsing patch failure list")?;
    Ok(Some(raw.into_iter().map(PatchFailure::from).collect()))
}

pub fn parse_unmerged_paths(stderr: &str) -> Vec<String> {
    stderr
        .lines()
        .filter_map(|line| line.strip_prefix("U "))
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Modified,
    Deleted,
    Untracked,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub status: FileStatus,
    pub path: String,
}

pub fn parse_short_status(output: &str) -> Vec<StatusEntry> {
    output
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            let (code, path) = trimmed.split_once(' ')?;
            let status = match code {
                "M" | "MM" | "AM" => FileStatus::Modified,
                "D" | "MD" | "AD" => FileStatus::Deleted,
                "??" => FileStatus::Untracked,
                _ => FileStatus::Other,
            };
            Some(StatusEntry {
                status,
                path: path.trim().to_string(),
            })
        })
        .collect()
}
