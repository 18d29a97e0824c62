use std::fmt;

use tracing::{debug, info, warn};
use uplift_core::report::{reports_patch_failures, FileStatus};
use uplift_core::{
    classify_failures, PatchGroups, ScriptOutcome, ToolFailure, UpgradeError, Version,
};
use uplift_state::ContinuationRecord;

use crate::commits::CommitPartitioner;
use crate::issue::{sync_issue, IssueSync};
use crate::package::{read_version_at, refresh_pins_timestamp, write_target_version};
use crate::resolution::{apply_three_way, stage_resolved};
use crate::UpgradeContext;

pub const PRINT_FAILURES_FLAG: &str = "--print-patch-failures-in-json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeState {
    Start,
    VersionBumped,
    PatchesAttempted,
    Clean,
    ConflictsPending,
    PatchesFinalized,
    StringsFinalized,
    Done,
    Failed,
}

impl fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::VersionBumped => "version-bumped",
            Self::PatchesAttempted => "patches-attempted",
            Self::Clean => "clean",
            Self::ConflictsPending => "conflicts-pending",
            Self::PatchesFinalized => "patches-finalized",
            Self::StringsFinalized => "strings-finalized",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Versions an invocation works between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub target: Version,
    pub base_branch: String,
    /// Version pinned on the base branch.
    pub base: Version,
}

impl UpgradeRequest {
    /// Resolves the base branch from `previous` or the current branch's
    /// upstream and reads its pinned version.
    pub fn resolve(
        ctx: &UpgradeContext<'_>,
        target: Version,
        previous: Option<&str>,
    ) -> Result<Self, UpgradeError> {
        let base_branch = match previous.map(str::trim).filter(|value| !value.is_empty()) {
            Some(previous) => previous.to_string(),
            None => ctx
                .vcs
                .upstream_branch()?
                .ok_or(UpgradeError::MissingBaseBranch)?,
        };
        let base = read_version_at(ctx, &base_branch)?;
        debug!(%base_branch, %base, %target, "resolved upgrade request");
        Ok(Self {
            target,
            base_branch,
            base,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Resume from a persisted continuation record.
    pub continuation: bool,
    /// The resumed run has no conflict-resolved commit to make.
    pub no_conflict_change: bool,
    pub with_github: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Done {
        /// `None` unless issue sync was requested; `Some(Err)` when the sync
        /// failed after the upgrade itself completed.
        issue: Option<Result<IssueSync, String>>,
    },
    /// Halted for manual resolution; resume with `--continue`.
    ConflictsPending {
        conflicted_files: Vec<String>,
        removed_source_patches: Vec<String>,
    },
}

/// Drives one upgrade invocation through its states.
pub struct UpgradeMachine<'a> {
    ctx: UpgradeContext<'a>,
    request: UpgradeRequest,
    commits: CommitPartitioner<'a>,
    state: UpgradeState,
}

impl<'a> UpgradeMachine<'a> {
    pub fn new(ctx: UpgradeContext<'a>, request: UpgradeRequest) -> Self {
        let commits = CommitPartitioner::new(ctx, request.base, request.target);
        Self {
            ctx,
            request,
            commits,
            state: UpgradeState::Start,
        }
    }

    pub fn state(&self) -> UpgradeState {
        self.state
    }

    pub fn run(&mut self, options: RunOptions) -> Result<RunOutcome, UpgradeError> {
        let result = self.run_inner(options);
        if let Err(err) = &result {
            warn!(state = %self.state, code = err.code(), "upgrade failed");
            self.state = UpgradeState::Failed;
        }
        result
    }

    fn run_inner(&mut self, options: RunOptions) -> Result<RunOutcome, UpgradeError> {
        if options.with_github && !self.ctx.issues.is_authenticated()? {
            return Err(UpgradeError::AuthRequired);
        }

        let store = self.ctx.continuation_store();
        let record = if options.continuation {
            Some(store.load(&self.request.target)?)
        } else {
            None
        };
        let working = match &record {
            Some(record) => record.working_version,
            None => read_version_at(&self.ctx, "HEAD")?,
        };
        self.report_history_links(&working);

        let mut reinit = options.continuation;
        match record {
            None => {
                if self.request.target == working {
                    return Err(UpgradeError::AlreadyStarted {
                        target: self.request.target.to_string(),
                    });
                }
                if !self.request.target.is_upgrade_from(&working) {
                    return Err(UpgradeError::NotAnUpgrade {
                        from: working.to_string(),
                        to: self.request.target.to_string(),
                    });
                }
                if store.exists() {
                    warn!(path = %store.path().display(), "continuation record from an earlier run is present");
                    self.ctx.reporter.warn(&format!(
                        "{} from an earlier run will be replaced if this run halts on conflicts",
                        self.ctx.layout.continuation_file()
                    ));
                }

                self.bump_version()?;
                self.ctx.reporter.status("Running init");
                match self.ctx.scripts.init()? {
                    ScriptOutcome::Succeeded => {
                        self.advance(UpgradeState::PatchesAttempted);
                        if let Err(err) = self.check_regenerated_patches() {
                            if matches!(err, UpgradeError::DirtyPatchState { .. }) {
                                self.save_clean_record(working)?;
                            }
                            return Err(err);
                        }
                    }
                    ScriptOutcome::Failed(failure) if reports_patch_failures(&failure.raw_output) => {
                        self.advance(UpgradeState::PatchesAttempted);
                        let record = self.resolve_patch_failures(working)?;
                        if record.requires_conflict_resolution() {
                            self.advance(UpgradeState::ConflictsPending);
                            return Ok(RunOutcome::ConflictsPending {
                                conflicted_files: record.conflicted_files,
                                removed_source_patches: record.removed_source_patches,
                            });
                        }

                        self.check_regenerated_patches()?;
                        stage_resolved(&self.ctx, &record.patch_groups, false)?;
                        self.commits.commit_conflict_resolved()?;
                        reinit = true;
                    }
                    ScriptOutcome::Failed(failure) => {
                        return Err(UpgradeError::tool_failure(
                            "npm run init",
                            failure.exit_status,
                            failure.raw_output,
                        ));
                    }
                }
            }
            Some(record) if record.patch_groups.is_empty() => {
                // Halted on patch files after a clean init; nothing to resolve.
                self.advance(UpgradeState::PatchesAttempted);
                self.check_regenerated_patches()?;
            }
            Some(record) => {
                self.advance(UpgradeState::ConflictsPending);
                if !options.no_conflict_change {
                    if record.requires_conflict_resolution() {
                        self.check_regenerated_patches()?;
                    }
                    stage_resolved(&self.ctx, &record.patch_groups, true)?;
                    if !self.has_staged_changes()? {
                        return Err(UpgradeError::NothingToCommit);
                    }
                    self.commits.commit_conflict_resolved()?;
                }
            }
        }
        self.advance(UpgradeState::Clean);

        self.ctx.reporter.status("Committing updated patches");
        self.commits.commit_updated_patches()?;
        self.advance(UpgradeState::PatchesFinalized);

        if reinit {
            self.ctx.reporter.status("Re-running init to verify the patch stack");
            self.require_success("npm run init", self.ctx.scripts.init()?)?;
        }
        self.rebase_strings()?;
        self.advance(UpgradeState::StringsFinalized);

        store.clear()?;
        let issue = if options.with_github {
            Some(
                sync_issue(&self.ctx, &self.request.base, &self.request.target)
                    .map_err(|err| err.to_string()),
            )
        } else {
            None
        };
        self.advance(UpgradeState::Done);
        Ok(RunOutcome::Done { issue })
    }

    /// Re-creates the updated-patches and updated-strings commits for the
    /// current tree.
    pub fn regenerate_only(&mut self) -> Result<(), UpgradeError> {
        let result = self.regenerate_inner();
        if result.is_err() {
            self.state = UpgradeState::Failed;
        }
        result
    }

    fn regenerate_inner(&mut self) -> Result<(), UpgradeError> {
        self.ctx.reporter.status("Running init");
        self.require_success("npm run init", self.ctx.scripts.init()?)?;
        self.ctx.reporter.status("Regenerating patches");
        self.require_success("npm run update_patches", self.ctx.scripts.update_patches()?)?;
        self.commits.commit_updated_patches()?;
        self.advance(UpgradeState::PatchesFinalized);
        self.rebase_strings()?;
        self.advance(UpgradeState::StringsFinalized);
        self.advance(UpgradeState::Done);
        Ok(())
    }

    pub fn issue_only(&mut self) -> Result<IssueSync, UpgradeError> {
        if !self.ctx.issues.is_authenticated()? {
            self.state = UpgradeState::Failed;
            return Err(UpgradeError::AuthRequired);
        }
        sync_issue(&self.ctx, &self.request.base, &self.request.target)
    }

    fn advance(&mut self, next: UpgradeState) {
        info!(from = %self.state, to = %next, "state transition");
        self.state = next;
    }

    fn report_history_links(&self, working: &Version) {
        let target = &self.request.target;
        if *working != self.request.base {
            self.ctx.reporter.task(&format!(
                "Changes since last branch upgrade: {}",
                self.ctx.history_link(working, target)
            ));
        }
        self.ctx.reporter.task(&format!(
            "All changes: {}",
            self.ctx.history_link(&self.request.base, target)
        ));
    }

    fn bump_version(&mut self) -> Result<(), UpgradeError> {
        self.ctx.reporter.status("Bumping the pinned version");
        write_target_version(&self.ctx, &self.request.target)?;
        refresh_pins_timestamp(&self.ctx)?;
        self.commits.commit_version_bump()?;
        self.advance(UpgradeState::VersionBumped);
        Ok(())
    }

    /// Applies the failed patches three-way and persists what still needs
    /// the operator.
    fn resolve_patch_failures(&self, working: Version) -> Result<ContinuationRecord, UpgradeError> {
        self.ctx.reporter.status("Collecting patch failures");
        let report = match self.ctx.scripts.apply_patches(&[PRINT_FAILURES_FLAG])? {
            ScriptOutcome::Failed(ToolFailure {
                structured_failures: Some(failures),
                ..
            }) => failures,
            ScriptOutcome::Failed(failure) => {
                return Err(UpgradeError::tool_failure(
                    "npm run apply_patches",
                    failure.exit_status,
                    format!(
                        "apply patches failed to provide a list of patches\n{}",
                        failure.raw_output
                    ),
                ));
            }
            ScriptOutcome::Succeeded => {
                return Err(UpgradeError::tool_failure(
                    "npm run apply_patches",
                    Some(0),
                    "apply patches failed to provide a list of patches",
                ));
            }
        };

        let classified = classify_failures(&report, &self.ctx.config.patches_marker)?;
        let patches = classified
            .groups
            .all_patches()
            .map(str::to_string)
            .collect::<Vec<_>>();
        if !patches.is_empty() {
            self.ctx
                .reporter
                .list("Reapplying patch files with --3way:", &patches);
        }
        let outcome = apply_three_way(&self.ctx, &classified.groups);

        if !classified.removed_source_patches.is_empty() {
            self.ctx.reporter.list(
                "Patch files set to be deleted:",
                &classified.removed_source_patches,
            );
        }
        if !outcome.conflicted_files.is_empty() {
            self.ctx.reporter.list(
                "Manually resolve conflicts for these files:",
                &outcome.conflicted_files,
            );
        }

        let record = ContinuationRecord {
            target_version: self.request.target,
            working_version: working,
            patch_groups: classified.groups,
            conflicted_files: outcome.conflicted_files.clone(),
            removed_source_patches: classified.removed_source_patches,
        };
        self.ctx.continuation_store().save(&record)?;
        if let Some(err) = outcome.first_failure() {
            return Err(err);
        }
        Ok(record)
    }

    /// Leaves a record with no patch groups so `--continue` can pick up once
    /// the operator has dealt with the patch files.
    fn save_clean_record(&self, working: Version) -> Result<(), UpgradeError> {
        self.ctx.continuation_store().save(&ContinuationRecord {
            target_version: self.request.target,
            working_version: working,
            patch_groups: PatchGroups::new(),
            conflicted_files: Vec::new(),
            removed_source_patches: Vec::new(),
        })
    }

    /// Regenerates patches and refuses to go on when that deleted a tracked
    /// patch or produced a new one.
    fn check_regenerated_patches(&self) -> Result<(), UpgradeError> {
        self.ctx.reporter.status("Regenerating patches");
        self.require_success("npm run update_patches", self.ctx.scripts.update_patches()?)?;

        let suffix = format!(".{}", self.ctx.config.patch_extension);
        let mut deleted = Vec::new();
        let mut untracked = Vec::new();
        for entry in self.ctx.vcs.status()? {
            if !entry.path.ends_with(&suffix) {
                continue;
            }
            match entry.status {
                FileStatus::Deleted => deleted.push(entry.path),
                FileStatus::Untracked => untracked.push(entry.path),
                FileStatus::Modified | FileStatus::Other => {}
            }
        }
        if deleted.is_empty() && untracked.is_empty() {
            return Ok(());
        }
        Err(UpgradeError::DirtyPatchState { deleted, untracked })
    }

    fn rebase_strings(&self) -> Result<(), UpgradeError> {
        self.ctx.reporter.status("Rebasing strings");
        self.require_success(
            "npm run chromium_rebase_l10n",
            self.ctx.scripts.rebase_l10n()?,
        )?;
        self.commits.commit_updated_strings()?;
        Ok(())
    }

    fn has_staged_changes(&self) -> Result<bool, UpgradeError> {
        let continuation_file = self.ctx.layout.continuation_file();
        Ok(self
            .ctx
            .vcs
            .staged_files()?
            .iter()
            .any(|path| path != continuation_file))
    }

    fn require_success(&self, operation: &str, outcome: ScriptOutcome) -> Result<(), UpgradeError> {
        match outcome {
            ScriptOutcome::Succeeded => Ok(()),
            ScriptOutcome::Failed(failure) => Err(UpgradeError::tool_failure(
                operation,
                failure.exit_status,
                failure.raw_output,
            )),
        }
    }
}
