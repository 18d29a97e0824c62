use std::cell::Cell;
use std::fmt;

use anyhow::anyhow;
use tracing::{debug, info};
use uplift_core::{UpgradeError, Version};
use uplift_tools::CommitSummary;

use crate::UpgradeContext;

/// Commits an upgrade produces, in the only order they may be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CommitStage {
    VersionBump,
    ConflictResolved,
    UpdatedPatches,
    UpdatedStrings,
}

impl CommitStage {
    pub fn message(self, product: &str, base: &Version, target: &Version) -> String {
        match self {
            Self::VersionBump => {
                format!("Update from {product} {base} to {product} {target}.")
            }
            Self::ConflictResolved => {
                format!("Conflict-resolved patches from {product} {base} to {product} {target}.")
            }
            Self::UpdatedPatches => {
                format!("Update patches from {product} {base} to {product} {target}.")
            }
            Self::UpdatedStrings => format!("Updated strings for {product} {target}."),
        }
    }
}

impl fmt::Display for CommitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VersionBump => "version-bump",
            Self::ConflictResolved => "conflict-resolved",
            Self::UpdatedPatches => "updated-patches",
            Self::UpdatedStrings => "updated-strings",
        };
        f.write_str(name)
    }
}

/// Stages and commits each [`CommitStage`] at most once, in order. A stage
/// with nothing staged produces no commit.
pub struct CommitPartitioner<'a> {
    ctx: UpgradeContext<'a>,
    base: Version,
    target: Version,
    last: Cell<Option<CommitStage>>,
}

impl<'a> CommitPartitioner<'a> {
    pub fn new(ctx: UpgradeContext<'a>, base: Version, target: Version) -> Self {
        Self {
            ctx,
            base,
            target,
            last: Cell::new(None),
        }
    }

    pub fn commit_version_bump(&self) -> Result<Option<CommitSummary>, UpgradeError> {
        self.enter(CommitStage::VersionBump)?;
        let layout = self.ctx.layout;
        self.ctx.vcs.stage(&[
            layout.package_file().to_string(),
            layout.pins_timestamp_file().to_string(),
        ])?;
        self.commit(CommitStage::VersionBump)
    }

    /// Commits whatever conflict resolution staged.
    pub fn commit_conflict_resolved(&self) -> Result<Option<CommitSummary>, UpgradeError> {
        self.enter(CommitStage::ConflictResolved)?;
        self.commit(CommitStage::ConflictResolved)
    }

    /// Stages tracked patch files only; new patch files need their own commit.
    pub fn commit_updated_patches(&self) -> Result<Option<CommitSummary>, UpgradeError> {
        self.enter(CommitStage::UpdatedPatches)?;
        let pathspec = format!("*.{}", self.ctx.config.patch_extension);
        self.ctx.vcs.stage_tracked(&[pathspec])?;
        self.commit(CommitStage::UpdatedPatches)
    }

    /// Stages modified or deleted tracked localization resources.
    pub fn commit_updated_strings(&self) -> Result<Option<CommitSummary>, UpgradeError> {
        self.enter(CommitStage::UpdatedStrings)?;
        self.ctx.vcs.stage_tracked(&self.ctx.config.string_globs)?;
        self.commit(CommitStage::UpdatedStrings)
    }

    fn enter(&self, stage: CommitStage) -> Result<(), UpgradeError> {
        if let Some(last) = self.last.get() {
            if stage <= last {
                return Err(anyhow!("commit stage {stage} requested after {last}").into());
            }
        }
        self.last.set(Some(stage));
        Ok(())
    }

    fn commit(&self, stage: CommitStage) -> Result<Option<CommitSummary>, UpgradeError> {
        let continuation_file = self.ctx.layout.continuation_file();
        if self
            .ctx
            .vcs
            .staged_files()?
            .iter()
            .any(|path| path == continuation_file)
        {
            debug!(path = continuation_file, "unstaging continuation record");
            self.ctx.vcs.unstage(continuation_file)?;
        }

        let message = stage.message(&self.ctx.config.product, &self.base, &self.target);
        match self.ctx.vcs.commit(&message)? {
            Some(commit) => {
                info!(%stage, revision = %commit.revision, "committed");
                self.ctx.reporter.committed(&commit);
                Ok(Some(commit))
            }
            None => {
                debug!(%stage, "nothing staged, skipping commit");
                Ok(None)
            }
        }
    }
}
