use tracing::{debug, warn};
use uplift_core::{PatchGroups, UpgradeError};

use crate::UpgradeContext;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictOutcome {
    /// Files left with conflict markers, named relative to the downstream
    /// repository.
    pub conflicted_files: Vec<String>,
    /// Groups whose apply or index reset could not run, in group order.
    pub failed_groups: Vec<GroupFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFailure {
    pub repo: String,
    pub message: String,
}

impl ConflictOutcome {
    fn record_failure(&mut self, repo: &str, what: &str, err: anyhow::Error) {
        let message = format!("{err:#}");
        warn!(%repo, error = %message, "{what}");
        self.failed_groups.push(GroupFailure {
            repo: repo.to_string(),
            message,
        });
    }

    /// The first group failure as a tool failure naming its sub-repository.
    pub fn first_failure(&self) -> Option<UpgradeError> {
        self.failed_groups.first().map(|failure| {
            UpgradeError::tool_failure(
                format!("git apply --3way in '{}'", failure.repo),
                None,
                failure.message.clone(),
            )
        })
    }
}

/// Re-applies each group with a three-way merge in its sub-repository.
///
/// Every group is attempted even when an earlier one fails, and each
/// sub-repository's index is reset right after its attempt. Failures to run
/// either step are collected in `failed_groups` instead of ending the loop.
pub fn apply_three_way(ctx: &UpgradeContext<'_>, groups: &PatchGroups) -> ConflictOutcome {
    let mut outcome = ConflictOutcome::default();
    for group in groups.iter() {
        let repo_dir = ctx.layout.sub_repository_path(&group.repo);
        let patches = group
            .patches
            .iter()
            .map(|patch| ctx.layout.patch_path(patch))
            .collect::<Vec<_>>();

        ctx.reporter
            .status(&format!("Applying {} patch(es) to {}", patches.len(), repo_dir.display()));
        let applied = ctx.applier.apply_three_way(&repo_dir, &patches);
        let reset = ctx.vcs.reset_index(&repo_dir);
        let applied = match applied {
            Ok(applied) => Some(applied),
            Err(err) => {
                outcome.record_failure(&group.repo, "three-way apply did not run", err);
                None
            }
        };
        if let Err(err) = reset {
            outcome.record_failure(&group.repo, "index reset failed", err);
        }
        let Some(applied) = applied else {
            continue;
        };

        if applied.success {
            debug!(repo = %group.repo, "three-way apply succeeded");
            continue;
        }
        if applied.conflicted_paths.is_empty() {
            warn!(
                repo = %group.repo,
                stderr = %applied.stderr.trim(),
                "three-way apply failed without reporting conflicts"
            );
        }
        outcome.conflicted_files.extend(
            applied
                .conflicted_paths
                .iter()
                .map(|path| ctx.layout.sub_repository_display(&group.repo, path)),
        );
    }
    outcome
}

/// Stages every patch in `groups` in one batch. With `skip_missing`, patches
/// deleted during manual resolution are left out.
pub fn stage_resolved(
    ctx: &UpgradeContext<'_>,
    groups: &PatchGroups,
    skip_missing: bool,
) -> Result<usize, UpgradeError> {
    let paths = groups
        .all_patches()
        .filter(|patch| !skip_missing || ctx.layout.patch_path(patch).exists())
        .map(str::to_string)
        .collect::<Vec<_>>();
    ctx.vcs.stage(&paths)?;
    Ok(paths.len())
}
