use serde::{Deserialize, Serialize};
use uplift_core::{PatchGroups, Version};

pub const CONTINUATION_SCHEMA: u32 = 1;

/// State of an upgrade halted for manual conflict resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationRecord {
    pub target_version: Version,
    pub working_version: Version,
    pub patch_groups: PatchGroups,
    pub conflicted_files: Vec<String>,
    pub removed_source_patches: Vec<String>,
}

impl ContinuationRecord {
    pub fn requires_conflict_resolution(&self) -> bool {
        !self.conflicted_files.is_empty() || !self.removed_source_patches.is_empty()
    }
}

/// On-disk shape. `schema` is optional here only so a record written
/// without one can be told apart from one that fails to parse.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ContinuationFile {
    #[serde(default)]
    pub(crate) schema: Option<u32>,
    pub(crate) target_version: Version,
    pub(crate) working_version: Version,
    #[serde(default)]
    pub(crate) patches: PatchGroups,
    #[serde(default)]
    pub(crate) conflicts: Vec<String>,
    #[serde(default)]
    pub(crate) deleted: Vec<String>,
}

impl From<&ContinuationRecord> for ContinuationFile {
    fn from(record: &ContinuationRecord) -> Self {
        Self {
            schema: Some(CONTINUATION_SCHEMA),
            target_version: record.target_version,
            working_version: record.working_version,
            patches: record.patch_groups.clone(),
            conflicts: record.conflicted_files.clone(),
            deleted: record.removed_source_patches.clone(),
        }
    }
}

impl From<ContinuationFile> for ContinuationRecord {
    fn from(file: ContinuationFile) -> Self {
        Self {
            target_version: file.target_version,
            working_version: file.working_version,
            patch_groups: file.patches,
            conflicted_files: file.conflicts,
            removed_source_patches: file.deleted,
        }
    }
}
