use std::fmt;
use std::path::{Component, Path};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::UpgradeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchFailureReason {
    /// The file the patch targets no longer exists upstream.
    SourceRemoved,
    Conflict,
}

impl PatchFailureReason {
    pub fn from_tool_reason(reason: Option<&str>) -> Self {
        match reason.map(str::trim) {
            Some("SRC_REMOVED") | Some("SOURCE_REMOVED") => Self::SourceRemoved,
            _ => Self::Conflict,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFailure {
    pub patch_path: String,
    pub reason: PatchFailureReason,
}

impl PatchFailure {
    pub fn conflict(patch_path: impl Into<String>) -> Self {
        Self {
            patch_path: patch_path.into(),
            reason: PatchFailureReason::Conflict,
        }
    }

    pub fn source_removed(patch_path: impl Into<String>) -> Self {
        Self {
            patch_path: patch_path.into(),
            reason: PatchFailureReason::SourceRemoved,
        }
    }
}

/// Failure record as printed by the patch-apply script's JSON report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPatchFailure {
    pub patch_path: String,
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<RawPatchFailure> for PatchFailure {
    fn from(raw: RawPatchFailure) -> Self {
        Self {
            reason: PatchFailureReason::from_tool_reason(raw.reason.as_deref()),
            patch_path: raw.patch_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchGroup {
    /// Sub-repository path relative to the source root; empty for the root
    /// repository.
    pub repo: String,
    pub patches: Vec<String>,
}

/// Patches keyed by the sub-repository they apply to. Groups keep the order
/// in which their key was first seen, and patches keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchGroups {
    groups: Vec<PatchGroup>,
}

impl PatchGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, repo: &str, patch_path: impl Into<String>) {
        let patch_path = patch_path.into();
        match self.groups.iter_mut().find(|group| group.repo == repo) {
            Some(group) => group.patches.push(patch_path),
            None => self.groups.push(PatchGroup {
                repo: repo.to_string(),
                patches: vec![patch_path],
            }),
        }
    }

    pub fn get(&self, repo: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|group| group.repo == repo)
            .map(|group| group.patches.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &PatchGroup> {
        self.groups.iter()
    }

    pub fn all_patches(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|group| group.patches.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Serialize for PatchGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(&group.repo, &group.patches)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PatchGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = PatchGroups;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of sub-repository to patch paths")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut groups = PatchGroups::new();
                while let Some((repo, patches)) = access.next_entry::<String, Vec<String>>()? {
                    if groups.get(&repo).is_some() {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate sub-repository '{repo}'"
                        )));
                    }
                    groups.groups.push(PatchGroup { repo, patches });
                }
                Ok(groups)
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedFailures {
    pub groups: PatchGroups,
    pub removed_source_patches: Vec<String>,
}

/// Splits patch-apply failures into patches whose source is gone and
/// conflicting patches grouped by target sub-repository.
pub fn classify_failures(
    failures: &[PatchFailure],
    patches_marker: &str,
) -> Result<ClassifiedFailures, UpgradeError> {
    let mut classified = ClassifiedFailures::default();
    for failure in failures {
        if failure.reason == PatchFailureReason::SourceRemoved {
            classified
                .removed_source_patches
                .push(failure.patch_path.clone());
            continue;
        }

        let repo = sub_repository_of(&failure.patch_path, patches_marker)?;
        classified.groups.push(&repo, failure.patch_path.clone());
    }
    Ok(classified)
}

/// The path segments between the first `patches_marker` segment and the file
/// name, joined with `/`.
pub fn sub_repository_of(patch_path: &str, patches_marker: &str) -> Result<String, UpgradeError> {
    let parts = Path::new(patch_path)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>();

    let Some(marker_index) = parts.iter().position(|part| part == patches_marker) else {
        return Err(UpgradeError::MalformedPatchPath {
            path: patch_path.to_string(),
            marker: patches_marker.to_string(),
        });
    };

    let start = marker_index + 1;
    let end = parts.len().saturating_sub(1).max(start);
    Ok(parts[start..end].join("/"))
}
