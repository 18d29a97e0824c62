mod config;
mod error;
mod layout;
mod patch;
pub mod report;
mod version;

pub use config::{GithubConfig, UpliftConfig, CONFIG_FILE_NAME};
pub use error::UpgradeError;
pub use layout::RepoLayout;
pub use patch::{
    classify_failures, sub_repository_of, ClassifiedFailures, PatchFailure, PatchFailureReason,
    PatchGroup, PatchGroups, RawPatchFailure,
};
pub use report::{ScriptOutcome, ToolFailure};
pub use version::{is_major_upgrade, is_upgrade, Version};

#[cfg(test)]
mod tests;
