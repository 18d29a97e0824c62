use std::path::{Path, PathBuf};

use crate::UpliftConfig;

/// Well-known paths inside the downstream repository and the source tree it
/// is checked out in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    root: PathBuf,
    package_file: String,
    pins_timestamp_file: String,
    continuation_file: String,
    source_root: String,
}

impl RepoLayout {
    pub fn new(root: impl Into<PathBuf>, config: &UpliftConfig) -> Self {
        Self {
            root: root.into(),
            package_file: config.package_file.clone(),
            pins_timestamp_file: config.pins_timestamp_file.clone(),
            continuation_file: config.continuation_file.clone(),
            source_root: config.source_root.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository-relative path of the package metadata file.
    pub fn package_file(&self) -> &str {
        &self.package_file
    }

    pub fn package_path(&self) -> PathBuf {
        self.root.join(&self.package_file)
    }

    pub fn pins_timestamp_file(&self) -> &str {
        &self.pins_timestamp_file
    }

    pub fn pins_timestamp_path(&self) -> PathBuf {
        self.root.join(&self.pins_timestamp_file)
    }

    pub fn continuation_file(&self) -> &str {
        &self.continuation_file
    }

    pub fn continuation_path(&self) -> PathBuf {
        self.root.join(&self.continuation_file)
    }

    /// Working copy a patch group applies to; `""` is the source root itself.
    pub fn sub_repository_path(&self, repo: &str) -> PathBuf {
        let base = self.root.join(&self.source_root);
        if repo.is_empty() {
            base
        } else {
            base.join(repo)
        }
    }

    /// How a file inside a sub-repository is named relative to the
    /// downstream repository, e.g. `../third_party/foo/bar.cc`.
    pub fn sub_repository_display(&self, repo: &str, relative: &str) -> String {
        let source_root = self.source_root.trim_end_matches('/');
        if repo.is_empty() {
            format!("{source_root}/{relative}")
        } else {
            format!("{source_root}/{repo}/{relative}")
        }
    }

    pub fn patch_path(&self, patch: &str) -> PathBuf {
        self.root.join(patch)
    }
}
