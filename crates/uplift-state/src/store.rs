use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;
use uplift_core::{UpgradeError, Version};

use crate::continuation::{ContinuationFile, CONTINUATION_SCHEMA};
use crate::ContinuationRecord;

/// Single-slot store for the continuation record at a fixed path.
#[derive(Debug, Clone)]
pub struct ContinuationStore {
    path: PathBuf,
}

impl ContinuationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Overwrites whatever record is currently stored.
    pub fn save(&self, record: &ContinuationRecord) -> Result<(), UpgradeError> {
        let file = ContinuationFile::from(record);
        let mut content = serde_json::to_string_pretty(&file).with_context(|| {
            format!(
                "continuation-write-failed: failed serializing {}",
                self.path.display()
            )
        })?;
        content.push('\n');
        fs::write(&self.path, content).with_context(|| {
            format!(
                "continuation-write-failed: failed writing {}",
                self.path.display()
            )
        })?;
        debug!(
            path = %self.path.display(),
            target = %record.target_version,
            groups = record.patch_groups.len(),
            conflicts = record.conflicted_files.len(),
            "saved continuation record"
        );
        Ok(())
    }

    /// Loads the stored record, which must target `expected_target`.
    pub fn load(&self, expected_target: &Version) -> Result<ContinuationRecord, UpgradeError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(UpgradeError::NoContinuation {
                    path: self.path.clone(),
                });
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!(
                        "continuation-unreadable: failed reading {}",
                        self.path.display()
                    ))
                    .into());
            }
        };

        let file: ContinuationFile =
            serde_json::from_str(&content).map_err(|err| self.stale(format!("is invalid ({err})")))?;
        match file.schema {
            Some(CONTINUATION_SCHEMA) => {}
            Some(other) => return Err(self.stale(format!("has unsupported schema {other}"))),
            None => return Err(self.stale("was written without a schema version".to_string())),
        }
        if file.target_version != *expected_target {
            return Err(self.stale(format!(
                "targets {} rather than {}",
                file.target_version, expected_target
            )));
        }

        debug!(path = %self.path.display(), "loaded continuation record");
        Ok(file.into())
    }

    /// Removes the stored record. Missing records are not an error.
    pub fn clear(&self) -> Result<(), UpgradeError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "cleared continuation record");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!(
                    "continuation-write-failed: failed removing {}",
                    self.path.display()
                ))
                .into()),
        }
    }

    fn stale(&self, reason: String) -> UpgradeError {
        UpgradeError::StaleContinuation {
            path: self.path.clone(),
            reason,
        }
    }
}
