use chrono::{DateTime, Local};
use uplift_core::{RepoLayout, UpliftConfig, Version};
use uplift_state::ContinuationStore;
use uplift_tools::{CommitSummary, IssueTracker, PackageScripts, PatchApplier, VersionControl};

/// Operator-facing progress output.
pub trait Reporter {
    /// A completed step.
    fn task(&self, message: &str);
    /// A heading followed by one bullet per item.
    fn list(&self, heading: &str, items: &[String]);
    fn warn(&self, message: &str);
    /// Transient progress, replaced by the next status.
    fn status(&self, message: &str);
    fn committed(&self, commit: &CommitSummary);
}

pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Everything a run touches, passed explicitly to each step.
#[derive(Clone, Copy)]
pub struct UpgradeContext<'a> {
    pub config: &'a UpliftConfig,
    pub layout: &'a RepoLayout,
    pub vcs: &'a dyn VersionControl,
    pub scripts: &'a dyn PackageScripts,
    pub applier: &'a dyn PatchApplier,
    pub issues: &'a dyn IssueTracker,
    pub clock: &'a dyn Clock,
    pub reporter: &'a dyn Reporter,
}

impl UpgradeContext<'_> {
    pub fn continuation_store(&self) -> ContinuationStore {
        ContinuationStore::new(self.layout.continuation_path())
    }

    pub fn history_link(&self, from: &Version, to: &Version) -> String {
        self.config.history_link(&from.to_string(), &to.to_string())
    }
}
