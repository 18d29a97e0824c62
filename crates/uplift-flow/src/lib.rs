mod commits;
mod context;
mod issue;
mod machine;
mod package;
mod resolution;

pub use commits::{CommitPartitioner, CommitStage};
pub use context::{Clock, Reporter, SystemClock, UpgradeContext};
pub use issue::{issue_body, issue_title, sync_issue, IssueSync};
pub use machine::{
    RunOptions, RunOutcome, UpgradeMachine, UpgradeRequest, UpgradeState, PRINT_FAILURES_FLAG,
};
pub use package::{
    read_version_at, refresh_pins_timestamp, rewrite_pins_timestamp, write_target_version,
};
pub use resolution::{apply_three_way, stage_resolved, ConflictOutcome, GroupFailure};
