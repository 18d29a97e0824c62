use anyhow::Context;
use regex::{NoExpand, Regex};
use tracing::info;
use uplift_core::{UpgradeError, Version};
use uplift_tools::NewIssue;

use crate::UpgradeContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueSync {
    Created { url: String },
    Updated { url: String },
    UpToDate { url: String },
}

/// Major upgrades are titled by major version only.
pub fn issue_title(product: &str, base: &Version, target: &Version) -> String {
    if target.is_major_upgrade_from(base) {
        format!(
            "Upgrade from {product} {} to {product} {}",
            base.major, target.major
        )
    } else {
        format!("Upgrade from {product} {base} to {product} {target}")
    }
}

pub fn issue_body(product: &str, downstream: &str, history_link: &str) -> String {
    format!(
        "### Minor {product} bump\n\
\n\
{history_link}\n\
\n\
### QA tests\n\
\n\
- Check branding items\n\
- Check for version bump\n\
\n\
### Minor {product} bump\n\
\n\
- No specific code changes in {downstream} (only line number changes in patches)\n"
    )
}

/// Matches any history link built from the configured template.
fn history_link_pattern(template: &str) -> Result<Regex, UpgradeError> {
    let prefix = template.split("{from}").next().unwrap_or(template);
    let pattern = format!(r"{}[^\s]+", regex::escape(prefix));
    let compiled =
        Regex::new(&pattern).with_context(|| format!("invalid history link pattern: {pattern}"))?;
    Ok(compiled)
}

/// Creates the upgrade issue, or points the existing one at the current
/// history link.
pub fn sync_issue(
    ctx: &UpgradeContext<'_>,
    base: &Version,
    target: &Version,
) -> Result<IssueSync, UpgradeError> {
    let title = issue_title(&ctx.config.product, base, target);
    let link = ctx.history_link(base, target);

    ctx.reporter.status("Looking up the upgrade issue");
    let existing = ctx
        .issues
        .search_open_issues(&title)?
        .into_iter()
        .find(|issue| issue.title == title);

    if let Some(issue) = existing {
        let pattern = history_link_pattern(&ctx.config.github.history_link)?;
        let body = pattern.replace_all(&issue.body, NoExpand(&link));
        if body == issue.body {
            info!(number = issue.number, "upgrade issue is up to date");
            return Ok(IssueSync::UpToDate { url: issue.url });
        }
        ctx.issues.edit_issue(issue.number, &body)?;
        info!(number = issue.number, "updated upgrade issue");
        return Ok(IssueSync::Updated { url: issue.url });
    }

    let url = ctx.issues.create_issue(&NewIssue {
        title,
        body: issue_body(&ctx.config.product, &ctx.config.downstream, &link),
        labels: ctx.config.github.labels.clone(),
        assignees: ctx.config.github.assignees.clone(),
    })?;
    info!(%url, "created upgrade issue");
    Ok(IssueSync::Created { url })
}
