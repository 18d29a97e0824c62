use std::fs;
use std::sync::OnceLock;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Local};
use regex::{NoExpand, Regex};
use serde_json::Value;
use tracing::debug;
use uplift_core::{UpgradeError, Version};

use crate::UpgradeContext;

/// Reads the upstream version pinned in the package metadata at `revision`.
pub fn read_version_at(ctx: &UpgradeContext<'_>, revision: &str) -> Result<Version, UpgradeError> {
    let package = load_package_at(ctx, revision)?;
    let pointer = &ctx.config.version_pointer;
    let raw = package
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            anyhow!(
                "{} at {revision} has no string version at '{pointer}'",
                ctx.layout.package_file()
            )
        })?;
    Version::parse(raw)
}

/// Rewrites the package metadata from HEAD with `target` as the pinned
/// version. Key order is preserved.
pub fn write_target_version(ctx: &UpgradeContext<'_>, target: &Version) -> Result<(), UpgradeError> {
    let mut package = load_package_at(ctx, "HEAD")?;
    let pointer = &ctx.config.version_pointer;
    let slot = package.pointer_mut(pointer).ok_or_else(|| {
        anyhow!(
            "{} has no version at '{pointer}'",
            ctx.layout.package_file()
        )
    })?;
    *slot = Value::String(target.to_string());

    let path = ctx.layout.package_path();
    let mut content = serde_json::to_string_pretty(&package)
        .with_context(|| format!("failed serializing {}", path.display()))?;
    content.push('\n');
    fs::write(&path, content).with_context(|| format!("failed writing {}", path.display()))?;
    debug!(path = %path.display(), %target, "updated package version");
    Ok(())
}

fn load_package_at(ctx: &UpgradeContext<'_>, revision: &str) -> Result<Value, UpgradeError> {
    let package_file = ctx.layout.package_file();
    let content = ctx.vcs.read_file_at_revision(revision, package_file)?;
    let package = serde_json::from_str(&content)
        .with_context(|| format!("failed parsing {package_file} at {revision}"))?;
    Ok(package)
}

fn pins_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"# Last updated:[^\n]*\nPinsListTimestamp\n[0-9]{10}\n")
            .expect("pins timestamp pattern is valid")
    })
}

/// Replaces the pins timestamp block with one for `now`. Returns `None`
/// when the block is absent.
pub fn rewrite_pins_timestamp(content: &str, now: DateTime<Local>) -> Option<String> {
    let pattern = pins_block_pattern();
    if !pattern.is_match(content) {
        return None;
    }
    let block = format!(
        "# Last updated: {}\nPinsListTimestamp\n{}\n",
        now.format("%a %b %d %H:%M:%S %Y"),
        now.timestamp()
    );
    Some(pattern.replace(content, NoExpand(&block)).into_owned())
}

/// Refreshes the pins timestamp file that ships with every version bump.
pub fn refresh_pins_timestamp(ctx: &UpgradeContext<'_>) -> Result<(), UpgradeError> {
    let path = ctx.layout.pins_timestamp_path();
    let content =
        fs::read_to_string(&path).with_context(|| format!("failed reading {}", path.display()))?;
    let updated = rewrite_pins_timestamp(&content, ctx.clock.now()).ok_or_else(|| {
        anyhow!(
            "expected PinsListTimestamp block not found in {}",
            path.display()
        )
    })?;
    fs::write(&path, updated).with_context(|| format!("failed writing {}", path.display()))?;

    if ctx.vcs.diff(ctx.layout.pins_timestamp_file())?.trim().is_empty() {
        return Err(anyhow!("pins timestamp failed to update in {}", path.display()).into());
    }
    Ok(())
}
