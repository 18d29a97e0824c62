use std::fs;
use std::io;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "uplift.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpliftConfig {
    pub product: String,
    /// Name of the downstream browser, used in issue text.
    pub downstream: String,
    pub package_file: String,
    pub version_pointer: String,
    pub pins_timestamp_file: String,
    pub continuation_file: String,
    pub patches_marker: String,
    pub source_root: String,
    pub patch_extension: String,
    pub string_globs: Vec<String>,
    pub github: GithubConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GithubConfig {
    pub repo: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub history_link: String,
}

impl Default for UpliftConfig {
    fn default() -> Self {
        Self {
            product: "Chromium".to_string(),
            downstream: "Brave".to_string(),
            package_file: "package.json".to_string(),
            version_pointer: "/config/projects/chrome/tag".to_string(),
            pins_timestamp_file:
                "chromium_src/net/tools/transport_security_state_generator/input_file_parsers.cc"
                    .to_string(),
            continuation_file: ".version_upgrade".to_string(),
            patches_marker: "patches".to_string(),
            source_root: "..".to_string(),
            patch_extension: "patch".to_string(),
            string_globs: vec![
                "*.grd".to_string(),
                "*.grdp".to_string(),
                "*.xtb".to_string(),
            ],
            github: GithubConfig::default(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            repo: "brave/brave-browser".to_string(),
            labels: [
                "Chromium/upgrade minor",
                "OS/Android",
                "OS/Desktop",
                "QA/Test-Plan-Specified",
                "QA/Yes",
                "release-notes/include",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            assignees: ["emerick", "mkarolin", "cdesouza-chromium"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            history_link:
                "https://chromium.googlesource.com/chromium/src/+log/{from}..{to}?pretty=fuller&n=10000"
                    .to_string(),
        }
    }
}

impl UpliftConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).context("failed to parse uplift config")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .with_context(|| format!("invalid config file: {}", path.display())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err)
                .with_context(|| format!("failed reading config file: {}", path.display())),
        }
    }

    pub fn history_link(&self, from: &str, to: &str) -> String {
        self.github
            .history_link
            .replace("{from}", from)
            .replace("{to}", to)
    }

    fn validate(&self) -> Result<()> {
        if self.patches_marker.trim().is_empty() || self.patches_marker.contains('/') {
            return Err(anyhow!(
                "patches_marker must be a single non-empty path segment: '{}'",
                self.patches_marker
            ));
        }
        if !self.version_pointer.starts_with('/') {
            return Err(anyhow!(
                "version_pointer must be a JSON pointer starting with '/': '{}'",
                self.version_pointer
            ));
        }
        if self.continuation_file.trim().is_empty() {
            return Err(anyhow!("continuation_file must not be empty"));
        }
        if self.patch_extension.trim().is_empty() || self.patch_extension.starts_with('.') {
            return Err(anyhow!(
                "patch_extension must be a bare extension without a leading dot: '{}'",
                self.patch_extension
            ));
        }
        if !self.github.history_link.contains("{from}") || !self.github.history_link.contains("{to}")
        {
            return Err(anyhow!(
                "github.history_link must contain both {{from}} and {{to}} placeholders"
            ));
        }
        Ok(())
    }
}
