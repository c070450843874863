//! User configuration for the `stk` application.

use crate::{
    constants::{PR_TEMPLATE_PATH, STK_CFG_FILE_NAME},
    errors::StkResult,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The user configuration, read from `~/.stk.toml` unless overridden.
///
/// Every key is optional. A missing file yields [StkConfig::default].
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StkConfig {
    /// The remote that hosts the upstream branch and receives pushes.
    pub remote: String,
    /// Overrides the upstream branch advertised by the remote's `HEAD`.
    pub upstream: Option<String>,
    /// Whether new pull requests are opened as drafts.
    pub draft: bool,
    /// Inline pull request body template.
    pub pr_template: Option<String>,
}

impl Default for StkConfig {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            upstream: None,
            draft: true,
            pr_template: None,
        }
    }
}

impl StkConfig {
    /// Returns the default configuration path, `~/.stk.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(STK_CFG_FILE_NAME))
    }

    /// Loads the configuration at `path`, or at [StkConfig::default_path] if [None].
    ///
    /// ## Takes
    /// - `path` - An explicit configuration path.
    ///
    /// ## Returns
    /// - `Ok(StkConfig)` - The parsed configuration, or the defaults if the file does not exist.
    /// - `Err(_)` - The file exists but could not be read or parsed.
    pub fn load(path: Option<&Path>) -> StkResult<Self> {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Ok(Self::default());
        };

        if !path.exists() {
            debug!(path = %path.display(), "No configuration file found, using defaults");
            return Ok(Self::default());
        }

        debug!(path = %path.display(), "Loading configuration");
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Parses a configuration from its TOML representation.
    pub fn parse(raw: &str) -> StkResult<Self> {
        toml::from_str(raw).map_err(Into::into)
    }

    /// Returns the body that new pull requests are seeded with.
    ///
    /// The inline `pr-template` wins over the repository's pull request template.
    pub fn pr_body_template(&self, workdir: Option<&Path>) -> String {
        if let Some(template) = self.pr_template.as_ref() {
            return template.clone();
        }

        workdir
            .map(|dir| dir.join(PR_TEMPLATE_PATH))
            .and_then(|path| std::fs::read_to_string(path).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::StkConfig;

    #[test]
    fn empty_config_uses_defaults() {
        let config = StkConfig::parse("").unwrap();
        assert_eq!(config, StkConfig::default());
        assert_eq!(config.remote, "origin");
        assert!(config.draft);
    }

    #[test]
    fn parses_kebab_case_keys() {
        let config = StkConfig::parse(
            r###"
            remote = "upstream"
            upstream = "main"
            draft = false
            pr-template = "## Summary"
            "###,
        )
        .unwrap();

        assert_eq!(config.remote, "upstream");
        assert_eq!(config.upstream.as_deref(), Some("main"));
        assert!(!config.draft);
        assert_eq!(config.pr_body_template(None), "## Summary");
    }

    #[test]
    fn rejects_malformed_config() {
        assert!(StkConfig::parse("draft = \"sometimes\"").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StkConfig::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config, StkConfig::default());
    }

    #[test]
    fn reads_repository_template() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".github")).unwrap();
        std::fs::write(
            dir.path().join(".github/pull_request_template.md"),
            "Describe the change",
        )
        .unwrap();

        let config = StkConfig::default();
        assert_eq!(config.pr_body_template(Some(dir.path())), "Describe the change");
    }
}
