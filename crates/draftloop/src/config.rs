//! Configuration for draftloop.
//!
//! Settings are layered, highest priority first: command-line flags,
//! environment variables (after `.env` is loaded), `draftloop.toml` in the
//! working directory, then `~/.config/draftloop/config.toml`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use draftloop_agent::{DEFAULT_GEMINI_MODEL, DEFAULT_MAX_RESULTS};
use draftloop_core::{LoopError, RevisionBudget};
use draftloop_critic::DEFAULT_TONE;

/// The project config file name
pub const CONFIG_FILE_NAME: &str = "draftloop.toml";

/// Environment variables holding the completion credential, in lookup order
pub const API_KEY_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];
pub const MAX_REVISIONS_VAR: &str = "MAX_REVISIONS";
pub const SEARCH_KEY_VAR: &str = "TAVILY_API_KEY";

/// Configuration loaded from `draftloop.toml`
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Maximum evaluation rounds per run
    pub max_revisions: Option<i64>,
    /// Completion model name
    pub model: Option<String>,
    /// Tone requested from the generator
    pub tone: Option<String>,
    #[serde(default)]
    pub search: SearchConfig,
}

/// `[search]` table
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    pub enabled: Option<bool>,
    pub max_results: Option<usize>,
}

impl ProjectConfig {
    /// Load configuration from a single file.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(config_path: &Path) -> Result<Option<Self>> {
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Load the working-directory file layered over the user-level file
    pub fn discover(working_dir: &Path) -> Result<Self> {
        let project = Self::load(&working_dir.join(CONFIG_FILE_NAME))?.unwrap_or_default();
        let user = match user_config_path() {
            Some(path) => Self::load(&path)?.unwrap_or_default(),
            None => Self::default(),
        };
        Ok(project.layered_over(user))
    }

    /// Fill every unset field of `self` from `lower`
    pub fn layered_over(self, lower: ProjectConfig) -> Self {
        Self {
            max_revisions: self.max_revisions.or(lower.max_revisions),
            model: self.model.or(lower.model),
            tone: self.tone.or(lower.tone),
            search: SearchConfig {
                enabled: self.search.enabled.or(lower.search.enabled),
                max_results: self.search.max_results.or(lower.search.max_results),
            },
        }
    }
}

/// `~/.config/draftloop/config.toml` (platform config dir)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("draftloop").join("config.toml"))
}

/// Values given on the command line
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub max_revisions: Option<i64>,
    pub model: Option<String>,
    pub tone: Option<String>,
    pub no_search: bool,
}

/// Fully resolved run settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub budget: RevisionBudget,
    pub model: String,
    pub tone: String,
    /// Present only when search is enabled and a credential exists
    pub search_api_key: Option<String>,
    pub search_max_results: usize,
    /// Why search is off, if it is
    pub search_disabled_reason: Option<String>,
}

impl Settings {
    /// Resolve settings from the CLI, an environment lookup and the file
    /// config. Missing required values are configuration errors.
    pub fn resolve<F>(cli: &CliOverrides, file: &ProjectConfig, env: F) -> Result<Self, LoopError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        let api_key = API_KEY_VARS.iter().find_map(|&name| env(name)).ok_or_else(|| {
            LoopError::Config(format!(
                "{} is not set (add it to the environment or a .env file)",
                API_KEY_VARS.join(" or ")
            ))
        })?;

        let budget = match (cli.max_revisions, env(MAX_REVISIONS_VAR), file.max_revisions) {
            (Some(max), _, _) => RevisionBudget::new(max)?,
            (None, Some(raw), _) => raw.parse::<RevisionBudget>()?,
            (None, None, Some(max)) => RevisionBudget::new(max)?,
            (None, None, None) => {
                return Err(LoopError::Config(format!(
                    "{} is not set (use --max-revisions, the environment or max_revisions in {})",
                    MAX_REVISIONS_VAR, CONFIG_FILE_NAME
                )))
            }
        };

        let model = cli
            .model
            .clone()
            .or_else(|| file.model.clone())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let tone = cli
            .tone
            .clone()
            .or_else(|| file.tone.clone())
            .unwrap_or_else(|| DEFAULT_TONE.to_string());

        let search_key = env(SEARCH_KEY_VAR);
        let search_disabled_reason = if cli.no_search {
            Some("disabled by --no-search".to_string())
        } else if file.search.enabled == Some(false) {
            Some(format!("disabled in {}", CONFIG_FILE_NAME))
        } else if search_key.is_none() {
            Some(format!("{} not found", SEARCH_KEY_VAR))
        } else {
            None
        };
        let search_api_key = search_key.filter(|_| search_disabled_reason.is_none());

        Ok(Self {
            api_key,
            budget,
            model,
            tone,
            search_api_key,
            search_max_results: file.search.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            search_disabled_reason,
        })
    }
}
