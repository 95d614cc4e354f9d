//! YAML configuration (`gherkin-studio.yaml`).
//!
//! Every field has a default, so a partial file or no file at all is valid.
//! The resolved `AppConfig` is handed to `Pipeline::new`; nothing here is
//! global.

use crate::browser::{LaunchOptions, SettleOptions};
use crate::error::ConfigError;
use crate::extract::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "gherkin-studio.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scenario_generation: ScenarioGenerationConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioGenerationConfig {
    /// Extraction cap per category
    #[serde(default = "default_max_elements")]
    pub max_elements_per_type: usize,

    /// Categories generated when the caller does not choose
    #[serde(default = "default_categories")]
    pub enabled_categories_default: Vec<String>,

    /// Concurrent backend calls during one run
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ScenarioGenerationConfig {
    fn default() -> Self {
        Self {
            max_elements_per_type: default_max_elements(),
            enabled_categories_default: default_categories(),
            concurrency: default_concurrency(),
        }
    }
}

impl ScenarioGenerationConfig {
    /// The default category selection; unknown names are dropped with a warning.
    pub fn enabled_categories(&self) -> BTreeSet<Category> {
        self.enabled_categories_default
            .iter()
            .filter_map(|name| match name.parse::<Category>() {
                Ok(category) => Some(category),
                Err(e) => {
                    log::warn!("Ignoring {} in enabled_categories_default", e);
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    #[serde(default = "default_settle_timeout")]
    pub settle_timeout_ms: u64,

    #[serde(default = "default_idle_quiet")]
    pub idle_quiet_ms: u64,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default)]
    pub no_sandbox: bool,

    pub chrome_path: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_secs: default_navigation_timeout(),
            settle_timeout_ms: default_settle_timeout(),
            idle_quiet_ms: default_idle_quiet(),
            headless: true,
            no_sandbox: false,
            chrome_path: None,
        }
    }
}

impl FetchConfig {
    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            chrome_path: self.chrome_path.clone(),
            no_sandbox: self.no_sandbox,
            headless: self.headless,
        }
    }

    pub fn settle_options(&self) -> SettleOptions {
        SettleOptions {
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            settle_timeout: Duration::from_millis(self.settle_timeout_ms),
            idle_quiet: Duration::from_millis(self.idle_quiet_ms),
            ..SettleOptions::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    #[default]
    #[serde(rename = "claude-cli")]
    ClaudeCli,
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub backend: BackendKind,

    pub model: Option<String>,

    /// Upper bound on a single backend call
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_claude_path")]
    pub claude_path: String,

    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_openai_key_env")]
    pub openai_api_key_env: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            model: None,
            timeout_secs: default_generation_timeout(),
            claude_path: default_claude_path(),
            openai_base_url: default_openai_base_url(),
            openai_api_key_env: default_openai_key_env(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Serde default helpers
fn default_max_elements() -> usize { 100 }
fn default_concurrency() -> usize { 4 }
fn default_navigation_timeout() -> u64 { 30 }
fn default_settle_timeout() -> u64 { 7000 }
fn default_idle_quiet() -> u64 { 500 }
fn default_true() -> bool { true }
fn default_generation_timeout() -> u64 { 120 }
fn default_claude_path() -> String { "claude".to_string() }
fn default_openai_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_openai_key_env() -> String { "OPENAI_API_KEY".to_string() }

fn default_categories() -> Vec<String> {
    Category::ALL.iter().map(|c| c.as_str().to_string()).collect()
}

impl AppConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AppConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scenario_generation.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "scenario_generation.concurrency must be at least 1".to_string(),
            ));
        }
        if self.fetch.navigation_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch.navigation_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "generation.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load config from a YAML file. A missing file yields defaults; a file that
/// exists but does not parse is an error.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    match std::fs::read_to_string(path) {
        Ok(content) => {
            log::debug!("Loaded config from {}", path.display());
            AppConfig::from_yaml_str(&content)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(AppConfig::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}
