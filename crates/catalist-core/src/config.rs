//! Configuration loading from TOML files
//!
//! The configuration is constructed once at process entry and passed by
//! reference into every component; core logic never reads it from ambient
//! state.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ConfigError;

/// Global configuration for catalist.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub workflow: WorkflowConfig,
    /// Per-project settings, keyed by project name.
    pub project: BTreeMap<String, ProjectConfig>,
}

/// Workflow-wide settings shared by all projects.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Datasets per batch file.
    pub n_per_batch: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { n_per_batch: 500 }
    }
}

/// Per-project settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Root of the data archive; dataset facets map to subdirectories.
    #[serde(deserialize_with = "deserialize_path")]
    pub base_dir: PathBuf,
    /// Where batches, results and the catalog index live.
    #[serde(deserialize_with = "deserialize_path")]
    pub catalog_dir: PathBuf,
    /// Where versioned CSV exports are written.
    #[serde(deserialize_with = "deserialize_path")]
    pub csv_dir: PathBuf,
    /// Manifest of dataset identifiers, one per line.
    #[serde(deserialize_with = "deserialize_path")]
    pub datasets_file: PathBuf,
    /// Facet names in identifier order.
    pub facet_rule: Vec<String>,
}

/// Deserialize a path, expanding a leading `${VAR}` environment reference.
fn deserialize_path<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(PathBuf::from(expand_env_var(&s)))
}

/// Expand a leading `${VAR}` to the environment variable's value.
fn expand_env_var(s: &str) -> String {
    if let Some(rest) = s.strip_prefix("${") {
        if let Some(end) = rest.find('}') {
            if let Ok(value) = std::env::var(&rest[..end]) {
                return format!("{value}{}", &rest[end + 1..]);
            }
        }
    }
    s.to_string()
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Search order:
    /// 1. ./catalist.toml (current directory)
    /// 2. ~/.config/catalist/config.toml
    ///
    /// If no config file is found, returns the defaults (no projects).
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("catalist.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "catalist") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Settings for one project.
    pub fn project(&self, name: &str) -> Result<&ProjectConfig, ConfigError> {
        self.project
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProject(name.to_string()))
    }
}
