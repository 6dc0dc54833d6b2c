//! Configuration handling for the synbrowse CLI
//!
//! Supports loading run configuration from synbrowse.toml files with CLI argument overrides.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use synbrowse_core::{AlignmentSettings, Dataset, Plugin, RunSettings, Toolchain};

use crate::error::CliError;

pub const DEFAULT_CONFIG_FILE: &str = "synbrowse.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub tools: Toolchain,

    #[serde(default)]
    pub alignment: AlignmentSettings,

    /// Genomes to process, in order
    #[serde(default = "default_datasets")]
    pub datasets: Vec<Dataset>,

    /// Plugin list written into the browser configuration
    #[serde(default = "default_plugins")]
    pub plugins: Vec<Plugin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Browser project directory
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Whether to remove previous output before running
    #[serde(default)]
    pub purge: PurgeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurgeMode {
    /// Prompt on stdin
    #[default]
    Ask,
    Always,
    Never,
}

// Default value functions
fn default_output_dir() -> PathBuf { PathBuf::from("jbrowse2") }
fn default_datasets() -> Vec<Dataset> { RunSettings::default().datasets }
fn default_plugins() -> Vec<Plugin> { vec![Plugin::protein3d()] }

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            purge: PurgeMode::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            tools: Toolchain::default(),
            alignment: AlignmentSettings::default(),
            datasets: default_datasets(),
            plugins: default_plugins(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(path)?
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    log::info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                    Self::load_from_file(&default_path)?
                } else {
                    log::info!("Using default configuration");
                    Self::default()
                }
            }
        };

        Ok(config)
    }

    /// Load configuration from a specific TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::config(format!("Failed to read configuration file {}: {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            CliError::config(format!("Failed to parse configuration file {}: {}", path.display(), e))
        })?;

        Ok(config)
    }

    /// Generate example configuration file content
    pub fn example_toml() -> Result<String> {
        let content = toml::to_string_pretty(&Self::default()).map_err(CliError::from)?;
        Ok(content)
    }

    pub fn to_settings(&self) -> RunSettings {
        RunSettings {
            output_dir: self.general.output_dir.clone(),
            datasets: self.datasets.clone(),
            tools: self.tools.clone(),
            alignment: self.alignment.clone(),
            plugins: self.plugins.clone(),
        }
    }
}
