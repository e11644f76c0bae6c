use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::AggregationOptions;
use crate::metrics::MissingSgpaPolicy;

pub const CONFIG_DIR_NAME: &str = ".gradeledger";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_ANALYSIS_ENDPOINT: &str = "http://localhost:8000/api/analyze-performance/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LedgerConfig {
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    #[serde(default = "default_merge_across_all_branches")]
    pub merge_across_all_branches: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            merge_across_all_branches: default_merge_across_all_branches(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MetricsConfig {
    #[serde(default)]
    pub missing_sgpa: MissingSgpaPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
        }
    }
}

impl LedgerConfig {
    pub fn aggregation_options(&self) -> AggregationOptions {
        AggregationOptions {
            merge_across_all_branches: self.aggregation.merge_across_all_branches,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn config_dir(workspace: impl AsRef<Path>) -> PathBuf {
    workspace.as_ref().join(CONFIG_DIR_NAME)
}

pub fn config_path(workspace: impl AsRef<Path>) -> PathBuf {
    config_dir(workspace).join(CONFIG_FILE_NAME)
}

pub fn load_workspace_config(workspace: impl AsRef<Path>) -> Result<LedgerConfig, ConfigError> {
    let path = config_path(workspace);
    if !path.exists() {
        return Ok(LedgerConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: LedgerConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

/// Loads the workspace config, writing the defaults first if none exists.
pub fn ensure_workspace_config(
    workspace: impl AsRef<Path>,
) -> Result<LedgerConfig, ConfigError> {
    let workspace = workspace.as_ref();
    fs::create_dir_all(config_dir(workspace))?;

    let path = config_path(workspace);
    if path.exists() {
        return load_workspace_config(workspace);
    }

    let config = LedgerConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "wrote default config");

    Ok(config)
}

fn default_merge_across_all_branches() -> bool {
    true
}

fn default_endpoint() -> String {
    DEFAULT_ANALYSIS_ENDPOINT.to_owned()
}

fn normalize_config(mut config: LedgerConfig) -> LedgerConfig {
    let endpoint = config.analysis.endpoint.trim();
    config.analysis.endpoint = if endpoint.is_empty() {
        default_endpoint()
    } else {
        endpoint.to_owned()
    };
    config
}
