//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::engine::executor::SyncConfig;
use crate::strategy::heuristics::HeuristicConfig;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub channel: ChannelConfig,
    #[serde(default)]
    pub pricing: HeuristicConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub currency: String,
    /// How many nights ahead each cycle proposes prices for.
    pub proposal_horizon_days: u32,
    /// Length of the trailing occupancy window.
    pub occupancy_window_days: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChannelConfig {
    pub enabled: bool,
    pub api_key_env: String,
    /// Override for staging or a local test server.
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReviewConfig {
    /// Demo-cycle convenience: approve low-risk proposals without an
    /// operator in the loop. Medium and high risk always wait.
    #[serde(default)]
    pub auto_approve_low_risk: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub audit_file: Option<String>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
