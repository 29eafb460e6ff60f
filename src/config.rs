//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys) are referenced by env-var name in the config and
//! resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

use crate::engine::{forward, InverseFallback};
use crate::types::PricingInput;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub commentary: CommentaryConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Display-only currency symbol.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
    #[serde(default)]
    pub inverse_fallback: InverseFallback,
    /// Input the session starts from.
    pub defaults: PricingInput,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommentaryConfig {
    pub enabled: bool,
    /// "openrouter" | "anthropic"
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

fn default_currency_symbol() -> String {
    "₩".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// The default session input must produce a ladder.
    pub fn validate(&self) -> Result<()> {
        forward::validate(&self.session.defaults)
            .context("Invalid [session.defaults] in config")?;
        if self.commentary.timeout_secs == 0 {
            anyhow::bail!("commentary.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Resolve a secret; empty values count as unset.
    pub fn resolve_secret(env_name: &str) -> Result<SecretString> {
        let value = Self::resolve_env(env_name)?;
        if value.trim().is_empty() {
            anyhow::bail!("Environment variable is empty: {env_name}");
        }
        Ok(SecretString::new(value))
    }
}
