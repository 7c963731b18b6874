use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::types::{BackendConfig, Config, MockResponse};

impl Config {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        debug!(path = %path.display(), "loading configuration");

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        Self::from_yaml(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(yaml).context("failed to parse YAML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            anyhow::bail!("at least one provider must be defined");
        }

        let mut provider_names = HashSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                anyhow::bail!("provider name must not be empty");
            }
            if !provider_names.insert(provider.name.as_str()) {
                anyhow::bail!("duplicate provider name: {}", provider.name);
            }
        }

        let primaries: Vec<&str> = self
            .providers
            .iter()
            .filter(|p| p.primary)
            .map(|p| p.name.as_str())
            .collect();
        if primaries.len() > 1 {
            anyhow::bail!("more than one primary provider: {}", primaries.join(", "));
        }

        if let Some(default) = &self.gateway.default_provider {
            if !provider_names.contains(default.as_str()) {
                anyhow::bail!("default_provider references unknown provider: {}", default);
            }
        }

        if self.gateway.provider_timeout.is_zero() {
            anyhow::bail!("gateway.provider_timeout must be greater than zero");
        }

        if self.gateway.bulk_concurrency == 0 {
            anyhow::bail!("gateway.bulk_concurrency must be greater than zero");
        }

        if self.pool.daily_limit == 0 {
            anyhow::bail!("pool.daily_limit must be greater than zero");
        }

        if self.pool.reset_interval.is_zero() {
            anyhow::bail!("pool.reset_interval must be greater than zero");
        }

        for provider in &self.providers {
            let BackendConfig::Mock(mock) = &provider.backend;
            if let MockResponse::Random { error_rate } = mock.response {
                if !(0.0..=1.0).contains(&error_rate) {
                    anyhow::bail!(
                        "provider '{}' error_rate must be between 0 and 1, got {}",
                        provider.name,
                        error_rate
                    );
                }
            }
        }

        // Numbers reference existing providers and appear once
        let mut numbers = HashSet::new();
        for entry in &self.pool.numbers {
            if !provider_names.contains(entry.provider.as_str()) {
                anyhow::bail!(
                    "number '{}' references unknown provider: {}",
                    entry.number,
                    entry.provider
                );
            }
            if !numbers.insert(entry.number.as_str()) {
                anyhow::bail!("duplicate pool number: {}", entry.number);
            }
        }

        info!("configuration validated successfully");
        Ok(())
    }
}
