use serde::Deserialize;
use std::time::Duration;

use crate::pool::DEFAULT_DAILY_LIMIT;

/// Root configuration for smsgw
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Dispatch behavior
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Sender number pool
    #[serde(default)]
    pub pool: PoolConfig,

    /// Delivery backends
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Gateway dispatch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Try the next provider when one fails
    #[serde(default = "default_true")]
    pub failover_enabled: bool,

    /// Upper bound on a single provider call
    #[serde(default = "default_provider_timeout", with = "humantime_serde")]
    pub provider_timeout: Duration,

    /// In-flight limit for bulk sends
    #[serde(default = "default_bulk_concurrency")]
    pub bulk_concurrency: usize,

    /// Primary provider, overriding per-provider `primary` flags
    pub default_provider: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            failover_enabled: true,
            provider_timeout: default_provider_timeout(),
            bulk_concurrency: default_bulk_concurrency(),
            default_provider: None,
        }
    }
}

fn default_provider_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_bulk_concurrency() -> usize {
    10
}

/// Number pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Assignments allowed per number per day
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,

    /// Period of the daily counter reset
    #[serde(default = "default_reset_interval", with = "humantime_serde")]
    pub reset_interval: Duration,

    /// Numbers loaded at startup
    #[serde(default)]
    pub numbers: Vec<NumberConfig>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            reset_interval: default_reset_interval(),
            numbers: Vec::new(),
        }
    }
}

fn default_daily_limit() -> u32 {
    DEFAULT_DAILY_LIMIT
}

fn default_reset_interval() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

/// Pooled sender number
#[derive(Debug, Clone, Deserialize)]
pub struct NumberConfig {
    /// Sender number
    pub number: String,

    /// Provider the number is provisioned with
    pub provider: String,
}

/// Provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Registration name (for logging/metrics)
    pub name: String,

    /// Designate as primary
    #[serde(default)]
    pub primary: bool,

    /// Register this provider at startup
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Backend selection
    #[serde(flatten)]
    pub backend: BackendConfig,
}

/// Backend type and its settings
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// In-process backend with scripted responses
    Mock(MockConfig),
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock",
        }
    }
}

/// Mock backend configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MockConfig {
    /// Response type
    #[serde(default)]
    pub response: MockResponse,

    /// Simulated latency
    #[serde(default, with = "humantime_serde")]
    pub latency: Duration,

    /// Reported account balance
    pub balance: Option<f64>,
}

/// Mock response type
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MockResponse {
    #[default]
    Success,
    /// Failure result carrying `message`
    Error { message: String },
    /// Transport fault carrying `message`
    Fault { message: String },
    Random { error_rate: f32 },
}

fn default_true() -> bool {
    true
}

/// Global settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Enable structured JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            json_logs: false,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Humantime serde support module
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
