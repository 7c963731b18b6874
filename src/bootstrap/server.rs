use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

use crate::config::{BackendConfig, Config, ProviderConfig};
use crate::gateway::Gateway;
use crate::pool::{DailyReset, NumberPool};
use crate::provider::{MockProvider, Provider};
use crate::telemetry::counters;

use super::shutdown::Shutdown;

/// Instantiate the backend a provider entry describes.
pub fn build_provider(config: &ProviderConfig) -> Arc<dyn Provider> {
    match &config.backend {
        BackendConfig::Mock(mock) => Arc::new(MockProvider::new(mock)),
    }
}

/// Build a gateway with every enabled provider registered.
///
/// `gateway.default_provider`, when set, wins over per-provider
/// `primary` flags.
pub fn build_gateway(config: &Config) -> Result<Gateway> {
    let mut gateway = Gateway::new(config.gateway.clone());

    for provider in &config.providers {
        if !provider.enabled {
            info!(provider = %provider.name, "provider disabled, skipping");
            continue;
        }
        gateway
            .register_provider(&provider.name, build_provider(provider), provider.primary)
            .with_context(|| format!("failed to register provider: {}", provider.name))?;
        info!(
            provider = %provider.name,
            backend = provider.backend.kind(),
            "provider configured"
        );
    }

    if let Some(default) = &config.gateway.default_provider {
        gateway
            .set_primary(default)
            .with_context(|| format!("default_provider is not enabled: {}", default))?;
    }

    Ok(gateway)
}

/// Build the number pool with the configured numbers loaded.
pub async fn build_pool(config: &Config) -> NumberPool {
    let pool = NumberPool::new(config.pool.daily_limit);
    pool.add_numbers_bulk(
        config
            .pool
            .numbers
            .iter()
            .map(|n| (n.number.as_str(), n.provider.as_str())),
    )
    .await;
    pool
}

/// Gateway process
///
/// Components:
/// - Gateway: provider registry and failover dispatch
/// - Number pool: sender numbers under a daily quota
/// - Daily reset: restores quotas and cooled-down numbers each period
/// - Shutdown: signal handling and task teardown
pub struct Server {
    config: Arc<Config>,
    gateway: Arc<Gateway>,
    pool: Arc<NumberPool>,
    shutdown: Arc<Shutdown>,
}

impl Server {
    /// Create a new server instance
    pub async fn new(config: Config) -> Result<Self> {
        counters::init(&opentelemetry::global::meter("smsgw"));

        let gateway = build_gateway(&config)?;
        let pool = build_pool(&config).await;

        Ok(Self {
            config: Arc::new(config),
            gateway: Arc::new(gateway),
            pool: Arc::new(pool),
            shutdown: Shutdown::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn pool(&self) -> &Arc<NumberPool> {
        &self.pool
    }

    pub fn shutdown(&self) -> &Arc<Shutdown> {
        &self.shutdown
    }

    /// Run background tasks until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        let span = info_span!("smsgw", version = env!("CARGO_PKG_VERSION"));
        self.serve().instrument(span).await
    }

    async fn serve(self) -> Result<()> {
        let stats = self.pool.stats().await;
        info!(
            providers = self.gateway.list_providers().len(),
            primary = self.gateway.primary().unwrap_or(""),
            numbers = stats.total,
            daily_limit = stats.daily_limit,
            "starting smsgw"
        );

        let reset = DailyReset::new(
            self.pool.clone(),
            self.shutdown.clone(),
            self.config.pool.reset_interval,
        );
        let reset_handle = tokio::spawn(reset.run());

        let signal = self.shutdown.wait_for_signal().await;
        // Stop tasks even if signal registration failed
        self.shutdown.trigger();

        if let Err(e) = reset_handle.await {
            error!(error = %e, "daily reset task panicked");
        }

        let stats = self.gateway.stats();
        info!(
            sent = stats.sent,
            failed = stats.failed,
            retried = stats.retried,
            "smsgw stopped"
        );

        signal.context("failed to listen for shutdown signal")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
gateway:
  provider_timeout: 1s
pool:
  daily_limit: 2
  numbers:
    - number: "+14377846365"
      provider: telnyx
    - number: "+14377846366"
      provider: backup
providers:
  - name: telnyx
    type: mock
    response:
      fault:
        message: down
  - name: backup
    type: mock
    primary: true
  - name: spare
    type: mock
    enabled: false
"#;

    #[tokio::test]
    async fn test_build_gateway_from_config() {
        let config = Config::from_yaml(YAML).unwrap();
        let gateway = build_gateway(&config).unwrap();

        assert_eq!(gateway.list_providers(), vec!["telnyx", "backup"]);
        assert_eq!(gateway.primary(), Some("backup"));
        assert_eq!(gateway.config().provider_timeout.as_secs(), 1);
    }

    #[tokio::test]
    async fn test_default_provider_overrides_flag() {
        let yaml = YAML.replace("gateway:\n", "gateway:\n  default_provider: telnyx\n");
        let config = Config::from_yaml(&yaml).unwrap();
        let gateway = build_gateway(&config).unwrap();
        assert_eq!(gateway.failover_order(), vec!["telnyx", "backup"]);
    }

    #[tokio::test]
    async fn test_default_provider_disabled() {
        let yaml = YAML.replace("gateway:\n", "gateway:\n  default_provider: spare\n");
        let config = Config::from_yaml(&yaml).unwrap();
        let err = build_gateway(&config).err().expect("expected build_gateway to fail");
        assert!(err.to_string().contains("spare"));
    }

    #[tokio::test]
    async fn test_build_pool_from_config() {
        let config = Config::from_yaml(YAML).unwrap();
        let pool = build_pool(&config).await;

        let stats = pool.stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.available, 2);
        assert_eq!(stats.daily_limit, 2);
    }

    #[tokio::test]
    async fn test_server_components() {
        let server = Server::new(Config::from_yaml(YAML).unwrap()).await.unwrap();
        let result = server
            .gateway()
            .send_assigned(server.pool(), "+12025551234", "hi", None)
            .await
            .unwrap()
            .unwrap();
        assert!(result.success);
        assert_eq!(result.provider.as_deref(), Some("backup"));
        assert_eq!(
            server.pool().assigned_to("+12025551234").await.as_deref(),
            Some("+14377846365")
        );
    }
}
