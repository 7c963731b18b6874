//! Multi-provider dispatch with failover.
//!
//! The gateway walks providers in failover order (primary first, the rest
//! in registration order) and returns the first success. A provider that
//! reports a failure, raises a fault or overruns the per-attempt timeout
//! hands the message to the next one. When every provider has been tried
//! the caller gets a failure-shaped [`SendResult`] carrying the last error.

mod error;
mod registry;
mod stats;

pub use error::GatewayError;
pub use registry::ProviderRegistration;
pub use stats::GatewayStats;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::pool::NumberPool;
use crate::provider::{Balance, DeliveryStatus, Message, Provider, ProviderError, SendResult};
use crate::telemetry::counters;

use registry::Registry;
use stats::StatsCounters;

const ALL_PROVIDERS_FAILED: &str = "all providers failed";

/// SMS gateway.
///
/// Providers are registered through `&mut self` before the gateway is
/// shared; sends only need `&self` and may run concurrently.
pub struct Gateway {
    config: GatewayConfig,
    registry: Registry,
    stats: StatsCounters,
}

impl Gateway {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            registry: Registry::default(),
            stats: StatsCounters::default(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Register a provider under `name`.
    ///
    /// The first provider registered becomes primary, as does any provider
    /// registered with `primary` set. Registering an existing name replaces
    /// the provider in place.
    pub fn register_provider(
        &mut self,
        name: &str,
        provider: Arc<dyn Provider>,
        primary: bool,
    ) -> Result<(), GatewayError> {
        self.registry.register(name, provider, primary)
    }

    /// Designate an already registered provider as primary.
    pub fn set_primary(&mut self, name: &str) -> Result<(), GatewayError> {
        self.registry.set_primary(name)
    }

    /// Primary provider name.
    pub fn primary(&self) -> Option<&str> {
        self.registry.primary()
    }

    /// Registered provider names, in registration order.
    pub fn list_providers(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Registered provider names, in failover order.
    pub fn failover_order(&self) -> Vec<&str> {
        self.registry.failover_order().map(|e| e.name()).collect()
    }

    /// Look up a registered provider.
    pub fn provider(&self, name: &str) -> Option<&ProviderRegistration> {
        self.registry.get(name)
    }

    pub fn stats(&self) -> GatewayStats {
        self.stats.snapshot()
    }

    /// Send a text message.
    pub async fn send(
        &self,
        target: &str,
        body: &str,
        sender: Option<&str>,
    ) -> Result<SendResult, GatewayError> {
        let mut message = Message::new(target, body);
        message.sender = sender.map(str::to_string);
        self.send_message(&message).await
    }

    /// Send a message through the failover chain.
    ///
    /// Returns `Err` only when failover is disabled and the first provider
    /// faults. Every other outcome is a `SendResult`.
    pub async fn send_message(&self, message: &Message) -> Result<SendResult, GatewayError> {
        let mut last_error: Option<String> = None;

        for (attempt, entry) in self.registry.failover_order().enumerate() {
            let name = entry.name();

            if attempt > 0 {
                self.stats.inc_retried();
                counters::provider_failover(name);
                debug!(provider = %name, attempt, target = %message.target, "failing over");
            }

            match self.attempt(entry, message).await {
                Ok(result) if result.success => {
                    self.stats.inc_sent();
                    counters::message_sent(name);
                    info!(
                        provider = %name,
                        target = %message.target,
                        message_id = result.message_id.as_deref().unwrap_or(""),
                        "message sent"
                    );
                    return Ok(stamp(result, name));
                }
                Ok(result) => {
                    warn!(
                        provider = %name,
                        target = %message.target,
                        error = result.error.as_deref().unwrap_or(""),
                        "provider reported failure"
                    );
                    if !self.config.failover_enabled {
                        self.record_failure();
                        return Ok(stamp(result, name));
                    }
                    last_error = result.error;
                }
                Err(e) => {
                    warn!(
                        provider = %name,
                        target = %message.target,
                        kind = e.kind(),
                        error = %e,
                        "provider fault"
                    );
                    counters::provider_error(name, e.kind());
                    if !self.config.failover_enabled {
                        return Err(GatewayError::Provider {
                            provider: name.to_string(),
                            source: e,
                        });
                    }
                    last_error = Some(e.to_string());
                }
            }
        }

        self.record_failure();
        warn!(
            target = %message.target,
            providers = self.registry.len(),
            "all providers failed"
        );
        Ok(SendResult::failure(
            last_error.unwrap_or_else(|| ALL_PROVIDERS_FAILED.to_string()),
        ))
    }

    /// Send many messages, at most `concurrency` in flight at once.
    ///
    /// Results come back in input order. A fault that would surface as
    /// `Err` from [`Gateway::send_message`] becomes a failure result in its
    /// slot. A concurrency of zero is treated as one.
    pub async fn send_bulk(&self, messages: &[Message], concurrency: usize) -> Vec<SendResult> {
        let concurrency = concurrency.max(1);
        let gate = Semaphore::new(concurrency);
        info!(messages = messages.len(), concurrency, "bulk send started");

        let sends = messages.iter().map(|message| {
            let gate = &gate;
            async move {
                let _permit = gate.acquire().await;
                match self.send_message(message).await {
                    Ok(result) => result,
                    Err(e) => {
                        self.record_failure();
                        SendResult::failure(e.to_string())
                    }
                }
            }
        });
        let results = join_all(sends).await;

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            messages = results.len(),
            succeeded,
            failed = results.len() - succeeded,
            "bulk send finished"
        );
        results
    }

    /// Send with [`Gateway::config`]'s bulk concurrency.
    pub async fn send_bulk_default(&self, messages: &[Message]) -> Vec<SendResult> {
        self.send_bulk(messages, self.config.bulk_concurrency).await
    }

    /// Assign a sender number to `target` from `pool`, then send from it.
    ///
    /// Returns `Ok(None)` without contacting any provider when the pool has
    /// nothing to hand out.
    ///
    /// The binding outlives the send: a failure result or an `Err` leaves
    /// the number assigned to `target`. Look it up with
    /// [`NumberPool::assigned_to`] and release it as needed.
    pub async fn send_assigned(
        &self,
        pool: &NumberPool,
        target: &str,
        body: &str,
        task_id: Option<&str>,
    ) -> Result<Option<SendResult>, GatewayError> {
        let Some(sender) = pool.assign_number(target, task_id).await else {
            return Ok(None);
        };
        self.send(target, body, Some(&sender)).await.map(Some)
    }

    /// Poll delivery status from a named provider.
    pub async fn provider_status(
        &self,
        name: &str,
        message_id: &str,
    ) -> Result<DeliveryStatus, GatewayError> {
        let entry = self.lookup(name)?;
        self.bounded(entry.provider().status(message_id))
            .await
            .map_err(|source| GatewayError::Provider {
                provider: name.to_string(),
                source,
            })
    }

    /// Read the account balance of a named provider.
    pub async fn provider_balance(&self, name: &str) -> Result<Balance, GatewayError> {
        let entry = self.lookup(name)?;
        self.bounded(entry.provider().balance())
            .await
            .map_err(|source| GatewayError::Provider {
                provider: name.to_string(),
                source,
            })
    }

    fn lookup(&self, name: &str) -> Result<&ProviderRegistration, GatewayError> {
        self.registry
            .get(name)
            .ok_or_else(|| GatewayError::UnknownProvider(name.to_string()))
    }

    fn record_failure(&self) {
        self.stats.inc_failed();
        counters::message_failed();
    }

    async fn attempt(
        &self,
        entry: &ProviderRegistration,
        message: &Message,
    ) -> Result<SendResult, ProviderError> {
        let start = Instant::now();
        let outcome = self.bounded(entry.provider().send(message)).await;
        counters::provider_request_duration(entry.name(), start.elapsed().as_secs_f64());
        outcome
    }

    /// Run a provider call under the per-attempt timeout.
    async fn bounded<T, F>(&self, call: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let limit = self.config.provider_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(ProviderError::Timeout(limit)))
    }
}

/// Attribute a result to the provider that produced it, unless the
/// provider already named itself.
fn stamp(mut result: SendResult, provider: &str) -> SendResult {
    if result.provider.is_none() {
        result.provider = Some(provider.to_string());
    }
    result
}
