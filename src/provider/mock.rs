//! Mock provider for testing without upstream backends.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::config::{MockConfig, MockResponse};

use super::{Balance, DeliveryStatus, Message, Provider, ProviderError, SendResult};

/// Mock backend that generates results without any network I/O.
#[derive(Debug)]
pub struct MockProvider {
    /// Response configuration
    response: MockResponse,
    /// Simulated latency
    latency: Duration,
    /// Reported balance
    balance: Option<f64>,
    /// Message ID counter
    message_counter: AtomicU64,
    /// Total requests processed
    request_count: AtomicU64,
    /// Successful responses
    success_count: AtomicU64,
    /// Error responses (failure results and faults)
    error_count: AtomicU64,
    /// Messages seen, in arrival order
    received: Mutex<Vec<Message>>,
}

impl MockProvider {
    /// Create a new mock provider from config.
    pub fn new(config: &MockConfig) -> Self {
        Self::with_response(config.response.clone())
            .with_latency(config.latency)
            .with_balance_opt(config.balance)
    }

    fn with_response(response: MockResponse) -> Self {
        Self {
            response,
            latency: Duration::ZERO,
            balance: None,
            message_counter: AtomicU64::new(1),
            request_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that accepts every message.
    pub fn success() -> Self {
        Self::with_response(MockResponse::Success)
    }

    /// Create a mock that rejects every message with a failure result.
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_response(MockResponse::Error {
            message: message.into(),
        })
    }

    /// Create a mock whose send call faults.
    pub fn fault(message: impl Into<String>) -> Self {
        Self::with_response(MockResponse::Fault {
            message: message.into(),
        })
    }

    /// Create a mock with periodic errors.
    pub fn random(error_rate: f32) -> Self {
        Self::with_response(MockResponse::Random { error_rate })
    }

    /// Set simulated latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Set the reported balance.
    pub fn with_balance(self, balance: f64) -> Self {
        self.with_balance_opt(Some(balance))
    }

    fn with_balance_opt(mut self, balance: Option<f64>) -> Self {
        self.balance = balance;
        self
    }

    /// Generate next message ID.
    fn next_message_id(&self) -> String {
        let id = self.message_counter.fetch_add(1, Ordering::Relaxed);
        format!("MOCK{:016X}", id)
    }

    fn accept(&self) -> SendResult {
        let message_id = self.next_message_id();
        self.success_count.fetch_add(1, Ordering::Relaxed);
        debug!(message_id = %message_id, "mock success");
        SendResult::success(message_id).with_status(DeliveryStatus::Sent)
    }

    /// Get total request count.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Get success count.
    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    /// Get error count.
    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Messages received so far.
    pub fn received(&self) -> Vec<Message> {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn send(&self, message: &Message) -> Result<SendResult, ProviderError> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message.clone());

        // Simulate latency
        if !self.latency.is_zero() {
            trace!(latency_ms = self.latency.as_millis(), "simulating latency");
            sleep(self.latency).await;
        }

        match &self.response {
            MockResponse::Success => Ok(self.accept()),
            MockResponse::Error { message } => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                debug!(error = %message, "mock error");
                Ok(SendResult::failure(message.clone()))
            }
            MockResponse::Fault { message } => {
                self.error_count.fetch_add(1, Ordering::Relaxed);
                debug!(error = %message, "mock fault");
                Err(ProviderError::Transport(message.clone()))
            }
            MockResponse::Random { error_rate } => {
                // Deterministic "random" using the message counter as seed
                let counter = self.message_counter.load(Ordering::Relaxed);
                let is_error = (counter % 100) < (*error_rate * 100.0) as u64;

                if is_error {
                    self.message_counter.fetch_add(1, Ordering::Relaxed);
                    self.error_count.fetch_add(1, Ordering::Relaxed);
                    debug!("mock random error");
                    Ok(SendResult::failure("mock random error"))
                } else {
                    Ok(self.accept())
                }
            }
        }
    }

    async fn status(&self, message_id: &str) -> Result<DeliveryStatus, ProviderError> {
        if message_id.starts_with("MOCK") {
            Ok(DeliveryStatus::Delivered)
        } else {
            Ok(DeliveryStatus::Unknown)
        }
    }

    async fn balance(&self) -> Result<Balance, ProviderError> {
        Ok(self.balance.map_or(Balance::Unsupported, Balance::Amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg() -> Message {
        Message::new("+12025551234", "test")
    }

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockProvider::success();

        let result = mock.send(&msg()).await.unwrap();
        assert!(result.success);
        assert!(result.message_id.unwrap().starts_with("MOCK"));
        assert_eq!(mock.request_count(), 1);
        assert_eq!(mock.success_count(), 1);
        assert_eq!(mock.received()[0].target, "+12025551234");
    }

    #[tokio::test]
    async fn test_mock_error_is_failure_result() {
        let mock = MockProvider::error("number blocked");

        let result = mock.send(&msg()).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("number blocked"));
        assert_eq!(mock.error_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_fault_is_err() {
        let mock = MockProvider::fault("connection reset");

        let err = mock.send(&msg()).await.unwrap_err();
        assert_eq!(err, ProviderError::Transport("connection reset".to_string()));
    }

    #[tokio::test]
    async fn test_mock_latency() {
        let mock = MockProvider::success().with_latency(Duration::from_millis(10));

        let start = std::time::Instant::now();
        let _result = mock.send(&msg()).await;
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_mock_random_mixes_outcomes() {
        let mock = MockProvider::random(0.5);

        for _ in 0..200 {
            let _ = mock.send(&msg()).await.unwrap();
        }
        assert!(mock.success_count() > 0);
        assert!(mock.error_count() > 0);
        assert_eq!(mock.success_count() + mock.error_count(), 200);
    }

    #[tokio::test]
    async fn test_mock_status_and_balance() {
        let mock = MockProvider::success().with_balance(42.5);

        let result = mock.send(&msg()).await.unwrap();
        let id = result.message_id.unwrap();
        assert_eq!(mock.status(&id).await.unwrap(), DeliveryStatus::Delivered);
        assert_eq!(mock.status("other").await.unwrap(), DeliveryStatus::Unknown);
        assert_eq!(mock.balance().await.unwrap(), Balance::Amount(42.5));
    }
}
