//! Provider capability contract.
//!
//! Every delivery backend implements [`Provider`]: send a message, poll a
//! delivery status, read an account balance. Wire details (authentication,
//! payload shape, transport status codes) stay inside the implementation;
//! the gateway only sees [`SendResult`] and [`ProviderError`].
//!
//! An ordinary delivery failure (upstream rejected the number, quota hit,
//! HTTP 4xx) is reported as a failure-shaped [`SendResult`]. `Err` is for
//! faults the backend could not classify: broken transport, timeouts,
//! internal bugs.

mod mock;

pub use mock::MockProvider;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend capability set.
///
/// # Example
///
/// ```ignore
/// struct Loopback;
///
/// #[async_trait]
/// impl Provider for Loopback {
///     async fn send(&self, message: &Message) -> Result<SendResult, ProviderError> {
///         Ok(SendResult::success(format!("loop-{}", message.target)))
///     }
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    /// Submit a single message.
    async fn send(&self, message: &Message) -> Result<SendResult, ProviderError>;

    /// Delivery status of a previously sent message.
    ///
    /// Backends without status polling keep the default.
    async fn status(&self, _message_id: &str) -> Result<DeliveryStatus, ProviderError> {
        Ok(DeliveryStatus::Unknown)
    }

    /// Account balance.
    ///
    /// Backends that cannot report one keep the default.
    async fn balance(&self) -> Result<Balance, ProviderError> {
        Ok(Balance::Unsupported)
    }
}

/// An outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Destination address
    pub target: String,

    /// Message text
    pub body: String,

    /// Sender identity (originating number)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,

    /// Media attachment (MMS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
}

impl Message {
    /// Create a plain text message.
    pub fn new(target: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            body: body.into(),
            sender: None,
            media_url: None,
        }
    }

    /// Set the sender identity.
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    /// Attach media.
    pub fn with_media_url(mut self, url: impl Into<String>) -> Self {
        self.media_url = Some(url.into());
        self
    }
}

/// Outcome of a delivery attempt sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendResult {
    /// Whether a backend accepted the message
    pub success: bool,

    /// Backend message identifier
    pub message_id: Option<String>,

    /// Name of the provider that produced this result
    pub provider: Option<String>,

    /// Error description on failure
    pub error: Option<String>,

    /// When the result was produced
    pub timestamp: DateTime<Utc>,

    /// Price charged by the backend
    pub price: Option<f64>,

    /// Delivery status reported with the result
    pub status: DeliveryStatus,
}

impl SendResult {
    /// Accepted by a backend.
    pub fn success(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            provider: None,
            error: None,
            timestamp: Utc::now(),
            price: None,
            status: DeliveryStatus::Queued,
        }
    }

    /// Rejected or undeliverable.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            provider: None,
            error: Some(error.into()),
            timestamp: Utc::now(),
            price: None,
            status: DeliveryStatus::Failed,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_status(mut self, status: DeliveryStatus) -> Self {
        self.status = status;
        self
    }
}

/// Delivery status as reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeliveryStatus {
    Queued,
    Sent,
    Delivered,
    Failed,
    /// Backend cannot tell (or does not support polling)
    Unknown,
    /// Backend-specific status string
    Other(String),
}

impl DeliveryStatus {
    /// Get the string name of this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
            Self::Other(s) => s,
        }
    }
}

impl From<&str> for DeliveryStatus {
    fn from(s: &str) -> Self {
        match s {
            "queued" => Self::Queued,
            "sent" => Self::Sent,
            "delivered" => Self::Delivered,
            "failed" => Self::Failed,
            "unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for DeliveryStatus {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<DeliveryStatus> for String {
    fn from(status: DeliveryStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account balance reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Balance {
    Amount(f64),
    Unsupported,
}

impl Balance {
    /// Numeric form, with `-1.0` standing for "not supported".
    pub fn as_legacy(&self) -> f64 {
        match self {
            Self::Amount(v) => *v,
            Self::Unsupported => -1.0,
        }
    }
}

/// Faults raised by a backend.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("rejected by backend: {0}")]
    Rejected(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Timeout(_) => "timeout",
            Self::Rejected(_) => "rejected",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Minimal;

    #[async_trait]
    impl Provider for Minimal {
        async fn send(&self, message: &Message) -> Result<SendResult, ProviderError> {
            Ok(SendResult::success(format!("min-{}", message.target)))
        }
    }

    #[tokio::test]
    async fn test_default_status_and_balance() {
        let p = Minimal;
        assert_eq!(p.status("x").await.unwrap(), DeliveryStatus::Unknown);
        let balance = p.balance().await.unwrap();
        assert_eq!(balance, Balance::Unsupported);
        assert_eq!(balance.as_legacy(), -1.0);
    }

    #[test]
    fn test_status_string_mapping() {
        assert_eq!(DeliveryStatus::from("delivered"), DeliveryStatus::Delivered);
        assert_eq!(
            DeliveryStatus::from("undelivered"),
            DeliveryStatus::Other("undelivered".to_string())
        );
        assert_eq!(String::from(DeliveryStatus::Queued), "queued");
    }

    #[test]
    fn test_result_serializes_status_as_string() {
        let result = SendResult::success("abc").with_provider("telnyx");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["provider"], "telnyx");
        assert_eq!(json["success"], true);
    }

    #[test]
    fn test_message_builder() {
        let msg = Message::new("+12025551234", "hi")
            .with_sender("+14377846365")
            .with_media_url("https://example.com/a.png");
        assert_eq!(msg.sender.as_deref(), Some("+14377846365"));
        assert!(msg.media_url.is_some());
    }
}
