use crate::provider::ProviderError;

/// Errors returned by the gateway.
///
/// Undeliverable messages are not errors; they come back as failure-shaped
/// `SendResult`s. These variants cover misuse and the failover-disabled
/// fast path.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("provider not registered: {0}")]
    UnknownProvider(String),

    #[error("invalid provider registration: {0}")]
    InvalidRegistration(String),

    #[error("provider {provider} failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },
}
