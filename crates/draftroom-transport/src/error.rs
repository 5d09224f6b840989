use std::time::Duration;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The provider refused the message because too many were sent too
    /// quickly. The pipeline backs off and retries the same message.
    #[error("rate limited by provider (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// The provider rejected the message for any other reason.
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// A subscriber connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
