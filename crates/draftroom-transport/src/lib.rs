//! Realtime transport layer for Draftroom.
//!
//! Provides the [`Publisher`] trait, the one primitive the engine needs
//! from a realtime provider: `publish(channel, event, payload)`. On top
//! of it sits the [`Broadcaster`], the rate-limited, ordered pipeline
//! every room enqueues its events into.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketPublisher`], a fan-out server via
//!   `tokio-tungstenite`

mod error;
mod memory;
mod pipeline;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::MemoryPublisher;
pub use pipeline::{Broadcaster, PipelineConfig, PipelineStats};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketPublisher;

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

/// Opaque identifier for a subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// What a subscriber receives for every published message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub channel: String,
    pub event: String,
    pub data: serde_json::Value,
}

impl Frame {
    /// Builds a frame from a JSON-encoded payload.
    ///
    /// # Errors
    /// [`TransportError::PublishFailed`] if `payload` is not valid JSON.
    pub fn new(channel: &str, event: &str, payload: &[u8]) -> Result<Self, TransportError> {
        let data = serde_json::from_slice(payload)
            .map_err(|e| TransportError::PublishFailed(format!("payload is not JSON: {e}")))?;
        Ok(Self {
            channel: channel.to_string(),
            event: event.to_string(),
            data,
        })
    }
}

/// A realtime provider's publish primitive.
///
/// Implementations report provider throttling as
/// [`TransportError::RateLimited`]; the [`Broadcaster`] treats that as
/// retryable and every other error as a reason to degrade.
///
/// The returned future must be `Send` because the broadcast drain loop
/// runs on a spawned task.
pub trait Publisher: Send + Sync + 'static {
    fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
