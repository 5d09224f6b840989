//! The rate-limited broadcast pipeline.
//!
//! Every room hands its events to one [`Broadcaster`]. Producers push
//! into an unbounded queue and return immediately; a single background
//! drain task publishes in FIFO order:
//!
//! ```text
//! room actors ──publish()──→ [ queue ] ──drain loop──→ Publisher
//!                                          │
//!                      ≥ min_interval between sends
//!                      RateLimited → sleep(backoff), retry same message
//!                      other error → degraded: drop until reset()
//! ```
//!
//! Retrying the message at the head before taking the next one is what
//! keeps ordering intact through throttling. Degraded mode never rolls
//! anything back; observers just lag until the transport is reset.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use draftroom_protocol::{
    ChunkTrailer, Codec, DEFAULT_CHUNK_SIZE, DraftEvent, JsonCodec, ProtocolError,
    chunk_event_name, split_into_chunks, trailer_event_name,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

use crate::{Publisher, TransportError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Pipeline tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Minimum gap between two sends.
    pub min_interval: Duration,
    /// Pause after the provider reports a rate-limit error.
    pub rate_limit_backoff: Duration,
    /// Items per chunk for [`Broadcaster::publish_chunked`].
    pub chunk_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(150),
            rate_limit_backoff: Duration::from_secs(3),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl PipelineConfig {
    /// Shortest backoff accepted, so a zero value cannot spin the drain loop.
    pub const MIN_BACKOFF: Duration = Duration::from_millis(50);

    /// Clamp out-of-range values.
    pub fn validated(mut self) -> Self {
        if self.chunk_size == 0 {
            warn!("chunk_size of 0 is invalid, using 1");
            self.chunk_size = 1;
        }
        if self.rate_limit_backoff < Self::MIN_BACKOFF {
            warn!(
                backoff_ms = self.rate_limit_backoff.as_millis() as u64,
                "rate_limit_backoff below minimum, clamping"
            );
            self.rate_limit_backoff = Self::MIN_BACKOFF;
        }
        self
    }
}

/// Counters for observing the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub delivered: u64,
    pub rate_limited: u64,
    pub dropped: u64,
    pub degraded: bool,
}

// ---------------------------------------------------------------------------
// Broadcaster
// ---------------------------------------------------------------------------

enum Outbound {
    Message {
        channel: String,
        event: String,
        payload: Vec<u8>,
    },
    Flush(oneshot::Sender<()>),
}

#[derive(Default)]
struct Shared {
    degraded: AtomicBool,
    delivered: AtomicU64,
    rate_limited: AtomicU64,
    dropped: AtomicU64,
    next_stream: AtomicU64,
}

/// Handle to the broadcast pipeline. Cheap to clone; all clones feed
/// the same ordered queue.
#[derive(Clone)]
pub struct Broadcaster {
    tx: mpsc::UnboundedSender<Outbound>,
    shared: Arc<Shared>,
    chunk_size: usize,
    codec: JsonCodec,
}

impl Broadcaster {
    /// Starts the drain task for `publisher` and returns the handle.
    pub fn spawn<P: Publisher>(publisher: P, config: PipelineConfig) -> Self {
        let config = config.validated();
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        tokio::spawn(drain(publisher, rx, Arc::clone(&shared), config.clone()));
        debug!(
            min_interval_ms = config.min_interval.as_millis() as u64,
            chunk_size = config.chunk_size,
            "broadcast pipeline started"
        );
        Self {
            tx,
            shared,
            chunk_size: config.chunk_size,
            codec: JsonCodec,
        }
    }

    /// Queues an already-encoded message. Never blocks; a no-op while
    /// the pipeline is degraded.
    pub fn publish(&self, channel: &str, event: &str, payload: Vec<u8>) {
        if self.is_degraded() {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            trace!(channel, event, "pipeline degraded, dropping message");
            return;
        }
        let queued = self.tx.send(Outbound::Message {
            channel: channel.to_string(),
            event: event.to_string(),
            payload,
        });
        if queued.is_err() {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Encodes `value` as JSON and queues it.
    ///
    /// # Errors
    /// [`ProtocolError::Encode`] if `value` cannot be serialized.
    pub fn publish_json<T: Serialize>(
        &self,
        channel: &str,
        event: &str,
        value: &T,
    ) -> Result<(), ProtocolError> {
        let payload = self.codec.encode(value)?;
        self.publish(channel, event, payload);
        Ok(())
    }

    /// Queues a draft event under its own event name.
    pub fn publish_event(&self, channel: &str, event: &DraftEvent) -> Result<(), ProtocolError> {
        self.publish_json(channel, event.name(), event)
    }

    /// Splits `items` into ordered chunks followed by a trailer carrying
    /// `meta`, and queues them back to back. Everything is encoded
    /// before anything is queued, so an encode failure never leaves a
    /// partial stream behind. Returns the stream id.
    pub fn publish_chunked<T, M>(
        &self,
        channel: &str,
        event: &str,
        items: &[T],
        meta: M,
    ) -> Result<u64, ProtocolError>
    where
        T: Serialize + Clone,
        M: Serialize,
    {
        let stream_id = self.shared.next_stream.fetch_add(1, Ordering::Relaxed) + 1;
        let chunks = split_into_chunks(stream_id, items, self.chunk_size);
        let trailer = ChunkTrailer {
            stream_id,
            total_chunks: chunks.len(),
            total_items: items.len(),
            meta,
        };

        let encoded = chunks
            .iter()
            .map(|chunk| self.codec.encode(chunk))
            .collect::<Result<Vec<_>, _>>()?;
        let trailer = self.codec.encode(&trailer)?;

        let chunk_event = chunk_event_name(event);
        for payload in encoded {
            self.publish(channel, &chunk_event, payload);
        }
        self.publish(channel, &trailer_event_name(event), trailer);
        Ok(stream_id)
    }

    /// Waits until everything queued before this call has been handled
    /// (delivered or dropped). For shutdown paths and tests; producers
    /// on the hot path never call this.
    pub async fn flush(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Outbound::Flush(reply)).is_ok() {
            let _ = done.await;
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.shared.degraded.load(Ordering::Acquire)
    }

    /// Leaves degraded mode. Messages dropped meanwhile are not replayed.
    pub fn reset(&self) {
        if self.shared.degraded.swap(false, Ordering::AcqRel) {
            tracing::info!("broadcast pipeline reset, resuming sends");
        }
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            delivered: self.shared.delivered.load(Ordering::Relaxed),
            rate_limited: self.shared.rate_limited.load(Ordering::Relaxed),
            dropped: self.shared.dropped.load(Ordering::Relaxed),
            degraded: self.is_degraded(),
        }
    }
}

// ---------------------------------------------------------------------------
// Drain loop
// ---------------------------------------------------------------------------

async fn drain<P: Publisher>(
    publisher: P,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    shared: Arc<Shared>,
    config: PipelineConfig,
) {
    let mut last_sent: Option<Instant> = None;

    while let Some(outbound) = rx.recv().await {
        let (channel, event, payload) = match outbound {
            Outbound::Message {
                channel,
                event,
                payload,
            } => (channel, event, payload),
            Outbound::Flush(reply) => {
                let _ = reply.send(());
                continue;
            }
        };

        loop {
            if shared.degraded.load(Ordering::Acquire) {
                shared.dropped.fetch_add(1, Ordering::Relaxed);
                break;
            }
            if let Some(last) = last_sent {
                time::sleep_until(last + config.min_interval).await;
            }

            match publisher.publish(&channel, &event, &payload).await {
                Ok(()) => {
                    last_sent = Some(Instant::now());
                    shared.delivered.fetch_add(1, Ordering::Relaxed);
                    trace!(%channel, %event, bytes = payload.len(), "broadcast delivered");
                    break;
                }
                Err(TransportError::RateLimited { retry_after }) => {
                    shared.rate_limited.fetch_add(1, Ordering::Relaxed);
                    let pause = retry_after.unwrap_or(config.rate_limit_backoff);
                    warn!(
                        %channel,
                        %event,
                        pause_ms = pause.as_millis() as u64,
                        "provider rate limit hit, backing off"
                    );
                    time::sleep(pause).await;
                }
                Err(e) => {
                    shared.degraded.store(true, Ordering::Release);
                    shared.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(%channel, %event, error = %e, "broadcast failed, pipeline degraded");
                    break;
                }
            }
        }
    }

    debug!("broadcast drain loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.min_interval, Duration::from_millis(150));
        assert_eq!(config.rate_limit_backoff, Duration::from_secs(3));
        assert_eq!(config.chunk_size, 10);
    }

    #[test]
    fn test_validated_clamps_zero_chunk_size_and_backoff() {
        let config = PipelineConfig {
            chunk_size: 0,
            rate_limit_backoff: Duration::ZERO,
            ..Default::default()
        }
        .validated();
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.rate_limit_backoff, PipelineConfig::MIN_BACKOFF);
    }
}
