//! WebSocket fan-out publisher using `tokio-tungstenite`.
//!
//! Observers connect, send one text frame naming the channel they want
//! (e.g. `draft-room-7`), and from then on receive every [`Frame`]
//! published on that channel as a JSON text message.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;

use crate::{ConnectionId, Frame, Publisher, TransportError};

/// Counter for generating unique subscriber connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

struct Subscriber {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Message>,
}

/// Fixed one-second window counter standing in for a provider quota.
struct RateWindow {
    started: Instant,
    sent: u32,
}

struct Hub {
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
    window: Mutex<RateWindow>,
    max_per_second: u32,
}

impl Hub {
    /// Admits one message against the per-second quota.
    async fn admit(&self) -> Result<(), TransportError> {
        if self.max_per_second == 0 {
            return Ok(());
        }
        let mut window = self.window.lock().await;
        let elapsed = window.started.elapsed();
        if elapsed >= Duration::from_secs(1) {
            window.started = Instant::now();
            window.sent = 0;
        }
        if window.sent >= self.max_per_second {
            let retry_after = Duration::from_secs(1).saturating_sub(window.started.elapsed());
            return Err(TransportError::RateLimited {
                retry_after: Some(retry_after),
            });
        }
        window.sent += 1;
        Ok(())
    }

    async fn subscribe(&self, channel: String, subscriber: Subscriber) {
        self.subscribers
            .lock()
            .await
            .entry(channel)
            .or_default()
            .push(subscriber);
    }

    async fn unsubscribe(&self, channel: &str, id: ConnectionId) {
        let mut subscribers = self.subscribers.lock().await;
        if let Some(list) = subscribers.get_mut(channel) {
            list.retain(|s| s.id != id);
            if list.is_empty() {
                subscribers.remove(channel);
            }
        }
    }
}

/// A [`Publisher`] that serves WebSocket subscribers directly.
///
/// `max_per_second` emulates a hosted provider's message quota; beyond
/// it, `publish` returns [`TransportError::RateLimited`]. Zero means
/// unlimited.
pub struct WebSocketPublisher {
    hub: Arc<Hub>,
    local_addr: SocketAddr,
}

impl WebSocketPublisher {
    /// Binds the subscriber listener and starts accepting observers.
    pub async fn bind(addr: &str, max_per_second: u32) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        let local_addr = listener.local_addr().map_err(TransportError::AcceptFailed)?;
        tracing::info!(%local_addr, max_per_second, "WebSocket publisher listening");

        let hub = Arc::new(Hub {
            subscribers: Mutex::new(HashMap::new()),
            window: Mutex::new(RateWindow {
                started: Instant::now(),
                sent: 0,
            }),
            max_per_second,
        });
        tokio::spawn(accept_loop(listener, Arc::clone(&hub)));

        Ok(Self { hub, local_addr })
    }

    /// The address observers connect to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of observers subscribed to `channel`.
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.hub
            .subscribers
            .lock()
            .await
            .get(channel)
            .map_or(0, Vec::len)
    }
}

impl Publisher for WebSocketPublisher {
    async fn publish(&self, channel: &str, event: &str, payload: &[u8]) -> Result<(), TransportError> {
        self.hub.admit().await?;
        let frame = Frame::new(channel, event, payload)?;
        let text = serde_json::to_string(&frame)
            .map_err(|e| TransportError::PublishFailed(e.to_string()))?;

        let mut subscribers = self.hub.subscribers.lock().await;
        if let Some(list) = subscribers.get_mut(channel) {
            // Writers whose task has ended are dropped here.
            list.retain(|s| s.tx.send(Message::Text(text.clone().into())).is_ok());
        }
        Ok(())
    }
}

async fn accept_loop(listener: TcpListener, hub: Arc<Hub>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let hub = Arc::clone(&hub);
                tokio::spawn(async move {
                    if let Err(e) = serve_subscriber(stream, addr, hub).await {
                        tracing::debug!(%addr, error = %e, "subscriber connection ended with error");
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to accept subscriber connection");
            }
        }
    }
}

async fn serve_subscriber(stream: TcpStream, addr: SocketAddr, hub: Arc<Hub>) -> Result<(), TransportError> {
    let ws = tokio_tungstenite::accept_async(stream).await.map_err(|e| {
        TransportError::AcceptFailed(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e))
    })?;
    let (mut sink, mut incoming) = ws.split();

    let channel = loop {
        match incoming.next().await {
            Some(Ok(Message::Text(text))) => break text.as_str().trim().to_string(),
            Some(Ok(Message::Close(_))) | None => return Ok(()),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(TransportError::ConnectionClosed(e.to_string())),
        }
    };

    let id = ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    let (tx, mut rx) = mpsc::unbounded_channel();
    hub.subscribe(channel.clone(), Subscriber { id, tx }).await;
    tracing::debug!(%id, %addr, %channel, "subscriber attached");

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = incoming.next().await {
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    hub.unsubscribe(&channel, id).await;
    writer.abort();
    tracing::debug!(%id, %channel, "subscriber detached");
    Ok(())
}
