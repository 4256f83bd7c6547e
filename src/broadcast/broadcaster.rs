//! Fan-out registry of live viewer connections

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderName};
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::frame::{StreamEvent, CONNECTED_FRAME, KEEP_ALIVE_FRAME};
use crate::alerts::{AlertSender, SendError};
use crate::api::presenter::AlertResponse;
use crate::domain::Alert;

/// Frames buffered per viewer before it is considered lagging
pub const DEFAULT_CLIENT_BUFFER: usize = 64;

type Registry = DashMap<u64, mpsc::Sender<Bytes>>;

/// Broadcasts alerts to every attached SSE viewer.
///
/// Writes never wait on a viewer. A viewer whose buffer is full is
/// unregistered, so its stream ends after the frames already queued and the
/// client reconnects instead of silently missing alerts. A viewer whose
/// stream has gone away is pruned.
pub struct Broadcaster {
    clients: Arc<Registry>,
    next_id: AtomicU64,
    buffer: usize,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_CLIENT_BUFFER)
    }

    /// Create a broadcaster with a per-viewer frame buffer of `buffer` (at least 1)
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            clients: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        }
    }

    /// Attach a new viewer.
    ///
    /// The handshake frame is queued before the viewer is registered, so it is
    /// always the first frame the viewer reads. Dropping the returned stream
    /// unregisters the viewer.
    pub fn add_client(&self) -> ClientStream {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);

        // Fresh channel with capacity >= 1, cannot be full
        let _ = tx.try_send(Bytes::from_static(CONNECTED_FRAME.as_bytes()));
        self.clients.insert(id, tx);

        tracing::debug!(client_id = id, clients = self.clients.len(), "SSE client connected");

        ClientStream {
            id,
            rx,
            registry: Arc::downgrade(&self.clients),
        }
    }

    /// Number of registered viewers
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Drop every viewer; their streams end after the frames already queued
    pub fn disconnect_all(&self) {
        let count = self.clients.len();
        self.clients.clear();
        tracing::info!(clients = count, "Disconnected all SSE clients");
    }

    /// Write a keep-alive comment to every viewer
    pub fn heartbeat(&self) -> usize {
        self.write_all(Bytes::from_static(KEEP_ALIVE_FRAME.as_bytes()))
    }

    /// Write a frame to every viewer, returning how many accepted it
    fn write_all(&self, frame: Bytes) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();
        let mut lagging = Vec::new();

        for entry in self.clients.iter() {
            match entry.value().try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => lagging.push(*entry.key()),
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // Removed after iterating; removing under the iterator's shard lock deadlocks
        for id in lagging {
            self.clients.remove(&id);
            tracing::warn!(client_id = id, "SSE client lagging, disconnected");
        }
        for id in closed {
            self.clients.remove(&id);
            tracing::debug!(client_id = id, "Pruned closed SSE client");
        }

        delivered
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertSender for Broadcaster {
    async fn send(&self, alert: &Alert) -> Result<(), SendError> {
        let payload = AlertResponse::from(alert);
        let frame = StreamEvent::NewAlert { payload: &payload }
            .to_frame()
            .map_err(|e| SendError::Delivery(format!("Failed to encode alert: {}", e)))?;

        let delivered = self.write_all(frame);
        tracing::info!(alert_id = %payload.id, clients = delivered, "Broadcasting alert");

        Ok(())
    }
}

/// Frame stream for one attached viewer
pub struct ClientStream {
    id: u64,
    rx: mpsc::Receiver<Bytes>,
    registry: Weak<Registry>,
}

impl ClientStream {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Stream for ClientStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx).map(|frame| frame.map(Ok))
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.id);
            tracing::debug!(client_id = self.id, "SSE client disconnected");
        }
    }
}

impl IntoResponse for ClientStream {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
                (HeaderName::from_static("x-accel-buffering"), "no"),
            ],
            Body::from_stream(self),
        )
            .into_response()
    }
}
