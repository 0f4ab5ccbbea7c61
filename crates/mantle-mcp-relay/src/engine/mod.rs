//! Protocol engines driven by a session.
//!
//! An engine never owns the SSE stream. It gets an [`OutboundSink`] from
//! the session transport, writes frames through it, and may ask the
//! session to close.

pub mod jsonrpc;
mod mcp;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::bridge::{CorrelatedReply, SyntheticRequest};

pub use mcp::{McpEngine, McpEngineFactory, PROTOCOL_VERSION, ServerInfo};

/// One server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }

    /// A `message` event, used for JSON-RPC traffic.
    pub fn message(data: impl Into<String>) -> Self {
        Self::new("message", data)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Outbound stream closed")]
    StreamClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Internal engine error: {0}")]
    Internal(String),
}

/// Write side of a session's event stream.
///
/// Clones share the stream. Once the session ends the stream, every send
/// fails with [`EngineError::StreamClosed`].
#[derive(Clone)]
pub struct OutboundSink {
    tx: Arc<Mutex<Option<mpsc::Sender<SseFrame>>>>,
    close: CancellationToken,
}

impl OutboundSink {
    pub(crate) fn new(tx: mpsc::Sender<SseFrame>, close: CancellationToken) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
            close,
        }
    }

    pub async fn send(&self, frame: SseFrame) -> Result<(), EngineError> {
        let tx = self.tx.lock().clone().ok_or(EngineError::StreamClosed)?;
        tx.send(frame).await.map_err(|_| EngineError::StreamClosed)
    }

    /// Ask the owning session to close.
    pub fn request_close(&self) {
        self.close.cancel();
    }

    pub fn is_open(&self) -> bool {
        self.tx.lock().as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Resolves when the client side of the stream went away or the stream
    /// was ended.
    pub(crate) async fn closed(&self) {
        let tx = self.tx.lock().clone();
        if let Some(tx) = tx {
            tx.closed().await;
        }
    }

    /// Resolves once [`request_close`](Self::request_close) was called.
    pub(crate) async fn close_requested(&self) {
        self.close.cancelled().await;
    }

    /// End the stream. Frames already queued are still delivered.
    pub(crate) fn end(&self) {
        self.tx.lock().take();
    }
}

/// One engine instance bound to one session.
#[async_trait]
pub trait ProtocolEngine: Send + Sync {
    /// Called once after the stream opened, before any inbound call.
    async fn connect(&self) -> Result<(), EngineError>;

    /// Handle one inbound call and return the reply for its HTTP caller.
    async fn handle(&self, request: SyntheticRequest) -> Result<CorrelatedReply, EngineError>;

    /// Called once at teardown.
    async fn disconnect(&self) {}
}

/// Creates an engine for each new session.
pub trait EngineFactory: Send + Sync {
    fn create(&self, session_id: &str, sink: OutboundSink) -> Arc<dyn ProtocolEngine>;
}
