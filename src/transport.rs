//! WebSocket transport adapter.
//!
//! ## Threading model
//!
//! ```text
//! runtime loop (owns PresenceSession)      │  transport tasks (tokio)
//! ──────────────────────────────────────── │ ─────────────────────────────
//! TransportHandle::send(&Message)          │  writer: outbound rx → ws sink
//!   → outbound tx (dropped if closed)      │
//!                                          │  reader: ws stream → events tx
//! events rx.recv()                         │    Text  → TransportEvent::Frame
//!   → session.enqueue_frame(frame)         │    Close → TransportEvent::Closed
//! ```
//!
//! Frames are forwarded undecoded; the session owns malformed-input handling.
//! A `join` is sent as soon as the socket opens.

use crate::protocol::{Message, ProtocolError};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] ProtocolError),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// One inbound text frame.
    Frame(String),
    /// The connection ended; no further frames follow.
    Closed { reason: String },
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Sending half of a connection. Cheap to clone.
#[derive(Debug, Clone)]
pub struct TransportHandle {
    outbound: Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>,
}

impl TransportHandle {
    /// A handle that was never connected; every send is dropped.
    pub fn disconnected() -> Self {
        Self {
            outbound: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.outbound
            .lock()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// Queues `msg` for the socket. Silently dropped when not connected.
    pub fn send(&self, msg: &Message) {
        let frame = match msg.encode() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("[transport] failed to encode {}: {}", msg.kind(), e);
                return;
            }
        };
        let guard = self.outbound.lock();
        match guard.as_ref() {
            Some(tx) => {
                if tx.send(frame).is_err() {
                    log::debug!("[transport] socket closed, dropping {}", msg.kind());
                }
            }
            None => log::debug!("[transport] not connected, dropping {}", msg.kind()),
        }
    }

    fn close(&self) {
        self.outbound.lock().take();
    }
}

// ---------------------------------------------------------------------------
// Connect
// ---------------------------------------------------------------------------

/// Opens `endpoint`, announces `local_id`, and starts the reader and writer
/// tasks. Must be called from within a tokio runtime.
pub async fn connect(
    endpoint: &str,
    local_id: &str,
) -> Result<(TransportHandle, mpsc::UnboundedReceiver<TransportEvent>), TransportError> {
    let (ws, _response) = tokio_tungstenite::connect_async(endpoint).await?;
    let (mut sink, mut stream) = ws.split();

    let join = Message::join(local_id).encode()?;
    sink.send(WsMessage::Text(join)).await?;
    log::info!("[transport] connected to {} as {}", endpoint, local_id);

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let handle = TransportHandle {
        outbound: Arc::new(Mutex::new(Some(out_tx))),
    };

    // Writer
    tokio::spawn(async move {
        while let Some(frame) = out_rx.recv().await {
            if let Err(e) = sink.send(WsMessage::Text(frame)).await {
                log::warn!("[transport] send failed: {}", e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    // Reader
    let reader_handle = handle.clone();
    tokio::spawn(async move {
        let reason = loop {
            match stream.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    if event_tx.send(TransportEvent::Frame(text)).is_err() {
                        break "receiver dropped".to_string();
                    }
                }
                Some(Ok(WsMessage::Binary(data))) => match String::from_utf8(data) {
                    Ok(text) => {
                        if event_tx.send(TransportEvent::Frame(text)).is_err() {
                            break "receiver dropped".to_string();
                        }
                    }
                    Err(_) => log::warn!("[transport] dropping non-UTF-8 binary frame"),
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    break frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "closed by peer".to_string());
                }
                // Ping/pong are answered by tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => break e.to_string(),
                None => break "stream ended".to_string(),
            }
        };
        reader_handle.close();
        let _ = event_tx.send(TransportEvent::Closed { reason });
    });

    Ok((handle, event_rx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_handle_drops_silently() {
        let handle = TransportHandle::disconnected();
        assert!(!handle.is_connected());
        handle.send(&Message::join("me"));
    }

    #[test]
    fn closed_handle_reports_disconnected() {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = TransportHandle {
            outbound: Arc::new(Mutex::new(Some(tx))),
        };
        assert!(handle.is_connected());
        drop(rx);
        assert!(!handle.is_connected());
        handle.send(&Message::leave("me"));
    }

    #[test]
    fn rejects_non_websocket_endpoint() {
        let result = tokio_test::block_on(connect("http://127.0.0.1/ws", "me"));
        assert!(matches!(result, Err(TransportError::WebSocket(_))));
    }
}
