//! WebSocket transport for connecting to the authoritative peer.
//!
//! Each [`WsTransport`] owns one background task that connects, forwards
//! inbound text frames to the tick loop, and writes queued outbound frames.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::transport::{
    ConnectionState, ConnectionStateWatch, Connector, Transport, TransportError, TransportEvent,
};

/// Handle to one WebSocket connection driven by a background task.
pub struct WsTransport {
    outgoing: mpsc::UnboundedSender<String>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    state: Arc<ConnectionStateWatch>,
    /// Sending `true` makes the connection task close the socket and exit.
    shutdown_tx: watch::Sender<bool>,
}

impl WsTransport {
    /// Spawn the connection task for `url` on `handle`. Returns immediately;
    /// [`TransportEvent::Opened`] is reported once the handshake completes.
    pub fn spawn(handle: &Handle, url: &str) -> Result<Self, TransportError> {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(TransportError::InvalidAddress(url.to_string()));
        }

        let state = Arc::new(ConnectionStateWatch::new());
        state.set(ConnectionState::Connecting);

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (ev_tx, ev_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        handle.spawn(run_connection(
            url.to_string(),
            out_rx,
            ev_tx,
            Arc::clone(&state),
            shutdown_rx,
        ));

        Ok(Self {
            outgoing: out_tx,
            events: ev_rx,
            state,
            shutdown_tx,
        })
    }

    /// Return the connection state watch.
    pub fn state(&self) -> &Arc<ConnectionStateWatch> {
        &self.state
    }
}

impl Transport for WsTransport {
    fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.state.current() == ConnectionState::Disconnected {
            return Err(TransportError::Closed);
        }
        self.outgoing.send(text).map_err(|_| TransportError::Closed)
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        self.events.try_recv().ok()
    }

    fn close(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Connect, then pump frames in both directions until either side closes or
/// shutdown is signalled.
async fn run_connection(
    url: String,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<TransportEvent>,
    state: Arc<ConnectionStateWatch>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let stream = tokio::select! {
        result = connect_async(url.as_str()) => match result {
            Ok((stream, _response)) => stream,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "WebSocket connect failed");
                let _ = events.send(TransportEvent::Error(e.to_string()));
                state.set(ConnectionState::Disconnected);
                return;
            }
        },
        _ = shutdown_rx.changed() => {
            state.set(ConnectionState::Disconnected);
            return;
        }
    };

    tracing::info!(url = %url, "WebSocket connected");
    state.set(ConnectionState::Connected);
    let _ = events.send(TransportEvent::Opened);

    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    let _ = events.send(TransportEvent::Text(text));
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty());
                    tracing::info!(?reason, "Peer closed connection");
                    let _ = events.send(TransportEvent::Closed { reason });
                    break;
                }
                // Ping/pong replies are handled inside tungstenite.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "WebSocket read error");
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    break;
                }
                None => {
                    let _ = events.send(TransportEvent::Closed { reason: None });
                    break;
                }
            },
            queued = outgoing.recv() => match queued {
                Some(text) => {
                    if let Err(e) = write.send(WsMessage::Text(text)).await {
                        tracing::warn!(error = %e, "WebSocket write error");
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        break;
                    }
                }
                None => {
                    let _ = write.send(WsMessage::Close(None)).await;
                    break;
                }
            },
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    let _ = write.send(WsMessage::Close(None)).await;
                    let _ = events.send(TransportEvent::Closed {
                        reason: Some("closed by client".to_string()),
                    });
                    break;
                }
            }
        }
    }

    state.set(ConnectionState::Disconnected);
}

/// [`Connector`] that opens [`WsTransport`]s on a tokio runtime.
pub struct WsConnector {
    handle: Handle,
}

impl WsConnector {
    /// Connector spawning onto the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Connector spawning onto the runtime of the calling context.
    pub fn current() -> Result<Self, TransportError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| TransportError::NoRuntime)
    }
}

impl Connector for WsConnector {
    fn open(&self, address: &str) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(WsTransport::spawn(&self.handle, address)?))
    }
}
