//! Transport seam between the tick loop and the network.
//!
//! A [`Transport`] is a non-blocking, message-oriented connection: the tick
//! loop pushes text frames with [`Transport::send`] and drains lifecycle and
//! data events with [`Transport::poll`]. A [`Connector`] opens transports for
//! an address. [`memory_pair`] and [`MemoryConnector`] provide an in-process
//! implementation backed by tokio channels.

use tokio::sync::{mpsc, watch};

use crate::messages::{Message, MessageError, decode_message, encode_message};

/// Event surfaced by a transport to the tick loop.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection is established and ready for traffic.
    Opened,
    /// A text frame arrived.
    Text(String),
    /// The connection closed, optionally with a reason.
    Closed {
        /// Close reason reported by the peer or the transport.
        reason: Option<String>,
    },
    /// The connection failed.
    Error(String),
}

/// Errors raised by transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection is closed; nothing can be sent.
    #[error("transport is closed")]
    Closed,

    /// The address could not be used to open a connection.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// No tokio runtime is available to drive the connection.
    #[error("no async runtime available")]
    NoRuntime,
}

/// Where the session is in its connection life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport, or the last one closed.
    Disconnected,
    /// A transport was opened and has not reported `Opened` yet.
    Connecting,
    /// The transport is open and `init` has been sent.
    Connected,
}

/// Current [`ConnectionState`], observable through [`watch`] receivers.
#[derive(Debug)]
pub struct ConnectionStateWatch {
    tx: watch::Sender<ConnectionState>,
}

impl Default for ConnectionStateWatch {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStateWatch {
    /// Starts out [`ConnectionState::Disconnected`].
    pub fn new() -> Self {
        Self {
            tx: watch::Sender::new(ConnectionState::Disconnected),
        }
    }

    /// Store `state` and wake subscribers. Returns the previous state.
    pub fn set(&self, state: ConnectionState) -> ConnectionState {
        self.tx.send_replace(state)
    }

    /// New receiver that sees every later [`set`](Self::set).
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// State as of the last `set`, without waiting.
    pub fn current(&self) -> ConnectionState {
        *self.tx.borrow()
    }
}

/// Non-blocking message-oriented connection.
pub trait Transport: Send {
    /// Queue a text frame for delivery.
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Take the next pending event, if any. Never blocks.
    fn poll(&mut self) -> Option<TransportEvent>;

    /// Begin closing the connection. Idempotent.
    fn close(&mut self);
}

/// Factory that opens transports.
pub trait Connector: Send {
    /// Start connecting to `address`. The returned transport reports
    /// [`TransportEvent::Opened`] once the connection is usable.
    fn open(&self, address: &str) -> Result<Box<dyn Transport>, TransportError>;
}

// ---------------------------------------------------------------------------
// In-memory transport
// ---------------------------------------------------------------------------

/// Client half of an in-memory connection.
pub struct MemoryTransport {
    outgoing: mpsc::UnboundedSender<String>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    closed: bool,
}

/// Peer half of an in-memory connection, driven by tests or a local host.
pub struct MemoryPeer {
    events: mpsc::UnboundedSender<TransportEvent>,
    incoming: mpsc::UnboundedReceiver<String>,
}

/// Create a connected client/peer pair. The client sees no events until the
/// peer calls [`MemoryPeer::accept`].
pub fn memory_pair() -> (MemoryTransport, MemoryPeer) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (ev_tx, ev_rx) = mpsc::unbounded_channel();
    (
        MemoryTransport {
            outgoing: out_tx,
            events: ev_rx,
            closed: false,
        },
        MemoryPeer {
            events: ev_tx,
            incoming: out_rx,
        },
    )
}

impl Transport for MemoryTransport {
    fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.outgoing.send(text).map_err(|_| TransportError::Closed)
    }

    fn poll(&mut self) -> Option<TransportEvent> {
        self.events.try_recv().ok()
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

impl MemoryPeer {
    /// Report the connection as open to the client.
    pub fn accept(&self) {
        let _ = self.events.send(TransportEvent::Opened);
    }

    /// Deliver a raw text frame to the client.
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Text(text.into()));
    }

    /// Encode and deliver a message to the client.
    pub fn send_message(&self, msg: &Message) -> Result<(), MessageError> {
        self.send_text(encode_message(msg)?);
        Ok(())
    }

    /// Close the connection from the peer side.
    pub fn close(&self, reason: Option<&str>) {
        let _ = self.events.send(TransportEvent::Closed {
            reason: reason.map(str::to_string),
        });
    }

    /// Report a transport failure to the client.
    pub fn fail(&self, error: impl Into<String>) {
        let _ = self.events.send(TransportEvent::Error(error.into()));
    }

    /// Take every frame the client has sent so far.
    pub fn drain_text(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(text) = self.incoming.try_recv() {
            frames.push(text);
        }
        frames
    }

    /// Take every frame the client has sent so far, decoded. Frames that do
    /// not decode are skipped.
    pub fn drain_messages(&mut self) -> Vec<Message> {
        self.drain_text()
            .iter()
            .filter_map(|text| decode_message(text).ok())
            .collect()
    }
}

/// [`Connector`] handing out in-memory transports. The matching peers are
/// collected by the [`MemoryListener`].
pub struct MemoryConnector {
    accepted: mpsc::UnboundedSender<(String, MemoryPeer)>,
}

/// Receives the peer half of every transport a [`MemoryConnector`] opens.
pub struct MemoryListener {
    accepted: mpsc::UnboundedReceiver<(String, MemoryPeer)>,
}

impl MemoryConnector {
    /// Create a connector and its listener.
    pub fn new() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { accepted: tx }, MemoryListener { accepted: rx })
    }
}

impl Connector for MemoryConnector {
    fn open(&self, address: &str) -> Result<Box<dyn Transport>, TransportError> {
        let (transport, peer) = memory_pair();
        self.accepted
            .send((address.to_string(), peer))
            .map_err(|_| TransportError::InvalidAddress(address.to_string()))?;
        Ok(Box::new(transport))
    }
}

impl MemoryListener {
    /// Next opened connection, with the address it was opened for.
    pub fn next(&mut self) -> Option<(String, MemoryPeer)> {
        self.accepted.try_recv().ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
