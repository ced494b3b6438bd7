//! Peer networking: JSON wire messages, type-tag routing, and the transport
//! seam with a WebSocket implementation and an in-memory pair for tests.

pub mod messages;
pub mod routing;
pub mod transport;
pub mod ws_client;

pub use messages::{
    Damage, Destroyed, EntityId, Fire, HitEffect, Init, InitAck, Leaderboard, LeaderboardEntry,
    Message, MessageError, Notification, NotificationLevel, PlayerCount, PlayerData,
    PlayerJoined, PlayerLeft, PlayerRespawn, Update, WireVec3, ZoneData, decode_message,
    encode_message,
};
pub use routing::{MessageHandler, MessageRouter, MessageTag};
pub use transport::{
    ConnectionState, ConnectionStateWatch, Connector, MemoryConnector, MemoryListener, MemoryPeer,
    MemoryTransport, Transport, TransportError, TransportEvent, memory_pair,
};
pub use ws_client::{WsConnector, WsTransport};
