//! Network message types and JSON serialization.
//!
//! Every message is a single JSON object whose `type` string selects the
//! payload schema. Field names are camelCase and vectors are `{x, y, z}`
//! objects. Use [`encode_message`] and [`decode_message`] for
//! encoding/decoding.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Deserializer, Serialize};

use crate::routing::MessageTag;

// ---------------------------------------------------------------------------
// Shared value types
// ---------------------------------------------------------------------------

/// Peer-assigned entity identifier.
///
/// Peers may send ids as JSON strings or integers; both decode to the same
/// textual id. Always serialized as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => EntityId(s),
            RawId::Unsigned(n) => EntityId(n.to_string()),
            RawId::Signed(n) => EntityId(n.to_string()),
        })
    }
}

/// Three-component vector as it appears on the wire. Missing components
/// default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireVec3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl From<Vec3> for WireVec3 {
    fn from(v: Vec3) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<WireVec3> for Vec3 {
    fn from(v: WireVec3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

/// Per-player state carried by roster, join, update and respawn messages.
///
/// Only `id` is mandatory; receivers ignore absent fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerData {
    /// Peer-assigned id.
    pub id: EntityId,
    /// World position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<WireVec3>,
    /// Euler rotation in radians (XYZ order).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<WireVec3>,
    /// Linear velocity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub velocity: Option<WireVec3>,
    /// Current health.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
    /// Scalar airspeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    /// Vehicle has been destroyed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_destroyed: Option<bool>,
    /// Vehicle has just respawned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_respawned: Option<bool>,
    /// Vehicle is off the ground.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_airborne: Option<bool>,
}

impl PlayerData {
    /// Player data carrying only an id.
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            position: None,
            rotation: None,
            velocity: None,
            health: None,
            callsign: None,
            speed: None,
            is_destroyed: None,
            is_respawned: None,
            is_airborne: None,
        }
    }
}

/// Cylindrical no-combat volume announced in `init_ack`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneData {
    /// Centre of the cylinder base.
    pub center: WireVec3,
    /// Horizontal radius.
    pub radius: f32,
    /// Ceiling above the centre.
    pub height: f32,
}

/// Severity attached to a `notification`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    /// Informational.
    #[default]
    Info,
    /// Something went wrong but play continues.
    Warning,
    /// Failure the player should know about.
    Error,
}

/// One leaderboard row. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardEntry {
    /// Player id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
    /// Kill count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kills: Option<u32>,
    /// Death count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deaths: Option<u32>,
    /// Score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
}

// ---------------------------------------------------------------------------
// Top-level enum
// ---------------------------------------------------------------------------

/// Top-level network message. The `type` field is the discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    // --- Handshake ---
    /// Client announces itself after the transport opens.
    Init(Init),
    /// Peer assigns an id and sends the roster.
    InitAck(InitAck),

    // --- Roster ---
    /// A player entered the match.
    PlayerJoined(PlayerJoined),
    /// A player left the match.
    PlayerLeft(PlayerLeft),
    /// Batched or single player state.
    Update(Update),
    /// A player respawned.
    PlayerRespawn(PlayerRespawn),
    /// Number of connected players.
    PlayerCount(PlayerCount),
    /// Score table.
    Leaderboard(Leaderboard),

    // --- Combat ---
    /// Damage dealt to a player.
    Damage(Damage),
    /// A player fired a volley.
    Fire(Fire),
    /// Cosmetic impact at a position.
    HitEffect(HitEffect),
    /// A player was destroyed.
    Destroyed(Destroyed),

    // --- System ---
    /// Text to surface to the player.
    Notification(Notification),
}

// ---------------------------------------------------------------------------
// Payload structs
// ---------------------------------------------------------------------------

/// Initial state snapshot sent on open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Init {
    /// Requested display name.
    pub callsign: String,
    /// Spawn position.
    pub position: WireVec3,
    /// Spawn rotation.
    pub rotation: WireVec3,
    /// Spawn health.
    pub health: f32,
}

/// Handshake reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitAck {
    /// Id assigned to the local player.
    pub client_id: EntityId,
    /// Players already in the match.
    pub players: Vec<PlayerData>,
    /// Optional spawn protection volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection_zone: Option<ZoneData>,
}

/// A player joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoined {
    /// The new player.
    pub player: PlayerData,
}

/// A player left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeft {
    /// Id of the departing player.
    pub player_id: EntityId,
}

/// Player state update. Exactly one of `players` or `player` is expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Batched state for many players.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub players: Option<Vec<PlayerData>>,
    /// State for a single player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerData>,
}

impl Update {
    /// Update carrying a single player's state.
    pub fn single(player: PlayerData) -> Self {
        Self {
            players: None,
            player: Some(player),
        }
    }

    /// Iterate every player entry regardless of which field carried it.
    pub fn entries(&self) -> impl Iterator<Item = &PlayerData> {
        self.players
            .iter()
            .flatten()
            .chain(self.player.iter())
    }
}

/// Damage dealt to a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Damage {
    /// Player receiving damage.
    pub target_id: EntityId,
    /// Health removed.
    pub amount: f32,
    /// Impact position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<WireVec3>,
    /// Player credited with the hit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<EntityId>,
}

/// A volley fired by a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fire {
    /// Shooter position.
    pub position: WireVec3,
    /// Shooter rotation.
    pub rotation: WireVec3,
    /// Shooter velocity.
    pub velocity: WireVec3,
    /// Shooter id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<EntityId>,
}

/// Cosmetic impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitEffect {
    /// Impact position.
    pub position: WireVec3,
    /// Whether the impact sound should play.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_sound: Option<bool>,
}

/// A player was destroyed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destroyed {
    /// Destroyed player.
    pub player_id: EntityId,
    /// Player credited with the kill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<EntityId>,
}

/// Text notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Message text.
    pub message: String,
    /// Severity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<NotificationLevel>,
}

/// A player respawned. `player` must carry position, rotation and health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRespawn {
    /// Respawned player state.
    pub player: PlayerData,
}

/// Connected player count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerCount {
    /// Number of players.
    pub count: u32,
}

/// Score table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    /// Rows in display order.
    pub data: Vec<LeaderboardEntry>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during message encoding and decoding.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// The text was not valid JSON.
    #[error("malformed JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The envelope has no string `type` field.
    #[error("message has no type field")]
    MissingType,

    /// The `type` is not one this client understands.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// A required field is missing or has the wrong shape.
    #[error("invalid {tag:?} payload: {source}")]
    InvalidPayload {
        /// Type of the rejected message.
        tag: MessageTag,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A conditionally required field is absent.
    #[error("{tag:?} message is missing {field}")]
    MissingField {
        /// Type of the rejected message.
        tag: MessageTag,
        /// Name of the absent field.
        field: &'static str,
    },

    /// Serialization failed.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

impl Message {
    /// Check requirements the type system cannot express.
    pub fn validate(&self) -> Result<(), MessageError> {
        match self {
            Message::Update(update) if update.players.is_none() && update.player.is_none() => {
                Err(MessageError::MissingField {
                    tag: MessageTag::Update,
                    field: "players",
                })
            }
            Message::PlayerRespawn(respawn) => {
                let missing = if respawn.player.position.is_none() {
                    Some("player.position")
                } else if respawn.player.rotation.is_none() {
                    Some("player.rotation")
                } else if respawn.player.health.is_none() {
                    Some("player.health")
                } else {
                    None
                };
                match missing {
                    Some(field) => Err(MessageError::MissingField {
                        tag: MessageTag::PlayerRespawn,
                        field,
                    }),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

/// Serialize a [`Message`] into its JSON text form.
pub fn encode_message(msg: &Message) -> Result<String, MessageError> {
    serde_json::to_string(msg).map_err(MessageError::Encode)
}

/// Decode JSON text into a validated [`Message`].
///
/// The `type` field is resolved first so unknown types and bad payloads
/// produce distinct errors.
pub fn decode_message(text: &str) -> Result<Message, MessageError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(MessageError::Malformed)?;

    let type_name = value
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or(MessageError::MissingType)?;
    let tag = MessageTag::from_wire(type_name)
        .ok_or_else(|| MessageError::UnknownType(type_name.to_string()))?;

    let msg: Message = serde_json::from_value(value)
        .map_err(|source| MessageError::InvalidPayload { tag, source })?;
    msg.validate()?;
    Ok(msg)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
