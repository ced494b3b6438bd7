//! Message routing: dispatch incoming messages to type-specific handlers.
//!
//! The [`MessageRouter`] maps [`MessageTag`] values to [`MessageHandler`]
//! implementations that mutate a caller-supplied context. Text frames are
//! decoded with [`decode_message`]; anything that fails to decode is logged
//! and dropped, so routing never fails.

use std::collections::HashMap;

use crate::messages::{Message, decode_message};

// ---------------------------------------------------------------------------
// MessageTag
// ---------------------------------------------------------------------------

/// Unique tag identifying a message type, used as the key for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTag {
    /// Client handshake.
    Init,
    /// Handshake reply.
    InitAck,
    /// Player joined.
    PlayerJoined,
    /// Player left.
    PlayerLeft,
    /// Player state update.
    Update,
    /// Damage dealt.
    Damage,
    /// Volley fired.
    Fire,
    /// Cosmetic impact.
    HitEffect,
    /// Player destroyed.
    Destroyed,
    /// Text notification.
    Notification,
    /// Player respawned.
    PlayerRespawn,
    /// Connected player count.
    PlayerCount,
    /// Score table.
    Leaderboard,
}

impl MessageTag {
    /// Every tag, in wire-table order.
    pub const ALL: [MessageTag; 13] = [
        MessageTag::Init,
        MessageTag::InitAck,
        MessageTag::PlayerJoined,
        MessageTag::PlayerLeft,
        MessageTag::Update,
        MessageTag::Damage,
        MessageTag::Fire,
        MessageTag::HitEffect,
        MessageTag::Destroyed,
        MessageTag::Notification,
        MessageTag::PlayerRespawn,
        MessageTag::PlayerCount,
        MessageTag::Leaderboard,
    ];

    /// The `type` string used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageTag::Init => "init",
            MessageTag::InitAck => "init_ack",
            MessageTag::PlayerJoined => "player_joined",
            MessageTag::PlayerLeft => "player_left",
            MessageTag::Update => "update",
            MessageTag::Damage => "damage",
            MessageTag::Fire => "fire",
            MessageTag::HitEffect => "hit_effect",
            MessageTag::Destroyed => "destroyed",
            MessageTag::Notification => "notification",
            MessageTag::PlayerRespawn => "player_respawn",
            MessageTag::PlayerCount => "player_count",
            MessageTag::Leaderboard => "leaderboard",
        }
    }

    /// Resolve a wire `type` string.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.as_str() == name)
    }
}

impl Message {
    /// Extract the routing tag from a message without consuming it.
    pub fn tag(&self) -> MessageTag {
        match self {
            Message::Init(_) => MessageTag::Init,
            Message::InitAck(_) => MessageTag::InitAck,
            Message::PlayerJoined(_) => MessageTag::PlayerJoined,
            Message::PlayerLeft(_) => MessageTag::PlayerLeft,
            Message::Update(_) => MessageTag::Update,
            Message::Damage(_) => MessageTag::Damage,
            Message::Fire(_) => MessageTag::Fire,
            Message::HitEffect(_) => MessageTag::HitEffect,
            Message::Destroyed(_) => MessageTag::Destroyed,
            Message::Notification(_) => MessageTag::Notification,
            Message::PlayerRespawn(_) => MessageTag::PlayerRespawn,
            Message::PlayerCount(_) => MessageTag::PlayerCount,
            Message::Leaderboard(_) => MessageTag::Leaderboard,
        }
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Trait for message handlers operating on a context of type `C`.
pub trait MessageHandler<C>: Send + Sync {
    /// Process a single incoming message.
    fn handle(&self, ctx: &mut C, msg: Message);
}

/// Blanket implementation for closures and plain functions.
impl<C, F> MessageHandler<C> for F
where
    F: Fn(&mut C, Message) + Send + Sync,
{
    fn handle(&self, ctx: &mut C, msg: Message) {
        self(ctx, msg);
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Routes incoming messages to registered handlers by [`MessageTag`].
pub struct MessageRouter<C> {
    handlers: HashMap<MessageTag, Box<dyn MessageHandler<C>>>,
}

impl<C> MessageRouter<C> {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for a specific message tag, replacing any previous one.
    pub fn register<H: MessageHandler<C> + 'static>(&mut self, tag: MessageTag, handler: H) {
        self.handlers.insert(tag, Box::new(handler));
    }

    /// Whether a handler is registered for `tag`.
    pub fn handles(&self, tag: MessageTag) -> bool {
        self.handlers.contains_key(&tag)
    }

    /// Route a decoded message to the registered handler.
    ///
    /// Returns `true` if a handler was found, `false` if the message was
    /// dropped.
    pub fn route(&self, ctx: &mut C, msg: Message) -> bool {
        let tag = msg.tag();
        if let Some(handler) = self.handlers.get(&tag) {
            handler.handle(ctx, msg);
            true
        } else {
            tracing::warn!("No handler registered for {:?}, dropping message", tag);
            false
        }
    }

    /// Decode a text frame and route it. Decode failures are logged and
    /// dropped without touching `ctx`.
    pub fn route_text(&self, ctx: &mut C, text: &str) -> bool {
        match decode_message(text) {
            Ok(msg) => self.route(ctx, msg),
            Err(e) => {
                tracing::warn!(error = %e, "Dropping undecodable message");
                false
            }
        }
    }

    /// Return an iterator over registered tags (useful for startup logging).
    pub fn registered_tags(&self) -> impl Iterator<Item = &MessageTag> {
        self.handlers.keys()
    }
}

impl<C> Default for MessageRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::*;

    #[derive(Default)]
    struct Counters {
        counts: HashMap<MessageTag, u32>,
        last_count: Option<u32>,
    }

    fn count(ctx: &mut Counters, msg: Message) {
        *ctx.counts.entry(msg.tag()).or_default() += 1;
        if let Message::PlayerCount(pc) = msg {
            ctx.last_count = Some(pc.count);
        }
    }

    #[test]
    fn test_message_routed_to_correct_handler() {
        let mut router = MessageRouter::new();
        router.register(MessageTag::PlayerCount, count);

        let mut ctx = Counters::default();
        assert!(router.route(&mut ctx, Message::PlayerCount(PlayerCount { count: 4 })));
        assert_eq!(ctx.last_count, Some(4));
    }

    #[test]
    fn test_unregistered_message_dropped() {
        let router: MessageRouter<Counters> = MessageRouter::new();
        let mut ctx = Counters::default();
        let routed = router.route(&mut ctx, Message::PlayerCount(PlayerCount { count: 1 }));
        assert!(!routed, "Message with no handler should return false");
        assert!(ctx.counts.is_empty());
    }

    #[test]
    fn test_routing_is_type_safe() {
        let mut router = MessageRouter::new();
        router.register(MessageTag::PlayerCount, count);
        let mut ctx = Counters::default();

        router.route(
            &mut ctx,
            Message::PlayerLeft(PlayerLeft {
                player_id: EntityId::new("x"),
            }),
        );
        assert!(ctx.counts.is_empty());

        router.route(&mut ctx, Message::PlayerCount(PlayerCount { count: 2 }));
        assert_eq!(ctx.counts.get(&MessageTag::PlayerCount), Some(&1));
    }

    #[test]
    fn test_route_text_decodes_and_dispatches() {
        let mut router = MessageRouter::new();
        router.register(MessageTag::PlayerCount, count);
        let mut ctx = Counters::default();

        assert!(router.route_text(&mut ctx, r#"{"type":"player_count","count":9}"#));
        assert_eq!(ctx.last_count, Some(9));
    }

    #[test]
    fn test_route_text_drops_bad_input_without_side_effects() {
        let mut router = MessageRouter::new();
        for tag in MessageTag::ALL {
            router.register(tag, count);
        }
        let mut ctx = Counters::default();

        assert!(!router.route_text(&mut ctx, "not json"));
        assert!(!router.route_text(&mut ctx, r#"{"type":"warp_drive"}"#));
        assert!(!router.route_text(&mut ctx, r#"{"type":"player_count"}"#));
        assert!(!router.route_text(&mut ctx, r#"{"count":3}"#));
        assert!(ctx.counts.is_empty());
    }

    #[test]
    fn test_wire_names_roundtrip_through_tags() {
        for tag in MessageTag::ALL {
            assert_eq!(MessageTag::from_wire(tag.as_str()), Some(tag));
        }
        assert_eq!(MessageTag::from_wire("Init"), None);
    }

    #[test]
    fn test_message_tag_matches_serialized_type() {
        let msg = Message::Destroyed(Destroyed {
            player_id: EntityId::new("p"),
            source_id: None,
        });
        let text = encode_message(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], msg.tag().as_str());
    }

    #[test]
    fn test_registered_tags() {
        let mut router: MessageRouter<Counters> = MessageRouter::default();
        router.register(MessageTag::Update, count);
        router.register(MessageTag::Damage, count);
        assert_eq!(router.registered_tags().count(), 2);
        assert!(router.handles(MessageTag::Update));
        assert!(!router.handles(MessageTag::Fire));
    }
}
