//! Events flowing between the sync layer and the rest of the game.
//!
//! [`GameEvent`]s go out to presentation (effects, sounds, HUD). They are
//! queued during a tick and drained by the caller. [`SimEvent`]s come in
//! from the local simulation.

use dogfight_net::{EntityId, NotificationLevel};
use glam::Vec3;

/// Sound cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    /// Projectile impact.
    Hit,
    /// Vehicle destroyed.
    Explosion,
    /// Guns fired.
    Fire,
}

/// Outbound notification for presentation.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Show an impact effect.
    HitEffect { position: Vec3 },
    /// A vehicle blew up.
    Explosion { id: EntityId, position: Vec3 },
    /// Play a positional sound.
    SoundPlay { sound: Sound, position: Vec3 },
    /// Show a text message.
    Notification {
        message: String,
        level: NotificationLevel,
    },
    /// A remote player appeared.
    PlaneCreated {
        id: EntityId,
        callsign: Option<String>,
    },
    /// A remote player or bot was removed.
    PlaneRemoved { id: EntityId },
    /// A vehicle came back to life.
    PlaneRespawned { id: EntityId },
    /// Local weapon heat changed.
    WeaponHeat { level: f32, max: f32 },
    /// Local weapon locked out.
    WeaponOverheat,
    /// Local weapon usable again.
    WeaponCooled,
}

impl GameEvent {
    /// Dotted event name as used by presentation subscribers.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HitEffect { .. } => "effect.hit",
            Self::Explosion { .. } => "effect.explosion",
            Self::SoundPlay { .. } => "sound.play",
            Self::Notification { .. } => "notification",
            Self::PlaneCreated { .. } => "network.plane.created",
            Self::PlaneRemoved { .. } => "network.plane.removed",
            Self::PlaneRespawned { .. } => "network.plane.respawned",
            Self::WeaponHeat { .. } => "weapon.heat",
            Self::WeaponOverheat => "weapon.overheat",
            Self::WeaponCooled => "weapon.cooled",
        }
    }
}

/// Inbound event from the local simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A vehicle pulled the trigger. `None` means the local player.
    Fire { shooter: Option<EntityId> },
    /// Damage from a non-projectile source (collisions, terrain).
    Damage {
        target: EntityId,
        amount: f32,
        position: Option<Vec3>,
        source: Option<EntityId>,
    },
    /// A vehicle was destroyed outright (crash).
    Destroyed {
        id: EntityId,
        source: Option<EntityId>,
    },
}

impl SimEvent {
    /// Dotted event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fire { .. } => "plane.fire",
            Self::Damage { .. } => "plane.damage",
            Self::Destroyed { .. } => "plane.destroyed",
        }
    }
}

/// FIFO of [`GameEvent`]s produced during a tick.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<GameEvent>,
}

impl EventQueue {
    /// Empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&mut self, event: GameEvent) {
        tracing::trace!(event = event.name(), "Queued game event");
        self.events.push(event);
    }

    /// Take every queued event in order.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Queued events in order.
    pub fn iter(&self) -> impl Iterator<Item = &GameEvent> {
        self.events.iter()
    }
}
