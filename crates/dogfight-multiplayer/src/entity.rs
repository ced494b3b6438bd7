//! Vehicle state shared by the local player, local bots, and mirrored
//! remote players.

use std::time::Duration;

use dogfight_combat::{Transform, Vitals};
use dogfight_net::{EntityId, PlayerData};
use glam::Vec3;

use crate::interpolation::infer_speed;
use crate::registry::RemoteDefaults;
use crate::scheduler::TaskHandle;

/// Id the local player uses until the peer assigns one.
pub const LOCAL_PLAYER_ID: &str = "local";

/// One vehicle in the world.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Unique id.
    pub id: EntityId,
    /// Display name.
    pub callsign: String,
    /// Current (rendered) transform.
    pub transform: Transform,
    /// Linear velocity.
    pub velocity: Vec3,
    /// Health and destruction state.
    pub vitals: Vitals,
    /// Scalar airspeed.
    pub speed: f32,
    /// Upper bound for `speed`.
    pub max_speed: f32,
    /// Off the ground.
    pub is_airborne: bool,
    /// Mirrored from the peer rather than simulated here.
    pub is_remote: bool,
    /// Inside the respawn announcement window.
    pub is_respawned: bool,
}

impl Entity {
    /// A locally simulated vehicle at full health.
    pub fn new(id: impl Into<EntityId>, transform: Transform, max_health: f32, max_speed: f32) -> Self {
        let id = id.into();
        Self {
            callsign: id.to_string(),
            id,
            transform,
            velocity: Vec3::ZERO,
            vitals: Vitals::new(max_health),
            speed: 0.0,
            max_speed,
            is_airborne: true,
            is_remote: false,
            is_respawned: false,
        }
    }

    /// Whether the vehicle has been destroyed and not yet respawned.
    pub fn is_destroyed(&self) -> bool {
        self.vitals.is_destroyed()
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.callsign.is_empty() {
            self.id.as_str()
        } else {
            &self.callsign
        }
    }
}

/// A remote player mirrored from peer messages.
///
/// The rendered transform lives in `entity.transform` and is blended toward
/// `target` every tick.
#[derive(Debug, Clone)]
pub struct RemoteEntity {
    /// Mirrored vehicle state.
    pub entity: Entity,
    /// Latest transform received from the peer.
    pub target: Transform,
    /// Fraction of the remaining distance covered per tick.
    pub interpolation_factor: f32,
    /// Position at the last update, for speed inference.
    pub last_known_position: Vec3,
    /// Simulation time of the last update.
    pub last_update_at: Option<Duration>,
    /// Scheduled removal after destruction.
    pub pending_removal: Option<TaskHandle>,
}

impl RemoteEntity {
    /// Mirror a player first seen in `data`. The transform snaps to the
    /// reported state so a new arrival does not glide in from the origin.
    pub fn spawn(data: &PlayerData, defaults: &RemoteDefaults) -> Self {
        let position = data.position.map(Vec3::from).unwrap_or_default();
        let rotation = data.rotation.map(Vec3::from).unwrap_or_default();
        let transform = Transform::new(position, rotation);

        let mut entity = Entity::new(
            data.id.clone(),
            transform,
            defaults.max_health,
            defaults.max_speed,
        );
        entity.is_remote = true;
        if let Some(callsign) = &data.callsign {
            entity.callsign = callsign.clone();
        }

        Self {
            entity,
            target: transform,
            interpolation_factor: defaults.interpolation_factor,
            last_known_position: position,
            last_update_at: None,
            pending_removal: None,
        }
    }

    /// Take the non-vital fields of a state update: target transform,
    /// velocity, speed, and labels. Health is handled by the caller.
    pub fn apply_update(&mut self, data: &PlayerData, now: Duration) {
        if let Some(position) = data.position {
            let position = Vec3::from(position);
            self.target.position = position;
            if data.speed.is_none()
                && let Some(last) = self.last_update_at
                && let Some(speed) = infer_speed(
                    self.last_known_position,
                    position,
                    now.saturating_sub(last),
                    self.entity.max_speed,
                )
            {
                self.entity.speed = speed;
            }
            self.last_known_position = position;
            self.last_update_at = Some(now);
        }
        if let Some(rotation) = data.rotation {
            self.target.rotation = rotation.into();
        }
        if let Some(velocity) = data.velocity {
            self.entity.velocity = velocity.into();
        }
        if let Some(speed) = data.speed {
            self.entity.speed = speed.clamp(0.0, self.entity.max_speed);
        }
        if let Some(callsign) = &data.callsign {
            self.entity.callsign = callsign.clone();
        }
        if let Some(airborne) = data.is_airborne {
            self.entity.is_airborne = airborne;
        }
    }

    /// Bring the mirror back to life at the reported state, snapping both
    /// the rendered and target transforms.
    pub fn respawn(&mut self, data: &PlayerData, now: Duration) {
        let position = data
            .position
            .map(Vec3::from)
            .unwrap_or(self.target.position);
        let rotation = data
            .rotation
            .map(Vec3::from)
            .unwrap_or(self.target.rotation);
        let transform = Transform::new(position, rotation);

        self.entity.vitals.revive(data.health);
        self.entity.transform = transform;
        self.target = transform;
        self.entity.velocity = data.velocity.map(Vec3::from).unwrap_or_default();
        self.entity.speed = data
            .speed
            .map_or(0.0, |s| s.clamp(0.0, self.entity.max_speed));
        self.entity.is_airborne = data.is_airborne.unwrap_or(true);
        self.entity.is_respawned = true;
        if let Some(callsign) = &data.callsign {
            self.entity.callsign = callsign.clone();
        }
        self.last_known_position = position;
        self.last_update_at = Some(now);
    }

    /// Whether an `isRespawned` update should be treated as a respawn.
    pub fn awaits_respawn(&self) -> bool {
        self.entity.is_destroyed() || self.pending_removal.is_some()
    }
}
