//! Health and the destruction life cycle.
//!
//! `Alive -> FreeFalling -> Grounded`, and back to `Alive` on respawn. A
//! vehicle that is not alive never takes damage. While free-falling the
//! wreck is pulled down by gravity and tumbles until it reaches the ground,
//! where it skids to a stop.

use dogfight_config::CombatConfig;
use glam::Vec3;
use rand::Rng;

use crate::transform::Transform;

/// Life cycle state of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    /// Flying and hittable.
    Alive,
    /// Destroyed, falling under gravity.
    FreeFalling,
    /// Destroyed and resting on the ground.
    Grounded,
}

/// Effect of a health change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// The vehicle was already destroyed; nothing changed.
    Ignored,
    /// Health changed and the vehicle survives.
    Damaged {
        /// Health after the change.
        health: f32,
    },
    /// This change destroyed the vehicle.
    Destroyed,
}

/// Free-fall tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeFallTuning {
    /// Downward acceleration.
    pub gravity: f32,
    /// Height of the ground plane.
    pub ground_height: f32,
    /// Velocity multiplier per tick once grounded.
    pub ground_damping: f32,
}

impl From<&CombatConfig> for FreeFallTuning {
    fn from(config: &CombatConfig) -> Self {
        Self {
            gravity: config.gravity,
            ground_height: config.ground_height,
            ground_damping: config.ground_damping.clamp(0.0, 1.0),
        }
    }
}

/// Health plus destruction state of one vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Vitals {
    health: f32,
    max_health: f32,
    life: LifeState,
    angular_velocity: Vec3,
}

impl Vitals {
    /// Alive at full health.
    pub fn new(max_health: f32) -> Self {
        let max_health = max_health.max(0.0);
        Self {
            health: max_health,
            max_health,
            life: LifeState::Alive,
            angular_velocity: Vec3::ZERO,
        }
    }

    /// Current health in `[0, max_health]`.
    pub fn health(&self) -> f32 {
        self.health
    }

    /// Maximum health.
    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    /// Life cycle state.
    pub fn life(&self) -> LifeState {
        self.life
    }

    /// Whether the vehicle is flying and hittable.
    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    /// Whether the vehicle has been destroyed and not yet respawned.
    pub fn is_destroyed(&self) -> bool {
        !self.is_alive()
    }

    /// Whether the wreck is still falling.
    pub fn is_free_falling(&self) -> bool {
        self.life == LifeState::FreeFalling
    }

    /// Tumble rate of the wreck (radians/s per axis).
    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    /// Subtract `amount` from health. Destroys the vehicle when health
    /// reaches zero.
    pub fn apply_damage(&mut self, amount: f32, tumble: Vec3) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome::Ignored;
        }
        self.set_health(self.health - amount.max(0.0), tumble)
    }

    /// Overwrite health with an authoritative value, clamped into range.
    pub fn set_health(&mut self, health: f32, tumble: Vec3) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome::Ignored;
        }
        self.health = health.clamp(0.0, self.max_health);
        if self.health <= 0.0 {
            self.destroy(tumble);
            DamageOutcome::Destroyed
        } else {
            DamageOutcome::Damaged {
                health: self.health,
            }
        }
    }

    /// Destroy the vehicle regardless of health. Returns `false` if it was
    /// already destroyed.
    pub fn destroy(&mut self, tumble: Vec3) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.health = 0.0;
        self.life = LifeState::FreeFalling;
        self.angular_velocity = tumble;
        true
    }

    /// Bring the vehicle back to life with `health` (full when `None`).
    pub fn revive(&mut self, health: Option<f32>) {
        let health = health.unwrap_or(self.max_health);
        self.health = if health > 0.0 {
            health.min(self.max_health)
        } else {
            self.max_health
        };
        self.life = LifeState::Alive;
        self.angular_velocity = Vec3::ZERO;
    }

    /// Integrate the wreck for one tick. Does nothing while alive.
    pub fn step_free_fall(
        &mut self,
        transform: &mut Transform,
        velocity: &mut Vec3,
        tuning: &FreeFallTuning,
        dt: f32,
    ) {
        match self.life {
            LifeState::Alive => {}
            LifeState::FreeFalling => {
                velocity.y -= tuning.gravity * dt;
                transform.position += *velocity * dt;
                transform.rotation += self.angular_velocity * dt;
                if transform.position.y <= tuning.ground_height {
                    transform.position.y = tuning.ground_height;
                    velocity.y = 0.0;
                    self.life = LifeState::Grounded;
                }
            }
            LifeState::Grounded => {
                *velocity *= tuning.ground_damping;
                velocity.y = 0.0;
                self.angular_velocity *= tuning.ground_damping;
                transform.position += *velocity * dt;
                transform.position.y = tuning.ground_height;
                transform.rotation += self.angular_velocity * dt;
            }
        }
    }
}

/// Random tumble for a fresh wreck, up to `max_rate` radians/s per axis.
pub fn random_tumble(rng: &mut impl Rng, max_rate: f32) -> Vec3 {
    let max_rate = max_rate.abs();
    if max_rate == 0.0 {
        return Vec3::ZERO;
    }
    Vec3::new(
        rng.random_range(-max_rate..=max_rate),
        rng.random_range(-max_rate..=max_rate),
        rng.random_range(-max_rate..=max_rate),
    )
}
