//! Ballistics engine: volley spawning, motion integration and hit detection.
//!
//! Each volley launches one projectile from each of two mirrored gun mounts.
//! Both are aimed at a convergence point straight ahead of the shooter, and
//! inherit the shooter's velocity.

use std::collections::HashMap;
use std::time::Duration;

use dogfight_config::CombatConfig;
use dogfight_net::EntityId;
use glam::Vec3;

use crate::collision::{CollisionTarget, Hit, detect_hits};
use crate::heat::{FireBlocked, HeatEvent, WeaponHeat};
use crate::projectile::{Projectile, ProjectilePool};
use crate::transform::Transform;
use crate::zone::ProtectionZone;

/// Projectiles per volley.
pub const MOUNT_COUNT: usize = 2;

/// Result of a fire request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// A volley launched into the given slots.
    Fired {
        /// Pool slots of the new projectiles.
        slots: [usize; MOUNT_COUNT],
    },
    /// The weapon's cooldown has not elapsed.
    CoolingDown,
    /// The weapon is in its overheat lockout.
    Overheated,
    /// Not enough free projectile slots; the request was dropped.
    PoolExhausted,
}

impl FireOutcome {
    /// Whether projectiles were launched.
    pub fn fired(&self) -> bool {
        matches!(self, FireOutcome::Fired { .. })
    }
}

impl From<FireBlocked> for FireOutcome {
    fn from(blocked: FireBlocked) -> Self {
        match blocked {
            FireBlocked::CoolingDown => FireOutcome::CoolingDown,
            FireBlocked::Overheated => FireOutcome::Overheated,
        }
    }
}

/// Owns the projectile pool and one heat tracker per armed vehicle.
pub struct BallisticsEngine {
    pool: ProjectilePool,
    weapons: HashMap<EntityId, WeaponHeat>,
    heat_events: Vec<(EntityId, HeatEvent)>,
    projectile_ttl: Duration,
    config: CombatConfig,
}

impl BallisticsEngine {
    /// Engine with an empty pool sized from `config`.
    pub fn new(config: &CombatConfig) -> Self {
        Self {
            pool: ProjectilePool::new(config.projectile_pool_size),
            weapons: HashMap::new(),
            heat_events: Vec::new(),
            projectile_ttl: config.projectile_ttl(),
            config: config.clone(),
        }
    }

    /// The projectile pool.
    pub fn pool(&self) -> &ProjectilePool {
        &self.pool
    }

    /// Heat tracker of `owner`, if it has fired before.
    pub fn weapon(&self, owner: &EntityId) -> Option<&WeaponHeat> {
        self.weapons.get(owner)
    }

    /// Fire a volley for `owner`, subject to its cooldown and heat.
    pub fn fire(
        &mut self,
        owner: &EntityId,
        origin: &Transform,
        origin_velocity: Vec3,
        now: Duration,
    ) -> FireOutcome {
        let weapon = self
            .weapons
            .entry(owner.clone())
            .or_insert_with(|| WeaponHeat::new(&self.config));
        if let Err(blocked) = weapon.check(now) {
            return blocked.into();
        }

        let outcome = self.spawn_volley(owner, origin, origin_velocity, now, false);
        if outcome.fired()
            && let Some(weapon) = self.weapons.get_mut(owner)
        {
            let event = weapon.commit(now);
            self.heat_events.push((owner.clone(), event));
        }
        outcome
    }

    /// Mirror a volley fired by a remote peer. Ignores heat and cooldown,
    /// and the projectiles never credit hits.
    pub fn fire_cosmetic(
        &mut self,
        owner: &EntityId,
        origin: &Transform,
        origin_velocity: Vec3,
        now: Duration,
    ) -> FireOutcome {
        self.spawn_volley(owner, origin, origin_velocity, now, true)
    }

    fn spawn_volley(
        &mut self,
        owner: &EntityId,
        origin: &Transform,
        origin_velocity: Vec3,
        now: Duration,
        cosmetic: bool,
    ) -> FireOutcome {
        if self.pool.pooled_count() < MOUNT_COUNT {
            tracing::warn!(
                owner = %owner,
                active = self.pool.active_count(),
                "Projectile pool exhausted, dropping fire request"
            );
            return FireOutcome::PoolExhausted;
        }

        let ttl = self.projectile_ttl;
        let aimed = self.aim(origin, origin_velocity);
        let mut slots = [0; MOUNT_COUNT];
        for (slot, (position, velocity)) in slots.iter_mut().zip(aimed) {
            let Some(acquired) = self.pool.acquire(Projectile {
                position,
                velocity,
                owner: owner.clone(),
                spawned_at: now,
                ttl,
                cosmetic,
            }) else {
                return FireOutcome::PoolExhausted;
            };
            *slot = acquired;
        }
        FireOutcome::Fired { slots }
    }

    /// Muzzle position and launch velocity for each mount.
    pub fn aim(&self, origin: &Transform, origin_velocity: Vec3) -> [(Vec3, Vec3); MOUNT_COUNT] {
        let [x, y, z] = self.config.mount_offset;
        let forward = origin.forward();
        let convergence = origin.position + forward * self.config.convergence_distance;

        [Vec3::new(x, y, z), Vec3::new(-x, y, z)].map(|mount| {
            let muzzle = origin.to_world(mount);
            let direction = (convergence - muzzle).try_normalize().unwrap_or(forward);
            (
                muzzle,
                direction * self.config.muzzle_speed + origin_velocity,
            )
        })
    }

    /// Advance projectiles and weapon heat by one tick.
    pub fn step(&mut self, now: Duration, dt: f32) {
        self.pool.step(now, dt);
        for (owner, weapon) in &mut self.weapons {
            if let Some(event) = weapon.tick(now, dt) {
                self.heat_events.push((owner.clone(), event));
            }
        }
    }

    /// Run collision detection for this tick.
    pub fn detect_hits(
        &mut self,
        targets: &[CollisionTarget],
        zone: Option<&ProtectionZone>,
    ) -> Vec<Hit> {
        detect_hits(&mut self.pool, targets, zone, self.config.collision_radius)
    }

    /// Take heat transitions recorded since the last drain.
    pub fn drain_heat_events(&mut self) -> Vec<(EntityId, HeatEvent)> {
        std::mem::take(&mut self.heat_events)
    }

    /// Release every projectile matching `predicate`.
    pub fn release_where(&mut self, predicate: impl FnMut(&Projectile) -> bool) -> usize {
        self.pool.release_where(predicate)
    }

    /// Forget a vehicle's weapon state.
    pub fn remove_weapon(&mut self, owner: &EntityId) {
        self.weapons.remove(owner);
    }

    /// Move weapon state and in-flight projectiles to a new owner id.
    pub fn reassign_owner(&mut self, from: &EntityId, to: &EntityId) {
        if from == to {
            return;
        }
        if let Some(weapon) = self.weapons.remove(from) {
            self.weapons.insert(to.clone(), weapon);
        }
        self.pool.reassign_owner(from, to);
    }
}
