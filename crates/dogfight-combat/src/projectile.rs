//! Fixed-capacity projectile pool.
//!
//! Slots are allocated once. A slot index is either on the free list or on
//! the active list, never both, so `active_count() + pooled_count()` always
//! equals `capacity()`.

use std::time::Duration;

use dogfight_net::EntityId;
use glam::Vec3;

/// One in-flight projectile.
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    /// World position.
    pub position: Vec3,
    /// World velocity.
    pub velocity: Vec3,
    /// Shooter. Never collides with its own projectiles.
    pub owner: EntityId,
    /// Simulation time of launch.
    pub spawned_at: Duration,
    /// Lifetime after launch.
    pub ttl: Duration,
    /// Visual-only projectile mirrored from a remote shooter. Never credits hits.
    pub cosmetic: bool,
}

impl Projectile {
    /// Whether the projectile has outlived its TTL at `now`.
    pub fn is_expired(&self, now: Duration) -> bool {
        now.saturating_sub(self.spawned_at) >= self.ttl
    }
}

/// Pool of projectile slots with O(1) acquire.
#[derive(Debug, Clone)]
pub struct ProjectilePool {
    slots: Vec<Option<Projectile>>,
    active: Vec<usize>,
    free: Vec<usize>,
}

impl ProjectilePool {
    /// Pool with `capacity` free slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            active: Vec::with_capacity(capacity),
            free: (0..capacity).rev().collect(),
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of projectiles in flight.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of free slots.
    pub fn pooled_count(&self) -> usize {
        self.free.len()
    }

    /// Place a projectile in a free slot. Returns `None` when the pool is exhausted.
    pub fn acquire(&mut self, projectile: Projectile) -> Option<usize> {
        let slot = self.free.pop()?;
        self.slots[slot] = Some(projectile);
        self.active.push(slot);
        Some(slot)
    }

    /// Return a slot to the pool. Returns `false` if it was not active.
    pub fn release(&mut self, slot: usize) -> bool {
        let Some(entry) = self.slots.get_mut(slot) else {
            return false;
        };
        if entry.take().is_none() {
            return false;
        }
        if let Some(i) = self.active.iter().position(|&s| s == slot) {
            self.active.swap_remove(i);
        }
        self.free.push(slot);
        true
    }

    /// Projectile in `slot`, if active.
    pub fn get(&self, slot: usize) -> Option<&Projectile> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Iterate active projectiles with their slot index.
    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &Projectile)> {
        self.active
            .iter()
            .filter_map(|&slot| self.slots[slot].as_ref().map(|p| (slot, p)))
    }

    /// Integrate positions over `dt` and release every projectile whose TTL
    /// has elapsed at `now`. Returns the number released.
    pub fn step(&mut self, now: Duration, dt: f32) -> usize {
        for &slot in &self.active {
            if let Some(p) = self.slots[slot].as_mut() {
                p.position += p.velocity * dt;
            }
        }
        self.release_where(|p| p.is_expired(now))
    }

    /// Release every active projectile matching `predicate`.
    pub fn release_where(&mut self, mut predicate: impl FnMut(&Projectile) -> bool) -> usize {
        let doomed: Vec<usize> = self
            .iter_active()
            .filter(|&(_, p)| predicate(p))
            .map(|(slot, _)| slot)
            .collect();
        for &slot in &doomed {
            self.release(slot);
        }
        doomed.len()
    }

    /// Transfer ownership of in-flight projectiles, used when the local
    /// player's id is reassigned.
    pub fn reassign_owner(&mut self, from: &EntityId, to: &EntityId) {
        for &slot in &self.active {
            if let Some(p) = self.slots[slot].as_mut()
                && &p.owner == from
            {
                p.owner = to.clone();
            }
        }
    }
}
