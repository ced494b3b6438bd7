//! Bounded pool of visible hit effects.
//!
//! When the pool is full the oldest effect is evicted to make room.

use std::collections::VecDeque;
use std::time::Duration;

use glam::Vec3;

/// One visible impact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitEffect {
    /// Impact position.
    pub position: Vec3,
    /// Simulation time the effect appeared.
    pub spawned_at: Duration,
}

/// Fixed-capacity FIFO of hit effects.
#[derive(Debug, Clone)]
pub struct HitEffectPool {
    effects: VecDeque<HitEffect>,
    capacity: usize,
    lifetime: Duration,
}

impl HitEffectPool {
    /// Pool holding at most `capacity` effects, each living `lifetime`.
    pub fn new(capacity: usize, lifetime: Duration) -> Self {
        Self {
            effects: VecDeque::with_capacity(capacity),
            capacity,
            lifetime,
        }
    }

    /// Show an effect at `position`. Returns the evicted effect when the
    /// pool was full. A zero-capacity pool shows nothing.
    pub fn spawn(&mut self, position: Vec3, now: Duration) -> Option<HitEffect> {
        if self.capacity == 0 {
            return None;
        }
        let evicted = if self.effects.len() >= self.capacity {
            self.effects.pop_front()
        } else {
            None
        };
        self.effects.push_back(HitEffect {
            position,
            spawned_at: now,
        });
        evicted
    }

    /// Drop effects older than their lifetime. Returns how many expired.
    pub fn expire(&mut self, now: Duration) -> usize {
        let before = self.effects.len();
        self.effects
            .retain(|e| now.saturating_sub(e.spawned_at) < self.lifetime);
        before - self.effects.len()
    }

    /// Number of visible effects.
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Whether no effects are visible.
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Visible effects, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &HitEffect> {
        self.effects.iter()
    }
}
