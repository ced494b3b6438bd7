//! Weapon heat: a fire-rate limiter with an overheat lockout.
//!
//! Every volley adds a fixed amount of heat. Reaching the maximum locks the
//! weapon for a fixed duration, after which heat resets to zero. While the
//! weapon is ready and the trigger is released, heat decays linearly.

use std::time::Duration;

use dogfight_config::CombatConfig;

/// Heat state machine states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeatState {
    /// The weapon may fire.
    Ready,
    /// The weapon is locked out since the given simulation time.
    Overheated {
        /// When the lockout began.
        since: Duration,
    },
}

/// Why a fire request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireBlocked {
    /// The per-volley cooldown has not elapsed.
    CoolingDown,
    /// The weapon is in its overheat lockout.
    Overheated,
}

/// Observable heat transitions, surfaced as `weapon.*` events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeatEvent {
    /// Heat level changed.
    Heat {
        /// Current heat.
        level: f32,
        /// Heat that triggers the lockout.
        max: f32,
    },
    /// The weapon entered the overheat lockout.
    Overheated,
    /// The lockout ended and heat reset to zero.
    Cooled,
}

/// Heat tracker for one weapon.
#[derive(Debug, Clone)]
pub struct WeaponHeat {
    heat: f32,
    state: HeatState,
    last_fire: Option<Duration>,
    trigger_held: bool,
    heat_per_shot: f32,
    max_heat: f32,
    lockout: Duration,
    decay_per_sec: f32,
    cooldown: Duration,
}

impl WeaponHeat {
    /// Cold weapon tuned from `config`.
    pub fn new(config: &CombatConfig) -> Self {
        Self {
            heat: 0.0,
            state: HeatState::Ready,
            last_fire: None,
            trigger_held: false,
            heat_per_shot: config.heat_per_shot,
            max_heat: config.max_heat,
            lockout: config.overheat_lockout(),
            decay_per_sec: config.heat_decay_per_sec,
            cooldown: config.fire_cooldown(),
        }
    }

    /// Current heat in `[0, max_heat]`.
    pub fn heat(&self) -> f32 {
        self.heat
    }

    /// Heat that triggers the lockout.
    pub fn max_heat(&self) -> f32 {
        self.max_heat
    }

    /// Current state.
    pub fn state(&self) -> HeatState {
        self.state
    }

    /// Whether the weapon is locked out.
    pub fn is_overheated(&self) -> bool {
        matches!(self.state, HeatState::Overheated { .. })
    }

    /// Check whether a volley may fire at `now`. Counts as a trigger pull
    /// for decay purposes even when refused.
    pub fn check(&mut self, now: Duration) -> Result<(), FireBlocked> {
        self.trigger_held = true;
        if self.is_overheated() {
            return Err(FireBlocked::Overheated);
        }
        if let Some(last) = self.last_fire
            && now.saturating_sub(last) < self.cooldown
        {
            return Err(FireBlocked::CoolingDown);
        }
        Ok(())
    }

    /// Record a volley that passed [`check`](Self::check).
    pub fn commit(&mut self, now: Duration) -> HeatEvent {
        self.last_fire = Some(now);
        self.heat = (self.heat + self.heat_per_shot).min(self.max_heat);
        if self.heat >= self.max_heat {
            self.state = HeatState::Overheated { since: now };
            tracing::debug!(heat = self.heat, "Weapon overheated");
            HeatEvent::Overheated
        } else {
            HeatEvent::Heat {
                level: self.heat,
                max: self.max_heat,
            }
        }
    }

    /// Advance the state machine by one tick.
    pub fn tick(&mut self, now: Duration, dt: f32) -> Option<HeatEvent> {
        let trigger_held = std::mem::take(&mut self.trigger_held);
        match self.state {
            HeatState::Overheated { since } => {
                if now.saturating_sub(since) >= self.lockout {
                    self.heat = 0.0;
                    self.state = HeatState::Ready;
                    Some(HeatEvent::Cooled)
                } else {
                    None
                }
            }
            HeatState::Ready if !trigger_held && self.heat > 0.0 => {
                self.heat = (self.heat - self.decay_per_sec * dt).max(0.0);
                Some(HeatEvent::Heat {
                    level: self.heat,
                    max: self.max_heat,
                })
            }
            HeatState::Ready => None,
        }
    }
}
