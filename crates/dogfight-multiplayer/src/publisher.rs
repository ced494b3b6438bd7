//! Outbound local state: the send throttle and the snapshot format.

use std::time::Duration;

use dogfight_net::PlayerData;

use crate::entity::Entity;

/// Limits outbound state updates to a fixed rate.
#[derive(Debug, Clone)]
pub struct StatePublisher {
    interval: Duration,
    last_sent: Option<Duration>,
}

impl StatePublisher {
    /// Publisher allowing at most `rate_hz` sends per second.
    pub fn new(rate_hz: u32) -> Self {
        Self {
            interval: Duration::from_nanos(1_000_000_000 / u64::from(rate_hz.max(1))),
            last_sent: None,
        }
    }

    /// Minimum spacing between sends.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether an update may go out at `now`. Records the send when it may.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.last_sent {
            Some(last) if now.saturating_sub(last) < self.interval => false,
            _ => {
                self.last_sent = Some(now);
                true
            }
        }
    }

    /// Forget the last send so the next poll succeeds.
    pub fn reset(&mut self) {
        self.last_sent = None;
    }
}

/// Wire snapshot of `entity`. `respawned` sets the `isRespawned` flag.
pub fn player_snapshot(entity: &Entity, respawned: bool) -> PlayerData {
    PlayerData {
        id: entity.id.clone(),
        position: Some(entity.transform.position.into()),
        rotation: Some(entity.transform.rotation.into()),
        velocity: Some(entity.velocity.into()),
        health: Some(entity.vitals.health()),
        callsign: Some(entity.callsign.clone()),
        speed: Some(entity.speed),
        is_destroyed: Some(entity.is_destroyed()),
        is_respawned: Some(respawned),
        is_airborne: Some(entity.is_airborne),
    }
}
