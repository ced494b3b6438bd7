//! Scripted flight for the headless client.
//!
//! A pilot flies a level circle at constant speed and fires in short
//! periodic bursts.

use std::f32::consts::TAU;

use dogfight_combat::Transform;
use dogfight_multiplayer::Entity;
use glam::Vec3;

/// Circle-flying autopilot.
#[derive(Debug, Clone)]
pub struct CirclePilot {
    center: Vec3,
    radius: f32,
    angular_speed: f32,
    phase: f32,
    burst_period: f32,
    burst_length: f32,
}

impl CirclePilot {
    /// Pilot circling `center` at `radius` with airspeed `speed`, starting
    /// `phase` radians around the circle.
    pub fn new(center: Vec3, radius: f32, speed: f32, phase: f32) -> Self {
        let radius = radius.max(1.0);
        Self {
            center,
            radius,
            angular_speed: speed / radius,
            phase,
            burst_period: 4.0,
            burst_length: 0.5,
        }
    }

    /// Where the pilot is at `t` seconds.
    pub fn transform_at(&self, t: f32) -> Transform {
        let (position, velocity) = self.state_at(t);
        Transform::new(position, heading_rotation(velocity))
    }

    fn state_at(&self, t: f32) -> (Vec3, Vec3) {
        let angle = (self.phase + self.angular_speed * t) % TAU;
        let (sin, cos) = angle.sin_cos();
        let position = self.center + Vec3::new(self.radius * cos, 0.0, self.radius * sin);
        let velocity = Vec3::new(-sin, 0.0, cos) * self.radius * self.angular_speed;
        (position, velocity)
    }

    /// Move `entity` to where the pilot is at `t` seconds.
    pub fn fly(&self, entity: &mut Entity, t: f32) {
        let (position, velocity) = self.state_at(t);
        entity.transform = Transform::new(position, heading_rotation(velocity));
        entity.velocity = velocity;
        entity.speed = velocity.length().min(entity.max_speed);
        entity.is_airborne = true;
    }

    /// Whether the trigger is held at `t` seconds.
    pub fn wants_fire(&self, t: f32) -> bool {
        t.rem_euclid(self.burst_period) < self.burst_length
    }
}

/// Euler rotation pointing the nose (`-Z`) along `velocity`.
fn heading_rotation(velocity: Vec3) -> Vec3 {
    Vec3::new(0.0, (-velocity.x).atan2(-velocity.z), 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nose_follows_velocity() {
        let pilot = CirclePilot::new(Vec3::new(0.0, 300.0, 0.0), 400.0, 80.0, 0.0);
        let mut entity = Entity::new("me", Transform::default(), 100.0, 400.0);
        for t in [0.0, 3.0, 7.5, 20.0] {
            pilot.fly(&mut entity, t);
            let along = entity.transform.forward().dot(entity.velocity.normalize());
            assert!(along > 0.999, "t={t} along={along}");
            assert!((entity.speed - 80.0).abs() < 1e-3);
            assert_eq!(entity.transform.position.y, 300.0);
        }
    }

    #[test]
    fn test_stays_on_circle() {
        let pilot = CirclePilot::new(Vec3::ZERO, 400.0, 80.0, 1.0);
        for t in [0.0, 10.0, 100.0] {
            let p = pilot.transform_at(t).position;
            assert!((p.length() - 400.0).abs() < 1e-2);
        }
    }

    #[test]
    fn test_fires_in_bursts() {
        let pilot = CirclePilot::new(Vec3::ZERO, 400.0, 80.0, 0.0);
        assert!(pilot.wants_fire(0.1));
        assert!(!pilot.wants_fire(1.0));
        assert!(pilot.wants_fire(4.2));
    }
}
