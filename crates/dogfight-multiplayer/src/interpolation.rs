//! Smoothing of remote transforms toward their latest reported state.
//!
//! Each tick the rendered transform covers a fixed fraction of the remaining
//! distance to the target. The factor is applied per tick, not scaled by
//! frame time, so convergence speed follows the tick rate.

use std::time::Duration;

use dogfight_combat::Transform;
use glam::Vec3;

use crate::registry::EntityRegistry;

/// Blend an angle toward `to` by `factor`, without wrap-around handling.
pub fn lerp_angle_raw(from: f32, to: f32, factor: f32) -> f32 {
    from + (to - from) * factor
}

/// Move `current` a `factor` fraction of the way to `target`.
pub fn blend_toward(current: &mut Transform, target: &Transform, factor: f32) {
    let factor = factor.clamp(0.0, 1.0);
    current.position = current.position.lerp(target.position, factor);
    current.rotation = Vec3::new(
        lerp_angle_raw(current.rotation.x, target.rotation.x, factor),
        lerp_angle_raw(current.rotation.y, target.rotation.y, factor),
        lerp_angle_raw(current.rotation.z, target.rotation.z, factor),
    );
}

/// Speed implied by moving from `previous` to `current` in `elapsed`,
/// clamped to `max_speed`. `None` when no time has passed.
pub fn infer_speed(previous: Vec3, current: Vec3, elapsed: Duration, max_speed: f32) -> Option<f32> {
    let secs = elapsed.as_secs_f32();
    if secs <= 0.0 {
        return None;
    }
    Some((previous.distance(current) / secs).min(max_speed.max(0.0)))
}

/// Advance every living remote one interpolation step. Wrecks are left to
/// the free-fall integrator.
pub fn interpolate_remotes(registry: &mut EntityRegistry) {
    for remote in registry.iter_mut() {
        if remote.entity.vitals.is_alive() {
            blend_toward(
                &mut remote.entity.transform,
                &remote.target,
                remote.interpolation_factor,
            );
        }
    }
}
