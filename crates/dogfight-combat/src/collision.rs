//! Per-tick projectile vs. vehicle collision.

use dogfight_net::EntityId;
use glam::Vec3;

use crate::projectile::ProjectilePool;
use crate::zone::ProtectionZone;

/// A vehicle that projectiles can hit this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionTarget {
    /// Vehicle id.
    pub id: EntityId,
    /// Vehicle centre.
    pub position: Vec3,
    /// Destroyed vehicles are not targets.
    pub alive: bool,
}

/// A projectile that struck a vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    /// Owner of the projectile.
    pub source: EntityId,
    /// Vehicle that was struck.
    pub target: EntityId,
    /// Projectile position at impact.
    pub position: Vec3,
}

/// Test every active, non-cosmetic projectile against `targets`.
///
/// A projectile hits the first target (in slice order) that is alive, is not
/// its owner, lies outside `zone`, and is strictly closer than `radius`.
/// Projectiles inside the zone hit nothing. A projectile that hits is
/// returned to the pool, so each projectile credits at most one target.
pub fn detect_hits(
    pool: &mut ProjectilePool,
    targets: &[CollisionTarget],
    zone: Option<&ProtectionZone>,
    radius: f32,
) -> Vec<Hit> {
    let radius_sq = radius * radius;
    let protected = |p: Vec3| zone.is_some_and(|z| z.contains(p));

    let mut hits = Vec::new();
    let mut spent = Vec::new();
    for (slot, projectile) in pool.iter_active() {
        if projectile.cosmetic || protected(projectile.position) {
            continue;
        }
        let struck = targets.iter().find(|t| {
            t.alive
                && t.id != projectile.owner
                && !protected(t.position)
                && t.position.distance_squared(projectile.position) < radius_sq
        });
        if let Some(target) = struck {
            hits.push(Hit {
                source: projectile.owner.clone(),
                target: target.id.clone(),
                position: projectile.position,
            });
            spent.push(slot);
        }
    }

    for slot in spent {
        pool.release(slot);
    }
    hits
}
