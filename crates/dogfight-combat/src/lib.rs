//! Combat resolution: pooled projectiles with convergence aiming, weapon
//! heat, per-tick collision, damage arbitration policies, and the
//! destruction/free-fall life cycle of vehicles.

pub mod ballistics;
pub mod collision;
pub mod damage;
pub mod effects;
pub mod heat;
pub mod projectile;
pub mod transform;
pub mod vitals;
pub mod zone;

pub use ballistics::{BallisticsEngine, FireOutcome, MOUNT_COUNT};
pub use collision::{CollisionTarget, Hit, detect_hits};
pub use damage::{
    Arbitration, DamageArbitrationPolicy, DamageReport, LocalAuthoritative, PeerAuthoritative,
    TargetKind,
};
pub use effects::{HitEffect, HitEffectPool};
pub use heat::{FireBlocked, HeatEvent, HeatState, WeaponHeat};
pub use projectile::{Projectile, ProjectilePool};
pub use transform::Transform;
pub use vitals::{DamageOutcome, FreeFallTuning, LifeState, Vitals, random_tumble};
pub use zone::ProtectionZone;
