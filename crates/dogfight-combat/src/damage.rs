//! Damage arbitration: who decides whether a hit changes health.
//!
//! Offline, every hit is applied on the spot ([`LocalAuthoritative`]). While
//! connected to a peer, hits on remote vehicles are reported and the peer's
//! broadcast is the only thing that changes their health
//! ([`PeerAuthoritative`]).

use std::fmt;

use dogfight_net::EntityId;
use glam::Vec3;

use crate::collision::Hit;

/// Who simulates the struck vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// The local player's own vehicle.
    LocalPlayer,
    /// An AI vehicle simulated on this machine and unknown to the peer.
    LocalBot,
    /// A vehicle mirrored from the peer.
    Remote,
}

/// Damage to be applied or reported.
#[derive(Debug, Clone, PartialEq)]
pub struct DamageReport {
    /// Vehicle receiving damage.
    pub target: EntityId,
    /// Vehicle credited with the damage, if known.
    pub source: Option<EntityId>,
    /// Health to remove.
    pub amount: f32,
    /// Impact position.
    pub position: Vec3,
}

impl DamageReport {
    /// Report for a projectile hit dealing `amount`.
    pub fn from_hit(hit: &Hit, amount: f32) -> Self {
        Self {
            target: hit.target.clone(),
            source: Some(hit.source.clone()),
            amount,
            position: hit.position,
        }
    }
}

/// Decision for one piece of damage.
#[derive(Debug, Clone, PartialEq)]
pub enum Arbitration {
    /// Subtract `amount` from the target's health now.
    Apply {
        /// Health to remove.
        amount: f32,
    },
    /// Send the report to the peer and wait for its verdict.
    Report(DamageReport),
    /// Leave health untouched.
    Ignore,
}

/// Strategy deciding what a detected hit does.
pub trait DamageArbitrationPolicy: fmt::Debug + Send {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Scale applied to damage this machine applies on its own authority.
    fn direct_damage_multiplier(&self) -> f32;

    /// Decide what happens to `report` given who simulates the target.
    fn arbitrate(&self, report: DamageReport, target: TargetKind) -> Arbitration;
}

/// Offline policy: all damage applies immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAuthoritative;

impl DamageArbitrationPolicy for LocalAuthoritative {
    fn name(&self) -> &'static str {
        "local-authoritative"
    }

    fn direct_damage_multiplier(&self) -> f32 {
        1.0
    }

    fn arbitrate(&self, report: DamageReport, _target: TargetKind) -> Arbitration {
        Arbitration::Apply {
            amount: report.amount * self.direct_damage_multiplier(),
        }
    }
}

/// Connected policy: the peer owns the health of every player.
///
/// Hits on remote vehicles are reported. Hits on the local player are
/// ignored because the peer broadcasts the authoritative result. Local bots
/// are invisible to the peer, so their damage still applies here.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerAuthoritative;

impl DamageArbitrationPolicy for PeerAuthoritative {
    fn name(&self) -> &'static str {
        "peer-authoritative"
    }

    fn direct_damage_multiplier(&self) -> f32 {
        0.0
    }

    fn arbitrate(&self, report: DamageReport, target: TargetKind) -> Arbitration {
        match target {
            TargetKind::Remote => Arbitration::Report(report),
            TargetKind::LocalPlayer => Arbitration::Ignore,
            TargetKind::LocalBot => Arbitration::Apply {
                amount: report.amount,
            },
        }
    }
}
