//! Spawn protection volume.

use dogfight_net::ZoneData;
use glam::Vec3;

/// Vertical cylinder inside which no collision is registered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtectionZone {
    /// Centre of the cylinder base.
    pub center: Vec3,
    /// Horizontal radius.
    pub radius: f32,
    /// Ceiling above `center.y`.
    pub height: f32,
}

impl ProtectionZone {
    /// Whether `position` lies inside the cylinder. The base is open, so
    /// anything below the centre but within the radius counts as inside.
    pub fn contains(&self, position: Vec3) -> bool {
        let dx = position.x - self.center.x;
        let dz = position.z - self.center.z;
        dx * dx + dz * dz <= self.radius * self.radius && position.y <= self.center.y + self.height
    }
}

impl From<ZoneData> for ProtectionZone {
    fn from(data: ZoneData) -> Self {
        Self {
            center: data.center.into(),
            radius: data.radius.max(0.0),
            height: data.height,
        }
    }
}
