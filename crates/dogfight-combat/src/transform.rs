//! Position plus Euler orientation of a vehicle.

use glam::{EulerRot, Quat, Vec3};

/// World transform. `rotation` holds XYZ Euler angles in radians, matching
/// the wire format. The vehicle's nose points along local `-Z`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    /// World position.
    pub position: Vec3,
    /// Euler angles (radians, XYZ order).
    pub rotation: Vec3,
}

impl Transform {
    /// Transform from position and Euler rotation.
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }

    /// Unrotated transform at `position`.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Vec3::ZERO,
        }
    }

    /// Orientation as a quaternion.
    pub fn orientation(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    /// Unit vector along the vehicle's nose.
    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    /// Map a vehicle-space offset to world space.
    pub fn to_world(&self, offset: Vec3) -> Vec3 {
        self.position + self.orientation() * offset
    }
}
