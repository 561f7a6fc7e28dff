//! Pose value types exchanged with the physics engine and the animation host.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// World-space position `(x, y, z)`.
pub type Vec3 = [f64; 3];

/// Unit quaternion in `(x, y, z, w)` component order.
pub type Quat = [f64; 4];

/// Identity rotation.
pub const QUAT_IDENTITY: Quat = [0.0, 0.0, 0.0, 1.0];

/// A position and orientation at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    /// The identity transform.
    pub const IDENTITY: Pose = Pose {
        position: [0.0; 3],
        orientation: QUAT_IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Check whether this is exactly the identity transform.
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Check that every component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.orientation.iter().all(|v| v.is_finite())
    }

    /// Compose `self * local`: express a pose given relative to this frame
    /// in this frame's parent space.
    ///
    /// Composing with the identity returns `self` unchanged, bit for bit.
    pub fn compose(&self, local: &Pose) -> Pose {
        if local.is_identity() {
            return *self;
        }

        let [x, y, z, w] = self.orientation;
        let rotation = DQuat::from_xyzw(x, y, z, w);
        let [lx, ly, lz, lw] = local.orientation;
        let local_rotation = DQuat::from_xyzw(lx, ly, lz, lw);

        let position = DVec3::from_array(self.position)
            + rotation * DVec3::from_array(local.position);
        let orientation = (rotation * local_rotation).normalize();

        Pose {
            position: position.to_array(),
            orientation: orientation.to_array(),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A single recorded pose of one part.
///
/// `frame_index` is the position of the sample in its part's sequence; it is
/// never stored in the archive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub frame_index: u64,
    pub position: Vec3,
    pub orientation: Quat,
}

impl PoseSample {
    pub fn new(frame_index: u64, pose: Pose) -> Self {
        Self {
            frame_index,
            position: pose.position,
            orientation: pose.orientation,
        }
    }

    /// The sample's pose without its index.
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_identity_is_exact() {
        let pose = Pose::new([-0.0, 1.0e-300, 3.25], [0.1, -0.2, 0.3, 0.9273618495495704]);
        let composed = pose.compose(&Pose::IDENTITY);
        assert_eq!(composed.position[0].to_bits(), (-0.0f64).to_bits());
        assert_eq!(composed, pose);
    }

    #[test]
    fn test_compose_translation_is_rotated() {
        // 90 degrees about Z
        let half = std::f64::consts::FRAC_PI_4;
        let link = Pose::new([1.0, 0.0, 0.0], [0.0, 0.0, half.sin(), half.cos()]);
        let local = Pose::new([1.0, 0.0, 0.0], QUAT_IDENTITY);

        let world = link.compose(&local);
        assert!((world.position[0] - 1.0).abs() < 1e-12);
        assert!((world.position[1] - 1.0).abs() < 1e-12);
        assert!(world.position[2].abs() < 1e-12);
        assert!((world.orientation[2] - half.sin()).abs() < 1e-12);
    }

    #[test]
    fn test_is_finite() {
        assert!(Pose::IDENTITY.is_finite());
        assert!(!Pose::new([f64::NAN, 0.0, 0.0], QUAT_IDENTITY).is_finite());
        assert!(!Pose::new([0.0; 3], [0.0, 0.0, f64::INFINITY, 1.0]).is_finite());
    }
}
