//! 6-DoF poses for placing visual models.

use nalgebra::{Isometry3, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};


/// A 3D pose as translation plus yaw/pitch/roll (radians).
///
/// The rotation is `Rz(yaw) * Ry(pitch) * Rx(roll)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pose3 {
    /// X translation.
    pub x: f64,
    /// Y translation.
    pub y: f64,
    /// Z translation.
    pub z: f64,
    /// Rotation about Z.
    pub yaw: f64,
    /// Rotation about Y.
    pub pitch: f64,
    /// Rotation about X.
    pub roll: f64,
}

impl Pose3 {
    /// The identity pose.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Pose from a translation and a yaw angle.
    pub fn from_xyz_yaw(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            z,
            yaw,
            ..Self::default()
        }
    }

    /// Convert to an nalgebra isometry.
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(self.x, self.y, self.z),
            UnitQuaternion::from_euler_angles(self.roll, self.pitch, self.yaw),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point3;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity() {
        let p = Point3::new(1.0, -2.0, 3.0);
        assert_eq!(Pose3::identity().to_isometry() * p, p);
    }

    #[test]
    fn test_yaw_then_translate() {
        let pose = Pose3::from_xyz_yaw(1.0, 0.0, 0.5, FRAC_PI_2);
        let q = pose.to_isometry() * Point3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(q.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(q.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(q.z, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_roll_moves_y_into_z() {
        let pose = Pose3 {
            roll: FRAC_PI_2,
            ..Pose3::default()
        };
        let q = pose.to_isometry() * Point3::new(0.0, 1.0, 0.0);
        assert_relative_eq!(q.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(q.y, 0.0, epsilon = 1e-12);
    }
}
