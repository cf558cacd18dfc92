//! Planar kinematic state types.

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

/// A 2D vector (m, m/s or N depending on context).
pub type Vec2 = Vector2<f64>;

/// Planar pose: position plus heading (radians).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2 {
    /// X position (m).
    pub x: f64,
    /// Y position (m).
    pub y: f64,
    /// Heading (rad).
    pub yaw: f64,
}

impl Pose2 {
    /// Create a pose.
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }
}

/// Planar velocity: linear `(vx, vy)` and angular `omega`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist2D {
    /// Velocity along X (m/s).
    pub vx: f64,
    /// Velocity along Y (m/s).
    pub vy: f64,
    /// Angular velocity (rad/s).
    pub omega: f64,
}

impl Twist2D {
    /// Create a twist.
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }

    /// Rotate the linear part by `angle`; `omega` is frame independent.
    pub fn rotated(&self, angle: f64) -> Self {
        let v = Rotation2::new(angle) * Vec2::new(self.vx, self.vy);
        Self {
            vx: v.x,
            vy: v.y,
            omega: self.omega,
        }
    }
}

/// Timing information handed to every per-step hook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulContext {
    /// Simulation time at the start of the step (s).
    pub simul_time: f64,
    /// Step length (s).
    pub dt: f64,
    /// Gravity acceleration (m/s²).
    pub gravity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_twist_rotation_round_trip() {
        let t = Twist2D::new(1.0, 0.5, 0.2);
        let back = t.rotated(0.7).rotated(-0.7);
        assert_relative_eq!(back.vx, t.vx, epsilon = 1e-12);
        assert_relative_eq!(back.vy, t.vy, epsilon = 1e-12);
        assert_eq!(back.omega, t.omega);
    }
}
