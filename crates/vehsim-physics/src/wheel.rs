//! Wheel geometry and spin state.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::types::{Twist2D, Vec2};

/// Spin angles beyond this magnitude (rad) are wrapped back into one turn.
pub const PHI_WRAP_THRESHOLD: f64 = 1e4;

/// Wheel parameters as they appear in a world file. Unset fields keep the
/// drivetrain's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WheelDescriptor {
    /// Position along the vehicle X axis (m).
    pub x: Option<f64>,
    /// Position along the vehicle Y axis (m).
    pub y: Option<f64>,
    /// Mounting angle relative to the chassis (deg).
    pub yaw_deg: Option<f64>,
    /// Diameter (m).
    pub diameter: Option<f64>,
    /// Width (m).
    pub width: Option<f64>,
    /// Mass (kg).
    pub mass: Option<f64>,
}

/// One wheel of a vehicle, in the chassis frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Wheel {
    /// Position along the vehicle X axis (m).
    pub x: f64,
    /// Position along the vehicle Y axis (m).
    pub y: f64,
    /// Steering angle relative to the chassis (rad).
    pub yaw: f64,
    /// Diameter (m).
    pub diameter: f64,
    /// Width (m).
    pub width: f64,
    /// Mass (kg).
    pub mass: f64,
    inertia: f64,
    phi: f64,
    w: f64,
}

impl Default for Wheel {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl Wheel {
    /// Wheel at `(x, y)` with default size (0.4 m diameter, 0.2 m wide, 2 kg).
    pub fn new(x: f64, y: f64) -> Self {
        let mut wheel = Self {
            x,
            y,
            yaw: 0.0,
            diameter: 0.4,
            width: 0.2,
            mass: 2.0,
            inertia: 0.0,
            phi: 0.0,
            w: 0.0,
        };
        wheel.recalc_inertia();
        wheel
    }

    /// Overwrite the parameters set in `desc`.
    pub fn apply_descriptor(&mut self, desc: &WheelDescriptor) {
        if let Some(x) = desc.x {
            self.x = x;
        }
        if let Some(y) = desc.y {
            self.y = y;
        }
        if let Some(yaw) = desc.yaw_deg {
            self.yaw = yaw.to_radians();
        }
        if let Some(d) = desc.diameter {
            self.diameter = d;
        }
        if let Some(w) = desc.width {
            self.width = w;
        }
        if let Some(m) = desc.mass {
            self.mass = m;
        }
        self.recalc_inertia();
    }

    /// Recompute the spin inertia after a size or mass change.
    ///
    /// Solid disc about its axle: `m r² / 2`.
    pub fn recalc_inertia(&mut self) {
        let r = self.radius();
        self.inertia = 0.5 * self.mass * r * r;
    }

    /// Radius (m).
    pub fn radius(&self) -> f64 {
        self.diameter * 0.5
    }

    /// Spin inertia about the axle (kg·m²).
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Spin angle (rad).
    pub fn phi(&self) -> f64 {
        self.phi
    }

    /// Set the spin angle.
    pub fn set_phi(&mut self, phi: f64) {
        self.phi = phi;
    }

    /// Spin rate (rad/s). Positive rolls the vehicle forward.
    pub fn w(&self) -> f64 {
        self.w
    }

    /// Set the spin rate.
    pub fn set_w(&mut self, w: f64) {
        self.w = w;
    }

    /// Explicit Euler step of the spin angle, wrapping runaway values.
    pub fn integrate_phi(&mut self, dt: f64) {
        self.phi += self.w * dt;
        let abs_phi = self.phi.abs();
        if abs_phi > PHI_WRAP_THRESHOLD {
            self.phi = (abs_phi % TAU).copysign(self.phi);
        }
    }

    /// Velocity of the wheel center in the chassis frame, given the chassis
    /// velocity in that same frame.
    pub fn velocity_local(&self, vehicle_vel_local: &Twist2D) -> Vec2 {
        let omega = vehicle_vel_local.omega;
        Vec2::new(
            vehicle_vel_local.vx - omega * self.y,
            vehicle_vel_local.vy + omega * self.x,
        )
    }

    /// Ground speed implied by the current spin rate (m/s).
    pub fn rolling_speed(&self) -> f64 {
        self.w * self.radius()
    }
}
