//! Motor controller building blocks shared by the drivetrains.

use serde::{Deserialize, Serialize};

/// A setpoint sent to a vehicle's active controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerCommand {
    /// Left and right motor torques (N·m) for differential drives.
    SideTorques {
        /// Torque on every left wheel.
        left: f64,
        /// Torque on every right wheel.
        right: f64,
    },
    /// Per-wheel torques (N·m) and equivalent steering angle (rad) for
    /// Ackermann drives.
    AckermannTorques {
        /// Rear-left torque.
        rear_left: f64,
        /// Rear-right torque.
        rear_right: f64,
        /// Front-left torque.
        front_left: f64,
        /// Front-right torque.
        front_right: f64,
        /// Equivalent steering angle of a virtual central front wheel.
        steer: f64,
    },
    /// Target chassis velocity: forward speed (m/s) and turn rate (rad/s).
    Twist {
        /// Forward speed.
        vx: f64,
        /// Turn rate.
        omega: f64,
    },
}

impl ControllerCommand {
    /// Short command name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SideTorques { .. } => "side_torques",
            Self::AckermannTorques { .. } => "ackermann_torques",
            Self::Twist { .. } => "twist",
        }
    }
}

/// Controller parameters as they appear in a world file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerDescriptor {
    /// Controller name (`raw` or `twist_pid`).
    pub class: String,
    /// Proportional gain.
    pub kp: Option<f64>,
    /// Integral gain.
    pub ki: Option<f64>,
    /// Derivative gain.
    pub kd: Option<f64>,
    /// Torque limit (N·m).
    pub max_torque: Option<f64>,
    /// Initial setpoint.
    pub command: Option<ControllerCommand>,
}

/// Incremental PID controller with output saturation.
///
/// Works on the output increment, so clamping the output is enough to stop
/// integral windup.
#[derive(Debug, Clone, PartialEq)]
pub struct PidController {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Output magnitude limit; zero or negative disables it.
    pub max_out: f64,
    last_output: f64,
    e_n: f64,
    e_n_1: f64,
    e_n_2: f64,
}

impl Default for PidController {
    fn default() -> Self {
        Self::new(100.0, 5.0, 0.0, 100.0)
    }
}

impl PidController {
    /// Create a controller.
    pub fn new(kp: f64, ki: f64, kd: f64, max_out: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            max_out,
            last_output: 0.0,
            e_n: 0.0,
            e_n_1: 0.0,
            e_n_2: 0.0,
        }
    }

    /// Apply the gains and limit set in `desc`.
    pub fn configure(&mut self, desc: &ControllerDescriptor) {
        if let Some(kp) = desc.kp {
            self.kp = kp;
        }
        if let Some(ki) = desc.ki {
            self.ki = ki;
        }
        if let Some(kd) = desc.kd {
            self.kd = kd;
        }
        if let Some(max) = desc.max_torque {
            self.max_out = max;
        }
    }

    /// Feed the current error and return the new output.
    pub fn compute(&mut self, err: f64, dt: f64) -> f64 {
        self.e_n_2 = self.e_n_1;
        self.e_n_1 = self.e_n;
        self.e_n = err;

        let mut output = self.last_output
            + self.kp * (self.e_n - self.e_n_1)
            + self.ki * self.e_n * dt
            + self.kd * (self.e_n - 2.0 * self.e_n_1 + self.e_n_2) / dt;

        if self.max_out > 0.0 {
            output = output.clamp(-self.max_out, self.max_out);
        }
        self.last_output = output;
        output
    }
}
