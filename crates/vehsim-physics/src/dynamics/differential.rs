//! Differential drive: two independently driven sides, no steering.

use crate::controller::{ControllerCommand, PidController};
use crate::error::{PhysicsError, Result};
use crate::types::{SimulContext, Twist2D};
use crate::wheel::Wheel;

use super::{invalid, mean_rolling_speed, mean_y, DynamicsDescriptor, VehicleDynamics};

/// Minimum left/right wheel separation (m).
const MIN_TRACK: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    TwoWheels,
    FourWheels,
}

impl Layout {
    fn left(self) -> &'static [usize] {
        match self {
            Self::TwoWheels => &[0],
            Self::FourWheels => &[0, 2],
        }
    }

    fn right(self) -> &'static [usize] {
        match self {
            Self::TwoWheels => &[1],
            Self::FourWheels => &[1, 3],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Controller {
    Raw {
        left: f64,
        right: f64,
    },
    TwistPid {
        vx: f64,
        omega: f64,
        left: PidController,
        right: PidController,
    },
}

/// Skid-steer drivetrain.
///
/// Wheel order is left, right for two wheels and rear-left, rear-right,
/// front-left, front-right for four. All wheels of a side get the same
/// torque.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferentialDynamics {
    layout: Layout,
    controller: Controller,
}

impl DifferentialDynamics {
    /// Name of the two-wheel variant.
    pub const NAME: &'static str = "differential";
    /// Name of the four-wheel variant.
    pub const NAME_4_WHEELS: &'static str = "differential_4_wheels";

    /// Two driven wheels.
    pub fn two_wheels() -> Self {
        Self {
            layout: Layout::TwoWheels,
            controller: Controller::Raw { left: 0.0, right: 0.0 },
        }
    }

    /// Four driven wheels.
    pub fn four_wheels() -> Self {
        Self {
            layout: Layout::FourWheels,
            ..Self::two_wheels()
        }
    }
}

impl VehicleDynamics for DifferentialDynamics {
    fn class_name(&self) -> &'static str {
        match self.layout {
            Layout::TwoWheels => Self::NAME,
            Layout::FourWheels => Self::NAME_4_WHEELS,
        }
    }

    fn default_wheels(&self) -> Vec<Wheel> {
        match self.layout {
            Layout::TwoWheels => vec![Wheel::new(0.0, 0.5), Wheel::new(0.0, -0.5)],
            Layout::FourWheels => vec![
                Wheel::new(-0.5, 0.5),
                Wheel::new(-0.5, -0.5),
                Wheel::new(0.5, 0.5),
                Wheel::new(0.5, -0.5),
            ],
        }
    }

    fn load_params(&mut self, vehicle: &str, desc: &DynamicsDescriptor, wheels: &[Wheel]) -> Result<()> {
        let track = mean_y(wheels, self.layout.left()) - mean_y(wheels, self.layout.right());
        if track.abs() < MIN_TRACK {
            return Err(invalid(vehicle, "left and right wheels share the same Y"));
        }

        let Some(ctrl) = &desc.controller else {
            return Ok(());
        };
        self.controller = match ctrl.class.as_str() {
            "raw" => Controller::Raw { left: 0.0, right: 0.0 },
            "twist_pid" => {
                let mut pid = PidController::default();
                pid.configure(ctrl);
                Controller::TwistPid {
                    vx: 0.0,
                    omega: 0.0,
                    left: pid.clone(),
                    right: pid,
                }
            }
            other => {
                return Err(PhysicsError::UnknownController {
                    dynamics: self.class_name().to_string(),
                    controller: other.to_string(),
                })
            }
        };
        if let Some(command) = ctrl.command {
            self.set_command(command)?;
        }
        Ok(())
    }

    fn controller_name(&self) -> &'static str {
        match self.controller {
            Controller::Raw { .. } => "raw",
            Controller::TwistPid { .. } => "twist_pid",
        }
    }

    fn set_command(&mut self, command: ControllerCommand) -> Result<()> {
        let controller = self.controller_name();
        match (&mut self.controller, command) {
            (Controller::Raw { left, right }, ControllerCommand::SideTorques { left: l, right: r }) => {
                *left = l;
                *right = r;
            }
            (Controller::TwistPid { vx, omega, .. }, ControllerCommand::Twist { vx: v, omega: w }) => {
                *vx = v;
                *omega = w;
            }
            _ => {
                return Err(PhysicsError::UnsupportedCommand {
                    controller: controller.to_string(),
                    command: command.kind().to_string(),
                })
            }
        }
        Ok(())
    }

    fn invoke_motor_controllers(&mut self, context: &SimulContext, wheels: &mut [Wheel], torques: &mut [f64]) {
        let odo = self.velocity_local_odo_estimate(wheels);
        let (left_ids, right_ids) = (self.layout.left(), self.layout.right());

        let (t_left, t_right) = match &mut self.controller {
            Controller::Raw { left, right } => (*left, *right),
            Controller::TwistPid {
                vx,
                omega,
                left,
                right,
            } => {
                let y_l = mean_y(wheels, left_ids);
                let y_r = mean_y(wheels, right_ids);
                let err_l = (*vx - *omega * y_l) - (odo.vx - odo.omega * y_l);
                let err_r = (*vx - *omega * y_r) - (odo.vx - odo.omega * y_r);
                (
                    left.compute(err_l, context.dt),
                    right.compute(err_r, context.dt),
                )
            }
        };

        for (ids, torque) in [(left_ids, t_left), (right_ids, t_right)] {
            for &i in ids {
                if let Some(t) = torques.get_mut(i) {
                    *t = torque;
                }
            }
        }
    }

    fn velocity_local_odo_estimate(&self, wheels: &[Wheel]) -> Twist2D {
        let (left, right) = (self.layout.left(), self.layout.right());
        let v_l = mean_rolling_speed(wheels, left);
        let v_r = mean_rolling_speed(wheels, right);
        let track = mean_y(wheels, left) - mean_y(wheels, right);

        let omega = if track.abs() < MIN_TRACK {
            0.0
        } else {
            (v_r - v_l) / track
        };
        Twist2D::new(0.5 * (v_l + v_r), 0.0, omega)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerDescriptor;
    use approx::assert_relative_eq;

    fn ctx() -> SimulContext {
        SimulContext {
            simul_time: 0.0,
            dt: 0.01,
            gravity: 9.81,
        }
    }

    fn twist_pid_desc() -> DynamicsDescriptor {
        DynamicsDescriptor {
            class: "differential".into(),
            controller: Some(ControllerDescriptor {
                class: "twist_pid".into(),
                command: Some(ControllerCommand::Twist { vx: 1.0, omega: 0.0 }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_odometry_straight_line() {
        let dynamics = DifferentialDynamics::two_wheels();
        let mut wheels = dynamics.default_wheels();
        for w in &mut wheels {
            w.set_w(5.0);
        }
        let odo = dynamics.velocity_local_odo_estimate(&wheels);
        assert_relative_eq!(odo.vx, 1.0, epsilon = 1e-12);
        assert_relative_eq!(odo.omega, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_odometry_turning() {
        let dynamics = DifferentialDynamics::two_wheels();
        let mut wheels = dynamics.default_wheels();
        wheels[0].set_w(-5.0);
        wheels[1].set_w(5.0);
        let odo = dynamics.velocity_local_odo_estimate(&wheels);
        assert_relative_eq!(odo.vx, 0.0, epsilon = 1e-12);
        // Right side forward, left side backward: spin counter-clockwise.
        assert_relative_eq!(odo.omega, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_four_wheel_odometry_averages_sides() {
        let dynamics = DifferentialDynamics::four_wheels();
        let mut wheels = dynamics.default_wheels();
        wheels[0].set_w(4.0);
        wheels[2].set_w(6.0);
        wheels[1].set_w(5.0);
        wheels[3].set_w(5.0);
        let odo = dynamics.velocity_local_odo_estimate(&wheels);
        assert_relative_eq!(odo.vx, 1.0, epsilon = 1e-12);
        assert_relative_eq!(odo.omega, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_raw_torques_per_side() {
        let mut dynamics = DifferentialDynamics::four_wheels();
        let mut wheels = dynamics.default_wheels();
        dynamics
            .set_command(ControllerCommand::SideTorques { left: 1.0, right: -2.0 })
            .unwrap();
        let mut torques = vec![0.0; 4];
        dynamics.invoke_motor_controllers(&ctx(), &mut wheels, &mut torques);
        assert_eq!(torques, vec![1.0, -2.0, 1.0, -2.0]);
    }

    #[test]
    fn test_twist_pid_accelerates_forward() {
        let mut dynamics = DifferentialDynamics::two_wheels();
        let mut wheels = dynamics.default_wheels();
        dynamics.load_params("r1", &twist_pid_desc(), &wheels).unwrap();
        assert_eq!(dynamics.controller_name(), "twist_pid");

        let mut torques = vec![0.0; 2];
        dynamics.invoke_motor_controllers(&ctx(), &mut wheels, &mut torques);
        assert!(torques[0] > 0.0);
        assert_relative_eq!(torques[0], torques[1], epsilon = 1e-12);
    }

    #[test]
    fn test_command_mismatch_rejected() {
        let mut dynamics = DifferentialDynamics::two_wheels();
        let err = dynamics
            .set_command(ControllerCommand::Twist { vx: 1.0, omega: 0.0 })
            .unwrap_err();
        assert!(matches!(err, PhysicsError::UnsupportedCommand { .. }));
    }

    #[test]
    fn test_unknown_controller() {
        let mut dynamics = DifferentialDynamics::two_wheels();
        let wheels = dynamics.default_wheels();
        let mut desc = twist_pid_desc();
        desc.controller.as_mut().unwrap().class = "mpc".into();
        let err = dynamics.load_params("r1", &desc, &wheels).unwrap_err();
        assert!(matches!(err, PhysicsError::UnknownController { controller, .. } if controller == "mpc"));
    }

    #[test]
    fn test_zero_track_rejected() {
        let mut dynamics = DifferentialDynamics::two_wheels();
        let wheels = vec![Wheel::new(0.0, 0.0), Wheel::new(0.0, 0.0)];
        assert!(dynamics
            .load_params("r1", &DynamicsDescriptor::default(), &wheels)
            .is_err());
    }
}
