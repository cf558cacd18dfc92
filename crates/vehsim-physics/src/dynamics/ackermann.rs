//! Ackermann steering: car-like vehicles with two steered front wheels.

use crate::controller::{ControllerCommand, PidController};
use crate::error::{PhysicsError, Result};
use crate::types::{SimulContext, Twist2D};
use crate::wheel::Wheel;
use vehsim_shape::Polygon2;

use super::{invalid, mean_rolling_speed, DynamicsDescriptor, VehicleDynamics};

const REAR_LEFT: usize = 0;
const REAR_RIGHT: usize = 1;
const FRONT_LEFT: usize = 2;
const FRONT_RIGHT: usize = 3;

/// Forward speeds below this (m/s) do not steer in twist mode.
const MIN_STEER_SPEED: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq)]
enum Controller {
    Raw {
        torques: [f64; 4],
        steer: f64,
    },
    TwistPid {
        vx: f64,
        omega: f64,
        rear_left: PidController,
        rear_right: PidController,
    },
}

/// Car-like drivetrain.
///
/// Wheel order is rear-left, rear-right, front-left, front-right. Steering
/// is expressed as the angle of a virtual wheel centered on the front axle;
/// each front wheel gets its own angle so all wheel axes meet at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct AckermannDynamics {
    max_steer_ang: f64,
    steer: f64,
    controller: Controller,
}

impl Default for AckermannDynamics {
    fn default() -> Self {
        Self {
            max_steer_ang: 30f64.to_radians(),
            steer: 0.0,
            controller: Controller::Raw {
                torques: [0.0; 4],
                steer: 0.0,
            },
        }
    }
}

impl AckermannDynamics {
    /// Registered name.
    pub const NAME: &'static str = "ackermann";

    /// Steering limit (rad).
    pub fn max_steer_ang(&self) -> f64 {
        self.max_steer_ang
    }

    /// Equivalent steering angle applied at the last step (rad).
    pub fn steer(&self) -> f64 {
        self.steer
    }
}

/// Front wheel angles `(left, right)` realizing the equivalent steering
/// angle `steer` for a track `w` and wheelbase `l`.
pub fn compute_front_wheel_angles(steer: f64, w: f64, l: f64) -> (f64, f64) {
    if steer.abs() < 1e-9 || l <= 0.0 {
        return (0.0, 0.0);
    }
    let cot = 1.0 / steer.tan();
    let k = w / (2.0 * l);
    ((1.0 / (cot - k)).atan(), (1.0 / (cot + k)).atan())
}

fn track_and_wheelbase(wheels: &[Wheel]) -> (f64, f64) {
    match (wheels.get(REAR_LEFT), wheels.get(FRONT_LEFT), wheels.get(FRONT_RIGHT)) {
        (Some(rl), Some(fl), Some(fr)) => (fl.y - fr.y, fl.x - rl.x),
        _ => (0.0, 0.0),
    }
}

impl VehicleDynamics for AckermannDynamics {
    fn class_name(&self) -> &'static str {
        Self::NAME
    }

    fn default_wheels(&self) -> Vec<Wheel> {
        vec![
            Wheel::new(0.0, 0.5),
            Wheel::new(0.0, -0.5),
            Wheel::new(1.3, 0.5),
            Wheel::new(1.3, -0.5),
        ]
    }

    fn default_chassis(&self) -> Polygon2 {
        Polygon2::from_xy(&[
            [-0.8, -1.0],
            [-0.8, 1.0],
            [1.5, 0.9],
            [1.8, 0.8],
            [1.8, -0.8],
            [1.5, -0.9],
        ])
    }

    fn load_params(&mut self, vehicle: &str, desc: &DynamicsDescriptor, wheels: &[Wheel]) -> Result<()> {
        let (w, l) = track_and_wheelbase(wheels);
        if l <= 0.0 {
            return Err(invalid(vehicle, "front axle must lie ahead of the rear axle"));
        }
        if w <= 0.0 {
            return Err(invalid(vehicle, "front-left wheel must lie left of front-right"));
        }
        if let Some(deg) = desc.max_steer_ang_deg {
            if !(deg > 0.0 && deg < 90.0) {
                return Err(invalid(vehicle, format!("max_steer_ang_deg {deg} outside (0, 90)")));
            }
            self.max_steer_ang = deg.to_radians();
        }

        let Some(ctrl) = &desc.controller else {
            return Ok(());
        };
        self.controller = match ctrl.class.as_str() {
            "raw" => Controller::Raw {
                torques: [0.0; 4],
                steer: 0.0,
            },
            "twist_pid" => {
                let mut pid = PidController::default();
                pid.configure(ctrl);
                Controller::TwistPid {
                    vx: 0.0,
                    omega: 0.0,
                    rear_left: pid.clone(),
                    rear_right: pid,
                }
            }
            other => {
                return Err(PhysicsError::UnknownController {
                    dynamics: Self::NAME.to_string(),
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
            (
                Controller::Raw { torques, steer },
                ControllerCommand::AckermannTorques {
                    rear_left,
                    rear_right,
                    front_left,
                    front_right,
                    steer: s,
                },
            ) => {
                *torques = [rear_left, rear_right, front_left, front_right];
                *steer = s;
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
        let (w, l) = track_and_wheelbase(wheels);

        let (desired_steer, wheel_torques) = match &mut self.controller {
            Controller::Raw { torques, steer } => (*steer, *torques),
            Controller::TwistPid {
                vx,
                omega,
                rear_left,
                rear_right,
            } => {
                let steer = if vx.abs() > MIN_STEER_SPEED {
                    (*omega * l / *vx).atan()
                } else {
                    0.0
                };
                let mut out = [0.0; 4];
                for (idx, pid) in [(REAR_LEFT, rear_left), (REAR_RIGHT, rear_right)] {
                    if let Some(wheel) = wheels.get(idx) {
                        let target = *vx - *omega * wheel.y;
                        out[idx] = pid.compute(target - wheel.rolling_speed(), context.dt);
                    }
                }
                (steer, out)
            }
        };

        self.steer = desired_steer.clamp(-self.max_steer_ang, self.max_steer_ang);
        let (fl, fr) = compute_front_wheel_angles(self.steer, w, l);
        if let Some(wheel) = wheels.get_mut(FRONT_LEFT) {
            wheel.yaw = fl;
        }
        if let Some(wheel) = wheels.get_mut(FRONT_RIGHT) {
            wheel.yaw = fr;
        }

        for (t, wt) in torques.iter_mut().zip(wheel_torques) {
            *t = wt;
        }
    }

    fn velocity_local_odo_estimate(&self, wheels: &[Wheel]) -> Twist2D {
        let (_, l) = track_and_wheelbase(wheels);
        let vx = mean_rolling_speed(wheels, &[REAR_LEFT, REAR_RIGHT]);
        let omega = if l > 0.0 { vx * self.steer.tan() / l } else { 0.0 };
        Twist2D::new(vx, 0.0, omega)
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

    #[test]
    fn test_inner_wheel_steers_more() {
        let (fl, fr) = compute_front_wheel_angles(0.3, 1.0, 1.3);
        assert!(fl > 0.3 && fr < 0.3 && fr > 0.0);
        let (fl, fr) = compute_front_wheel_angles(-0.3, 1.0, 1.3);
        assert!(fr < -0.3 && fl > -0.3 && fl < 0.0);
    }

    #[test]
    fn test_straight_ahead() {
        assert_eq!(compute_front_wheel_angles(0.0, 1.0, 1.3), (0.0, 0.0));
    }

    #[test]
    fn test_raw_steering_is_clamped() {
        let mut dynamics = AckermannDynamics::default();
        let mut wheels = dynamics.default_wheels();
        dynamics
            .set_command(ControllerCommand::AckermannTorques {
                rear_left: 1.0,
                rear_right: 1.0,
                front_left: 0.0,
                front_right: 0.0,
                steer: 1.2,
            })
            .unwrap();
        let mut torques = vec![0.0; 4];
        dynamics.invoke_motor_controllers(&ctx(), &mut wheels, &mut torques);

        assert_relative_eq!(dynamics.steer(), 30f64.to_radians(), epsilon = 1e-12);
        assert!(wheels[FRONT_LEFT].yaw > wheels[FRONT_RIGHT].yaw);
        assert_eq!(wheels[REAR_LEFT].yaw, 0.0);
        assert_eq!(torques, vec![1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_odometry_uses_steer_and_wheelbase() {
        let mut dynamics = AckermannDynamics::default();
        let mut wheels = dynamics.default_wheels();
        dynamics
            .set_command(ControllerCommand::AckermannTorques {
                rear_left: 0.0,
                rear_right: 0.0,
                front_left: 0.0,
                front_right: 0.0,
                steer: 0.2,
            })
            .unwrap();
        dynamics.invoke_motor_controllers(&ctx(), &mut wheels, &mut [0.0; 4]);
        wheels[REAR_LEFT].set_w(5.0);
        wheels[REAR_RIGHT].set_w(5.0);

        let odo = dynamics.velocity_local_odo_estimate(&wheels);
        assert_relative_eq!(odo.vx, 1.0, epsilon = 1e-12);
        assert_relative_eq!(odo.omega, 0.2f64.tan() / 1.3, epsilon = 1e-12);
    }

    #[test]
    fn test_twist_pid_steers_toward_turn() {
        let mut dynamics = AckermannDynamics::default();
        let mut wheels = dynamics.default_wheels();
        let desc = DynamicsDescriptor {
            class: "ackermann".into(),
            controller: Some(ControllerDescriptor {
                class: "twist_pid".into(),
                command: Some(ControllerCommand::Twist { vx: 1.0, omega: 0.3 }),
                ..Default::default()
            }),
            ..Default::default()
        };
        dynamics.load_params("car", &desc, &wheels).unwrap();

        let mut torques = vec![0.0; 4];
        dynamics.invoke_motor_controllers(&ctx(), &mut wheels, &mut torques);
        assert_relative_eq!(dynamics.steer(), (0.3f64 * 1.3).atan(), epsilon = 1e-12);
        assert!(torques[REAR_LEFT] > 0.0 && torques[REAR_RIGHT] > 0.0);
        assert_eq!(torques[FRONT_LEFT], 0.0);
    }

    #[test]
    fn test_invalid_geometry() {
        let mut dynamics = AckermannDynamics::default();
        let mut wheels = dynamics.default_wheels();
        wheels[FRONT_LEFT].x = -1.0;
        let err = dynamics
            .load_params("car", &DynamicsDescriptor::default(), &wheels)
            .unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidDescriptor { .. }));
    }

    #[test]
    fn test_invalid_steer_limit() {
        let mut dynamics = AckermannDynamics::default();
        let wheels = dynamics.default_wheels();
        let desc = DynamicsDescriptor {
            max_steer_ang_deg: Some(95.0),
            ..Default::default()
        };
        assert!(dynamics.load_params("car", &desc, &wheels).is_err());
    }
}
