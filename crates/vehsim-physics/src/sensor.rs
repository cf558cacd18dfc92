//! Sensors attached to vehicles.

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};
use crate::types::{Pose2, SimulContext, Twist2D};

/// Vehicle state handed to sensors after each physics step.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState<'a> {
    /// Vehicle name.
    pub name: &'a str,
    /// Ground-truth pose.
    pub pose: Pose2,
    /// Ground-truth velocity, world frame.
    pub velocity: Twist2D,
    /// Velocity estimated from wheel spin, vehicle frame.
    pub odometry: Twist2D,
}

/// One sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Observation {
    /// Dead-reckoned pose from wheel odometry.
    Odometry {
        /// Simulation time of the reading (s).
        timestamp: f64,
        /// Integrated pose estimate.
        pose: Pose2,
        /// Velocity estimate, vehicle frame.
        twist: Twist2D,
    },
}

/// A sensor updated from the vehicle's simulation hooks.
pub trait Sensor: Send {
    /// Sensor name.
    fn name(&self) -> &str;

    /// Called before the physics step.
    fn simul_pre_timestep(&mut self, _context: &SimulContext, _vehicle: &VehicleState<'_>) {}

    /// Called after the physics step.
    fn simul_post_timestep(&mut self, context: &SimulContext, vehicle: &VehicleState<'_>);

    /// Most recent reading, if any.
    fn last_observation(&self) -> Option<Observation>;
}

/// Sensor parameters as they appear in a world file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorDescriptor {
    /// Sensor kind.
    pub class: String,
    /// Sensor name; defaults to the kind.
    pub name: Option<String>,
    /// Minimum time between readings (s); zero reports every step.
    #[serde(default)]
    pub period: f64,
}

/// Build the sensor described by `desc`.
pub fn sensor_from_descriptor(desc: &SensorDescriptor) -> Result<Box<dyn Sensor>> {
    let name = desc.name.clone().unwrap_or_else(|| desc.class.clone());
    match desc.class.as_str() {
        OdometrySensor::NAME => Ok(Box::new(OdometrySensor::new(name, desc.period))),
        other => Err(PhysicsError::UnknownSensor(other.to_string())),
    }
}

/// Integrates the wheel odometry estimate into a pose.
///
/// Starts at the vehicle pose seen at its first update.
#[derive(Debug, Clone)]
pub struct OdometrySensor {
    name: String,
    period: f64,
    pose: Option<Pose2>,
    last_update: f64,
    last: Option<Observation>,
}

impl OdometrySensor {
    /// Sensor kind used in world files.
    pub const NAME: &'static str = "odometry";

    /// Create an odometry sensor reporting every `period` seconds.
    pub fn new(name: impl Into<String>, period: f64) -> Self {
        Self {
            name: name.into(),
            period: period.max(0.0),
            pose: None,
            last_update: f64::NEG_INFINITY,
            last: None,
        }
    }

    /// Current dead-reckoned pose.
    pub fn pose(&self) -> Option<Pose2> {
        self.pose
    }
}

impl Sensor for OdometrySensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn simul_post_timestep(&mut self, context: &SimulContext, vehicle: &VehicleState<'_>) {
        let pose = self.pose.get_or_insert(vehicle.pose);

        // Exact arc integration over the step.
        let odo = vehicle.odometry;
        let dt = context.dt;
        let dtheta = odo.omega * dt;
        let (dx, dy) = if dtheta.abs() < 1e-9 {
            (odo.vx * dt, odo.vy * dt)
        } else {
            let (s, c) = dtheta.sin_cos();
            let k = 1.0 / odo.omega;
            (
                k * (odo.vx * s - odo.vy * (1.0 - c)),
                k * (odo.vx * (1.0 - c) + odo.vy * s),
            )
        };
        let (s, c) = pose.yaw.sin_cos();
        pose.x += c * dx - s * dy;
        pose.y += s * dx + c * dy;
        pose.yaw += dtheta;
        let pose = *pose;

        let now = context.simul_time + dt;
        if now - self.last_update + 1e-12 >= self.period {
            self.last_update = now;
            self.last = Some(Observation::Odometry {
                timestamp: now,
                pose,
                twist: odo,
            });
        }
    }

    fn last_observation(&self) -> Option<Observation> {
        self.last.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn state(odometry: Twist2D) -> VehicleState<'static> {
        VehicleState {
            name: "r1",
            pose: Pose2::new(1.0, 0.0, 0.0),
            velocity: Twist2D::default(),
            odometry,
        }
    }

    #[test]
    fn test_odometry_straight() {
        let mut sensor = OdometrySensor::new("odo", 0.0);
        let st = state(Twist2D::new(1.0, 0.0, 0.0));
        for i in 0..100 {
            let ctx = SimulContext {
                simul_time: i as f64 * 0.01,
                dt: 0.01,
                gravity: 9.81,
            };
            sensor.simul_post_timestep(&ctx, &st);
        }
        let pose = sensor.pose().unwrap();
        assert_relative_eq!(pose.x, 2.0, epsilon = 1e-9);
        assert_relative_eq!(pose.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_odometry_circle_returns_home() {
        let mut sensor = OdometrySensor::new("odo", 0.0);
        let omega = 1.0;
        let steps = 1000;
        let dt = std::f64::consts::TAU / omega / steps as f64;
        let st = state(Twist2D::new(1.0, 0.0, omega));
        for i in 0..steps {
            let ctx = SimulContext {
                simul_time: i as f64 * dt,
                dt,
                gravity: 9.81,
            };
            sensor.simul_post_timestep(&ctx, &st);
        }
        let pose = sensor.pose().unwrap();
        assert_relative_eq!(pose.x, 1.0, epsilon = 1e-9);
        assert_relative_eq!(pose.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_period_throttles_readings() {
        let mut sensor = OdometrySensor::new("odo", 0.1);
        let st = state(Twist2D::new(1.0, 0.0, 0.0));
        let mut stamps = Vec::new();
        for i in 0..30 {
            let ctx = SimulContext {
                simul_time: i as f64 * 0.01,
                dt: 0.01,
                gravity: 9.81,
            };
            sensor.simul_post_timestep(&ctx, &st);
            if let Some(Observation::Odometry { timestamp, .. }) = sensor.last_observation() {
                if stamps.last() != Some(&timestamp) {
                    stamps.push(timestamp);
                }
            }
        }
        assert_eq!(stamps.len(), 3);
    }

    #[test]
    fn test_factory() {
        let desc = SensorDescriptor {
            class: "odometry".into(),
            name: None,
            period: 0.0,
        };
        assert_eq!(sensor_from_descriptor(&desc).unwrap().name(), "odometry");

        let desc = SensorDescriptor {
            class: "lidar".into(),
            name: None,
            period: 0.0,
        };
        assert!(matches!(
            sensor_from_descriptor(&desc).err(),
            Some(PhysicsError::UnknownSensor(_))
        ));
    }
}
