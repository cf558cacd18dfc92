//! Drivetrains: wheel layout, motor controllers and odometry per vehicle
//! dynamics class.
//!
//! A drivetrain is selected by name from a [`DynamicsRegistry`]. The
//! registry is built explicitly by the world; applications can register
//! their own classes before loading vehicles.

mod ackermann;
mod differential;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vehsim_shape::Polygon2;

use crate::controller::{ControllerCommand, ControllerDescriptor};
use crate::error::{PhysicsError, Result};
use crate::types::{SimulContext, Twist2D};
use crate::wheel::{Wheel, WheelDescriptor};

pub use ackermann::{compute_front_wheel_angles, AckermannDynamics};
pub use differential::DifferentialDynamics;

/// Drivetrain parameters as they appear in a world file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DynamicsDescriptor {
    /// Registered drivetrain name.
    pub class: String,
    /// Per-wheel overrides, in the drivetrain's wheel order. Either empty or
    /// exactly one entry per wheel.
    #[serde(default)]
    pub wheels: Vec<WheelDescriptor>,
    /// Motor controller selection and gains.
    pub controller: Option<ControllerDescriptor>,
    /// Steering limit for steered drivetrains (deg).
    pub max_steer_ang_deg: Option<f64>,
}

/// The behavior a concrete drivetrain plugs into a vehicle.
///
/// The wheel count is fixed by [`VehicleDynamics::default_wheels`]; the
/// vehicle never adds or removes wheels afterwards.
pub trait VehicleDynamics: Send {
    /// Registered name.
    fn class_name(&self) -> &'static str;

    /// Wheel layout with default geometry. Its length is the vehicle's
    /// wheel count.
    fn default_wheels(&self) -> Vec<Wheel>;

    /// Chassis footprint used when the world file gives none.
    fn default_chassis(&self) -> Polygon2 {
        default_chassis_polygon()
    }

    /// Read drivetrain specific parameters and select the controller.
    /// `wheels` already carries the descriptor's per-wheel overrides.
    fn load_params(&mut self, vehicle: &str, desc: &DynamicsDescriptor, wheels: &[Wheel]) -> Result<()>;

    /// Name of the active controller.
    fn controller_name(&self) -> &'static str;

    /// Send a new setpoint to the active controller.
    fn set_command(&mut self, command: ControllerCommand) -> Result<()>;

    /// Compute this step's motor torque for every wheel (N·m, positive
    /// forward). May also steer wheels.
    fn invoke_motor_controllers(&mut self, context: &SimulContext, wheels: &mut [Wheel], torques: &mut [f64]);

    /// Chassis velocity in its own frame, estimated from wheel spin only.
    fn velocity_local_odo_estimate(&self, wheels: &[Wheel]) -> Twist2D;
}

/// Footprint of a small generic robot (m).
pub fn default_chassis_polygon() -> Polygon2 {
    Polygon2::from_xy(&[
        [-0.4, -0.5],
        [-0.4, 0.5],
        [0.4, 0.5],
        [0.6, 0.3],
        [0.6, -0.3],
        [0.4, -0.5],
    ])
}

/// Creates a fresh drivetrain instance.
pub type DynamicsConstructor = fn() -> Box<dyn VehicleDynamics>;

/// Name to constructor table for drivetrains.
#[derive(Debug, Clone, Default)]
pub struct DynamicsRegistry {
    constructors: HashMap<String, DynamicsConstructor>,
}

impl DynamicsRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the drivetrains shipped with this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(DifferentialDynamics::NAME, || Box::new(DifferentialDynamics::two_wheels()));
        registry.register(DifferentialDynamics::NAME_4_WHEELS, || {
            Box::new(DifferentialDynamics::four_wheels())
        });
        registry.register(AckermannDynamics::NAME, || Box::new(AckermannDynamics::default()));
        registry
    }

    /// Register or replace a drivetrain.
    pub fn register(&mut self, name: &str, constructor: DynamicsConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }

    /// Instantiate the drivetrain registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn VehicleDynamics>> {
        self.constructors
            .get(name)
            .map(|ctor| ctor())
            .ok_or_else(|| PhysicsError::UnknownDynamics(name.to_string()))
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Mean Y of the wheels at `indices`.
pub(crate) fn mean_y(wheels: &[Wheel], indices: &[usize]) -> f64 {
    mean(indices.iter().filter_map(|&i| wheels.get(i)).map(|w| w.y))
}

/// Mean rolling speed of the wheels at `indices`.
pub(crate) fn mean_rolling_speed(wheels: &[Wheel], indices: &[usize]) -> f64 {
    mean(indices.iter().filter_map(|&i| wheels.get(i)).map(Wheel::rolling_speed))
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

pub(crate) fn invalid(vehicle: &str, reason: impl Into<String>) -> PhysicsError {
    PhysicsError::InvalidDescriptor {
        name: vehicle.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = DynamicsRegistry::with_builtin();
        assert_eq!(
            registry.names(),
            vec!["ackermann", "differential", "differential_4_wheels"]
        );
        assert_eq!(registry.create("differential").unwrap().default_wheels().len(), 2);
        assert_eq!(
            registry.create("differential_4_wheels").unwrap().default_wheels().len(),
            4
        );
        assert_eq!(registry.create("ackermann").unwrap().default_wheels().len(), 4);
    }

    #[test]
    fn test_unknown_class() {
        let registry = DynamicsRegistry::with_builtin();
        let err = registry.create("hovercraft").err().unwrap();
        assert!(matches!(err, PhysicsError::UnknownDynamics(name) if name == "hovercraft"));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = DynamicsRegistry::new();
        assert!(!registry.contains("differential"));
        registry.register("my_robot", || Box::new(DifferentialDynamics::two_wheels()));
        assert!(registry.contains("my_robot"));
        assert!(registry.create("my_robot").is_ok());
    }

    #[test]
    fn test_default_chassis_area() {
        let poly = default_chassis_polygon();
        assert_eq!(poly.len(), 6);
        assert!((poly.area() - 0.96).abs() < 1e-9);
    }
}
