#![warn(missing_docs)]

//! Multi-vehicle 2D physics simulation for vehsim using Rapier2d.
//!
//! Vehicles are rigid bodies moving on a plane seen from above. Each one
//! carries wheels, a drivetrain with its motor controller, a wheel/ground
//! friction model and optional sensors. Obstacles ("blocks") are static or
//! pushable bodies whose footprint may come from a visual model through the
//! world's [`vehsim_collision::CollisionShapeCache`].
//!
//! # Features
//!
//! - Differential (2 and 4 wheels) and Ackermann drivetrains, selected by
//!   name from an explicit [`DynamicsRegistry`]
//! - Raw torque and twist PID controllers
//! - Vehicle class templates and TOML/JSON world files
//! - Fixed-timestep stepping, external forces, snapshots and per-step logs
//!
//! # Example
//!
//! ```ignore
//! use vehsim_physics::{ControllerCommand, World};
//!
//! let mut world = World::from_path("world.toml")?;
//! world.set_command("r1", ControllerCommand::Twist { vx: 1.0, omega: 0.2 })?;
//! world.run_simulation(5.0)?;
//! println!("{:?}", world.vehicle("r1").map(|v| v.pose()));
//! ```

mod block;
mod class_registry;
mod colliders;
mod controller;
mod descriptor;
mod dynamics;
mod error;
mod friction;
mod physics;
mod recorder;
mod sensor;
mod types;
mod vehicle;
mod visual;
mod wheel;
mod world;

pub use block::{Block, BlockDescriptor};
pub use class_registry::VehicleClassRegistry;
pub use colliders::{polygon_to_collider, validated_hull, wheel_collider, MIN_FOOTPRINT_AREA};
pub use controller::{ControllerCommand, ControllerDescriptor, PidController};
pub use descriptor::{
    ChassisDescriptor, SimulationParams, VehicleDescriptor, WorldDescriptor, DEFAULT_GRAVITY, DEFAULT_TIMESTEP,
};
pub use dynamics::{
    compute_front_wheel_angles, default_chassis_polygon, AckermannDynamics, DifferentialDynamics,
    DynamicsConstructor, DynamicsDescriptor, DynamicsRegistry, VehicleDynamics,
};
pub use error::{PhysicsError, Result};
pub use friction::{
    friction_from_descriptor, DefaultFriction, FrictionDescriptor, FrictionInput, FrictionModel, FrictionOutput,
};
pub use physics::PhysicsWorld;
pub use recorder::{VehicleLog, VehicleLogRecord, WheelLogRecord};
pub use sensor::{sensor_from_descriptor, Observation, OdometrySensor, Sensor, SensorDescriptor, VehicleState};
pub use types::{Pose2, SimulContext, Twist2D, Vec2};
pub use vehicle::{
    Vehicle, VehicleHandles, DEFAULT_CHASSIS_MASS, DEFAULT_CHASSIS_Z_MAX, DEFAULT_CHASSIS_Z_MIN, MIN_MAX_RADIUS,
};
pub use visual::{VisualDescriptor, VisualGeometry};
pub use wheel::{Wheel, WheelDescriptor};
pub use world::{BlockSnapshot, VehicleSnapshot, World, WorldSnapshot};
