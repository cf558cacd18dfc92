//! Error types for the vehicle simulation.

use thiserror::Error;
use vehsim_collision::CollisionError;

/// Errors that can occur while loading or running a simulation.
///
/// Everything here is a load-time failure: a world that produced one of
/// these must not enter the simulation loop.
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// No drivetrain registered under this name.
    #[error("Unknown vehicle dynamics class '{0}'")]
    UnknownDynamics(String),

    /// A vehicle refers to a class template that was never registered.
    #[error("Vehicle class '{0}' undefined")]
    UndefinedVehicleClass(String),

    /// No friction model registered under this name.
    #[error("Unknown friction model '{0}'")]
    UnknownFriction(String),

    /// The drivetrain has no controller with this name.
    #[error("Unknown controller '{controller}' for dynamics '{dynamics}'")]
    UnknownController {
        /// Drivetrain name.
        dynamics: String,
        /// Requested controller.
        controller: String,
    },

    /// No sensor registered under this name.
    #[error("Unknown sensor class '{0}'")]
    UnknownSensor(String),

    /// Structurally invalid descriptor.
    #[error("Invalid descriptor for '{name}': {reason}")]
    InvalidDescriptor {
        /// Vehicle, block or class name.
        name: String,
        /// What is wrong.
        reason: String,
    },

    /// The drivetrain defines no wheels.
    #[error("Vehicle '{0}' has no wheels")]
    NoWheels(String),

    /// Descriptor wheel list does not match the drivetrain layout.
    #[error("Vehicle '{vehicle}' expects {expected} wheels, descriptor gives {found}")]
    WheelCount {
        /// Vehicle name.
        vehicle: String,
        /// Wheels fixed by the drivetrain.
        expected: usize,
        /// Wheels found in the descriptor.
        found: usize,
    },

    /// Chassis polygon unusable as a collision shape.
    #[error("Invalid chassis polygon for '{vehicle}': {vertices} vertices, area {area} m²")]
    InvalidChassis {
        /// Vehicle or block name.
        vehicle: String,
        /// Number of polygon vertices.
        vertices: usize,
        /// Polygon area.
        area: f64,
    },

    /// `create_multibody_system` called on an already attached vehicle.
    #[error("'{0}' is already attached to a physics world")]
    AlreadyAttached(String),

    /// Physics access on a vehicle that has no bodies yet.
    #[error("'{0}' is not attached to a physics world")]
    NotAttached(String),

    /// The active controller does not accept this command.
    #[error("Controller '{controller}' does not accept command {command}")]
    UnsupportedCommand {
        /// Active controller name.
        controller: String,
        /// Rejected command.
        command: String,
    },

    /// Two objects share a name.
    #[error("Duplicate name '{0}'")]
    DuplicateName(String),

    /// No vehicle with this name.
    #[error("Vehicle not found: {0}")]
    UnknownVehicle(String),

    /// Collision-shape extraction failed.
    #[error(transparent)]
    Collision(#[from] CollisionError),

    /// World file could not be parsed.
    #[error("Failed to parse world description: {0}")]
    Parse(String),

    /// World file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for PhysicsError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for PhysicsError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;
