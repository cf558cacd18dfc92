//! World description files.
//!
//! A world is described in TOML (or JSON) and deserialized with serde:
//!
//! ```toml
//! [simulation]
//! timestep = 0.005
//!
//! [vehicle_classes.small_robot.dynamics]
//! class = "differential"
//!
//! [[vehicles]]
//! name = "r1"
//! class = "small_robot"
//! init_pose = [0.0, 0.0, 90.0]
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::block::BlockDescriptor;
use crate::dynamics::DynamicsDescriptor;
use crate::error::{PhysicsError, Result};
use crate::friction::FrictionDescriptor;
use crate::sensor::SensorDescriptor;
use crate::visual::VisualDescriptor;

/// Default simulation step (s).
pub const DEFAULT_TIMESTEP: f64 = 0.01;
/// Default gravity acceleration (m/s²).
pub const DEFAULT_GRAVITY: f64 = 9.81;

fn default_timestep() -> f64 {
    DEFAULT_TIMESTEP
}

fn default_gravity() -> f64 {
    DEFAULT_GRAVITY
}

/// Global simulation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationParams {
    /// Fixed physics step (s).
    #[serde(default = "default_timestep")]
    pub timestep: f64,
    /// Gravity acceleration (m/s²).
    #[serde(default = "default_gravity")]
    pub gravity: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            timestep: DEFAULT_TIMESTEP,
            gravity: DEFAULT_GRAVITY,
        }
    }
}

/// Chassis parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChassisDescriptor {
    /// Mass (kg).
    pub mass: Option<f64>,
    /// Bottom of the chassis body (m).
    pub z_min: Option<f64>,
    /// Top of the chassis body (m).
    pub z_max: Option<f64>,
    /// Footprint vertices in the vehicle frame (m).
    pub shape: Option<Vec<[f64; 2]>>,
    /// Derive the footprint from the vehicle's visual model instead.
    #[serde(default)]
    pub shape_from_visual: bool,
}

/// One vehicle, or a vehicle class template.
///
/// Every field is optional so that instances can inherit from a class: an
/// instance field, when set, replaces the class field; sensors accumulate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleDescriptor {
    /// Unique vehicle name; generated when absent.
    pub name: Option<String>,
    /// Registered class template to start from.
    pub class: Option<String>,
    /// Initial pose `[x, y, yaw]` (m, m, deg).
    pub init_pose: Option<[f64; 3]>,
    /// Initial velocity `[vx, vy, omega]` in the vehicle frame (m/s, m/s, deg/s).
    pub init_vel: Option<[f64; 3]>,
    /// Drivetrain.
    pub dynamics: Option<DynamicsDescriptor>,
    /// Chassis body.
    pub chassis: Option<ChassisDescriptor>,
    /// Wheel/ground friction.
    pub friction: Option<FrictionDescriptor>,
    /// Attached sensors.
    #[serde(default)]
    pub sensors: Vec<SensorDescriptor>,
    /// Visual model.
    pub visual: Option<VisualDescriptor>,
    /// Record per-step state.
    pub log: Option<bool>,
}

impl VehicleDescriptor {
    /// This descriptor layered over a class template.
    pub fn merged_with_class(&self, class: &VehicleDescriptor) -> VehicleDescriptor {
        VehicleDescriptor {
            name: self.name.clone(),
            class: self.class.clone(),
            init_pose: self.init_pose.or(class.init_pose),
            init_vel: self.init_vel.or(class.init_vel),
            dynamics: self.dynamics.clone().or_else(|| class.dynamics.clone()),
            chassis: self.chassis.clone().or_else(|| class.chassis.clone()),
            friction: self.friction.clone().or_else(|| class.friction.clone()),
            sensors: class.sensors.iter().chain(&self.sensors).cloned().collect(),
            visual: self.visual.clone().or_else(|| class.visual.clone()),
            log: self.log.or(class.log),
        }
    }
}

/// Complete world description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldDescriptor {
    /// Global settings.
    #[serde(default)]
    pub simulation: SimulationParams,
    /// Vehicle class templates by name.
    #[serde(default)]
    pub vehicle_classes: BTreeMap<String, VehicleDescriptor>,
    /// Vehicles, in creation order.
    #[serde(default)]
    pub vehicles: Vec<VehicleDescriptor>,
    /// Obstacles.
    #[serde(default)]
    pub blocks: Vec<BlockDescriptor>,
}

impl WorldDescriptor {
    /// Parse a TOML world description.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Parse a JSON world description.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a world file, JSON if its extension is `.json`, TOML otherwise.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Structural checks that need no registry: settings ranges, class
    /// references, duplicate names and mandatory fields.
    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if !(sim.timestep.is_finite() && sim.timestep > 0.0) {
            return Err(invalid("simulation", format!("timestep must be positive, got {}", sim.timestep)));
        }
        if !(sim.gravity.is_finite() && sim.gravity >= 0.0) {
            return Err(invalid("simulation", format!("gravity must be non-negative, got {}", sim.gravity)));
        }

        let mut names = HashSet::new();
        for (i, veh) in self.vehicles.iter().enumerate() {
            let resolved = match &veh.class {
                Some(class) => {
                    let template = self
                        .vehicle_classes
                        .get(class)
                        .ok_or_else(|| PhysicsError::UndefinedVehicleClass(class.clone()))?;
                    veh.merged_with_class(template)
                }
                None => veh.clone(),
            };
            let label = resolved.name.clone().unwrap_or_else(|| format!("vehicles[{i}]"));
            if let Some(name) = &resolved.name {
                if !names.insert(name.clone()) {
                    return Err(PhysicsError::DuplicateName(name.clone()));
                }
            }
            validate_vehicle(&label, &resolved)?;
        }

        for (i, block) in self.blocks.iter().enumerate() {
            if let Some(name) = &block.name {
                if !names.insert(name.clone()) {
                    return Err(PhysicsError::DuplicateName(name.clone()));
                }
            }
            let label = block.name.clone().unwrap_or_else(|| format!("blocks[{i}]"));
            block.validate(&label)?;
        }
        Ok(())
    }
}

/// Checks on a vehicle descriptor already merged with its class.
pub(crate) fn validate_vehicle(label: &str, desc: &VehicleDescriptor) -> Result<()> {
    if desc.init_pose.is_none() {
        return Err(invalid(label, "missing init_pose"));
    }
    if desc.dynamics.is_none() {
        return Err(invalid(label, "missing dynamics"));
    }
    if let Some(chassis) = &desc.chassis {
        if let Some(mass) = chassis.mass {
            if !(mass.is_finite() && mass > 0.0) {
                return Err(invalid(label, format!("chassis mass must be positive, got {mass}")));
            }
        }
        if let (Some(lo), Some(hi)) = (chassis.z_min, chassis.z_max) {
            if lo >= hi {
                return Err(invalid(label, format!("chassis z_min {lo} must be below z_max {hi}")));
            }
        }
        if chassis.shape_from_visual && desc.visual.is_none() {
            return Err(invalid(label, "shape_from_visual requires a visual model"));
        }
    }
    Ok(())
}

pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> PhysicsError {
    PhysicsError::InvalidDescriptor {
        name: name.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD: &str = r#"
        [simulation]
        timestep = 0.005

        [vehicle_classes.small_robot]
        sensors = [{ class = "odometry" }]
        [vehicle_classes.small_robot.dynamics]
        class = "differential"
        [vehicle_classes.small_robot.chassis]
        mass = 20.0

        [[vehicles]]
        name = "r1"
        class = "small_robot"
        init_pose = [1.0, 2.0, 90.0]
        sensors = [{ class = "odometry", name = "odo2", period = 0.1 }]

        [[vehicles]]
        name = "r2"
        init_pose = [5.0, 0.0, 0.0]
        [vehicles.dynamics]
        class = "ackermann"

        [[blocks]]
        name = "wall"
        pose = [3.0, 0.0, 0.0]
        shape = [[-0.1, -2.0], [0.1, -2.0], [0.1, 2.0], [-0.1, 2.0]]
    "#;

    #[test]
    fn test_parse_world() {
        let world = WorldDescriptor::from_toml_str(WORLD).unwrap();
        assert_eq!(world.simulation.timestep, 0.005);
        assert_eq!(world.simulation.gravity, DEFAULT_GRAVITY);
        assert_eq!(world.vehicles.len(), 2);
        assert_eq!(world.blocks.len(), 1);
        world.validate().unwrap();
    }

    #[test]
    fn test_class_merge() {
        let world = WorldDescriptor::from_toml_str(WORLD).unwrap();
        let class = &world.vehicle_classes["small_robot"];
        let merged = world.vehicles[0].merged_with_class(class);
        assert_eq!(merged.dynamics.unwrap().class, "differential");
        assert_eq!(merged.chassis.unwrap().mass, Some(20.0));
        assert_eq!(merged.sensors.len(), 2);
        assert_eq!(merged.init_pose, Some([1.0, 2.0, 90.0]));
    }

    #[test]
    fn test_class_name_not_inherited() {
        let class = VehicleDescriptor {
            name: Some("template".into()),
            log: Some(true),
            ..Default::default()
        };
        let merged = VehicleDescriptor::default().merged_with_class(&class);
        assert_eq!(merged.name, None);
        assert_eq!(merged.log, Some(true));
    }

    #[test]
    fn test_undefined_class() {
        let mut world = WorldDescriptor::from_toml_str(WORLD).unwrap();
        world.vehicles[0].class = Some("tank".into());
        assert!(matches!(
            world.validate(),
            Err(PhysicsError::UndefinedVehicleClass(name)) if name == "tank"
        ));
    }

    #[test]
    fn test_duplicate_names() {
        let mut world = WorldDescriptor::from_toml_str(WORLD).unwrap();
        world.vehicles[1].name = Some("r1".into());
        assert!(matches!(world.validate(), Err(PhysicsError::DuplicateName(_))));
    }

    #[test]
    fn test_missing_init_pose() {
        let mut world = WorldDescriptor::from_toml_str(WORLD).unwrap();
        world.vehicles[1].init_pose = None;
        assert!(matches!(
            world.validate(),
            Err(PhysicsError::InvalidDescriptor { name, .. }) if name == "r2"
        ));
    }

    #[test]
    fn test_bad_timestep() {
        let mut world = WorldDescriptor::default();
        world.simulation.timestep = 0.0;
        assert!(world.validate().is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = WorldDescriptor::from_toml_str("[simulation]\ntimestpe = 0.1\n").unwrap_err();
        assert!(matches!(err, PhysicsError::Parse(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let world = WorldDescriptor::from_toml_str(WORLD).unwrap();
        let json = serde_json::to_string(&world).unwrap();
        assert_eq!(WorldDescriptor::from_json_str(&json).unwrap(), world);
    }
}
