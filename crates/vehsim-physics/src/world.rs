//! The simulated world: physics, shape cache, registries, vehicles and
//! obstacles, advanced at a fixed timestep.

use std::path::Path;

use log::{debug, info};
use serde::Serialize;
use vehsim_collision::CollisionShapeCache;
use vehsim_shape::Point2;

use crate::block::{Block, BlockDescriptor};
use crate::class_registry::VehicleClassRegistry;
use crate::controller::ControllerCommand;
use crate::descriptor::{SimulationParams, VehicleDescriptor, WorldDescriptor};
use crate::dynamics::DynamicsRegistry;
use crate::error::{PhysicsError, Result};
use crate::physics::PhysicsWorld;
use crate::types::{Pose2, SimulContext, Twist2D, Vec2};
use crate::vehicle::Vehicle;

/// Leftover time below this is not worth a step (s).
const TIME_EPSILON: f64 = 1e-9;

/// State of one vehicle at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    /// Vehicle name.
    pub name: String,
    /// Pose.
    pub pose: Pose2,
    /// World-frame velocity.
    pub velocity: Twist2D,
    /// Wheel odometry estimate, vehicle frame.
    pub odometry: Twist2D,
    /// Chassis footprint, vehicle frame.
    pub chassis: Vec<[f64; 2]>,
    /// Bounding radius (m).
    pub max_radius: f64,
    /// Wheel spin angles (rad).
    pub wheel_phi: Vec<f64>,
}

/// State of one obstacle at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSnapshot {
    /// Block name.
    pub name: String,
    /// Pose.
    pub pose: Pose2,
    /// Footprint, block frame.
    pub footprint: Vec<[f64; 2]>,
}

/// Immutable copy of the world state, for presentation or export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    /// Simulation time (s).
    pub time: f64,
    /// Vehicles, in creation order.
    pub vehicles: Vec<VehicleSnapshot>,
    /// Obstacles, in creation order.
    pub blocks: Vec<BlockSnapshot>,
}

/// A simulated world.
pub struct World {
    params: SimulationParams,
    physics: PhysicsWorld,
    shape_cache: CollisionShapeCache,
    dynamics: DynamicsRegistry,
    classes: VehicleClassRegistry,
    vehicles: Vec<Vehicle>,
    blocks: Vec<Block>,
    time: f64,
    pending: f64,
    vehicles_added: usize,
    blocks_added: usize,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("params", &self.params)
            .field("time", &self.time)
            .field("vehicles", &self.vehicles)
            .field("blocks", &self.blocks)
            .finish_non_exhaustive()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(SimulationParams::default())
    }
}

impl World {
    /// Empty world with the built-in drivetrains registered.
    pub fn new(params: SimulationParams) -> Self {
        Self {
            params,
            physics: PhysicsWorld::new(),
            shape_cache: CollisionShapeCache::new(),
            dynamics: DynamicsRegistry::with_builtin(),
            classes: VehicleClassRegistry::new(),
            vehicles: Vec::new(),
            blocks: Vec::new(),
            time: 0.0,
            pending: 0.0,
            vehicles_added: 0,
            blocks_added: 0,
        }
    }

    /// Build a world from a description.
    pub fn from_descriptor(desc: &WorldDescriptor) -> Result<Self> {
        desc.validate()?;
        let mut world = Self::new(desc.simulation);
        for (name, template) in &desc.vehicle_classes {
            world.register_vehicle_class(name.clone(), template.clone())?;
        }
        for vehicle in &desc.vehicles {
            world.spawn_vehicle(vehicle)?;
        }
        for block in &desc.blocks {
            world.add_block(block)?;
        }
        info!(
            "world loaded: {} vehicles, {} blocks, {} classes, timestep {} s",
            world.vehicles.len(),
            world.blocks.len(),
            world.classes.len(),
            world.params.timestep
        );
        Ok(world)
    }

    /// Load and build a world file (TOML, or JSON by extension).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("loading world from {}", path.display());
        Self::from_descriptor(&WorldDescriptor::from_path(path)?)
    }

    /// Register a vehicle class template.
    pub fn register_vehicle_class(&mut self, name: impl Into<String>, template: VehicleDescriptor) -> Result<()> {
        self.classes.register_vehicle_class(name, template)
    }

    /// Build a vehicle from `desc`, attach it to the physics world and add it.
    /// Returns its index.
    pub fn spawn_vehicle(&mut self, desc: &VehicleDescriptor) -> Result<usize> {
        let vehicle = Vehicle::factory(self, desc)?;
        self.add_vehicle(vehicle)
    }

    /// Attach an already built vehicle and add it. Returns its index.
    pub fn add_vehicle(&mut self, mut vehicle: Vehicle) -> Result<usize> {
        if self.name_taken(vehicle.name()) {
            return Err(PhysicsError::DuplicateName(vehicle.name().to_string()));
        }
        vehicle.create_multibody_system(&mut self.physics)?;
        self.vehicles.push(vehicle);
        self.vehicles_added += 1;
        Ok(self.vehicles.len() - 1)
    }

    /// Build an obstacle and add it. Returns its index.
    pub fn add_block(&mut self, desc: &BlockDescriptor) -> Result<usize> {
        let name = desc
            .name
            .clone()
            .unwrap_or_else(|| self.generated_name("block", self.blocks_added));
        if self.name_taken(&name) {
            return Err(PhysicsError::DuplicateName(name));
        }
        let block = Block::factory(name, desc, &self.shape_cache, &mut self.physics)?;
        self.blocks.push(block);
        self.blocks_added += 1;
        Ok(self.blocks.len() - 1)
    }

    /// Detach a vehicle from the physics world and hand it back.
    pub fn remove_vehicle(&mut self, name: &str) -> Result<Vehicle> {
        let index = self
            .vehicles
            .iter()
            .position(|v| v.name() == name)
            .ok_or_else(|| PhysicsError::UnknownVehicle(name.to_string()))?;
        let mut vehicle = self.vehicles.remove(index);
        vehicle.remove_multibody_system(&mut self.physics)?;
        debug!("vehicle '{name}' removed");
        Ok(vehicle)
    }

    /// Advance by exactly one timestep.
    pub fn step(&mut self) -> Result<()> {
        self.check_timestep()?;
        let context = SimulContext {
            simul_time: self.time,
            dt: self.params.timestep,
            gravity: self.params.gravity,
        };

        for vehicle in &mut self.vehicles {
            vehicle.simul_pre_timestep(&context, &mut self.physics)?;
        }
        self.physics.step(context.dt);
        for vehicle in &mut self.vehicles {
            vehicle.simul_post_timestep(&context, &mut self.physics)?;
        }
        for block in &mut self.blocks {
            block.simul_post_timestep(&self.physics)?;
        }

        self.time += context.dt;
        Ok(())
    }

    /// Advance by `dt` seconds in fixed timesteps. Time that does not fill
    /// a whole step is carried over to the next call. Returns the number of
    /// steps run.
    pub fn run_simulation(&mut self, dt: f64) -> Result<usize> {
        if !(dt.is_finite() && dt >= 0.0) {
            return Err(PhysicsError::InvalidDescriptor {
                name: "simulation".to_string(),
                reason: format!("cannot advance by {dt} s"),
            });
        }
        self.check_timestep()?;
        self.pending += dt;
        let mut steps = 0;
        while self.pending + TIME_EPSILON >= self.params.timestep {
            self.step()?;
            self.pending -= self.params.timestep;
            steps += 1;
        }
        self.pending = self.pending.max(0.0);
        Ok(steps)
    }

    /// Apply an external force (world frame) at a point of a vehicle given
    /// in its own frame, for the next step.
    pub fn apply_force(&mut self, vehicle: &str, force: Vec2, local_point: Point2) -> Result<()> {
        let vehicle = self
            .vehicles
            .iter()
            .find(|v| v.name() == vehicle)
            .ok_or_else(|| PhysicsError::UnknownVehicle(vehicle.to_string()))?;
        vehicle.apply_force(&mut self.physics, force, local_point)
    }

    /// Send a setpoint to a vehicle's controller.
    pub fn set_command(&mut self, vehicle: &str, command: ControllerCommand) -> Result<()> {
        self.vehicle_mut(vehicle)
            .ok_or_else(|| PhysicsError::UnknownVehicle(vehicle.to_string()))?
            .set_command(command)
    }

    /// Turn per-step recording on or off for every vehicle.
    pub fn set_recording(&mut self, recording: bool) {
        for vehicle in &mut self.vehicles {
            vehicle.set_recording(recording);
        }
    }

    /// Drop every vehicle's recorded steps.
    pub fn clear_logs(&mut self) {
        for vehicle in &mut self.vehicles {
            vehicle.clear_log();
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            time: self.time,
            vehicles: self
                .vehicles
                .iter()
                .map(|v| VehicleSnapshot {
                    name: v.name().to_string(),
                    pose: v.pose(),
                    velocity: v.velocity(),
                    odometry: v.velocity_local_odo_estimate(),
                    chassis: v.chassis_polygon().points.iter().map(|p| [p.x, p.y]).collect(),
                    max_radius: v.max_radius(),
                    wheel_phi: v.wheels().iter().map(|w| w.phi()).collect(),
                })
                .collect(),
            blocks: self
                .blocks
                .iter()
                .map(|b| BlockSnapshot {
                    name: b.name().to_string(),
                    pose: b.pose(),
                    footprint: b.footprint().points.iter().map(|p| [p.x, p.y]).collect(),
                })
                .collect(),
        }
    }

    /// Vehicle by name.
    pub fn vehicle(&self, name: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.name() == name)
    }

    /// Vehicle by name, mutably.
    pub fn vehicle_mut(&mut self, name: &str) -> Option<&mut Vehicle> {
        self.vehicles.iter_mut().find(|v| v.name() == name)
    }

    /// All vehicles, in creation order.
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// All obstacles, in creation order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Simulation time (s).
    pub fn simul_time(&self) -> f64 {
        self.time
    }

    /// Global settings.
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Rapier state.
    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    /// Collision shape cache shared by every model of this world.
    pub fn shape_cache(&self) -> &CollisionShapeCache {
        &self.shape_cache
    }

    /// Drivetrain registry.
    pub fn dynamics_registry(&self) -> &DynamicsRegistry {
        &self.dynamics
    }

    /// Drivetrain registry, for registering custom drivetrains.
    pub fn dynamics_registry_mut(&mut self) -> &mut DynamicsRegistry {
        &mut self.dynamics
    }

    /// Vehicle class templates.
    pub fn vehicle_classes(&self) -> &VehicleClassRegistry {
        &self.classes
    }

    /// Name for the next unnamed vehicle.
    pub(crate) fn next_vehicle_name(&self) -> String {
        self.generated_name("veh", self.vehicles_added)
    }

    /// First free `{prefix}{n}` after the `added` objects created so far.
    /// Counters only grow, so removals never recycle a name.
    fn generated_name(&self, prefix: &str, added: usize) -> String {
        (added + 1..)
            .map(|n| format!("{prefix}{n}"))
            .find(|name| !self.name_taken(name))
            .unwrap_or_else(|| format!("{prefix}{added}"))
    }

    fn name_taken(&self, name: &str) -> bool {
        self.vehicles.iter().any(|v| v.name() == name) || self.blocks.iter().any(|b| b.name() == name)
    }

    fn check_timestep(&self) -> Result<()> {
        let timestep = self.params.timestep;
        if timestep.is_finite() && timestep > 0.0 {
            Ok(())
        } else {
            Err(PhysicsError::InvalidDescriptor {
                name: "simulation".to_string(),
                reason: format!("timestep must be positive, got {timestep}"),
            })
        }
    }
}
