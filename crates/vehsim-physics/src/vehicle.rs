//! Vehicles: a chassis body with wheels, a drivetrain, a friction model and
//! sensors.

use std::sync::Arc;

use log::{debug, info};
use rapier2d::prelude::{
    point, vector, ColliderBuilder, ColliderHandle, Isometry, Real, RigidBodyBuilder, RigidBodyHandle,
};
use vehsim_collision::Renderable;
use vehsim_shape::{Point2, Polygon2};

use crate::colliders::{polygon_to_collider, validated_hull, wheel_collider};
use crate::controller::ControllerCommand;
use crate::descriptor::{invalid, validate_vehicle, VehicleDescriptor};
use crate::dynamics::VehicleDynamics;
use crate::error::{PhysicsError, Result};
use crate::friction::{friction_from_descriptor, DefaultFriction, FrictionInput, FrictionModel};
use crate::physics::PhysicsWorld;
use crate::recorder::{VehicleLog, VehicleLogRecord, WheelLogRecord};
use crate::sensor::{sensor_from_descriptor, Observation, Sensor, VehicleState};
use crate::types::{Pose2, SimulContext, Twist2D, Vec2};
use crate::wheel::Wheel;
use crate::world::World;

/// Default chassis mass (kg).
pub const DEFAULT_CHASSIS_MASS: f64 = 15.0;
/// Default chassis bottom (m).
pub const DEFAULT_CHASSIS_Z_MIN: f64 = 0.05;
/// Default chassis top (m).
pub const DEFAULT_CHASSIS_Z_MAX: f64 = 0.6;
/// Lower bound of the bounding radius (m).
pub const MIN_MAX_RADIUS: f64 = 0.001;

const CHASSIS_FRICTION: Real = 0.3;
const CHASSIS_RESTITUTION: Real = 0.01;
const WHEEL_FRICTION: Real = 0.5;
const WHEEL_RESTITUTION: Real = 0.05;

/// Physics handles of an attached vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleHandles {
    /// The chassis rigid body.
    pub body: RigidBodyHandle,
    /// The chassis collider.
    pub chassis: ColliderHandle,
    /// One collider per wheel, in wheel order.
    pub wheels: Vec<ColliderHandle>,
}

/// A simulated vehicle.
///
/// Pose and velocity are those of the vehicle reference frame, in world
/// coordinates. They are refreshed from the physics body after every step.
pub struct Vehicle {
    name: String,
    dynamics: Box<dyn VehicleDynamics>,
    friction: Box<dyn FrictionModel>,
    sensors: Vec<Box<dyn Sensor>>,
    wheels: Vec<Wheel>,
    torque_per_wheel: Vec<f64>,
    chassis_poly: Polygon2,
    chassis_mass: f64,
    chassis_z_min: f64,
    chassis_z_max: f64,
    max_radius: f64,
    visual: Option<Arc<dyn Renderable>>,
    q: Pose2,
    dq: Twist2D,
    handles: Option<VehicleHandles>,
    recording: bool,
    log: VehicleLog,
    last_wheel_records: Vec<WheelLogRecord>,
}

impl std::fmt::Debug for Vehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vehicle")
            .field("name", &self.name)
            .field("dynamics", &self.dynamics.class_name())
            .field("wheels", &self.wheels.len())
            .field("q", &self.q)
            .field("dq", &self.dq)
            .field("attached", &self.handles.is_some())
            .finish_non_exhaustive()
    }
}

impl Vehicle {
    /// A vehicle with the drivetrain's default wheels and chassis, at the
    /// origin and at rest.
    ///
    /// # Errors
    ///
    /// [`PhysicsError::NoWheels`] if the drivetrain defines no wheels.
    pub fn new(name: impl Into<String>, dynamics: Box<dyn VehicleDynamics>) -> Result<Self> {
        let name = name.into();
        let wheels = dynamics.default_wheels();
        if wheels.is_empty() {
            return Err(PhysicsError::NoWheels(name));
        }
        let chassis_poly = dynamics.default_chassis();
        let n = wheels.len();

        let mut vehicle = Self {
            name,
            dynamics,
            friction: Box::new(DefaultFriction::default()),
            sensors: Vec::new(),
            wheels,
            torque_per_wheel: vec![0.0; n],
            chassis_poly,
            chassis_mass: DEFAULT_CHASSIS_MASS,
            chassis_z_min: DEFAULT_CHASSIS_Z_MIN,
            chassis_z_max: DEFAULT_CHASSIS_Z_MAX,
            max_radius: MIN_MAX_RADIUS,
            visual: None,
            q: Pose2::default(),
            dq: Twist2D::default(),
            handles: None,
            recording: false,
            log: VehicleLog::default(),
            last_wheel_records: vec![WheelLogRecord::default(); n],
        };
        vehicle.update_max_radius_from_poly();
        Ok(vehicle)
    }

    /// Build a vehicle from its description, resolving class templates and
    /// plug-ins through `world`.
    ///
    /// The vehicle is not attached to the physics world yet; see
    /// [`Vehicle::create_multibody_system`].
    ///
    /// # Errors
    ///
    /// Unknown class, drivetrain, controller, friction model or sensor;
    /// wheel-count mismatch; missing mandatory fields; invalid chassis or a
    /// degenerate visual footprint.
    pub fn factory(world: &World, desc: &VehicleDescriptor) -> Result<Self> {
        let desc = match &desc.class {
            Some(class) => {
                let template = world
                    .vehicle_classes()
                    .get(class)
                    .ok_or_else(|| PhysicsError::UndefinedVehicleClass(class.clone()))?;
                desc.merged_with_class(template)
            }
            None => desc.clone(),
        };
        let name = desc.name.clone().unwrap_or_else(|| world.next_vehicle_name());
        validate_vehicle(&name, &desc)?;

        let dyn_desc = desc
            .dynamics
            .as_ref()
            .ok_or_else(|| invalid(&name, "missing dynamics"))?;
        let dynamics = world.dynamics_registry().create(&dyn_desc.class)?;
        let mut vehicle = Self::new(name, dynamics)?;

        // Wheels, then drivetrain parameters that depend on them.
        if !dyn_desc.wheels.is_empty() {
            if dyn_desc.wheels.len() != vehicle.wheels.len() {
                return Err(PhysicsError::WheelCount {
                    vehicle: vehicle.name,
                    expected: vehicle.wheels.len(),
                    found: dyn_desc.wheels.len(),
                });
            }
            for (wheel, wd) in vehicle.wheels.iter_mut().zip(&dyn_desc.wheels) {
                wheel.apply_descriptor(wd);
            }
        }
        vehicle
            .dynamics
            .load_params(&vehicle.name, dyn_desc, &vehicle.wheels)?;

        // Chassis.
        let chassis = desc.chassis.clone().unwrap_or_default();
        vehicle.chassis_mass = chassis.mass.unwrap_or(DEFAULT_CHASSIS_MASS);
        vehicle.chassis_z_min = chassis.z_min.unwrap_or(DEFAULT_CHASSIS_Z_MIN);
        vehicle.chassis_z_max = chassis.z_max.unwrap_or(DEFAULT_CHASSIS_Z_MAX);
        if vehicle.chassis_z_min >= vehicle.chassis_z_max {
            return Err(invalid(&vehicle.name, "chassis z_min must be below z_max"));
        }

        if let Some(vdesc) = &desc.visual {
            let model = vdesc.build();
            if chassis.shape_from_visual {
                let poly = vdesc.footprint(
                    model.as_ref(),
                    world.shape_cache(),
                    vehicle.chassis_z_min,
                    vehicle.chassis_z_max,
                )?;
                vehicle.set_chassis_shape(poly)?;
            }
            vehicle.visual = Some(model);
        }
        if let Some(shape) = &chassis.shape {
            vehicle.set_chassis_shape(Polygon2::from_xy(shape))?;
        }
        validated_hull(&vehicle.chassis_poly, &vehicle.name)?;

        vehicle.friction = friction_from_descriptor(&desc.friction.clone().unwrap_or_default())?;
        for sd in &desc.sensors {
            vehicle.sensors.push(sensor_from_descriptor(sd)?);
        }

        // Initial state: yaw and turn rate in degrees, velocity in the vehicle frame.
        if let Some([x, y, yaw_deg]) = desc.init_pose {
            vehicle.q = Pose2::new(x, y, yaw_deg.to_radians());
        }
        if let Some([vx, vy, omega_deg]) = desc.init_vel {
            vehicle.dq = Twist2D::new(vx, vy, omega_deg.to_radians()).rotated(vehicle.q.yaw);
        }
        vehicle.recording = desc.log.unwrap_or(false);

        info!(
            "vehicle '{}' created: {} with {} wheels, controller '{}'",
            vehicle.name,
            vehicle.dynamics.class_name(),
            vehicle.wheels.len(),
            vehicle.dynamics.controller_name()
        );
        Ok(vehicle)
    }

    /// Create the chassis body, chassis collider and one collider per wheel
    /// in `physics`, at the current pose and velocity.
    ///
    /// # Errors
    ///
    /// [`PhysicsError::AlreadyAttached`] on a second call;
    /// [`PhysicsError::InvalidChassis`] if the chassis polygon is unusable.
    pub fn create_multibody_system(&mut self, physics: &mut PhysicsWorld) -> Result<()> {
        if self.handles.is_some() {
            return Err(PhysicsError::AlreadyAttached(self.name.clone()));
        }
        if self.wheels.is_empty() {
            return Err(PhysicsError::NoWheels(self.name.clone()));
        }
        let chassis_shape = polygon_to_collider(&self.chassis_poly, &self.name)?;

        // Rapier velocities refer to the center of mass.
        let com = self.local_center_of_mass();
        let com_offset = nalgebra::Rotation2::new(self.q.yaw) * com.coords;
        let linvel = Vec2::new(
            self.dq.vx - self.dq.omega * com_offset.y,
            self.dq.vy + self.dq.omega * com_offset.x,
        );

        let body = RigidBodyBuilder::dynamic()
            .position(Isometry::new(vector![self.q.x as Real, self.q.y as Real], self.q.yaw as Real))
            .linvel(vector![linvel.x as Real, linvel.y as Real])
            .angvel(self.dq.omega as Real)
            .build();
        let body = physics.insert_body(body);

        let chassis = ColliderBuilder::new(chassis_shape)
            .mass(self.chassis_mass as Real)
            .friction(CHASSIS_FRICTION)
            .restitution(CHASSIS_RESTITUTION)
            .build();
        let chassis = physics.insert_collider(chassis, body);

        let wheels = self
            .wheels
            .iter()
            .map(|w| {
                let collider = ColliderBuilder::new(wheel_collider(w.diameter, w.width))
                    .position(wheel_isometry(w))
                    .mass(w.mass as Real)
                    .friction(WHEEL_FRICTION)
                    .restitution(WHEEL_RESTITUTION)
                    .build();
                physics.insert_collider(collider, body)
            })
            .collect();

        self.handles = Some(VehicleHandles {
            body,
            chassis,
            wheels,
        });
        debug!(
            "vehicle '{}' attached: chassis area {:.3} m², mass {:.2} kg",
            self.name,
            self.chassis_poly.area(),
            self.total_mass()
        );
        Ok(())
    }

    /// Remove the vehicle's body and colliders from `physics`.
    pub fn remove_multibody_system(&mut self, physics: &mut PhysicsWorld) -> Result<()> {
        let handles = self
            .handles
            .take()
            .ok_or_else(|| PhysicsError::NotAttached(self.name.clone()))?;
        physics.remove_body(handles.body);
        Ok(())
    }

    /// Run the controllers, then apply each wheel's friction force to the
    /// chassis body.
    pub fn simul_pre_timestep(&mut self, context: &SimulContext, physics: &mut PhysicsWorld) -> Result<()> {
        let handles = self
            .handles
            .as_ref()
            .ok_or_else(|| PhysicsError::NotAttached(self.name.clone()))?;

        self.dynamics
            .invoke_motor_controllers(context, &mut self.wheels, &mut self.torque_per_wheel);

        // Steering may have moved wheels.
        for (wheel, &handle) in self.wheels.iter().zip(&handles.wheels) {
            if let Some(collider) = physics.collider_mut(handle) {
                collider.set_position_wrt_parent(wheel_isometry(wheel));
            }
        }

        let n = self.wheels.len();
        let weight = self.chassis_mass * context.gravity / n as f64;
        let vel_local = self.velocity_local();

        let body = physics
            .body_mut(handles.body)
            .ok_or_else(|| PhysicsError::NotAttached(self.name.clone()))?;
        let pose = *body.position();

        for (i, wheel) in self.wheels.iter_mut().enumerate() {
            let torque = self.torque_per_wheel.get(i).copied().unwrap_or(0.0);
            let speed = wheel.velocity_local(&vel_local);
            let out = self.friction.evaluate_friction(&FrictionInput {
                context: *context,
                wheel,
                weight,
                motor_torque: torque,
                wheel_speed: speed,
            });
            wheel.set_w(wheel.w() + out.wheel_alpha * context.dt);

            let force = pose.rotation * vector![out.force.x as Real, out.force.y as Real];
            let point = pose * point![wheel.x as Real, wheel.y as Real];
            body.add_force_at_point(force, point, true);

            if let Some(rec) = self.last_wheel_records.get_mut(i) {
                *rec = WheelLogRecord {
                    torque,
                    weight,
                    velocity: [speed.x, speed.y],
                    friction: [out.force.x, out.force.y],
                    w: wheel.w(),
                };
            }
        }

        let odometry = self.dynamics.velocity_local_odo_estimate(&self.wheels);
        let state = VehicleState {
            name: &self.name,
            pose: self.q,
            velocity: self.dq,
            odometry,
        };
        for sensor in &mut self.sensors {
            sensor.simul_pre_timestep(context, &state);
        }
        Ok(())
    }

    /// Read back the body state, integrate wheel spin angles, update sensors
    /// and the log.
    pub fn simul_post_timestep(&mut self, context: &SimulContext, physics: &mut PhysicsWorld) -> Result<()> {
        let handle = self
            .handles
            .as_ref()
            .map(|h| h.body)
            .ok_or_else(|| PhysicsError::NotAttached(self.name.clone()))?;
        let body = physics
            .body_mut(handle)
            .ok_or_else(|| PhysicsError::NotAttached(self.name.clone()))?;

        let pos = *body.position();
        let origin = point![pos.translation.x, pos.translation.y];
        let v = body.velocity_at_point(&origin);
        self.q = Pose2::new(
            pos.translation.x as f64,
            pos.translation.y as f64,
            pos.rotation.angle() as f64,
        );
        self.dq = Twist2D::new(v.x as f64, v.y as f64, body.angvel() as f64);
        body.reset_forces(false);

        for wheel in &mut self.wheels {
            wheel.integrate_phi(context.dt);
        }

        let odometry = self.dynamics.velocity_local_odo_estimate(&self.wheels);
        let state = VehicleState {
            name: &self.name,
            pose: self.q,
            velocity: self.dq,
            odometry,
        };
        for sensor in &mut self.sensors {
            sensor.simul_post_timestep(context, &state);
        }

        if self.recording {
            self.log.push(VehicleLogRecord {
                timestamp: context.simul_time + context.dt,
                pose: self.q,
                velocity: self.dq,
                odometry,
                wheels: self.last_wheel_records.clone(),
            });
        }
        Ok(())
    }

    /// Apply an external force (world frame, N) at a point given in the
    /// vehicle frame. It acts during the next physics step only.
    pub fn apply_force(&self, physics: &mut PhysicsWorld, force: Vec2, local_point: Point2) -> Result<()> {
        let handle = self
            .handles
            .as_ref()
            .map(|h| h.body)
            .ok_or_else(|| PhysicsError::NotAttached(self.name.clone()))?;
        let body = physics
            .body_mut(handle)
            .ok_or_else(|| PhysicsError::NotAttached(self.name.clone()))?;
        let point = *body.position() * point![local_point.x as Real, local_point.y as Real];
        body.add_force_at_point(vector![force.x as Real, force.y as Real], point, true);
        Ok(())
    }

    /// Velocity of the vehicle frame expressed in that frame.
    pub fn velocity_local(&self) -> Twist2D {
        self.dq.rotated(-self.q.yaw)
    }

    /// Velocity in the vehicle frame, estimated from wheel spin only.
    pub fn velocity_local_odo_estimate(&self) -> Twist2D {
        self.dynamics.velocity_local_odo_estimate(&self.wheels)
    }

    /// Velocity of each wheel center in the vehicle frame, for a given
    /// vehicle-frame velocity.
    pub fn wheels_velocity_local(&self, vehicle_vel_local: &Twist2D) -> Vec<Vec2> {
        self.wheels
            .iter()
            .map(|w| w.velocity_local(vehicle_vel_local))
            .collect()
    }

    /// Replace the chassis footprint and refresh the bounding radius. Only
    /// allowed before the vehicle is attached.
    pub fn set_chassis_shape(&mut self, poly: Polygon2) -> Result<()> {
        if self.handles.is_some() {
            return Err(PhysicsError::AlreadyAttached(self.name.clone()));
        }
        validated_hull(&poly, &self.name)?;
        self.chassis_poly = poly;
        self.update_max_radius_from_poly();
        Ok(())
    }

    /// Recompute the bounding radius from the chassis polygon.
    pub fn update_max_radius_from_poly(&mut self) {
        self.max_radius = self.chassis_poly.max_vertex_norm().max(MIN_MAX_RADIUS);
    }

    /// Send a setpoint to the active controller.
    pub fn set_command(&mut self, command: ControllerCommand) -> Result<()> {
        self.dynamics.set_command(command)
    }

    /// Set the pose. Before attachment only; afterwards the body owns it.
    pub fn set_pose(&mut self, pose: Pose2) -> Result<()> {
        if self.handles.is_some() {
            return Err(PhysicsError::AlreadyAttached(self.name.clone()));
        }
        self.q = pose;
        Ok(())
    }

    /// Set the world-frame velocity. Before attachment only.
    pub fn set_velocity(&mut self, velocity: Twist2D) -> Result<()> {
        if self.handles.is_some() {
            return Err(PhysicsError::AlreadyAttached(self.name.clone()));
        }
        self.dq = velocity;
        Ok(())
    }

    /// Vehicle name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pose of the vehicle frame.
    pub fn pose(&self) -> Pose2 {
        self.q
    }

    /// World-frame velocity of the vehicle frame origin.
    pub fn velocity(&self) -> Twist2D {
        self.dq
    }

    /// Number of wheels.
    pub fn num_wheels(&self) -> usize {
        self.wheels.len()
    }

    /// All wheels, in drivetrain order.
    pub fn wheels(&self) -> &[Wheel] {
        &self.wheels
    }

    /// One wheel.
    pub fn wheel(&self, index: usize) -> Option<&Wheel> {
        self.wheels.get(index)
    }

    /// One wheel, mutably. The wheel count itself cannot change.
    pub fn wheel_mut(&mut self, index: usize) -> Option<&mut Wheel> {
        self.wheels.get_mut(index)
    }

    /// Motor torques computed at the last step.
    pub fn torque_per_wheel(&self) -> &[f64] {
        &self.torque_per_wheel
    }

    /// Drivetrain.
    pub fn dynamics(&self) -> &dyn VehicleDynamics {
        self.dynamics.as_ref()
    }

    /// Friction model.
    pub fn friction(&self) -> &dyn FrictionModel {
        self.friction.as_ref()
    }

    /// Replace the friction model.
    pub fn set_friction(&mut self, friction: Box<dyn FrictionModel>) {
        self.friction = friction;
    }

    /// Attach a sensor.
    pub fn add_sensor(&mut self, sensor: Box<dyn Sensor>) {
        self.sensors.push(sensor);
    }

    /// Latest reading of every sensor, by sensor name.
    pub fn observations(&self) -> Vec<(&str, Observation)> {
        self.sensors
            .iter()
            .filter_map(|s| s.last_observation().map(|o| (s.name(), o)))
            .collect()
    }

    /// Chassis footprint in the vehicle frame.
    pub fn chassis_polygon(&self) -> &Polygon2 {
        &self.chassis_poly
    }

    /// Chassis mass (kg), wheels excluded.
    pub fn chassis_mass(&self) -> f64 {
        self.chassis_mass
    }

    /// Chassis plus wheels mass (kg).
    pub fn total_mass(&self) -> f64 {
        self.chassis_mass + self.wheels.iter().map(|w| w.mass).sum::<f64>()
    }

    /// Chassis height band `(z_min, z_max)`.
    pub fn chassis_z_band(&self) -> (f64, f64) {
        (self.chassis_z_min, self.chassis_z_max)
    }

    /// Radius of the circle centered on the vehicle frame that contains the
    /// chassis.
    pub fn max_radius(&self) -> f64 {
        self.max_radius
    }

    /// Center of mass of chassis and wheels, vehicle frame.
    pub fn local_center_of_mass(&self) -> Point2 {
        let chassis = self.chassis_poly.centroid();
        let total = self.total_mass();
        if total <= 0.0 {
            return chassis;
        }
        let mut acc = chassis.coords * self.chassis_mass;
        for w in &self.wheels {
            acc += Vec2::new(w.x, w.y) * w.mass;
        }
        Point2::from(acc / total)
    }

    /// Visual model, if any.
    pub fn visual(&self) -> Option<&Arc<dyn Renderable>> {
        self.visual.as_ref()
    }

    /// Physics handles, once attached.
    pub fn handles(&self) -> Option<&VehicleHandles> {
        self.handles.as_ref()
    }

    /// Whether the vehicle has bodies in a physics world.
    pub fn is_attached(&self) -> bool {
        self.handles.is_some()
    }

    /// Start or stop per-step recording.
    pub fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    /// Whether per-step recording is on.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Recorded steps.
    pub fn log(&self) -> &VehicleLog {
        &self.log
    }

    /// Drop every recorded step.
    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

fn wheel_isometry(w: &Wheel) -> Isometry<Real> {
    Isometry::new(vector![w.x as Real, w.y as Real], w.yaw as Real)
}
