//! Wheel/ground friction models.

use nalgebra::Rotation2;
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};
use crate::types::{SimulContext, Vec2};
use crate::wheel::Wheel;

/// Everything a friction model sees for one wheel during one step.
#[derive(Debug, Clone, Copy)]
pub struct FrictionInput<'a> {
    /// Step timing.
    pub context: SimulContext,
    /// The wheel being evaluated.
    pub wheel: &'a Wheel,
    /// Share of the vehicle weight on this wheel (N).
    pub weight: f64,
    /// Motor torque on the axle (N·m). Positive drives forward.
    pub motor_torque: f64,
    /// Velocity of the wheel center in the chassis frame (m/s).
    pub wheel_speed: Vec2,
}

/// Result of a friction evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrictionOutput {
    /// Ground force on the chassis at the wheel position, chassis frame (N).
    pub force: Vec2,
    /// Spin acceleration of the wheel over this step (rad/s²).
    pub wheel_alpha: f64,
}

/// A wheel/ground interaction model.
pub trait FrictionModel: Send {
    /// Model name as used in world files.
    fn name(&self) -> &'static str;

    /// Net ground force and resulting spin acceleration for one wheel.
    fn evaluate_friction(&self, input: &FrictionInput<'_>) -> FrictionOutput;
}

/// Friction parameters as they appear in a world file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrictionDescriptor {
    /// Model name.
    #[serde(default = "default_class")]
    pub class: String,
    /// Friction coefficient.
    pub mu: Option<f64>,
    /// Viscous damping on the wheel axle (N·m·s/rad).
    pub c_damping: Option<f64>,
}

fn default_class() -> String {
    DefaultFriction::NAME.to_string()
}

impl Default for FrictionDescriptor {
    fn default() -> Self {
        Self {
            class: default_class(),
            mu: None,
            c_damping: None,
        }
    }
}

/// Build the friction model named in `desc`.
pub fn friction_from_descriptor(desc: &FrictionDescriptor) -> Result<Box<dyn FrictionModel>> {
    match desc.class.as_str() {
        DefaultFriction::NAME => {
            let mut model = DefaultFriction::default();
            if let Some(mu) = desc.mu {
                model.mu = mu;
            }
            if let Some(c) = desc.c_damping {
                model.c_damping = c;
            }
            Ok(Box::new(model))
        }
        other => Err(PhysicsError::UnknownFriction(other.to_string())),
    }
}

/// Coulomb friction with a per-wheel force cap of `mu · N`.
///
/// Lateral slip is cancelled within one step when the cap allows it. The
/// longitudinal force is the one that makes the wheel roll without slipping
/// given the motor torque and axle damping, again capped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultFriction {
    /// Friction coefficient.
    pub mu: f64,
    /// Viscous damping on the wheel axle (N·m·s/rad).
    pub c_damping: f64,
}

impl Default for DefaultFriction {
    fn default() -> Self {
        Self {
            mu: 0.8,
            c_damping: 1.0,
        }
    }
}

impl DefaultFriction {
    /// Name used in world files.
    pub const NAME: &'static str = "default";
}

impl FrictionModel for DefaultFriction {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate_friction(&self, input: &FrictionInput<'_>) -> FrictionOutput {
        let wheel = input.wheel;
        let dt = input.context.dt;
        if dt <= 0.0 || input.context.gravity <= 0.0 {
            return FrictionOutput::default();
        }

        let gravity = input.context.gravity;
        let partial_mass = input.weight / gravity + wheel.mass;
        let max_friction = self.mu * partial_mass * gravity;

        // Wheel frame: X rolls, Y slips.
        let to_wheel = Rotation2::new(-wheel.yaw);
        let vel = to_wheel * input.wheel_speed;

        let lat_force = (-vel.y * partial_mass / dt).clamp(-max_friction, max_friction);

        let r = wheel.radius();
        let inertia = wheel.inertia();
        let damping = self.c_damping * wheel.w();
        let desired_alpha = (vel.x / r - wheel.w()) / dt;
        let lon_force = ((input.motor_torque - inertia * desired_alpha - damping) / r)
            .clamp(-max_friction, max_friction);

        let wheel_alpha = if inertia > 0.0 {
            (input.motor_torque - r * lon_force - damping) / inertia
        } else {
            desired_alpha
        };

        FrictionOutput {
            force: Rotation2::new(wheel.yaw) * Vec2::new(lon_force, lat_force),
            wheel_alpha,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const G: f64 = 9.81;

    fn input<'a>(wheel: &'a Wheel, torque: f64, speed: Vec2) -> FrictionInput<'a> {
        FrictionInput {
            context: SimulContext {
                simul_time: 0.0,
                dt: 0.01,
                gravity: G,
            },
            wheel,
            weight: 15.0 * G / 2.0,
            motor_torque: torque,
            wheel_speed: speed,
        }
    }

    #[test]
    fn test_rolling_without_torque_only_damps() {
        let mut wheel = Wheel::new(0.0, 0.5);
        wheel.set_w(5.0);
        let out = DefaultFriction::default().evaluate_friction(&input(&wheel, 0.0, Vec2::new(1.0, 0.0)));
        // Rolling speed matches ground speed: only axle damping remains.
        assert_relative_eq!(out.force.x, -1.0 * 5.0 / 0.2, epsilon = 1e-9);
        assert_relative_eq!(out.force.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_forward_torque_pushes_forward() {
        let torque = 2.0;
        let wheel = Wheel::new(0.0, 0.5);
        let model = DefaultFriction::default();

        // At rest, traction reacts the whole torque and the wheel holds.
        let out = model.evaluate_friction(&input(&wheel, torque, Vec2::zeros()));
        assert_relative_eq!(out.force.x, torque / wheel.radius(), epsilon = 1e-9);
        assert_relative_eq!(out.wheel_alpha, 0.0, epsilon = 1e-9);

        // Once the ground moves under a still wheel, part of the torque
        // spins it up and traction drops below T / r.
        let out = model.evaluate_friction(&input(&wheel, torque, Vec2::new(0.01, 0.0)));
        assert!(out.wheel_alpha > 0.0, "alpha = {}", out.wheel_alpha);
        assert!(out.force.x > 0.0);
        assert!(out.force.x < torque / wheel.radius());
    }

    #[test]
    fn test_lateral_force_is_capped() {
        let wheel = Wheel::new(0.0, 0.5);
        let model = DefaultFriction::default();
        let out = model.evaluate_friction(&input(&wheel, 0.0, Vec2::new(0.0, 10.0)));
        let cap = model.mu * (15.0 / 2.0 + wheel.mass) * G;
        assert_relative_eq!(out.force.y, -cap, epsilon = 1e-9);
    }

    #[test]
    fn test_steered_wheel_rotates_force() {
        let mut wheel = Wheel::new(1.0, 0.5);
        wheel.yaw = std::f64::consts::FRAC_PI_2;
        let out = DefaultFriction::default().evaluate_friction(&input(&wheel, 2.0, Vec2::zeros()));
        assert!(out.force.x.abs() < 1e-9);
        assert!(out.force.y > 0.0);
    }

    #[test]
    fn test_factory() {
        let model = friction_from_descriptor(&FrictionDescriptor {
            mu: Some(0.5),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(model.name(), "default");

        let err = friction_from_descriptor(&FrictionDescriptor {
            class: "ice".into(),
            ..Default::default()
        });
        assert!(matches!(err, Err(PhysicsError::UnknownFriction(name)) if name == "ice"));
    }
}
