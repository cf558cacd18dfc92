//! Obstacles: static walls or pushable boxes.

use std::sync::Arc;

use rapier2d::prelude::{vector, ColliderBuilder, Isometry, RigidBodyBuilder, RigidBodyHandle};
use serde::{Deserialize, Serialize};
use vehsim_collision::{CollisionShapeCache, Renderable};
use vehsim_shape::Polygon2;

use crate::colliders::polygon_to_collider;
use crate::descriptor::invalid;
use crate::error::{PhysicsError, Result};
use crate::physics::PhysicsWorld;
use crate::types::Pose2;
use crate::visual::VisualDescriptor;

/// Obstacle parameters as they appear in a world file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockDescriptor {
    /// Unique name; generated when absent.
    pub name: Option<String>,
    /// Pose `[x, y, yaw]` (m, m, deg).
    #[serde(default)]
    pub pose: [f64; 3],
    /// Whether the block can be pushed.
    #[serde(default)]
    pub dynamic: bool,
    /// Mass of a dynamic block (kg).
    pub mass: Option<f64>,
    /// Bottom of the block (m).
    pub z_min: Option<f64>,
    /// Top of the block (m).
    pub z_max: Option<f64>,
    /// Footprint vertices in the block frame (m).
    pub shape: Option<Vec<[f64; 2]>>,
    /// Visual model; its footprint is used when `shape` is absent.
    pub visual: Option<VisualDescriptor>,
    /// Contact friction coefficient.
    pub friction: Option<f64>,
    /// Contact restitution.
    pub restitution: Option<f64>,
    /// Ground drag on translation of a dynamic block (1/s).
    pub linear_damping: Option<f64>,
    /// Ground drag on rotation of a dynamic block (1/s).
    pub angular_damping: Option<f64>,
}

impl BlockDescriptor {
    pub(crate) fn validate(&self, label: &str) -> Result<()> {
        if self.shape.is_none() && self.visual.is_none() {
            return Err(invalid(label, "block needs a shape or a visual model"));
        }
        if let Some(mass) = self.mass {
            if !(mass.is_finite() && mass > 0.0) {
                return Err(invalid(label, format!("block mass must be positive, got {mass}")));
            }
        }
        let (lo, hi) = self.z_band();
        if lo >= hi {
            return Err(invalid(label, format!("block z_min {lo} must be below z_max {hi}")));
        }
        Ok(())
    }

    fn z_band(&self) -> (f64, f64) {
        (self.z_min.unwrap_or(0.0), self.z_max.unwrap_or(1.0))
    }
}

/// An obstacle in the world.
pub struct Block {
    name: String,
    pose: Pose2,
    footprint: Polygon2,
    z_min: f64,
    z_max: f64,
    dynamic: bool,
    visual: Option<Arc<dyn Renderable>>,
    body: Option<RigidBodyHandle>,
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("name", &self.name)
            .field("pose", &self.pose)
            .field("dynamic", &self.dynamic)
            .finish_non_exhaustive()
    }
}

impl Block {
    /// Build a block and add its body to `physics`.
    pub fn factory(
        name: String,
        desc: &BlockDescriptor,
        cache: &CollisionShapeCache,
        physics: &mut PhysicsWorld,
    ) -> Result<Self> {
        desc.validate(&name)?;
        let (z_min, z_max) = desc.z_band();

        let visual = desc.visual.as_ref().map(|v| (v, v.build()));
        let footprint = match (&desc.shape, &visual) {
            (Some(shape), _) => Polygon2::from_xy(shape),
            (None, Some((vdesc, model))) => vdesc.footprint(model.as_ref(), cache, z_min, z_max)?,
            (None, None) => return Err(invalid(&name, "block needs a shape or a visual model")),
        };
        let shape = polygon_to_collider(&footprint, &name)?;

        let pose = Pose2::new(desc.pose[0], desc.pose[1], desc.pose[2].to_radians());
        let position = Isometry::new(vector![pose.x as f32, pose.y as f32], pose.yaw as f32);
        let body = if desc.dynamic {
            RigidBodyBuilder::dynamic()
                .position(position)
                .linear_damping(desc.linear_damping.unwrap_or(1.0) as f32)
                .angular_damping(desc.angular_damping.unwrap_or(1.0) as f32)
                .build()
        } else {
            RigidBodyBuilder::fixed().position(position).build()
        };
        let handle = physics.insert_body(body);

        let mut collider = ColliderBuilder::new(shape)
            .friction(desc.friction.unwrap_or(0.5) as f32)
            .restitution(desc.restitution.unwrap_or(0.01) as f32);
        if desc.dynamic {
            collider = collider.mass(desc.mass.unwrap_or(1.0) as f32);
        }
        physics.insert_collider(collider.build(), handle);
        log::debug!("block '{name}' added at ({:.3}, {:.3})", pose.x, pose.y);

        Ok(Self {
            name,
            pose,
            footprint,
            z_min,
            z_max,
            dynamic: desc.dynamic,
            visual: visual.map(|(_, model)| model),
            body: Some(handle),
        })
    }

    /// Block name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current pose.
    pub fn pose(&self) -> Pose2 {
        self.pose
    }

    /// Footprint in the block frame.
    pub fn footprint(&self) -> &Polygon2 {
        &self.footprint
    }

    /// Height band `(z_min, z_max)`.
    pub fn z_band(&self) -> (f64, f64) {
        (self.z_min, self.z_max)
    }

    /// Whether the block can move.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Visual model, if any.
    pub fn visual(&self) -> Option<&Arc<dyn Renderable>> {
        self.visual.as_ref()
    }

    /// Refresh the pose from the physics body.
    pub fn simul_post_timestep(&mut self, physics: &PhysicsWorld) -> Result<()> {
        let handle = self.body.ok_or_else(|| PhysicsError::NotAttached(self.name.clone()))?;
        let body = physics
            .body(handle)
            .ok_or_else(|| PhysicsError::NotAttached(self.name.clone()))?;
        let pos = body.position();
        self.pose = Pose2::new(
            pos.translation.x as f64,
            pos.translation.y as f64,
            pos.rotation.angle() as f64,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::VisualGeometry;

    fn wall() -> BlockDescriptor {
        BlockDescriptor {
            pose: [3.0, 0.0, 90.0],
            shape: Some(vec![[-0.1, -2.0], [0.1, -2.0], [0.1, 2.0], [-0.1, 2.0]]),
            ..Default::default()
        }
    }

    #[test]
    fn test_static_block() {
        let mut physics = PhysicsWorld::new();
        let cache = CollisionShapeCache::new();
        let mut block = Block::factory("wall".into(), &wall(), &cache, &mut physics).unwrap();
        assert_eq!(physics.num_bodies(), 1);
        assert!(!block.is_dynamic());

        physics.step(0.01);
        block.simul_post_timestep(&physics).unwrap();
        assert!((block.pose().x - 3.0).abs() < 1e-6);
        assert!((block.pose().yaw - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_block_from_visual() {
        let mut physics = PhysicsWorld::new();
        let cache = CollisionShapeCache::new();
        let desc = BlockDescriptor {
            dynamic: true,
            visual: Some(VisualDescriptor {
                geometry: VisualGeometry::Box { size: [1.0, 1.0, 1.0] },
                pose: vehsim_shape::Pose3::from_xyz_yaw(0.0, 0.0, 0.5, 0.0),
                scale: 1.0,
                key: Some("box1".into()),
            }),
            ..Default::default()
        };
        let block = Block::factory("box".into(), &desc, &cache, &mut physics).unwrap();
        assert!((block.footprint().area() - 1.0).abs() < 1e-5);
        assert!(cache.contains("box1"));
    }

    #[test]
    fn test_block_without_geometry() {
        let mut physics = PhysicsWorld::new();
        let cache = CollisionShapeCache::new();
        let err = Block::factory("ghost".into(), &BlockDescriptor::default(), &cache, &mut physics).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidDescriptor { .. }));
        assert_eq!(physics.num_bodies(), 0);
    }
}
