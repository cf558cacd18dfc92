//! Rigid-body world management using Rapier2d.
//!
//! The simulated plane is seen from above: bodies move in X/Y and rotate
//! about Z, and Rapier's gravity stays zero. Weight only enters through the
//! wheel friction models.

use nalgebra::Vector2;
use rapier2d::dynamics::{
    CCDSolver, ImpulseJointSet, IntegrationParameters, IslandManager, MultibodyJointSet,
    RigidBody, RigidBodyHandle, RigidBodySet,
};
use rapier2d::geometry::{BroadPhaseMultiSap, Collider, ColliderHandle, ColliderSet, NarrowPhase};
use rapier2d::pipeline::{PhysicsPipeline, QueryPipeline};

/// Rapier state shared by every simulated object of a world.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector2<f32>,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create an empty physics world.
    pub fn new() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: Vector2::zeros(),
            integration_params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    /// Step the physics simulation by dt seconds.
    pub fn step(&mut self, dt: f64) {
        self.integration_params.dt = dt as f32;

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Insert a rigid body.
    pub fn insert_body(&mut self, body: RigidBody) -> RigidBodyHandle {
        self.bodies.insert(body)
    }

    /// Attach a collider to a body.
    pub fn insert_collider(&mut self, collider: Collider, parent: RigidBodyHandle) -> ColliderHandle {
        self.colliders
            .insert_with_parent(collider, parent, &mut self.bodies)
    }

    /// Remove a body together with its colliders.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> Option<RigidBody> {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        )
    }

    /// Borrow a body.
    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    /// Mutably borrow a body.
    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    /// Borrow a collider.
    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    /// Mutably borrow a collider.
    pub fn collider_mut(&mut self, handle: ColliderHandle) -> Option<&mut Collider> {
        self.colliders.get_mut(handle)
    }

    /// Number of rigid bodies.
    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    /// Number of colliders.
    pub fn num_colliders(&self) -> usize {
        self.colliders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier2d::prelude::{vector, ColliderBuilder, RigidBodyBuilder};

    #[test]
    fn test_insert_and_remove_body() {
        let mut world = PhysicsWorld::new();
        let body = world.insert_body(RigidBodyBuilder::dynamic().build());
        world.insert_collider(ColliderBuilder::cuboid(0.5, 0.5).build(), body);
        world.insert_collider(ColliderBuilder::ball(0.2).build(), body);
        assert_eq!(world.num_bodies(), 1);
        assert_eq!(world.num_colliders(), 2);

        assert!(world.remove_body(body).is_some());
        assert_eq!(world.num_bodies(), 0);
        assert_eq!(world.num_colliders(), 0);
    }

    #[test]
    fn test_free_body_keeps_velocity_without_gravity() {
        let mut world = PhysicsWorld::new();
        let body = world.insert_body(
            RigidBodyBuilder::dynamic()
                .linvel(vector![1.0, 0.0])
                .build(),
        );
        world.insert_collider(ColliderBuilder::cuboid(0.5, 0.5).build(), body);

        for _ in 0..100 {
            world.step(0.01);
        }

        let b = world.body(body).unwrap();
        assert!((b.translation().x - 1.0).abs() < 1e-3);
        assert!(b.translation().y.abs() < 1e-6);
    }
}
