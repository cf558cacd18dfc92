#![warn(missing_docs)]

//! Collision-shape extraction for vehsim.
//!
//! Reduces arbitrary 3D visual models to convex 2.5D collision volumes
//! ([`Shape2p5`]) usable by a 2D physics solver, and caches the result per
//! model so each distinct asset is reduced at most once.
//!
//! # Example
//!
//! ```ignore
//! use vehsim_collision::{CollisionShapeCache, MeshModel, TriangleMesh};
//! use vehsim_shape::Pose3;
//!
//! let cache = CollisionShapeCache::new();
//! let model = MeshModel::new(TriangleMesh::cuboid(1.0, 1.0, 1.0));
//!
//! // Slice of the model between the ground and 0.5 m, placed so it rests on the floor.
//! let pose = Pose3::from_xyz_yaw(0.0, 0.0, 0.5, 0.0);
//! let shape = cache.get(&model, 0.0, 0.5, &pose, 1.0, Some("crate.box"))?;
//! assert!(shape.volume() > 0.0);
//! ```

mod cache;
mod error;
mod mesh;
mod renderable;

pub use cache::CollisionShapeCache;
pub use error::{CollisionError, Result};
pub use mesh::{CompositeModel, MeshModel, PointCloud, TriangleMesh, Wireframe};
pub use renderable::{PrimitiveBuffer, RenderPoint, Renderable, Triangle};

pub use vehsim_shape::Shape2p5;
