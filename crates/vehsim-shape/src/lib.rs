#![warn(missing_docs)]

//! Geometry primitives for the vehsim collision pipeline.
//!
//! Thin wrappers around nalgebra providing the types shared by the
//! collision-shape extraction and the vehicle models:
//!
//! - [`Polygon2`]: a closed 2D contour with area/radius queries
//! - [`convex_hull`]: 2D convex hull of a point set
//! - [`Shape2p5`]: a convex contour extruded over a height band
//! - [`Pose3`]: a 6-DoF pose used to place visual models in the world

mod convex_hull;
mod polygon;
mod pose;
mod shape2p5;

pub use convex_hull::convex_hull;
pub use polygon::Polygon2;
pub use pose::Pose3;
pub use shape2p5::{Shape2p5, MIN_VOLUME};

/// A point in the 2D ground plane.
pub type Point2 = nalgebra::Point2<f64>;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in the 2D ground plane.
pub type Vec2 = nalgebra::Vector2<f64>;

/// Tolerance used when deciding whether two points coincide.
pub const POINT_EPSILON: f64 = 1e-12;
