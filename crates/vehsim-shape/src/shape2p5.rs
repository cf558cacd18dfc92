//! 2.5D shapes: a convex contour extruded over a height band.

use serde::Serialize;

use crate::{convex_hull, Point2, Point3, Polygon2};

/// Volumes below this threshold (m³) are considered degenerate.
pub const MIN_VOLUME: f64 = 1e-8;

/// A 2D convex contour plus a `[z_min, z_max]` height band.
///
/// Immutable once built: a shape is computed once per visual model and then
/// shared by value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Shape2p5 {
    contour: Vec<Point2>,
    z_min: f64,
    z_max: f64,
}

impl Shape2p5 {
    /// Build a shape from a contour and a height band.
    ///
    /// The contour is taken as given; callers that need convexity go
    /// through [`Shape2p5::create_convex_hull_from_points`].
    pub fn new(contour: Vec<Point2>, z_min: f64, z_max: f64) -> Self {
        Self {
            contour,
            z_min,
            z_max,
        }
    }

    /// Convex hull of the XY projection of `points`.
    ///
    /// The height band spans the Z extent of the input. Collinear boundary
    /// points are dropped. An empty input yields an empty contour with a
    /// zero band.
    pub fn create_convex_hull_from_points(points: &[Point3]) -> Self {
        let (mut z_min, mut z_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let mut xy = Vec::with_capacity(points.len());
        for p in points {
            z_min = z_min.min(p.z);
            z_max = z_max.max(p.z);
            xy.push(Point2::new(p.x, p.y));
        }
        if xy.is_empty() {
            z_min = 0.0;
            z_max = 0.0;
        }

        Self {
            contour: convex_hull(&xy),
            z_min,
            z_max,
        }
    }

    /// Same contour, with the height band replaced.
    pub fn with_height_band(self, z_min: f64, z_max: f64) -> Self {
        Self {
            contour: self.contour,
            z_min,
            z_max,
        }
    }

    /// Contour vertices (counter-clockwise for hulls).
    pub fn contour(&self) -> &[Point2] {
        &self.contour
    }

    /// Contour as an owned polygon.
    pub fn to_polygon(&self) -> Polygon2 {
        Polygon2::new(self.contour.clone())
    }

    /// Lower end of the height band.
    pub fn z_min(&self) -> f64 {
        self.z_min
    }

    /// Upper end of the height band.
    pub fn z_max(&self) -> f64 {
        self.z_max
    }

    /// Area enclosed by the contour; zero for fewer than 3 vertices.
    pub fn area(&self) -> f64 {
        if self.contour.len() < 3 {
            return 0.0;
        }
        self.to_polygon().area()
    }

    /// `area() * (z_max - z_min)`. Never fails; degenerate shapes give 0.
    pub fn volume(&self) -> f64 {
        self.area() * (self.z_max - self.z_min).max(0.0)
    }

    /// Whether the shape is too thin to be used as a collision volume.
    pub fn is_degenerate(&self) -> bool {
        self.volume() < MIN_VOLUME
    }
}
