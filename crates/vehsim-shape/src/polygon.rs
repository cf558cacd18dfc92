//! Closed 2D polygons.

use serde::{Deserialize, Serialize};

use crate::Point2;

/// A 2D polygon (closed contour).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon2 {
    /// Vertices of the polygon in order.
    pub points: Vec<Point2>,
}

impl Polygon2 {
    /// Create a new polygon from points.
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Create a polygon from `[x, y]` pairs.
    pub fn from_xy(coords: &[[f64; 2]]) -> Self {
        Self {
            points: coords.iter().map(|c| Point2::new(c[0], c[1])).collect(),
        }
    }

    /// Axis-aligned rectangle centered at `(cx, cy)`.
    pub fn rectangle(cx: f64, cy: f64, half_x: f64, half_y: f64) -> Self {
        Self::from_xy(&[
            [cx - half_x, cy - half_y],
            [cx + half_x, cy - half_y],
            [cx + half_x, cy + half_y],
            [cx - half_x, cy + half_y],
        ])
    }

    /// Check if the polygon is empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Signed area of the polygon.
    /// Positive for counter-clockwise, negative for clockwise.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area / 2.0
    }

    /// Unsigned area.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Is the polygon counter-clockwise?
    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Ensure counter-clockwise winding.
    pub fn ensure_ccw(&mut self) {
        if !self.is_ccw() {
            self.points.reverse();
        }
    }

    /// Area-weighted centroid. Falls back to the vertex average for
    /// polygons without area.
    pub fn centroid(&self) -> Point2 {
        let n = self.points.len();
        if n == 0 {
            return Point2::origin();
        }
        let a = self.signed_area();
        if a.abs() < f64::EPSILON {
            let sum = self
                .points
                .iter()
                .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
            return Point2::from(sum / n as f64);
        }
        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            let cross = p.x * q.y - q.x * p.y;
            cx += (p.x + q.x) * cross;
            cy += (p.y + q.y) * cross;
        }
        Point2::new(cx / (6.0 * a), cy / (6.0 * a))
    }

    /// Largest distance from the local origin to any vertex.
    pub fn max_vertex_norm(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.coords.norm())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_signed_area_winding() {
        let mut poly = Polygon2::from_xy(&[[0.0, 0.0], [0.0, 1.0], [2.0, 1.0], [2.0, 0.0]]);
        assert_relative_eq!(poly.signed_area(), -2.0);
        assert!(!poly.is_ccw());

        poly.ensure_ccw();
        assert_relative_eq!(poly.signed_area(), 2.0);
    }

    #[test]
    fn test_degenerate_area() {
        let poly = Polygon2::from_xy(&[[0.0, 0.0], [1.0, 1.0]]);
        assert_eq!(poly.area(), 0.0);
    }

    #[test]
    fn test_centroid() {
        let poly = Polygon2::rectangle(1.0, -2.0, 0.5, 3.0);
        let c = poly.centroid();
        assert_relative_eq!(c.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(c.y, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_max_vertex_norm() {
        let poly = Polygon2::from_xy(&[[-0.4, -0.5], [0.6, 0.3], [0.0, 2.0]]);
        assert_relative_eq!(poly.max_vertex_norm(), 2.0);
    }
}
