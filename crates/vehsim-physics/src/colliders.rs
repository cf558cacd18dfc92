//! Collision shape generation from planar footprints.

use parry2d::math::{Point, Real};
use parry2d::shape::SharedShape;
use vehsim_shape::{convex_hull, Polygon2, POINT_EPSILON};

use crate::error::{PhysicsError, Result};

/// Minimum footprint area accepted for a collider (m²).
pub const MIN_FOOTPRINT_AREA: f64 = 1e-9;

/// Generate a convex collision shape from a footprint polygon.
///
/// Non-convex inputs are replaced by their convex hull.
///
/// # Arguments
///
/// * `poly` - Footprint in the body frame
/// * `name` - Owner name for error messages
pub fn polygon_to_collider(poly: &Polygon2, name: &str) -> Result<SharedShape> {
    let hull = validated_hull(poly, name)?;
    let points: Vec<Point<Real>> = hull
        .points
        .iter()
        .map(|p| Point::new(p.x as Real, p.y as Real))
        .collect();

    SharedShape::convex_polyline(points).ok_or_else(|| invalid(poly, name))
}

/// Rectangular wheel footprint seen from above: `diameter` long, `width` wide.
pub fn wheel_collider(diameter: f64, width: f64) -> SharedShape {
    SharedShape::cuboid((diameter * 0.5) as Real, (width * 0.5) as Real)
}

/// Convex hull of `poly` through [`vehsim_shape::convex_hull`], rejecting
/// empty and zero-area footprints.
pub fn validated_hull(poly: &Polygon2, name: &str) -> Result<Polygon2> {
    if poly.len() < 3 {
        return Err(invalid(poly, name));
    }
    let hull = Polygon2::new(convex_hull(&poly.points));
    if hull.len() < 3 || hull.area() < MIN_FOOTPRINT_AREA {
        return Err(invalid(poly, name));
    }
    if hull.len() < poly.len() && !same_vertices(&hull, poly) {
        log::warn!("footprint of '{name}' is not convex, using its convex hull");
    }
    Ok(hull)
}

fn same_vertices(hull: &Polygon2, poly: &Polygon2) -> bool {
    poly.points
        .iter()
        .all(|p| hull.points.iter().any(|h| (h - p).norm() <= POINT_EPSILON))
}

fn invalid(poly: &Polygon2, name: &str) -> PhysicsError {
    PhysicsError::InvalidChassis {
        vehicle: name.to_string(),
        vertices: poly.len(),
        area: poly.area(),
    }
}
