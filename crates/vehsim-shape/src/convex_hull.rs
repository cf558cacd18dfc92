//! 2D convex hull of a point set.

use parry2d_f64::transformation;

use crate::{Point2, Polygon2, POINT_EPSILON};

/// Compute the convex hull of a 2D point set.
///
/// Returns the hull vertices in counter-clockwise order. Points lying on a
/// hull edge are not part of the result, and duplicated inputs appear at
/// most once. Non-finite inputs are ignored.
///
/// Inputs without area yield their distinct extreme points: none, a single
/// point, or the two ends of a segment.
pub fn convex_hull(points: &[Point2]) -> Vec<Point2> {
    let pts: Vec<Point2> = points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();

    if let Some(extremes) = flat_extremes(&pts) {
        return extremes;
    }

    let mut hull = Polygon2::new(transformation::convex_hull(&pts));
    drop_collinear(&mut hull.points);
    hull.ensure_ccw();
    hull.points
}

/// Extreme points of a set spanning no area, or `None` if it has some.
fn flat_extremes(pts: &[Point2]) -> Option<Vec<Point2>> {
    let Some(&first) = pts.first() else {
        return Some(Vec::new());
    };
    let a = farthest_from(pts, &first);
    if (a - first).norm() <= POINT_EPSILON {
        return Some(vec![first]);
    }
    let b = farthest_from(pts, &a);
    let span = (b - a).norm();
    // |cross| is span times the distance to the line through a and b.
    let has_area = pts.iter().any(|p| cross(&a, &b, p).abs() > POINT_EPSILON * span);
    (!has_area).then(|| vec![a, b])
}

fn farthest_from(pts: &[Point2], origin: &Point2) -> Point2 {
    pts.iter()
        .copied()
        .max_by(|p, q| (p - origin).norm_squared().total_cmp(&(q - origin).norm_squared()))
        .unwrap_or(*origin)
}

/// Remove hull vertices that coincide with a neighbor or lie on the segment
/// joining their neighbors.
fn drop_collinear(hull: &mut Vec<Point2>) {
    let mut i = 0;
    while hull.len() > 3 && i < hull.len() {
        let n = hull.len();
        let prev = hull[(i + n - 1) % n];
        let next = hull[(i + 1) % n];
        let span = (next - prev).norm();
        if cross(&prev, &hull[i], &next).abs() <= POINT_EPSILON * span.max(1.0) {
            hull.remove(i);
            i = i.saturating_sub(1);
        } else {
            i += 1;
        }
    }
}

/// Z component of `(a - o) x (b - o)`.
fn cross(o: &Point2, a: &Point2, b: &Point2) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pts(coords: &[[f64; 2]]) -> Vec<Point2> {
        coords.iter().map(|c| Point2::new(c[0], c[1])).collect()
    }

    #[test]
    fn test_square_with_interior_points() {
        let input = pts(&[
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
            [0.5, 0.5],
            [0.2, 0.7],
        ]);
        let hull = convex_hull(&input);
        assert_eq!(hull.len(), 4);
        assert_relative_eq!(Polygon2::new(hull).signed_area(), 1.0);
    }

    #[test]
    fn test_collinear_points_excluded() {
        let input = pts(&[
            [0.0, 0.0],
            [0.5, 0.0],
            [1.0, 0.0],
            [1.0, 0.5],
            [1.0, 1.0],
            [0.0, 1.0],
        ]);
        let hull = convex_hull(&input);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point2::new(0.5, 0.0)));
        assert!(!hull.contains(&Point2::new(1.0, 0.5)));
    }

    #[test]
    fn test_duplicates_and_degenerate_inputs() {
        assert!(convex_hull(&[]).is_empty());

        let same = pts(&[[1.0, 2.0], [1.0, 2.0], [1.0, 2.0]]);
        assert_eq!(convex_hull(&same).len(), 1);

        let line = pts(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]);
        let hull = convex_hull(&line);
        assert_eq!(hull.len(), 2);
        assert_eq!(Polygon2::new(hull).area(), 0.0);
    }

    #[test]
    fn test_non_finite_points_ignored() {
        let input = pts(&[
            [0.0, 0.0],
            [2.0, 0.0],
            [f64::NAN, 1.0],
            [2.0, 2.0],
            [f64::INFINITY, 0.0],
            [0.0, 2.0],
        ]);
        let hull = convex_hull(&input);
        assert_eq!(hull.len(), 4);
        assert!(hull.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert_relative_eq!(Polygon2::new(hull).signed_area(), 4.0);
    }

    #[test]
    fn test_many_points_on_hull_edges() {
        // Dense samples along every edge of a rectangle plus its corners.
        let mut input = Vec::new();
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            input.push(Point2::new(3.0 * t, 0.0));
            input.push(Point2::new(3.0 * t, 1.0));
            input.push(Point2::new(0.0, t));
            input.push(Point2::new(3.0, t));
        }
        let hull = convex_hull(&input);
        assert_eq!(hull.len(), 4);
        assert_relative_eq!(Polygon2::new(hull).signed_area(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_convex_input_is_its_own_hull() {
        // Points on a circle: every one of them is a hull vertex.
        let n = 17;
        let input: Vec<Point2> = (0..n)
            .map(|i| {
                let a = i as f64 * std::f64::consts::TAU / n as f64;
                Point2::new(2.0 * a.cos(), 2.0 * a.sin())
            })
            .collect();
        let hull = convex_hull(&input);
        assert_eq!(hull.len(), n);
        for p in &hull {
            assert!(input.contains(p));
        }
        assert_relative_eq!(
            Polygon2::new(hull).area(),
            Polygon2::new(input).area(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_hull_area_dominates_any_triangle() {
        let input = pts(&[
            [0.1, 0.3],
            [2.0, -1.0],
            [3.5, 0.4],
            [1.2, 2.9],
            [1.0, 1.0],
            [2.2, 0.8],
            [-0.5, 1.5],
        ]);
        let hull = convex_hull(&input);
        let hull_area = Polygon2::new(hull.clone()).area();
        assert!(Polygon2::new(hull).is_ccw());

        for i in 0..input.len() {
            for j in (i + 1)..input.len() {
                for k in (j + 1)..input.len() {
                    let tri = Polygon2::new(vec![input[i], input[j], input[k]]);
                    assert!(tri.area() <= hull_area + 1e-12);
                }
            }
        }
    }
}
