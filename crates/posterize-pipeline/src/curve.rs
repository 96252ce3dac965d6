//! Bezier curve fitting for closed contour rings.
//!
//! The ring is first simplified with Ramer-Douglas-Peucker, then every
//! edge `p1 → p2` becomes a cubic Bezier whose control points follow a
//! Catmull-Rom tangent estimate from the neighbors `p0` and `p3`:
//! `c1 = p1 + (p2 - p0) / 6`, `c2 = p2 - (p3 - p1) / 6`.

use std::fmt::Write;

use crate::path::fmt_coord;
use crate::simplify::simplify_ring;
use crate::types::Point;

/// Minimum ring size that can be fitted with curves.
pub const MIN_CURVE_POINTS: usize = 3;

/// Simplify `points` with `tolerance` and fit a closed Bezier loop.
///
/// Returns an empty string when fewer than [`MIN_CURVE_POINTS`] points
/// remain after simplification.
#[must_use]
pub fn fit_curve(points: &[Point], tolerance: f64) -> String {
    let simplified = simplify_ring(points, tolerance);
    bezier_loop(&simplified)
}

/// Closed Catmull-Rom → cubic Bezier loop through `points`.
///
/// Returns an empty string for fewer than [`MIN_CURVE_POINTS`] points.
#[must_use]
pub fn bezier_loop(points: &[Point]) -> String {
    let n = points.len();
    if n < MIN_CURVE_POINTS {
        return String::new();
    }

    let mut d = String::with_capacity(n * 40);
    let _ = write!(d, "M{} {}", fmt_coord(points[0].x), fmt_coord(points[0].y));
    for i in 0..n {
        let p0 = points[(i + n - 1) % n];
        let p1 = points[i];
        let p2 = points[(i + 1) % n];
        let p3 = points[(i + 2) % n];

        let c1 = Point::new(p1.x + (p2.x - p0.x) / 6.0, p1.y + (p2.y - p0.y) / 6.0);
        let c2 = Point::new(p2.x - (p3.x - p1.x) / 6.0, p2.y - (p3.y - p1.y) / 6.0);
        let _ = write!(
            d,
            " C{} {} {} {} {} {}",
            fmt_coord(c1.x),
            fmt_coord(c1.y),
            fmt_coord(c2.x),
            fmt_coord(c2.y),
            fmt_coord(p2.x),
            fmt_coord(p2.y),
        );
    }
    d.push_str(" Z");
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_points_give_empty_path() {
        let pts = [Point::new(0.0, 0.0), Point::new(5.0, 5.0)];
        assert_eq!(bezier_loop(&pts), "");
        assert_eq!(fit_curve(&pts, 0.0), "");
    }

    #[test]
    fn triangle_control_points() {
        let pts = [Point::new(0.0, 0.0), Point::new(6.0, 0.0), Point::new(0.0, 6.0)];
        let d = bezier_loop(&pts);
        // Edge (0,0)→(6,0): p0=(0,6), p3=(0,6).
        // c1 = (0,0) + ((6,0)-(0,6))/6 = (1,-1)
        // c2 = (6,0) - ((0,6)-(0,0))/6 = (6,-1)
        assert!(d.starts_with("M0 0 C1 -1 6 -1 6 0 "), "{d}");
        assert_eq!(d.matches('C').count(), 3);
        assert!(d.ends_with(" C-1 6 -1 1 0 0 Z"), "{d}");
    }

    #[test]
    fn loop_returns_to_start() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        let d = bezier_loop(&pts);
        assert!(d.ends_with(" 0 0 Z"), "{d}");
    }
}
