//! Path simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Reduces point count by removing points within a given tolerance of
//! the chord between retained neighbors. Contours are closed rings, so
//! [`simplify_ring`] first splits the ring at the point farthest from
//! its start and simplifies both arcs.

use crate::types::Point;

/// Simplify a closed ring (last point connects back to the first).
///
/// The ring is anchored at its first point and at the point farthest
/// from it; both arcs between the anchors are simplified with RDP. The
/// result never repeats the first point at the end.
#[must_use = "returns the simplified ring"]
pub fn simplify_ring(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let far = points
        .iter()
        .enumerate()
        .skip(1)
        .max_by(|(_, a), (_, b)| {
            a.distance_squared(first)
                .total_cmp(&b.distance_squared(first))
        })
        .map_or(points.len() / 2, |(i, _)| i);

    // Walk the ring as an open polyline that ends back at the start.
    let mut closed = points.to_vec();
    closed.push(first);
    let last = closed.len() - 1;

    let mut kept = vec![false; closed.len()];
    kept[0] = true;
    kept[far] = true;
    kept[last] = true;
    rdp_recurse(&closed, 0, far, tolerance, &mut kept);
    rdp_recurse(&closed, far, last, tolerance, &mut kept);
    kept[last] = false;

    retain_kept(&closed, &kept)
}

fn retain_kept(points: &[Point], kept: &[bool]) -> Vec<Point> {
    points
        .iter()
        .zip(kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// line segment between them. If that distance exceeds `tolerance`, the
/// point is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ring_unchanged() {
        let ring = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        assert_eq!(simplify_ring(&ring, 1.0), ring);
    }

    #[test]
    fn zero_tolerance_preserves_ring() {
        let ring: Vec<Point> = [(0, 0), (1, 0), (2, 1), (2, 2), (1, 2), (0, 1)]
            .into_iter()
            .map(Point::from)
            .collect();
        assert_eq!(simplify_ring(&ring, 0.0), ring);
    }

    #[test]
    fn square_ring_reduces_to_corners() {
        // Pixel walk around a 4x4 square: 12 boundary points.
        let ring: Vec<Point> = [
            (0, 0),
            (1, 0),
            (2, 0),
            (3, 0),
            (3, 1),
            (3, 2),
            (3, 3),
            (2, 3),
            (1, 3),
            (0, 3),
            (0, 2),
            (0, 1),
        ]
        .into_iter()
        .map(Point::from)
        .collect();
        let simplified = simplify_ring(&ring, 0.5);
        assert_eq!(
            simplified,
            vec![
                Point::new(0.0, 0.0),
                Point::new(3.0, 0.0),
                Point::new(3.0, 3.0),
                Point::new(0.0, 3.0),
            ]
        );
    }

    #[test]
    fn ring_with_large_tolerance_keeps_anchors() {
        let ring: Vec<Point> = [(0, 0), (4, 1), (8, 0), (4, -1)]
            .into_iter()
            .map(Point::from)
            .collect();
        let simplified = simplify_ring(&ring, 100.0);
        assert_eq!(simplified, vec![Point::new(0.0, 0.0), Point::new(8.0, 0.0)]);
    }

    #[test]
    fn perpendicular_distance_diagonal_segment() {
        let d = perpendicular_distance(
            Point::new(2.0, -1.0),
            Point::new(0.0, 0.0),
            Point::new(4.0, 2.0),
        );
        let expected = 8.0 / 20.0_f64.sqrt();
        assert!((d - expected).abs() < 1e-10, "got {d}, expected {expected}");
    }

    #[test]
    fn perpendicular_distance_coincident_endpoints() {
        let d = perpendicular_distance(
            Point::new(3.0, 4.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
        );
        assert!((d - 5.0).abs() < 1e-10);
    }
}
