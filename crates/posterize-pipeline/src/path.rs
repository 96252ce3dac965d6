//! Contour-to-path conversion.
//!
//! Turns one contour's closed point ring into an SVG path `d` string,
//! either as straight line segments or, when curve smoothing is
//! requested, as a fitted cubic Bezier loop (see [`crate::curve`]).

use std::fmt::Write;

use tracing::warn;

use crate::curve;
use crate::types::Point;

/// Path written for a contour with no point data.
pub const DEGENERATE_PATH: &str = "M0 0 Z";

/// Options controlling contour-to-path conversion.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PathOptions {
    /// RDP tolerance in pixels before curve fitting. `0.0` emits
    /// straight line segments through every contour point.
    pub curve_smoothing: f64,
}

impl PathOptions {
    /// Options for the given curve smoothing tolerance.
    #[must_use]
    pub const fn new(curve_smoothing: f64) -> Self {
        Self { curve_smoothing }
    }

    /// Whether curve fitting is requested.
    #[must_use]
    pub fn curves(&self) -> bool {
        self.curve_smoothing > 0.0
    }
}

/// Convert a closed contour ring to an SVG path `d` string.
///
/// An empty ring yields [`DEGENERATE_PATH`]. In curve mode a ring that
/// simplifies to fewer than 3 points yields an empty string.
#[must_use]
pub fn contour_path(points: &[(i32, i32)], options: &PathOptions) -> String {
    if points.is_empty() {
        warn!("contour has no points, emitting degenerate path");
        return DEGENERATE_PATH.to_owned();
    }
    let points: Vec<Point> = points.iter().copied().map(Point::from).collect();
    if options.curves() {
        curve::fit_curve(&points, options.curve_smoothing)
    } else {
        straight_path(&points)
    }
}

/// `M x y L x y … Z` through every point.
#[must_use]
pub fn straight_path(points: &[Point]) -> String {
    let mut d = String::with_capacity(points.len() * 10);
    for (i, p) in points.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        if i > 0 {
            d.push(' ');
        }
        let _ = write!(d, "{cmd}{} {}", fmt_coord(p.x), fmt_coord(p.y));
    }
    if !d.is_empty() {
        d.push_str(" Z");
    }
    d
}

/// Format a coordinate with at most two decimals and no trailing zeros.
#[must_use]
pub fn fmt_coord(v: f64) -> String {
    let r = (v * 100.0).round() / 100.0;
    if r == 0.0 {
        // Also folds -0.0.
        return "0".to_owned();
    }
    format!("{r}")
}
