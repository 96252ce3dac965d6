//! Tone-simulating hatching lines.
//!
//! Darker tones get tighter spacing, and tones below
//! [`CROSS_HATCH_TONE`] get a second, perpendicular line set. Lines are
//! generated across a bounding rectangle and then clipped to the shape
//! (outer ring plus hole rings) with the even-odd rule, so the strokes
//! stay inside the shape without relying on a renderer clip path.

use std::fmt::Write;

use geo::Rect;
use tracing::debug;

use crate::path::fmt_coord;
use crate::settings::CrossHatchingSettings;
use crate::types::{Point, RegionType, VectorPath};

/// Stroke paint for hatching and pen outlines.
pub const INK: &str = "#000000";

/// Tones below this get a second, perpendicular line set.
pub const CROSS_HATCH_TONE: f64 = 0.5;

/// Tones below this get their spacing halved.
pub const DENSE_TONE: f64 = 0.3;

const MIN_SPACING: f64 = 2.0;
const MAX_SPACING: f64 = 20.0;

/// Spacing multiplier of the secondary line set.
const CROSS_SPACING_FACTOR: f64 = 1.5;

/// Clipped pieces shorter than this are dropped.
const MIN_SEGMENT_LENGTH: f64 = 1e-6;

/// A straight hatching stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HatchLine {
    /// First endpoint.
    pub start: Point,
    /// Second endpoint.
    pub end: Point,
}

impl HatchLine {
    /// Length of the stroke.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    fn at(&self, t: f64) -> Point {
        Point::new(
            (self.end.x - self.start.x).mul_add(t, self.start.x),
            (self.end.y - self.start.y).mul_add(t, self.start.y),
        )
    }
}

/// Distance between adjacent lines for a tone in `[0, 1]` (1 = light).
///
/// `max(2, min(20, 20·(0.5 + tone) / density))`, halved below
/// [`DENSE_TONE`]. Non-increasing as the tone darkens.
#[must_use]
pub fn hatch_spacing(tone: f64, density: u8) -> f64 {
    let tone = tone.clamp(0.0, 1.0);
    let density = f64::from(density.max(1));
    let spacing = (MAX_SPACING * (0.5 + tone) / density).clamp(MIN_SPACING, MAX_SPACING);
    if tone < DENSE_TONE {
        spacing / 2.0
    } else {
        spacing
    }
}

/// Parallel lines across `bounds` for the given tone.
///
/// Each line spans the full diagonal of `bounds`, centered on it, and
/// lines are offset by whole multiples of the spacing along the normal
/// of the hatch angle. Below [`CROSS_HATCH_TONE`] a second set at
/// `angle + 90°` with 1.5× spacing is appended.
#[must_use]
pub fn generate_hatch_lines(
    bounds: Rect<f64>,
    tone: f64,
    settings: &CrossHatchingSettings,
) -> Vec<HatchLine> {
    let spacing = hatch_spacing(tone, settings.density);
    let mut lines = line_set(bounds, settings.angle, spacing);
    if tone < CROSS_HATCH_TONE {
        let cross_angle = (settings.angle + 90.0).rem_euclid(180.0);
        lines.extend(line_set(bounds, cross_angle, spacing * CROSS_SPACING_FACTOR));
    }
    debug!(tone, spacing, lines = lines.len(), "generated hatch lines");
    lines
}

fn line_set(bounds: Rect<f64>, angle_degrees: f64, spacing: f64) -> Vec<HatchLine> {
    let center = bounds.center();
    let half = bounds.width().hypot(bounds.height()) / 2.0;
    if spacing.is_nan() || spacing <= 0.0 || !half.is_finite() {
        return Vec::new();
    }

    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let normal = (-sin, cos);

    #[allow(clippy::cast_possible_truncation)]
    let steps = (half / spacing).floor() as i64;
    (-steps..=steps)
        .map(|k| {
            #[allow(clippy::cast_precision_loss)]
            let offset = k as f64 * spacing;
            let mx = normal.0.mul_add(offset, center.x);
            let my = normal.1.mul_add(offset, center.y);
            HatchLine {
                start: Point::new(cos.mul_add(-half, mx), sin.mul_add(-half, my)),
                end: Point::new(cos.mul_add(half, mx), sin.mul_add(half, my)),
            }
        })
        .collect()
}

/// Clip lines to the region bounded by `rings` under the even-odd rule.
///
/// Pass the outer ring followed by its hole rings. A line that crosses
/// the shape several times yields several segments.
#[must_use]
pub fn clip_to_shape(lines: &[HatchLine], rings: &[Vec<Point>]) -> Vec<HatchLine> {
    let mut clipped = Vec::new();
    let mut hits: Vec<f64> = Vec::new();

    for line in lines {
        let dir = (line.end.x - line.start.x, line.end.y - line.start.y);
        let len_sq = dir.0.mul_add(dir.0, dir.1 * dir.1);
        if len_sq == 0.0 {
            continue;
        }

        hits.clear();
        for ring in rings {
            let n = ring.len();
            if n < 2 {
                continue;
            }
            for i in 0..n {
                let a = ring[i];
                let b = ring[(i + 1) % n];
                let side_a = dir.0.mul_add(a.y - line.start.y, -(dir.1 * (a.x - line.start.x)));
                let side_b = dir.0.mul_add(b.y - line.start.y, -(dir.1 * (b.x - line.start.x)));
                // Half-open rule: a vertex on the line counts once.
                if (side_a > 0.0) == (side_b > 0.0) {
                    continue;
                }
                let s = side_a / (side_a - side_b);
                let qx = (b.x - a.x).mul_add(s, a.x);
                let qy = (b.y - a.y).mul_add(s, a.y);
                let t = dir.0.mul_add(qx - line.start.x, dir.1 * (qy - line.start.y)) / len_sq;
                hits.push(t);
            }
        }

        hits.sort_by(f64::total_cmp);
        for pair in hits.chunks_exact(2) {
            let t0 = pair[0].clamp(0.0, 1.0);
            let t1 = pair[1].clamp(0.0, 1.0);
            let segment = HatchLine {
                start: line.at(t0),
                end: line.at(t1),
            };
            if segment.length() > MIN_SEGMENT_LENGTH {
                clipped.push(segment);
            }
        }
    }

    clipped
}

/// One stroke-only [`VectorPath`] per line.
#[must_use]
pub fn hatch_paths(lines: &[HatchLine], settings: &CrossHatchingSettings) -> Vec<VectorPath> {
    lines
        .iter()
        .map(|line| {
            let mut d = String::new();
            let _ = write!(
                d,
                "M{} {} L{} {}",
                fmt_coord(line.start.x),
                fmt_coord(line.start.y),
                fmt_coord(line.end.x),
                fmt_coord(line.end.y),
            );
            VectorPath::stroked(d, INK, settings.line_width).with_region_type(RegionType::Hatch)
        })
        .collect()
}
