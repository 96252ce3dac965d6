//! Region grouping: merge same-bucket shapes that do not overlap into
//! shared drawing groups.
//!
//! The contour hierarchy is walked depth-first from every root, in
//! index order. Even-depth contours are fill boundaries; their direct
//! children (odd depth) are holes rendered as sub-paths of the same
//! `d` string, relying on the even-odd fill rule. Each fill boundary
//! joins the first existing group (in creation order) whose members it
//! does not overlap, or starts a new one. The result is deterministic.
//!
//! A fill boundary without points cannot be placed, so it gets a group
//! of its own holding [`DEGENERATE_PATH`].

use geo::{BoundingRect, Contains, Intersects, LineString, Polygon, Rect};
use tracing::warn;

use crate::contour::ContourSet;
use crate::path::{DEGENERATE_PATH, PathOptions, contour_path};

/// Number of evenly spaced boundary samples used by the precise
/// overlap test.
pub const OVERLAP_SAMPLES: usize = 12;

/// One fill boundary inside a [`RegionGroup`], with its holes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    /// Index of the fill-boundary contour.
    pub contour: usize,
    /// Indices of its direct hole children.
    pub holes: Vec<usize>,
}

/// A set of non-overlapping fill boundaries drawn as one path.
#[derive(Debug, Clone)]
pub struct RegionGroup {
    /// Member fill boundaries, in merge order.
    pub members: Vec<GroupMember>,
    /// Path strings: each member's boundary followed by its holes.
    pub paths: Vec<String>,
    shapes: Vec<Shape>,
    degenerate: bool,
}

impl RegionGroup {
    /// The group's combined path `d`: all non-empty member paths joined
    /// with a space.
    #[must_use]
    pub fn path_data(&self) -> String {
        self.paths
            .iter()
            .filter(|p| !p.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `true` for the stand-in group of a fill boundary without points.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    fn accepts(&self, shape: &Shape) -> bool {
        !self.degenerate && self.shapes.iter().all(|member| !member.overlaps(shape))
    }
}

/// Geometry cached per fill boundary for the overlap tests.
#[derive(Debug, Clone)]
struct Shape {
    rect: Rect<f64>,
    polygon: Polygon<f64>,
    samples: Vec<geo::Point<f64>>,
}

impl Shape {
    fn new(points: &[(i32, i32)]) -> Option<Self> {
        let ring: Vec<(f64, f64)> = points
            .iter()
            .map(|&(x, y)| (f64::from(x), f64::from(y)))
            .collect();
        let polygon = Polygon::new(LineString::from(ring), Vec::new());
        let rect = polygon.bounding_rect()?;
        Some(Self {
            rect,
            samples: sample_points(points),
            polygon,
        })
    }

    /// Bounding boxes first; if they intersect, any sample of one shape
    /// strictly inside the other counts as overlap.
    fn overlaps(&self, other: &Self) -> bool {
        if !self.rect.intersects(&other.rect) {
            return false;
        }
        self.samples.iter().any(|p| other.polygon.contains(p))
            || other.samples.iter().any(|p| self.polygon.contains(p))
    }
}

/// Up to [`OVERLAP_SAMPLES`] points evenly spaced along the ring.
fn sample_points(points: &[(i32, i32)]) -> Vec<geo::Point<f64>> {
    let n = points.len();
    let count = n.min(OVERLAP_SAMPLES);
    (0..count)
        .map(|i| {
            let (x, y) = points[i * n / count];
            geo::Point::new(f64::from(x), f64::from(y))
        })
        .collect()
}

/// Group the fill boundaries of one bucket's contour hierarchy.
#[must_use]
pub fn group_regions(set: &ContourSet, options: &PathOptions) -> Vec<RegionGroup> {
    let mut groups: Vec<RegionGroup> = Vec::new();
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in set.roots() {
        stack.push((root, 0));
        while let Some((index, depth)) = stack.pop() {
            let Some(contour) = set.get(index) else {
                continue;
            };
            // Reverse push keeps children in index order.
            for &child in contour.children.iter().rev() {
                stack.push((child, depth + 1));
            }
            if depth % 2 == 1 {
                continue;
            }

            let Some(shape) = Shape::new(&contour.points) else {
                warn!(contour = index, "fill boundary has no points, emitting degenerate group");
                groups.push(RegionGroup {
                    members: vec![GroupMember {
                        contour: index,
                        holes: contour.children.clone(),
                    }],
                    paths: vec![DEGENERATE_PATH.to_owned()],
                    shapes: Vec::new(),
                    degenerate: true,
                });
                continue;
            };
            let mut path = contour_path(&contour.points, options);
            for &hole in &contour.children {
                if let Some(h) = set.get(hole) {
                    let hole_path = contour_path(&h.points, options);
                    if !hole_path.is_empty() {
                        if !path.is_empty() {
                            path.push(' ');
                        }
                        path.push_str(&hole_path);
                    }
                }
            }
            let member = GroupMember {
                contour: index,
                holes: contour.children.clone(),
            };

            match groups.iter_mut().find(|g| g.accepts(&shape)) {
                Some(group) => {
                    group.members.push(member);
                    group.paths.push(path);
                    group.shapes.push(shape);
                }
                None => groups.push(RegionGroup {
                    members: vec![member],
                    paths: vec![path],
                    shapes: vec![shape],
                    degenerate: false,
                }),
            }
        }
    }

    groups
}
