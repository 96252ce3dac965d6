//! Moore-neighbor boundary tracing with a nesting hierarchy.
//!
//! Foreground is labelled with 8-connectivity and background with
//! 4-connectivity (the dual pair that makes borders well defined), both
//! through `imageproc`'s connected-component labelling. Background
//! components that do not touch the image edge are holes.
//!
//! A single raster scan then emits contours in the order their first
//! pixel is met:
//!
//! * first pixel of a foreground component: trace its outer border,
//!   starting with the west neighbor as backtrack. Its parent is the
//!   hole containing the pixel to its left, if any.
//! * first pixel of a hole: trace the foreground border around it,
//!   starting at the pixel above with the hole pixel as backtrack. Its
//!   parent is the outer border of the component above.
//!
//! Parents are always met before their children, so parent indices
//! are known when a child is emitted.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::contour::{BorderKind, ExtractError};

/// Moore neighborhood, clockwise (y grows downward) starting east.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const WEST: usize = 4;
const SOUTH: usize = 2;

/// Background label for pixels connected to the image edge.
const OUTSIDE: u32 = u32::MAX;

/// A contour entry: points, border kind, parent index.
pub type ContourEntry = (Vec<(i32, i32)>, BorderKind, Option<usize>);

/// Trace every border in `mask` (non-zero = foreground).
///
/// # Errors
///
/// Returns [`ExtractError::Resource`] if the mask is too large to index
/// with `i32` coordinates.
pub fn trace_contours(mask: &GrayImage) -> Result<Vec<ContourEntry>, ExtractError> {
    let w = mask.width() as usize;
    let h = mask.height() as usize;
    if w == 0 || h == 0 {
        return Ok(Vec::new());
    }
    if i32::try_from(w).is_err() || i32::try_from(h).is_err() {
        return Err(ExtractError::Resource(format!(
            "mask {w}x{h} exceeds the traceable size"
        )));
    }

    let binary = GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
        Luma([if mask.get_pixel(x, y)[0] > 0 { 255 } else { 0 }])
    });
    let grid = Grid {
        w,
        h,
        fg: binary.as_raw().iter().map(|&v| v > 0).collect(),
    };
    let fg_labels = connected_components(&binary, Connectivity::Eight, Luma([0])).into_raw();
    let (bg_labels, hole_count) = label_background(&binary);
    let component_count = fg_labels.iter().copied().max().unwrap_or(0) as usize;

    let mut outer_of_component: Vec<Option<usize>> = vec![None; component_count + 1];
    let mut border_of_hole: Vec<Option<usize>> = vec![None; hole_count as usize + 1];
    let mut entries: Vec<ContourEntry> = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            if grid.fg[idx] {
                let c = fg_labels[idx] as usize;
                if outer_of_component[c].is_some() {
                    continue;
                }
                let parent = (x > 0)
                    .then(|| bg_labels[idx - 1])
                    .filter(|&l| l != OUTSIDE && l != 0)
                    .and_then(|l| border_of_hole[l as usize]);
                let points = trace(&grid, (x, y), WEST);
                outer_of_component[c] = Some(entries.len());
                entries.push((points, BorderKind::Outer, parent));
            } else {
                let l = bg_labels[idx];
                if l == OUTSIDE || l == 0 || border_of_hole[l as usize].is_some() {
                    continue;
                }
                // The first pixel of an enclosed hole always has
                // foreground directly above it.
                if y == 0 || !grid.fg[idx - w] {
                    continue;
                }
                let above = idx - w;
                let parent = outer_of_component[fg_labels[above] as usize];
                let points = trace(&grid, (x, y - 1), SOUTH);
                border_of_hole[l as usize] = Some(entries.len());
                entries.push((points, BorderKind::Hole, parent));
            }
        }
    }

    Ok(entries)
}

struct Grid {
    w: usize,
    h: usize,
    fg: Vec<bool>,
}

impl Grid {
    #[allow(clippy::cast_sign_loss)]
    fn is_fg(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        let (x, y) = (x as usize, y as usize);
        x < self.w && y < self.h && self.fg[y * self.w + x]
    }
}

/// Label 4-connected background components. Components touching the
/// image edge get [`OUTSIDE`]; enclosed ones keep their label. Returns
/// the labels and the largest label issued.
fn label_background(binary: &GrayImage) -> (Vec<u32>, u32) {
    let labels = connected_components(binary, Connectivity::Four, Luma([255]));
    let (w, h) = labels.dimensions();
    let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0);

    let mut touches_edge = vec![false; max_label as usize + 1];
    let edge = (0..w)
        .flat_map(|x| [(x, 0), (x, h - 1)])
        .chain((0..h).flat_map(|y| [(0, y), (w - 1, y)]));
    for (x, y) in edge {
        touches_edge[labels.get_pixel(x, y)[0] as usize] = true;
    }

    let labels = labels
        .into_raw()
        .into_iter()
        .map(|l| if l != 0 && touches_edge[l as usize] { OUTSIDE } else { l })
        .collect();
    (labels, max_label)
}

/// Moore-neighbor trace from `start`, whose neighbor in direction
/// `backtrack` is background.
///
/// Stops when the walk is back at `start` and about to repeat its first
/// move, or after a safety bound of steps.
fn trace(grid: &Grid, start: (usize, usize), backtrack: usize) -> Vec<(i32, i32)> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let start = (start.0 as i32, start.1 as i32);
    let max_steps = 4 * grid.w * grid.h + 8;

    let mut points = vec![start];
    let mut current = start;
    let mut back = backtrack;
    let mut first_move = None;

    for _ in 0..max_steps {
        let Some(k) = (1..8)
            .map(|i| (back + i) % 8)
            .find(|&d| grid.is_fg(current.0 + DIRECTIONS[d].0, current.1 + DIRECTIONS[d].1))
        else {
            // Isolated pixel.
            break;
        };
        let next = (current.0 + DIRECTIONS[k].0, current.1 + DIRECTIONS[k].1);

        if current == start {
            match first_move {
                None => first_move = Some(next),
                Some(first) if first == next => break,
                Some(_) => {}
            }
        }

        // The last background neighbor examined becomes the backtrack,
        // re-expressed relative to the new pixel.
        let prev = (k + 7) % 8;
        let back_pos = (current.0 + DIRECTIONS[prev].0, current.1 + DIRECTIONS[prev].1);
        let offset = (back_pos.0 - next.0, back_pos.1 - next.1);
        back = DIRECTIONS.iter().position(|&d| d == offset).unwrap_or(back);
        current = next;
        points.push(current);
    }

    if points.len() > 1 && points.last() == Some(&start) {
        points.pop();
    }
    points
}
