//! Small-region noise removal on a bucket grid.
//!
//! Connected same-bucket regions (4-connectivity) are discovered in
//! row-major order. A region with fewer than `min_region_size` pixels
//! is reassigned, in place and immediately, to the bucket that borders
//! it most often. Later regions therefore see earlier reassignments,
//! which is why discovery order is fixed.

use serde::{Deserialize, Serialize};

use crate::types::BucketGrid;

/// Summary of one noise-removal pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseReport {
    /// Connected regions discovered.
    pub regions: usize,
    /// Regions that were reassigned to a neighboring bucket.
    pub merged: usize,
    /// Pixels whose bucket changed.
    pub pixels_changed: usize,
}

/// Merge regions smaller than `min_region_size` into their dominant
/// neighbor bucket.
///
/// A region with no external neighbor (it covers the whole grid) keeps
/// its bucket. Ties between neighbor buckets go to the lowest index.
/// `min_region_size` of 0 or 1 is a no-op.
pub fn remove_noise(grid: &mut BucketGrid, min_region_size: usize) -> NoiseReport {
    let w = grid.width() as usize;
    let h = grid.height() as usize;
    let color_count = usize::from(grid.color_count());
    let data = grid.as_mut_slice();

    let mut report = NoiseReport::default();
    if min_region_size <= 1 || w == 0 || h == 0 {
        return report;
    }

    let mut visited = vec![false; w * h];
    let mut region = Vec::new();
    let mut stack = Vec::new();
    let mut neighbor_counts = vec![0usize; color_count];

    for start in 0..w * h {
        if visited[start] {
            continue;
        }
        let bucket = data[start];

        region.clear();
        neighbor_counts.iter_mut().for_each(|c| *c = 0);
        stack.push(start);
        visited[start] = true;

        while let Some(idx) = stack.pop() {
            region.push(idx);
            let x = idx % w;
            let y = idx / w;
            for n in neighbors4(x, y, w, h).into_iter().flatten() {
                if data[n] == bucket {
                    if !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                } else if let Some(c) = neighbor_counts.get_mut(usize::from(data[n])) {
                    *c += 1;
                }
            }
        }

        report.regions += 1;
        if region.len() >= min_region_size {
            continue;
        }

        let mut best = bucket;
        let mut best_count = 0;
        for (b, &count) in neighbor_counts.iter().enumerate() {
            if count > best_count {
                best_count = count;
                best = u8::try_from(b).unwrap_or(bucket);
            }
        }
        if best != bucket {
            for &idx in &region {
                data[idx] = best;
            }
            report.merged += 1;
            report.pixels_changed += region.len();
        }
    }

    report
}

/// Indices of the in-bounds 4-neighbors of `(x, y)`.
fn neighbors4(x: usize, y: usize, w: usize, h: usize) -> [Option<usize>; 4] {
    let idx = y * w + x;
    [
        (x + 1 < w).then_some(idx + 1),
        (y + 1 < h).then_some(idx + w),
        (x > 0).then(|| idx - 1),
        (y > 0).then(|| idx - w),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn grid(width: u32, color_count: u8, rows: &[&[u8]]) -> BucketGrid {
        let data: Vec<u8> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        let height = u32::try_from(rows.len()).unwrap();
        BucketGrid::new(width, height, color_count, data).unwrap()
    }

    #[test]
    fn isolated_pixel_is_absorbed() {
        let mut g = grid(3, 2, &[&[0, 0, 0], &[0, 1, 0], &[0, 0, 0]]);
        let report = remove_noise(&mut g, 2);
        assert!(g.as_slice().iter().all(|&b| b == 0));
        assert_eq!(report.merged, 1);
        assert_eq!(report.pixels_changed, 1);
    }

    #[test]
    fn clean_input_is_unchanged() {
        let rows: [&[u8]; 4] = [
            &[0, 0, 1, 1],
            &[0, 0, 1, 1],
            &[2, 2, 2, 2],
            &[2, 2, 2, 2],
        ];
        let mut g = grid(4, 3, &rows);
        let before = g.clone();
        let report = remove_noise(&mut g, 4);
        assert_eq!(g, before);
        assert_eq!(report.merged, 0);
        assert_eq!(report.regions, 3);
    }

    #[test]
    fn second_pass_over_noisy_input_changes_nothing() {
        let rows: [&[u8]; 6] = [
            &[0, 0, 0, 0, 2, 2, 2, 2],
            &[0, 1, 0, 0, 2, 2, 0, 2],
            &[0, 0, 0, 1, 2, 2, 2, 2],
            &[0, 0, 0, 0, 2, 1, 1, 2],
            &[0, 2, 0, 0, 2, 2, 2, 2],
            &[0, 0, 0, 0, 2, 2, 2, 1],
        ];
        let mut g = grid(8, 3, &rows);
        let first = remove_noise(&mut g, 3);
        assert_eq!(first.merged, 6);
        assert_eq!(first.pixels_changed, 7);

        let cleaned = g.clone();
        let second = remove_noise(&mut g, 3);
        assert_eq!(g, cleaned);
        assert_eq!(second.merged, 0);
        assert_eq!(second.pixels_changed, 0);
        assert_eq!(second.regions, 2);
        for y in 0..6 {
            for x in 0..8 {
                assert_eq!(g.get(x, y), Some(if x < 4 { 0 } else { 2 }));
            }
        }
    }

    #[test]
    fn majority_neighbor_wins() {
        // The single 2 touches three 0s and one 1.
        let mut g = grid(3, 3, &[&[0, 0, 0], &[0, 2, 1], &[0, 0, 1]]);
        remove_noise(&mut g, 2);
        assert_eq!(g.get(1, 1), Some(0));
    }

    #[test]
    fn neighbor_tie_goes_to_lowest_bucket() {
        // The middle 1 touches two 2s and two 0s.
        let mut g = grid(3, 3, &[&[0, 0, 2], &[0, 1, 2], &[0, 2, 2]]);
        remove_noise(&mut g, 2);
        assert_eq!(g.get(1, 1), Some(0));
    }

    #[test]
    fn whole_grid_region_keeps_bucket() {
        let mut g = BucketGrid::filled(2, 2, 3, 1);
        remove_noise(&mut g, 100);
        assert!(g.as_slice().iter().all(|&b| b == 1));
    }

    #[test]
    fn diagonal_pixels_are_separate_regions() {
        // 4-connectivity: the two 1s only touch diagonally, so each is
        // a one-pixel region and both are absorbed.
        let mut g = grid(3, 2, &[&[1, 0, 0], &[0, 1, 0], &[0, 0, 0]]);
        let report = remove_noise(&mut g, 2);
        assert!(g.as_slice().iter().all(|&b| b == 0));
        assert_eq!(report.merged, 2);
    }

    #[test]
    fn min_region_size_one_is_noop() {
        let mut g = grid(3, 2, &[&[0, 1, 0], &[1, 0, 1]]);
        let before = g.clone();
        remove_noise(&mut g, 1);
        assert_eq!(g, before);
    }

    #[test]
    fn values_stay_in_range() {
        let data: Vec<u8> = (0..64u32)
            .map(|i| u8::try_from((i * 7 + i / 3) % 4).unwrap())
            .collect();
        let mut g = BucketGrid::new(8, 8, 4, data).unwrap();
        remove_noise(&mut g, 3);
        assert!(g.as_slice().iter().all(|&b| b < 4));
    }
}
