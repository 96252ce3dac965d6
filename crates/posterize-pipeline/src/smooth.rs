//! Majority-vote smoothing of a bucket grid.
//!
//! Each pass replaces every pixel by the bucket most common among its
//! 8-connected neighbors; the pixel's own bucket wins ties. Passes are
//! double-buffered so a pass never reads its own partial output.

use crate::types::BucketGrid;

/// Run `iterations` majority-vote passes over `grid`, in place.
///
/// Only values already present in the grid are ever written, so the
/// bucket range invariant is preserved.
pub fn smooth(grid: &mut BucketGrid, iterations: u32) {
    let w = grid.width() as usize;
    let h = grid.height() as usize;
    if iterations == 0 || w == 0 || h == 0 {
        return;
    }
    let color_count = usize::from(grid.color_count());

    let mut front = grid.as_slice().to_vec();
    let mut back = vec![0u8; w * h];
    let mut counts = vec![0u16; color_count];

    for _ in 0..iterations {
        let mut changed = false;
        for y in 0..h {
            for x in 0..w {
                let own = front[y * w + x];
                counts.iter_mut().for_each(|c| *c = 0);

                for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                        if nx == x && ny == y {
                            continue;
                        }
                        if let Some(c) = counts.get_mut(usize::from(front[ny * w + nx])) {
                            *c += 1;
                        }
                    }
                }

                let own_count = counts.get(usize::from(own)).copied().unwrap_or(0);
                let mut best = own;
                let mut best_count = own_count;
                for (b, &count) in counts.iter().enumerate() {
                    if count > best_count {
                        best_count = count;
                        best = u8::try_from(b).unwrap_or(own);
                    }
                }
                back[y * w + x] = best;
                changed |= best != own;
            }
        }
        std::mem::swap(&mut front, &mut back);
        if !changed {
            break;
        }
    }

    grid.as_mut_slice().copy_from_slice(&front);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn uniform_grid_is_stable() {
        for iterations in [0, 1, 5, 20] {
            let mut g = BucketGrid::filled(7, 5, 4, 2);
            let before = g.clone();
            smooth(&mut g, iterations);
            assert_eq!(g, before, "changed after {iterations} iterations");
        }
    }

    #[test]
    fn lone_pixel_is_voted_out() {
        let mut data = vec![0u8; 9];
        data[4] = 1;
        let mut g = BucketGrid::new(3, 3, 2, data).unwrap();
        smooth(&mut g, 1);
        assert!(g.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn own_value_wins_ties() {
        // (0,0) sees one neighbor of each bucket: 2, 0 and 1.
        let mut g = BucketGrid::new(2, 2, 3, vec![1, 2, 0, 1]).unwrap();
        smooth(&mut g, 1);
        assert_eq!(g.get(0, 0), Some(1));
    }

    #[test]
    fn pass_reads_only_previous_pass() {
        // A horizontal stripe: with double buffering the result is
        // symmetric left-to-right.
        let data = vec![
            0, 0, 0, 0, 0, //
            1, 1, 1, 1, 1, //
            0, 0, 0, 0, 0, //
        ];
        let mut g = BucketGrid::new(5, 3, 2, data).unwrap();
        smooth(&mut g, 1);
        let s = g.as_slice();
        for y in 0..3 {
            assert_eq!(s[y * 5], s[y * 5 + 4], "row {y} is not symmetric");
            assert_eq!(s[y * 5 + 1], s[y * 5 + 3], "row {y} is not symmetric");
        }
    }

    #[test]
    fn values_stay_in_range() {
        let data: Vec<u8> = (0..100u32)
            .map(|i| u8::try_from((i * 13 + i / 7) % 5).unwrap())
            .collect();
        let mut g = BucketGrid::new(10, 10, 5, data).unwrap();
        smooth(&mut g, 3);
        assert!(g.as_slice().iter().all(|&b| b < 5));
    }
}
