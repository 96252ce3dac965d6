//! Luminance bucketization and posterized raster output.
//!
//! Each pixel's luminance `0.299*R + 0.587*G + 0.114*B` is compared
//! against ascending thresholds; the bucket is the first index whose
//! threshold is at least the luminance, or the last bucket.

use crate::settings::round_to_u8;
use crate::types::{BucketGrid, RgbaImage};

/// Perceptual luminance of an RGB triple, in `[0, 255]`.
#[must_use]
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.114f64.mul_add(
        f64::from(b),
        0.299f64.mul_add(f64::from(r), 0.587 * f64::from(g)),
    )
}

/// Bucket index for a luminance value.
///
/// `thresholds` holds `color_count - 1` ascending cut points. The
/// result is the first `b` with `lum <= thresholds[b]`, else
/// `color_count - 1`.
#[must_use]
pub fn bucket_for(lum: f64, thresholds: &[u8], color_count: u8) -> u8 {
    let last = color_count.saturating_sub(1);
    thresholds
        .iter()
        .take(usize::from(last))
        .position(|&t| lum <= f64::from(t))
        .map_or(last, |b| u8::try_from(b).unwrap_or(last))
}

/// Assign every pixel of `pixels` to a bucket.
///
/// `color_count` is clamped to at least 2; a single bucket would
/// degenerate into a uniform image.
#[must_use = "returns the bucket grid"]
pub fn bucketize(pixels: &RgbaImage, thresholds: &[u8], color_count: u8) -> BucketGrid {
    let color_count = color_count.max(2);
    let data = pixels
        .pixels()
        .map(|p| {
            let [r, g, b, _] = p.0;
            bucket_for(luminance(r, g, b), thresholds, color_count)
        })
        .collect();
    BucketGrid::from_parts(pixels.width(), pixels.height(), color_count, data)
}

/// Gray level drawn for a bucket.
///
/// Bucket 0 is black and the last bucket is white. Intermediate buckets
/// take the threshold that admits them (`thresholds[b - 1]`) when custom
/// thresholds were supplied, else an even `round(255 * b / (n - 1))`.
#[must_use]
pub fn bucket_tone(bucket: u8, color_count: u8, custom_thresholds: Option<&[u8]>) -> u8 {
    let last = color_count.saturating_sub(1).max(1);
    if bucket == 0 {
        return 0;
    }
    if bucket >= last {
        return 255;
    }
    if let Some(&t) = custom_thresholds.and_then(|t| t.get(usize::from(bucket - 1))) {
        return t;
    }
    round_to_u8(255.0 * f64::from(bucket) / f64::from(last))
}

/// Render a bucket grid as a gray RGBA image.
///
/// When `source` is given, alpha is copied from it (it must have the
/// grid's dimensions); otherwise every pixel is opaque.
#[must_use = "returns the posterized image"]
pub fn posterize_pixels(
    buckets: &BucketGrid,
    custom_thresholds: Option<&[u8]>,
    source: Option<&RgbaImage>,
) -> RgbaImage {
    let color_count = buckets.color_count();
    let tones: Vec<u8> = (0..color_count)
        .map(|b| bucket_tone(b, color_count, custom_thresholds))
        .collect();
    let alpha = source.filter(|s| s.dimensions() == (buckets.width(), buckets.height()));

    let mut out = RgbaImage::new(buckets.width(), buckets.height());
    for (i, (pixel, &b)) in out.pixels_mut().zip(buckets.as_slice()).enumerate() {
        let tone = tones.get(usize::from(b)).copied().unwrap_or(255);
        let a = alpha
            .and_then(|s| s.as_raw().get(i * 4 + 3).copied())
            .unwrap_or(255);
        pixel.0 = [tone, tone, tone, a];
    }
    out
}

/// Paint black borders along bucket boundaries.
///
/// A pixel is a boundary seed when a 4-neighbor lies in a different
/// bucket; every pixel within `thickness - 1` (Chebyshev distance) of a
/// seed is painted black. The bucket grid is not modified.
pub fn draw_borders(image: &mut RgbaImage, buckets: &BucketGrid, thickness: u32) {
    if thickness == 0 || image.dimensions() != (buckets.width(), buckets.height()) {
        return;
    }
    let w = buckets.width() as usize;
    let h = buckets.height() as usize;
    let data = buckets.as_slice();
    let reach = (thickness - 1) as usize;

    let mut border = vec![false; w * h];
    for y in 0..h {
        for x in 0..w {
            let b = data[y * w + x];
            let differs = (x + 1 < w && data[y * w + x + 1] != b)
                || (y + 1 < h && data[(y + 1) * w + x] != b)
                || (x > 0 && data[y * w + x - 1] != b)
                || (y > 0 && data[(y - 1) * w + x] != b);
            if !differs {
                continue;
            }
            for by in y.saturating_sub(reach)..=(y + reach).min(h - 1) {
                for bx in x.saturating_sub(reach)..=(x + reach).min(w - 1) {
                    border[by * w + bx] = true;
                }
            }
        }
    }

    for (pixel, &is_border) in image.pixels_mut().zip(&border) {
        if is_border {
            pixel.0 = [0, 0, 0, pixel.0[3]];
        }
    }
}
