//! Pen-drawing strategy: stroke-only outlines for plotters.
//!
//! Every bucket, the darkest included, becomes one layer of black
//! outlines. Holes are traced only when `outline_regions` is set;
//! otherwise just the outermost boundaries are extracted. Mid-tone
//! buckets can additionally be hatched, one clipped line set per fill
//! boundary.

use tracing::debug;

use crate::contour::{ContourExtractor, RetrievalMode};
use crate::hatch::INK;
use crate::path::{PathOptions, contour_path};
use crate::settings::VectorSettings;
use crate::strategy::{
    BACKGROUND, bucket_tone_level, fallback, for_each_bucket, hatch_shape, is_mid_tone,
};
use crate::types::{BucketGrid, VectorLayer, VectorOutput, VectorPath};

/// Stroke width of pen outlines.
pub const OUTLINE_STROKE_WIDTH: f64 = 1.0;

pub(crate) fn convert(
    buckets: &BucketGrid,
    settings: &VectorSettings,
    extractor: &dyn ContourExtractor,
) -> VectorOutput {
    let color_count = buckets.color_count();
    let hatch_settings = &settings.cross_hatching_settings;
    let options = PathOptions::new(settings.curve_smoothing);
    let mode = if hatch_settings.outline_regions {
        RetrievalMode::Tree
    } else {
        RetrievalMode::External
    };
    let hatching = settings.hatching_enabled();
    let mut layers = Vec::new();

    let result = for_each_bucket(buckets, extractor, mode, |bucket, set| {
        let mut paths: Vec<VectorPath> = set
            .iter()
            .map(|c| contour_path(&c.points, &options))
            .filter(|d| !d.is_empty())
            .map(|d| VectorPath::stroked(d, INK, OUTLINE_STROKE_WIDTH))
            .collect();

        if hatching && is_mid_tone(bucket, color_count) {
            let tone = bucket_tone_level(bucket, color_count);
            let before = paths.len();
            for (index, contour) in set.iter().enumerate() {
                if set.depth(index) % 2 == 0 {
                    paths.extend(hatch_shape(
                        &set,
                        index,
                        &contour.children,
                        tone,
                        hatch_settings,
                    ));
                }
            }
            debug!(bucket, tone, hatch_paths = paths.len() - before, "hatched bucket");
        }

        if !paths.is_empty() {
            layers.push(
                VectorLayer::new(format!("bucket-{bucket}"), paths)
                    .with_label(format!("Bucket {}", bucket + 1)),
            );
        }
    });

    match result {
        Ok(()) => VectorOutput {
            dimensions: buckets.dimensions(),
            layers,
            background: BACKGROUND.to_owned(),
        },
        Err(reason) => fallback(buckets, &reason),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::contour::ContourExtractorKind;
    use crate::settings::CrossHatchingSettings;
    use crate::types::{NO_PAINT, RegionType};

    /// A bucket-1 ring (with a bucket-0 hole) on a bucket-2 background.
    fn ring() -> BucketGrid {
        let mut data = vec![2u8; 12 * 12];
        for y in 2..10 {
            for x in 2..10 {
                let inner = (4..8).contains(&x) && (4..8).contains(&y);
                data[y * 12 + x] = if inner { 0 } else { 1 };
            }
        }
        BucketGrid::new(12, 12, 3, data).unwrap()
    }

    fn outline_count(layer: &VectorLayer) -> usize {
        layer
            .paths
            .iter()
            .filter(|p| p.region_type == Some(RegionType::Outline))
            .count()
    }

    #[test]
    fn one_stroke_only_layer_per_bucket() {
        let out = convert(
            &ring(),
            &VectorSettings::default(),
            &ContourExtractorKind::default(),
        );
        let ids: Vec<&str> = out.layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["bucket-0", "bucket-1", "bucket-2"]);
        for p in out.layers.iter().flat_map(|l| &l.paths) {
            assert_eq!(p.fill, NO_PAINT);
            assert_eq!(p.stroke, INK);
        }
    }

    #[test]
    fn outline_regions_controls_holes() {
        let with_holes = convert(
            &ring(),
            &VectorSettings::default(),
            &ContourExtractorKind::default(),
        );
        assert_eq!(outline_count(&with_holes.layers[1]), 2);

        let settings = VectorSettings {
            cross_hatching_settings: CrossHatchingSettings {
                outline_regions: false,
                ..CrossHatchingSettings::default()
            },
            ..VectorSettings::default()
        };
        let without = convert(&ring(), &settings, &ContourExtractorKind::default());
        assert_eq!(outline_count(&without.layers[1]), 1);
    }

    #[test]
    fn hatching_skips_extreme_buckets_and_avoids_holes() {
        let settings = VectorSettings {
            cross_hatching_settings: CrossHatchingSettings {
                enabled: true,
                density: 10,
                ..CrossHatchingSettings::default()
            },
            ..VectorSettings::default()
        };
        let out = convert(&ring(), &settings, &ContourExtractorKind::default());
        let hatch = |layer: &VectorLayer| {
            layer
                .paths
                .iter()
                .filter(|p| p.region_type == Some(RegionType::Hatch))
                .count()
        };
        assert_eq!(hatch(&out.layers[0]), 0);
        assert!(hatch(&out.layers[1]) > 0);
        assert_eq!(hatch(&out.layers[2]), 0);

        // No hatch segment midpoint falls strictly inside the hole.
        for p in out.layers[1]
            .paths
            .iter()
            .filter(|p| p.region_type == Some(RegionType::Hatch))
        {
            let nums: Vec<f64> = p
                .d
                .split(|c: char| c == 'M' || c == 'L' || c == ' ')
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().unwrap())
                .collect();
            let (mx, my) = ((nums[0] + nums[2]) / 2.0, (nums[1] + nums[3]) / 2.0);
            let in_hole = mx > 4.0 && mx < 7.0 && my > 4.0 && my < 7.0;
            assert!(!in_hole, "hatch segment {} crosses the hole", p.d);
        }
    }

    #[test]
    fn no_hatching_by_default() {
        let out = convert(
            &ring(),
            &VectorSettings::default(),
            &ContourExtractorKind::default(),
        );
        assert!(
            out.layers
                .iter()
                .flat_map(|l| &l.paths)
                .all(|p| p.region_type != Some(RegionType::Hatch))
        );
    }
}
