//! Stencil strategy: filled, color-separated regions.
//!
//! Every bucket's full contour tree is grouped into non-overlapping
//! region groups; each group becomes one layer holding one path whose
//! `d` concatenates the members' boundaries and holes.

use tracing::debug;

use crate::contour::{ContourExtractor, RetrievalMode};
use crate::group::group_regions;
use crate::path::PathOptions;
use crate::settings::{VectorSettings, VectorStyle};
use crate::strategy::{
    BACKGROUND, bucket_color, bucket_tone_level, fallback, for_each_bucket, hatch_shape,
    is_mid_tone,
};
use crate::types::{BucketGrid, VectorLayer, VectorOutput, VectorPath};

/// Border stroke of filled regions.
pub const BORDER_STROKE: &str = "#333333";

/// Border stroke width of filled regions.
pub const BORDER_STROKE_WIDTH: f64 = 0.5;

/// Stroke width of outlined regions.
pub const OUTLINE_STROKE_WIDTH: f64 = 1.0;

pub(crate) fn convert(
    buckets: &BucketGrid,
    settings: &VectorSettings,
    extractor: &dyn ContourExtractor,
) -> VectorOutput {
    let color_count = buckets.color_count();
    let options = PathOptions::new(settings.curve_smoothing);
    let hatching = settings.hatching_enabled();
    let mut layers = Vec::new();

    let result = for_each_bucket(buckets, extractor, RetrievalMode::Tree, |bucket, set| {
        let groups = group_regions(&set, &options);
        debug!(bucket, groups = groups.len(), "grouped regions");

        let color = bucket_color(bucket, color_count);
        let tone = bucket_tone_level(bucket, color_count);

        for (g, group) in groups.iter().enumerate() {
            let d = group.path_data();
            if d.is_empty() {
                continue;
            }
            let region = match settings.style {
                VectorStyle::Filled => {
                    VectorPath::filled(d, color.clone(), BORDER_STROKE, BORDER_STROKE_WIDTH)
                }
                VectorStyle::Outline | VectorStyle::Crosshatched => {
                    VectorPath::stroked(d, color.clone(), OUTLINE_STROKE_WIDTH)
                }
            };
            let mut paths = vec![region];
            if hatching && is_mid_tone(bucket, color_count) {
                for member in &group.members {
                    paths.extend(hatch_shape(
                        &set,
                        member.contour,
                        &member.holes,
                        tone,
                        &settings.cross_hatching_settings,
                    ));
                }
            }
            layers.push(
                VectorLayer::new(format!("bucket-{bucket}-group-{g}"), paths)
                    .with_label(format!("Bucket {} group {}", bucket + 1, g + 1)),
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
    use crate::contour::{BorderKind, ContourExtractorKind, ContourSet, ExtractError};
    use crate::path::DEGENERATE_PATH;
    use crate::types::{GrayImage, NO_PAINT, RegionType};

    /// Two separate squares of bucket 1 on a bucket-0 background.
    fn two_squares() -> BucketGrid {
        let mut data = vec![0u8; 12 * 6];
        for y in 1..5 {
            for x in (1..5).chain(7..11) {
                data[y * 12 + x] = 1;
            }
        }
        BucketGrid::new(12, 6, 2, data).unwrap()
    }

    #[test]
    fn separate_regions_share_a_group() {
        let out = convert(
            &two_squares(),
            &VectorSettings::default(),
            &ContourExtractorKind::default(),
        );
        let ids: Vec<&str> = out.layers.iter().map(|l| l.id.as_str()).collect();
        // Bucket 0: the background with two holes. Bucket 1: both squares.
        assert_eq!(ids, ["bucket-0-group-0", "bucket-1-group-0"]);
        let squares = &out.layers[1].paths[0];
        assert_eq!(squares.d.matches('M').count(), 2);
        assert_eq!(out.layers[0].paths[0].d.matches('M').count(), 3);
    }

    #[test]
    fn filled_style_uses_bucket_hue_and_border() {
        let out = convert(
            &two_squares(),
            &VectorSettings::default(),
            &ContourExtractorKind::default(),
        );
        let p = &out.layers[1].paths[0];
        assert_eq!(p.fill, bucket_color(1, 2));
        assert_eq!(p.stroke, BORDER_STROKE);
        assert_eq!(p.region_type, Some(RegionType::Fill));
    }

    #[test]
    fn outline_style_strokes_with_hue() {
        let settings = VectorSettings {
            style: VectorStyle::Outline,
            ..VectorSettings::default()
        };
        let out = convert(&two_squares(), &settings, &ContourExtractorKind::default());
        for layer in &out.layers {
            for p in &layer.paths {
                assert_eq!(p.fill, NO_PAINT);
            }
        }
        assert_eq!(out.layers[1].paths[0].stroke, bucket_color(1, 2));
    }

    #[test]
    fn both_extractors_agree_on_layout() {
        let a = convert(
            &two_squares(),
            &VectorSettings::default(),
            &ContourExtractorKind::BorderFollowing,
        );
        let b = convert(
            &two_squares(),
            &VectorSettings::default(),
            &ContourExtractorKind::MooreNeighbor,
        );
        let ids = |o: &VectorOutput| o.layers.iter().map(|l| l.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn curve_smoothing_emits_cubics() {
        let settings = VectorSettings {
            curve_smoothing: 0.5,
            ..VectorSettings::default()
        };
        let out = convert(&two_squares(), &settings, &ContourExtractorKind::default());
        assert!(out.layers[1].paths[0].d.contains('C'));
    }

    /// Reports an empty ring ahead of a real square for every mask.
    struct EmptyRingFirst;

    impl ContourExtractor for EmptyRingFirst {
        fn find_contours(
            &self,
            _mask: &GrayImage,
            _mode: RetrievalMode,
        ) -> Result<ContourSet, ExtractError> {
            ContourSet::from_parents(vec![
                (Vec::new(), BorderKind::Outer, None),
                (vec![(0, 0), (3, 0), (3, 3), (0, 3)], BorderKind::Outer, None),
            ])
        }
    }

    #[test]
    fn empty_ring_becomes_degenerate_layer() {
        let grid = BucketGrid::filled(4, 4, 2, 1);
        let out = convert(&grid, &VectorSettings::default(), &EmptyRingFirst);
        let ids: Vec<&str> = out.layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["bucket-1-group-0", "bucket-1-group-1"]);
        assert_eq!(out.layers[0].paths[0].d, DEGENERATE_PATH);
        assert_eq!(out.layers[1].paths[0].d, "M0 0 L3 0 L3 3 L0 3 Z");
    }
}
