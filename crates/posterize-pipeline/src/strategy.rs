//! Conversion strategies: bucket grid → layered vector output.
//!
//! [`StrategyKind`] is a closed set of strategies dispatched by `match`
//! (the same shape as [`ContourExtractorKind`]). Both strategies share
//! the per-bucket extraction loop in [`for_each_bucket`], which owns the
//! error policy:
//!
//! * [`ExtractError::Unavailable`] on any bucket abandons the conversion
//!   and yields [`placeholder_output`].
//! * [`ExtractError::Resource`] and [`ExtractError::MalformedContour`]
//!   skip that bucket and continue.
//!
//! [`ContourExtractorKind`]: crate::contour::ContourExtractorKind

use geo::{BoundingRect, LineString};
use palette::{FromColor, Hsl, Srgb};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::contour::{ContourExtractor, ContourSet, ExtractError, RetrievalMode};
use crate::hatch::{clip_to_shape, generate_hatch_lines, hatch_paths};
use crate::path::fmt_coord;
use crate::settings::{CrossHatchingSettings, VectorSettings};
use crate::types::{
    BucketGrid, Dimensions, NO_PAINT, Point, RegionType, VectorLayer, VectorOutput, VectorPath,
};
use crate::{bucketize, pen, stencil};

/// Background paint of every strategy's output.
pub const BACKGROUND: &str = "#ffffff";

/// Which conversion strategy assembles the layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Filled, color-separated regions grouped per bucket.
    #[default]
    Stencil,
    /// Stroke-only outlines with optional hatching, for pen plotters.
    PenDrawing,
}

/// A setting a strategy responds to, for a UI collaborator deciding
/// which controls to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettingKey {
    /// `VectorSettings::style`.
    Style,
    /// `VectorSettings::curve_smoothing`.
    CurveSmoothing,
    /// `VectorSettings::export_layers`.
    ExportLayers,
    /// `CrossHatchingSettings::enabled`.
    HatchEnabled,
    /// `CrossHatchingSettings::density`.
    HatchDensity,
    /// `CrossHatchingSettings::angle`.
    HatchAngle,
    /// `CrossHatchingSettings::line_width`.
    HatchLineWidth,
    /// `CrossHatchingSettings::outline_regions`.
    OutlineRegions,
}

/// Turns a bucket grid into a layered vector output.
///
/// Conversion never fails: extraction problems are recovered locally
/// and logged.
pub trait ConversionStrategy {
    /// Convert `buckets` using contours from `extractor`.
    fn convert(
        &self,
        buckets: &BucketGrid,
        settings: &VectorSettings,
        extractor: &dyn ContourExtractor,
    ) -> VectorOutput;

    /// Settings that influence this strategy's output.
    fn contextual_settings(&self) -> &'static [SettingKey];
}

impl ConversionStrategy for StrategyKind {
    fn convert(
        &self,
        buckets: &BucketGrid,
        settings: &VectorSettings,
        extractor: &dyn ContourExtractor,
    ) -> VectorOutput {
        match *self {
            Self::Stencil => stencil::convert(buckets, settings, extractor),
            Self::PenDrawing => pen::convert(buckets, settings, extractor),
        }
    }

    fn contextual_settings(&self) -> &'static [SettingKey] {
        match *self {
            Self::Stencil => &[
                SettingKey::Style,
                SettingKey::CurveSmoothing,
                SettingKey::ExportLayers,
                SettingKey::HatchDensity,
                SettingKey::HatchAngle,
                SettingKey::HatchLineWidth,
            ],
            Self::PenDrawing => &[
                SettingKey::CurveSmoothing,
                SettingKey::ExportLayers,
                SettingKey::HatchEnabled,
                SettingKey::HatchDensity,
                SettingKey::HatchAngle,
                SettingKey::HatchLineWidth,
                SettingKey::OutlineRegions,
            ],
        }
    }
}

/// Extract contours for every bucket in ascending order and hand each
/// successful set to `visit`.
///
/// Buckets with no pixels are not extracted. Returns `Err` with the
/// capability's message when it reports itself unavailable.
pub(crate) fn for_each_bucket(
    buckets: &BucketGrid,
    extractor: &dyn ContourExtractor,
    mode: RetrievalMode,
    mut visit: impl FnMut(u8, ContourSet),
) -> Result<(), String> {
    let histogram = buckets.histogram();
    for bucket in 0..buckets.color_count() {
        if histogram.get(usize::from(bucket)).copied().unwrap_or(0) == 0 {
            continue;
        }
        // The mask lives for this bucket's pass only.
        let mask = buckets.mask(bucket);
        match extractor.find_contours(&mask, mode) {
            Ok(set) => {
                debug!(bucket, contours = set.len(), "extracted contours");
                visit(bucket, set);
            }
            Err(ExtractError::Unavailable(reason)) => return Err(reason),
            Err(e) => {
                warn!(bucket, error = %e, "skipping bucket");
            }
        }
    }
    Ok(())
}

/// Tone of `bucket` in `[0, 1]` (0 = darkest, 1 = lightest).
#[must_use]
pub fn bucket_tone_level(bucket: u8, color_count: u8) -> f64 {
    if color_count < 2 {
        return 1.0;
    }
    f64::from(bucket) / f64::from(color_count - 1)
}

/// Whether a bucket carries an intermediate tone worth hatching.
#[must_use]
pub const fn is_mid_tone(bucket: u8, color_count: u8) -> bool {
    bucket > 0 && bucket + 1 < color_count
}

/// Hatching for one fill boundary and its holes, clipped to the shape.
pub(crate) fn hatch_shape(
    set: &ContourSet,
    outer: usize,
    holes: &[usize],
    tone: f64,
    settings: &CrossHatchingSettings,
) -> Vec<VectorPath> {
    let rings: Vec<Vec<Point>> = std::iter::once(outer)
        .chain(holes.iter().copied())
        .filter_map(|i| set.get(i))
        .map(|c| c.points.iter().copied().map(Point::from).collect())
        .collect();
    let Some(bounds) = rings.first().and_then(|outer_ring| {
        LineString::from(
            outer_ring
                .iter()
                .map(|p| (p.x, p.y))
                .collect::<Vec<(f64, f64)>>(),
        )
        .bounding_rect()
    }) else {
        return Vec::new();
    };
    let lines = generate_hatch_lines(bounds, tone, settings);
    hatch_paths(&clip_to_shape(&lines, &rings), settings)
}

/// Fill color of a bucket: HSL hue `360·b/n`, 65% saturation, 50%
/// lightness, as `#rrggbb`.
#[must_use]
pub fn bucket_color(bucket: u8, color_count: u8) -> String {
    let hue = 360.0 * f64::from(bucket) / f64::from(color_count.max(1));
    hsl_to_hex(hue, 0.65, 0.5)
}

/// Convert HSL (hue in degrees, saturation and lightness in `[0, 1]`)
/// to a `#rrggbb` string.
#[must_use]
pub fn hsl_to_hex(hue: f64, saturation: f64, lightness: f64) -> String {
    let rgb: Srgb<u8> =
        Srgb::<f64>::from_color(Hsl::new_srgb(hue, saturation, lightness)).into_format();
    format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
}

/// Gray `#vvvvvv` for a tone value.
#[must_use]
pub fn gray_hex(value: u8) -> String {
    format!("#{value:02x}{value:02x}{value:02x}")
}

/// Deterministic stand-in output: one labeled horizontal band per
/// bucket, top to bottom from darkest to lightest.
#[must_use]
pub fn placeholder_output(dimensions: Dimensions, color_count: u8) -> VectorOutput {
    let n = color_count.max(1);
    let width = f64::from(dimensions.width);
    let band = f64::from(dimensions.height) / f64::from(n);

    let layers = (0..n)
        .map(|b| {
            let y0 = band * f64::from(b);
            let y1 = band * f64::from(b + 1);
            let d = format!(
                "M0 {y0} L{w} {y0} L{w} {y1} L0 {y1} Z",
                w = fmt_coord(width),
                y0 = fmt_coord(y0),
                y1 = fmt_coord(y1),
            );
            let fill = gray_hex(bucketize::bucket_tone(b, n, None));
            let path = VectorPath::filled(d, fill, NO_PAINT, 0.0)
                .with_region_type(RegionType::Placeholder);
            VectorLayer::new(format!("placeholder-{b}"), vec![path])
                .with_label(format!("Placeholder {}", b + 1))
        })
        .collect();

    VectorOutput {
        dimensions,
        layers,
        background: BACKGROUND.to_owned(),
    }
}

/// Log and build the placeholder for an unavailable extractor.
pub(crate) fn fallback(buckets: &BucketGrid, reason: &str) -> VectorOutput {
    warn!(reason, "contour extraction unavailable, emitting placeholder output");
    placeholder_output(buckets.dimensions(), buckets.color_count())
}
