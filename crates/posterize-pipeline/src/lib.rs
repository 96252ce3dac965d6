//! posterize-pipeline: Pure raster → layered vector pipeline (sans-IO).
//!
//! Converts raster images into posterized, layered vector output:
//! decode -> crop -> bucketize -> noise removal -> smoothing ->
//! per-bucket contour extraction -> region grouping -> path conversion
//! (optionally curve fitted) -> conversion strategy -> optional hatching.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns structured data. Serializing the output is
//! the job of `posterize-export`.

pub mod bucketize;
pub mod contour;
pub mod curve;
pub mod diagnostics;
pub mod group;
pub mod hatch;
mod moore;
pub mod noise;
pub mod path;
mod pen;
pub mod pipeline;
pub mod settings;
pub mod simplify;
pub mod smooth;
mod stencil;
pub mod strategy;
pub mod types;

pub use contour::{ContourExtractor, ContourExtractorKind, ContourSet, ExtractError};
pub use noise::NoiseReport;
pub use pipeline::{Pipeline, ProcessResult};
pub use settings::{
    BorderSettings, CropSettings, CrossHatchingSettings, NoiseSettings, PosterizeSettings,
    SETTINGS_STORAGE_KEY, Settings, SmoothSettings, VectorSettings, VectorStyle,
};
pub use strategy::{ConversionStrategy, SettingKey, StrategyKind};
pub use types::{
    BucketGrid, Dimensions, GrayImage, PipelineError, Point, RegionType, RgbaImage,
    VectorLayer, VectorOutput, VectorPath,
};

/// Decode image bytes (PNG, JPEG, BMP, WebP) into RGBA.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?.to_rgba8())
}

/// Apply the crop rectangle, clamped to the image. Disabled crops
/// return a copy of the input.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidSettings`] if the clamped rectangle
/// is empty.
pub fn crop(image: &RgbaImage, settings: &CropSettings) -> Result<RgbaImage, PipelineError> {
    let dimensions = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    Ok(match settings.resolve(dimensions)? {
        Some((x, y, width, height)) => {
            image::imageops::crop_imm(image, x, y, width, height).to_image()
        }
        None => image.clone(),
    })
}

/// Result of the raster half of the pipeline.
#[derive(Debug, Clone)]
pub struct PosterizeOutput {
    /// Bucket index per pixel, after noise removal and smoothing.
    pub buckets: BucketGrid,
    /// Gray rendering of the buckets, with borders when enabled.
    pub image: RgbaImage,
    /// Noise removal summary, when it ran.
    pub noise: Option<NoiseReport>,
}

/// Bucketize `pixels` and run the enabled raster post-processors.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidSettings`] if the settings fail
/// validation.
pub fn posterize(
    pixels: &RgbaImage,
    settings: &PosterizeSettings,
) -> Result<PosterizeOutput, PipelineError> {
    let settings = settings.normalized()?;
    let thresholds = settings.effective_thresholds();
    let mut buckets = bucketize::bucketize(pixels, &thresholds, settings.color_count);

    let noise = (settings.noise_settings.enabled && settings.noise_settings.min_region_size > 0)
        .then(|| noise::remove_noise(&mut buckets, settings.noise_settings.min_region_size));

    if settings.smooth_settings.enabled {
        smooth::smooth(&mut buckets, settings.smooth_settings.strength);
    }

    let custom = settings
        .has_custom_thresholds()
        .then_some(settings.thresholds.as_slice());
    let mut image = bucketize::posterize_pixels(&buckets, custom, Some(pixels));
    if settings.border_settings.enabled {
        bucketize::draw_borders(&mut image, &buckets, settings.border_settings.thickness);
    }

    Ok(PosterizeOutput {
        buckets,
        image,
        noise,
    })
}

/// Convert a bucket grid with the configured strategy and extractor.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidSettings`] if the settings fail
/// validation. Extraction problems never surface here; they degrade
/// to placeholder output or skipped buckets.
pub fn vectorize(
    buckets: &BucketGrid,
    settings: &VectorSettings,
) -> Result<VectorOutput, PipelineError> {
    vectorize_with(buckets, settings, &settings.contour_extractor)
}

/// Like [`vectorize`], with a caller-supplied contour extractor.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidSettings`] if the settings fail
/// validation.
pub fn vectorize_with(
    buckets: &BucketGrid,
    settings: &VectorSettings,
    extractor: &dyn ContourExtractor,
) -> Result<VectorOutput, PipelineError> {
    let settings = settings.normalized()?;
    Ok(settings.strategy.convert(buckets, &settings, extractor))
}

/// Run the full pipeline on encoded image bytes.
///
/// # Pipeline steps
///
/// 1. Validate settings
/// 2. Decode image to RGBA
/// 3. Optional crop
/// 4. Bucketize, then optional noise removal, smoothing and borders
/// 5. Vectorize with the configured strategy
///
/// # Errors
///
/// Returns [`PipelineError::InvalidSettings`] before any decoding if the
/// settings are invalid. Returns [`PipelineError::EmptyInput`] or
/// [`PipelineError::ImageDecode`] for unusable image bytes.
pub fn process(image_bytes: &[u8], settings: &Settings) -> Result<ProcessResult, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), settings.clone())
        .decode()?
        .crop()?
        .posterize()?
        .vectorize()
        .into_result())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode an RGBA image as PNG bytes.
    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    fn white(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]))
    }

    /// Black disc on white.
    fn disc(size: u32) -> RgbaImage {
        let c = f64::from(size) / 2.0;
        RgbaImage::from_fn(size, size, |x, y| {
            let d = (f64::from(x) + 0.5 - c).hypot(f64::from(y) + 0.5 - c);
            if d < c * 0.6 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn decode_empty_input() {
        assert!(matches!(decode(&[]), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn decode_corrupt_input() {
        assert!(matches!(
            decode(&[0xFF, 0x00]),
            Err(PipelineError::ImageDecode(_))
        ));
    }

    #[test]
    fn crop_clamps_to_image() {
        let img = white(10, 8);
        let settings = CropSettings {
            enabled: true,
            x: 6,
            y: 2,
            width: 100,
            height: 3,
        };
        let cropped = crop(&img, &settings).unwrap();
        assert_eq!(cropped.dimensions(), (4, 3));
    }

    #[test]
    fn crop_outside_image_is_rejected() {
        let settings = CropSettings {
            enabled: true,
            x: 50,
            y: 0,
            width: 5,
            height: 5,
        };
        assert!(matches!(
            crop(&white(10, 10), &settings),
            Err(PipelineError::InvalidSettings(_))
        ));
    }

    #[test]
    fn white_four_by_four_round_trip() {
        let settings = PosterizeSettings {
            color_count: 2,
            thresholds: vec![128],
            ..PosterizeSettings::default()
        };
        let posterized = posterize(&white(4, 4), &settings).unwrap();
        assert!(posterized.buckets.as_slice().iter().all(|&b| b == 1));

        let set = ContourExtractorKind::default()
            .find_contours(&posterized.buckets.mask(1), contour::RetrievalMode::Tree)
            .unwrap();
        assert_eq!(set.len(), 1);
        let points = &set.get(0).unwrap().points;
        for corner in [(0, 0), (3, 0), (3, 3), (0, 3)] {
            assert!(points.contains(&corner), "missing corner {corner:?}");
        }

        let output = vectorize(&posterized.buckets, &VectorSettings::default()).unwrap();
        assert_eq!(output.layers.len(), 1);
        assert_eq!(output.layers[0].paths.len(), 1);
    }

    #[test]
    fn posterize_rejects_invalid_settings() {
        let settings = PosterizeSettings {
            color_count: 1,
            ..PosterizeSettings::default()
        };
        assert!(matches!(
            posterize(&white(2, 2), &settings),
            Err(PipelineError::InvalidSettings(_))
        ));
    }

    #[test]
    fn bucket_range_holds_after_post_processing() {
        let img = RgbaImage::from_fn(24, 24, |x, y| {
            let v = u8::try_from((x * 37 + y * 11) % 256).unwrap();
            image::Rgba([v, v.wrapping_mul(3), v / 2, 255])
        });
        for color_count in 2..=6u8 {
            let settings = PosterizeSettings {
                color_count,
                noise_settings: NoiseSettings {
                    enabled: true,
                    min_region_size: 5,
                },
                smooth_settings: SmoothSettings {
                    enabled: true,
                    strength: 2,
                },
                ..PosterizeSettings::default()
            };
            let p = posterize(&img, &settings).unwrap();
            assert!(p.buckets.as_slice().iter().all(|&b| b < color_count));
            assert!(p.noise.is_some());
        }
    }

    #[test]
    fn borders_darken_boundaries_only() {
        let settings = PosterizeSettings {
            color_count: 2,
            border_settings: BorderSettings {
                enabled: true,
                thickness: 1,
            },
            ..PosterizeSettings::default()
        };
        let p = posterize(&disc(20), &settings).unwrap();
        // Corners are far from the disc edge and stay white.
        assert_eq!(p.image.get_pixel(0, 0).0, [255, 255, 255, 255]);
        let black = p.image.pixels().filter(|px| px.0[0] == 0).count();
        let bucket0 = p.buckets.histogram()[0];
        assert!(black > bucket0, "border pixels were not drawn");
    }

    #[test]
    fn process_runs_every_stage() {
        let bytes = png_bytes(&disc(32));
        let settings = Settings {
            posterize: PosterizeSettings {
                color_count: 2,
                ..PosterizeSettings::default()
            },
            ..Settings::default()
        };
        let result = process(&bytes, &settings).unwrap();
        assert_eq!(
            result.output.dimensions,
            Dimensions {
                width: 32,
                height: 32
            }
        );
        assert!(!result.output.layers.is_empty());
    }

    #[test]
    fn process_validates_before_decoding() {
        let settings = Settings {
            vector: VectorSettings {
                curve_smoothing: -1.0,
                ..VectorSettings::default()
            },
            ..Settings::default()
        };
        // Empty bytes would be EmptyInput; validation comes first.
        assert!(matches!(
            process(&[], &settings),
            Err(PipelineError::InvalidSettings(_))
        ));
    }

    #[test]
    fn vectorize_with_unavailable_extractor_is_placeholder() {
        struct Missing;
        impl ContourExtractor for Missing {
            fn find_contours(
                &self,
                _mask: &GrayImage,
                _mode: contour::RetrievalMode,
            ) -> Result<ContourSet, ExtractError> {
                Err(ExtractError::Unavailable("missing".to_owned()))
            }
        }
        let grid = BucketGrid::filled(8, 8, 4, 2);
        let out = vectorize_with(&grid, &VectorSettings::default(), &Missing).unwrap();
        assert_eq!(out.layers.len(), 4);
    }
}
