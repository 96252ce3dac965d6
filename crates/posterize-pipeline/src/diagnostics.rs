//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! [`process_with_diagnostics`] drives the staged [`Pipeline`] one step
//! at a time and records a [`StageDiagnostics`] per step. Time is read
//! through the [`Clock`] trait so the core never touches a platform
//! timer itself; callers supply one (the bench uses `std::time::Instant`).
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::{Pipeline, ProcessResult};
use crate::types::{PipelineError, RegionType, VectorOutput};
use crate::{NoiseReport, Settings, StrategyKind};

/// Source of monotonic time for stage measurements.
pub trait Clock {
    /// Opaque instant type.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
///
/// The crop stage is `None` when cropping is disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Settings validation and image decoding.
    pub decode: StageDiagnostics,
    /// Optional crop.
    pub crop: Option<StageDiagnostics>,
    /// Bucketize, noise removal, smoothing and borders.
    pub posterize: StageDiagnostics,
    /// Contour extraction through layer assembly.
    pub vectorize: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
    },
    /// Crop metrics.
    Crop {
        /// Width after cropping.
        width: u32,
        /// Height after cropping.
        height: u32,
    },
    /// Posterize metrics.
    Posterize {
        /// Number of buckets.
        color_count: u8,
        /// Pixel count per bucket.
        histogram: Vec<usize>,
        /// Noise removal summary, when it ran.
        noise: Option<NoiseReport>,
    },
    /// Vectorize metrics.
    Vectorize {
        /// Conversion strategy used.
        strategy: StrategyKind,
        /// Number of layers produced.
        layer_count: usize,
        /// Number of paths across all layers.
        path_count: usize,
        /// Number of hatching paths.
        hatch_count: usize,
        /// `true` when extraction was unavailable and placeholder
        /// bands were emitted.
        placeholder: bool,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Working image width in pixels.
    pub image_width: u32,
    /// Working image height in pixels.
    pub image_height: u32,
    /// Number of layers in the output.
    pub layer_count: usize,
    /// Number of paths in the output.
    pub path_count: usize,
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}",
            self.summary.image_width, self.summary.image_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for (name, diag) in self.stages() {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Layers: {}  |  Paths: {}",
            self.summary.layer_count, self.summary.path_count,
        ));

        lines.join("\n")
    }

    /// Executed stages in order, with display names.
    #[must_use]
    pub fn stages(&self) -> Vec<(&'static str, &StageDiagnostics)> {
        let mut stages = vec![("Decode", &self.decode)];
        if let Some(ref crop) = self.crop {
            stages.push(("Crop", crop));
        }
        stages.push(("Posterize", &self.posterize));
        stages.push(("Vectorize", &self.vectorize));
        stages
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Crop { width, height } => format!("{width}x{height}"),
        StageMetrics::Posterize {
            color_count,
            histogram,
            noise,
        } => {
            let counts = histogram
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("/");
            match noise {
                Some(n) => format!(
                    "{color_count} buckets [{counts}] noise: {} regions merged, {} px",
                    n.merged, n.pixels_changed,
                ),
                None => format!("{color_count} buckets [{counts}]"),
            }
        }
        StageMetrics::Vectorize {
            strategy,
            layer_count,
            path_count,
            hatch_count,
            placeholder,
        } => {
            let fallback = if *placeholder { " (placeholder)" } else { "" };
            format!(
                "{strategy:?} {layer_count} layers, {path_count} paths, {hatch_count} hatches{fallback}"
            )
        }
    }
}

fn vectorize_metrics(strategy: StrategyKind, output: &VectorOutput) -> StageMetrics {
    let paths = || output.layers.iter().flat_map(|l| &l.paths);
    StageMetrics::Vectorize {
        strategy,
        layer_count: output.layers.len(),
        path_count: output.path_count(),
        hatch_count: paths()
            .filter(|p| p.region_type == Some(RegionType::Hatch))
            .count(),
        placeholder: paths().any(|p| p.region_type == Some(RegionType::Placeholder)),
    }
}

/// Run the staged pipeline, timing each stage with `clock`.
///
/// # Errors
///
/// Same as [`crate::process`].
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    settings: &Settings,
    clock: &C,
) -> Result<(ProcessResult, PipelineDiagnostics), PipelineError> {
    let pipeline_start = clock.now();

    let start = clock.now();
    let decoded = Pipeline::new(image_bytes.to_vec(), settings.clone()).decode()?;
    let decode = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Decode {
            input_bytes: decoded.source_len(),
            width: decoded.original().width(),
            height: decoded.original().height(),
        },
    };

    let start = clock.now();
    let cropped = decoded.crop()?;
    let crop_duration = clock.elapsed(&start);
    let crop = settings.crop.enabled.then(|| StageDiagnostics {
        duration: crop_duration,
        metrics: StageMetrics::Crop {
            width: cropped.cropped().width(),
            height: cropped.cropped().height(),
        },
    });

    let start = clock.now();
    let posterized = cropped.posterize()?;
    let posterize = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Posterize {
            color_count: posterized.buckets().color_count(),
            histogram: posterized.buckets().histogram(),
            noise: posterized.noise(),
        },
    };

    let start = clock.now();
    let vectorized = posterized.vectorize();
    let vectorize = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: vectorize_metrics(settings.vector.strategy, vectorized.output()),
    };

    let result = vectorized.into_result();
    let total_duration = clock.elapsed(&pipeline_start);

    let summary = PipelineSummary {
        image_width: result.output.dimensions.width,
        image_height: result.output.dimensions.height,
        layer_count: result.output.layers.len(),
        path_count: result.output.path_count(),
    };

    Ok((
        result,
        PipelineDiagnostics {
            decode,
            crop,
            posterize,
            vectorize,
            total_duration,
            summary,
        },
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{CropSettings, CrossHatchingSettings, PosterizeSettings, RgbaImage};

    /// Advances one millisecond per `now()` call.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get() + 1;
            self.0.set(t);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.0.get() - since)
        }
    }

    fn gradient_png() -> Vec<u8> {
        let img = RgbaImage::from_fn(24, 16, |x, _y| {
            let v = u8::try_from(x * 10).unwrap();
            image::Rgba([v, v, v, 255])
        });
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

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn diagnostics_match_plain_process() {
        let settings = Settings::default();
        let png = gradient_png();
        let clock = TickClock(Cell::new(0));
        let (result, diag) = process_with_diagnostics(&png, &settings, &clock).unwrap();
        let plain = crate::process(&png, &settings).unwrap();

        assert_eq!(result.output, plain.output);
        assert!(diag.crop.is_none());
        assert_eq!(diag.summary.layer_count, plain.output.layers.len());
        assert_eq!(diag.summary.path_count, plain.output.path_count());
        assert_eq!(diag.summary.image_width, 24);
        assert!(matches!(
            diag.decode.metrics,
            StageMetrics::Decode {
                width: 24,
                height: 16,
                ..
            }
        ));
        assert!(diag.total_duration >= diag.vectorize.duration);
    }

    #[test]
    fn crop_stage_is_recorded_when_enabled() {
        let settings = Settings {
            crop: CropSettings {
                enabled: true,
                x: 0,
                y: 0,
                width: 10,
                height: 8,
            },
            ..Settings::default()
        };
        let clock = TickClock(Cell::new(0));
        let (_, diag) = process_with_diagnostics(&gradient_png(), &settings, &clock).unwrap();
        assert!(matches!(
            diag.crop.as_ref().map(|c| &c.metrics),
            Some(StageMetrics::Crop {
                width: 10,
                height: 8
            })
        ));
        assert_eq!(diag.stages().len(), 4);
    }

    #[test]
    fn invalid_settings_fail_before_any_stage() {
        let settings = Settings {
            posterize: PosterizeSettings {
                color_count: 0,
                ..PosterizeSettings::default()
            },
            ..Settings::default()
        };
        let clock = TickClock(Cell::new(0));
        assert!(matches!(
            process_with_diagnostics(&gradient_png(), &settings, &clock),
            Err(PipelineError::InvalidSettings(_))
        ));
    }

    #[test]
    fn vectorize_metrics_count_hatches() {
        let mut settings = Settings::default();
        settings.vector.strategy = StrategyKind::PenDrawing;
        settings.vector.cross_hatching_settings = CrossHatchingSettings {
            enabled: true,
            ..CrossHatchingSettings::default()
        };
        let clock = TickClock(Cell::new(0));
        let (_, diag) = process_with_diagnostics(&gradient_png(), &settings, &clock).unwrap();
        assert!(matches!(
            diag.vectorize.metrics,
            StageMetrics::Vectorize {
                strategy: StrategyKind::PenDrawing,
                hatch_count,
                placeholder: false,
                ..
            } if hatch_count > 0
        ));
    }

    #[test]
    fn report_and_json() {
        let clock = TickClock(Cell::new(0));
        let (_, diag) =
            process_with_diagnostics(&gradient_png(), &Settings::default(), &clock).unwrap();
        let report = diag.report();
        assert!(report.contains("Pipeline Diagnostics Report"));
        assert!(report.contains("Posterize"));
        assert!(report.contains("Stencil"));

        let json = serde_json::to_string(&diag).unwrap();
        let back: PipelineDiagnostics = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary.path_count, diag.summary.path_count);
    }
}
