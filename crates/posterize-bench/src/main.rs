//! posterize-bench: CLI tool for settings experimentation and diagnostics.
//!
//! Runs the posterize pipeline on a given image file with configurable
//! settings, printing per-stage timings and counts. Useful for:
//!
//! - Comparing the stencil and pen-drawing strategies
//! - Tuning color counts, thresholds, noise removal and smoothing
//! - Checking how curve smoothing and hatching density affect path counts
//! - Writing the SVG (or one SVG per layer) for inspection
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin posterize-bench -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{ArgAction, Parser, ValueEnum};
use posterize_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use posterize_pipeline::{
    ContourExtractorKind, CrossHatchingSettings, PosterizeSettings, Settings, StrategyKind,
    VectorOutput, VectorStyle,
};
use tracing_subscriber::EnvFilter;

/// Settings experimentation and diagnostics for the posterize pipeline.
///
/// Runs the pipeline on a given image and prints per-stage timing and
/// count diagnostics.
#[derive(Parser)]
#[command(name = "posterize-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Number of tonal buckets (2-10).
    #[arg(long, default_value_t = PosterizeSettings::DEFAULT_COLOR_COUNT)]
    colors: u8,

    /// Custom luminance thresholds, comma separated (e.g. `60,120,200`).
    #[arg(long, value_delimiter = ',')]
    thresholds: Vec<u8>,

    /// Enable noise removal with this minimum region size in pixels.
    #[arg(long)]
    noise_min_region: Option<usize>,

    /// Enable smoothing with this many passes.
    #[arg(long)]
    smooth_strength: Option<u32>,

    /// Draw bucket borders of this thickness into the posterized raster.
    #[arg(long)]
    border_thickness: Option<u32>,

    /// Conversion strategy.
    #[arg(long, value_enum, default_value_t = Strategy::Stencil)]
    strategy: Strategy,

    /// Vector style.
    #[arg(long, value_enum, default_value_t = Style::Filled)]
    style: Style,

    /// Contour extractor.
    #[arg(long, value_enum, default_value_t = Extractor::BorderFollowing)]
    extractor: Extractor,

    /// Curve fitting tolerance in pixels (0 keeps straight edges).
    #[arg(long, default_value_t = 0.0)]
    curve_smoothing: f64,

    /// Enable hatching with this density (1-10).
    #[arg(long)]
    hatch_density: Option<u8>,

    /// Hatch angle in degrees.
    #[arg(long, default_value_t = CrossHatchingSettings::DEFAULT_ANGLE)]
    hatch_angle: f64,

    /// Hatch stroke width.
    #[arg(long, default_value_t = CrossHatchingSettings::DEFAULT_LINE_WIDTH)]
    hatch_line_width: f64,

    /// Trace hole outlines in the pen-drawing strategy.
    #[arg(long, action = ArgAction::Set, default_value_t = true)]
    outline_regions: bool,

    /// Write SVG output to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write one SVG per visible layer into this directory.
    #[arg(long)]
    layers_dir: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full settings as a JSON string.
    ///
    /// When provided, all other settings flags are ignored. The JSON
    /// must be a valid `Settings` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Conversion strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Filled, color-separated regions.
    Stencil,
    /// Stroke-only outlines for plotters.
    PenDrawing,
}

/// Vector style selection.
#[derive(Clone, Copy, ValueEnum)]
enum Style {
    /// Filled regions with a thin border.
    Filled,
    /// Stroke-only region outlines.
    Outline,
    /// Outlines plus hatching of mid tones.
    Crosshatched,
}

/// Contour extractor selection.
#[derive(Clone, Copy, ValueEnum)]
enum Extractor {
    /// Suzuki-Abe border following.
    BorderFollowing,
    /// Moore-neighbor boundary tracing.
    MooreNeighbor,
}

/// Build [`Settings`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual settings flags are ignored. Otherwise, settings are
/// assembled from the individual flags.
fn settings_from_cli(cli: &Cli) -> Result<Settings, String> {
    if let Some(ref json) = cli.config_json {
        return Settings::from_json(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let mut settings = Settings::default();

    let posterize = &mut settings.posterize;
    posterize.color_count = cli.colors;
    posterize.thresholds.clone_from(&cli.thresholds);
    if let Some(min_region_size) = cli.noise_min_region {
        posterize.noise_settings.enabled = true;
        posterize.noise_settings.min_region_size = min_region_size;
    }
    if let Some(strength) = cli.smooth_strength {
        posterize.smooth_settings.enabled = true;
        posterize.smooth_settings.strength = strength;
    }
    if let Some(thickness) = cli.border_thickness {
        posterize.border_settings.enabled = true;
        posterize.border_settings.thickness = thickness;
    }

    let vector = &mut settings.vector;
    vector.strategy = match cli.strategy {
        Strategy::Stencil => StrategyKind::Stencil,
        Strategy::PenDrawing => StrategyKind::PenDrawing,
    };
    vector.style = match cli.style {
        Style::Filled => VectorStyle::Filled,
        Style::Outline => VectorStyle::Outline,
        Style::Crosshatched => VectorStyle::Crosshatched,
    };
    vector.contour_extractor = match cli.extractor {
        Extractor::BorderFollowing => ContourExtractorKind::BorderFollowing,
        Extractor::MooreNeighbor => ContourExtractorKind::MooreNeighbor,
    };
    vector.curve_smoothing = cli.curve_smoothing;
    vector.cross_hatching_settings = CrossHatchingSettings {
        enabled: cli.hatch_density.is_some(),
        density: cli
            .hatch_density
            .unwrap_or(CrossHatchingSettings::DEFAULT_DENSITY),
        angle: cli.hatch_angle,
        line_width: cli.hatch_line_width,
        outline_regions: cli.outline_regions,
    };

    Ok(settings)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match settings_from_cli(&cli) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    eprintln!("Settings: {settings:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match posterize_pipeline::diagnostics::process_with_diagnostics(
            &image_bytes,
            &settings,
            &StdClock,
        ) {
            Ok((result, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write SVG output on the first run only.
                if run == 0 {
                    write_outputs(&cli, &settings, &result.output);
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    // Print summary when multiple runs.
    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Write `--svg` and `--layers-dir` outputs. Failures are reported but
/// do not change the exit code.
fn write_outputs(cli: &Cli, settings: &Settings, output: &VectorOutput) {
    if cli.svg.is_none() && cli.layers_dir.is_none() {
        return;
    }

    let title = cli
        .image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("bench");
    let config_json = settings.to_json().ok();
    let metadata = posterize_export::SvgMetadata {
        title: Some(title),
        description: None,
        config_json: config_json.as_deref(),
        group_layers: settings.vector.export_layers,
    };

    if let Some(ref svg_path) = cli.svg {
        let svg = posterize_export::to_svg(output, &metadata);
        write_file(svg_path, &svg);
    }

    if let Some(ref dir) = cli.layers_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Error creating {}: {e}", dir.display());
            return;
        }
        match posterize_export::to_layer_svgs(output, &metadata) {
            Ok(layers) => {
                for layer in layers {
                    write_file(&dir.join(&layer.file_name), &layer.svg);
                }
            }
            Err(e) => eprintln!("Error exporting layers: {e}"),
        }
    }
}

fn write_file(path: &Path, contents: &str) {
    match std::fs::write(path, contents) {
        Ok(()) => {
            eprintln!(
                "SVG written to {} ({} bytes)",
                path.display(),
                contents.len(),
            );
        }
        Err(e) => {
            eprintln!("Error writing SVG to {}: {e}", path.display());
        }
    }
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&PipelineDiagnostics) -> Option<Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[PipelineDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Decode", |d| Some(d.decode.duration)),
        ("Crop", |d| d.crop.as_ref().map(|s| s.duration)),
        ("Posterize", |d| Some(d.posterize.duration)),
        ("Vectorize", |d| Some(d.vectorize.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
