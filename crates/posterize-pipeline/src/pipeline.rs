//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`] which runs the entire pipeline in one
//! call, [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use posterize_pipeline::{Pipeline, PipelineError, Settings};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let result = Pipeline::new(png, Settings::default())
//!     .decode()?
//!     .crop()?
//!     .posterize()?
//!     .vectorize()
//!     .into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state
//! (or `Result` for fallible stages), carrying all previously computed
//! intermediates. Settings are validated by [`Pending::decode`] before
//! the image bytes are touched.

use serde::{Deserialize, Serialize};

use crate::noise::NoiseReport;
use crate::strategy::ConversionStrategy;
use crate::types::{BucketGrid, Dimensions, PipelineError, RgbaImage, VectorOutput};
use crate::{PosterizeOutput, Settings};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// The source image bytes and settings are stored but not yet touched.
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    settings: Settings,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the settings, decode the source image and advance to
    /// the [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] if the settings fail
    /// validation, [`PipelineError::EmptyInput`] if the source bytes are
    /// empty, and [`PipelineError::ImageDecode`] if the image format is
    /// unrecognized or the data is corrupt.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        let settings = self.settings.normalized()?;
        let original = crate::decode(&self.source)?;
        Ok(Decoded {
            settings,
            original,
            source_len: self.source.len(),
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding the source image.
#[must_use = "pipeline stages are consumed by advancing; call .crop() to continue"]
pub struct Decoded {
    settings: Settings,
    original: RgbaImage,
    source_len: usize,
}

impl Decoded {
    /// The original decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Size of the encoded source in bytes.
    #[must_use]
    pub const fn source_len(&self) -> usize {
        self.source_len
    }

    /// Apply the crop settings and advance to the [`Cropped`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] if the crop rectangle
    /// is empty within the image.
    pub fn crop(self) -> Result<Cropped, PipelineError> {
        let cropped = crate::crop(&self.original, &self.settings.crop)?;
        Ok(Cropped {
            settings: self.settings,
            original: self.original,
            cropped,
        })
    }
}

// ───────────────────────── Stage 2: Cropped ──────────────────────────

/// Pipeline state after the optional crop.
#[must_use = "pipeline stages are consumed by advancing; call .posterize() to continue"]
pub struct Cropped {
    settings: Settings,
    original: RgbaImage,
    cropped: RgbaImage,
}

impl Cropped {
    /// The working image (a copy of the original when cropping is off).
    #[must_use]
    pub const fn cropped(&self) -> &RgbaImage {
        &self.cropped
    }

    /// Bucketize and post-process, advancing to the [`Posterized`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] if the posterize
    /// settings fail validation.
    pub fn posterize(self) -> Result<Posterized, PipelineError> {
        let posterized = crate::posterize(&self.cropped, &self.settings.posterize)?;
        Ok(Posterized {
            settings: self.settings,
            original: self.original,
            cropped: self.cropped,
            posterized,
        })
    }
}

// ───────────────────────── Stage 3: Posterized ───────────────────────

/// Pipeline state after bucketization and raster post-processing.
#[must_use = "pipeline stages are consumed by advancing; call .vectorize() to continue"]
pub struct Posterized {
    settings: Settings,
    original: RgbaImage,
    cropped: RgbaImage,
    posterized: PosterizeOutput,
}

impl Posterized {
    /// Bucket index per pixel.
    #[must_use]
    pub const fn buckets(&self) -> &BucketGrid {
        &self.posterized.buckets
    }

    /// Gray rendering of the buckets.
    #[must_use]
    pub const fn posterized(&self) -> &RgbaImage {
        &self.posterized.image
    }

    /// Noise removal summary, when it ran.
    #[must_use]
    pub const fn noise(&self) -> Option<NoiseReport> {
        self.posterized.noise
    }

    /// Convert to vector layers with the configured strategy and
    /// advance to the [`Vectorized`] stage.
    ///
    /// Infallible: settings were validated at decode time and
    /// extraction problems degrade locally.
    pub fn vectorize(self) -> Vectorized {
        let vector = &self.settings.vector;
        let output = vector
            .strategy
            .convert(&self.posterized.buckets, vector, &vector.contour_extractor);
        Vectorized {
            original: self.original,
            cropped: self.cropped,
            posterized: self.posterized,
            output,
        }
    }
}

// ───────────────────────── Stage 4: Vectorized ───────────────────────

/// Pipeline state after vector conversion. Terminal.
#[must_use = "call .into_result() to obtain the ProcessResult"]
pub struct Vectorized {
    original: RgbaImage,
    cropped: RgbaImage,
    posterized: PosterizeOutput,
    output: VectorOutput,
}

impl Vectorized {
    /// The layered vector output.
    #[must_use]
    pub const fn output(&self) -> &VectorOutput {
        &self.output
    }

    /// Canvas dimensions of the output.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.output.dimensions
    }

    /// Consume the pipeline and return every intermediate.
    #[must_use]
    pub fn into_result(self) -> ProcessResult {
        ProcessResult {
            original: self.original,
            cropped: self.cropped,
            posterized: self.posterized.image,
            buckets: self.posterized.buckets,
            noise: self.posterized.noise,
            output: self.output,
        }
    }
}

// ───────────────────────── Result ────────────────────────────────────

/// Every intermediate of one pipeline run.
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Decoded source image.
    pub original: RgbaImage,
    /// Working image after the optional crop.
    pub cropped: RgbaImage,
    /// Gray posterized rendering (with borders when enabled).
    pub posterized: RgbaImage,
    /// Bucket index per pixel.
    pub buckets: BucketGrid,
    /// Noise removal summary, when it ran.
    pub noise: Option<NoiseReport>,
    /// Layered vector output.
    pub output: VectorOutput,
}

/// Serde-compatible proxy for [`ProcessResult`]; images are stored as
/// `(width, height, raw RGBA bytes)`.
#[derive(Serialize, Deserialize)]
struct ProcessResultProxy {
    original: (u32, u32, Vec<u8>),
    cropped: (u32, u32, Vec<u8>),
    posterized: (u32, u32, Vec<u8>),
    buckets: BucketGrid,
    noise: Option<NoiseReport>,
    output: VectorOutput,
}

fn image_parts(image: &RgbaImage) -> (u32, u32, Vec<u8>) {
    (image.width(), image.height(), image.as_raw().clone())
}

impl Serialize for ProcessResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ProcessResultProxy {
            original: image_parts(&self.original),
            cropped: image_parts(&self.cropped),
            posterized: image_parts(&self.posterized),
            buckets: self.buckets.clone(),
            noise: self.noise,
            output: self.output.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProcessResult {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = ProcessResultProxy::deserialize(deserializer)?;
        let image = |(w, h, raw): (u32, u32, Vec<u8>), what: &str| {
            RgbaImage::from_raw(w, h, raw).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid {what} image dimensions"))
            })
        };
        Ok(Self {
            original: image(proxy.original, "original")?,
            cropped: image(proxy.cropped, "cropped")?,
            posterized: image(proxy.posterized, "posterized")?,
            buckets: proxy.buckets,
            noise: proxy.noise,
            output: proxy.output,
        })
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Entry point for the staged pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Create a pipeline in the [`Pending`] state.
    ///
    /// Nothing is validated or decoded until [`Pending::decode`].
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, settings: Settings) -> Pending {
        Pending {
            settings,
            source: image_bytes,
        }
    }
}
