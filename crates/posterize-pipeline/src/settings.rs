//! Pipeline settings and their eager validation.
//!
//! All settings are plain serde structs mirroring what a
//! state-management collaborator persists as JSON under
//! [`SETTINGS_STORAGE_KEY`]. Missing fields take their defaults so older
//! persisted blobs keep loading.
//!
//! Validation happens once at the pipeline boundary via the
//! `normalized()` methods: impossible values are rejected with
//! [`PipelineError::InvalidSettings`], recoverable ones (unsorted
//! thresholds, out-of-range hatch density or angle) are normalized.

use serde::{Deserialize, Serialize};

use crate::contour::ContourExtractorKind;
use crate::strategy::StrategyKind;
use crate::types::{Dimensions, PipelineError};

/// Storage key under which a UI collaborator persists [`Settings`].
pub const SETTINGS_STORAGE_KEY: &str = "posterize-settings";

/// Small isolated region removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoiseSettings {
    /// Whether noise removal runs.
    pub enabled: bool,
    /// Regions with fewer pixels than this are merged into a neighbor.
    pub min_region_size: usize,
}

impl NoiseSettings {
    /// Default minimum region size in pixels.
    pub const DEFAULT_MIN_REGION_SIZE: usize = 10;
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            min_region_size: Self::DEFAULT_MIN_REGION_SIZE,
        }
    }
}

/// Majority-vote smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SmoothSettings {
    /// Whether smoothing runs.
    pub enabled: bool,
    /// Number of relaxation passes.
    pub strength: u32,
}

impl SmoothSettings {
    /// Default number of smoothing passes.
    pub const DEFAULT_STRENGTH: u32 = 1;
}

impl Default for SmoothSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            strength: Self::DEFAULT_STRENGTH,
        }
    }
}

/// Black outlines between buckets in the posterized raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BorderSettings {
    /// Whether borders are drawn.
    pub enabled: bool,
    /// Border thickness in pixels.
    pub thickness: u32,
}

impl BorderSettings {
    /// Default border thickness in pixels.
    pub const DEFAULT_THICKNESS: u32 = 1;
}

impl Default for BorderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            thickness: Self::DEFAULT_THICKNESS,
        }
    }
}

/// How pixels are bucketized and post-processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PosterizeSettings {
    /// Number of tone levels, at least 2.
    pub color_count: u8,
    /// Ascending luminance cut points, `color_count - 1` of them, or
    /// empty for evenly spaced levels.
    pub thresholds: Vec<u8>,
    /// Small region removal.
    pub noise_settings: NoiseSettings,
    /// Majority-vote smoothing.
    pub smooth_settings: SmoothSettings,
    /// Posterized raster outlines.
    pub border_settings: BorderSettings,
}

impl PosterizeSettings {
    /// Default number of tone levels.
    pub const DEFAULT_COLOR_COUNT: u8 = 4;
    /// Smallest accepted number of tone levels.
    pub const MIN_COLOR_COUNT: u8 = 2;

    /// Validate and normalize.
    ///
    /// Thresholds that are out of order are sorted ascending; a single
    /// slider edit can otherwise leave a later, smaller threshold that
    /// the bucket assignment would never reach.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] if `color_count < 2`
    /// or if a non-empty threshold list does not hold exactly
    /// `color_count - 1` values.
    pub fn normalized(&self) -> Result<Self, PipelineError> {
        if self.color_count < Self::MIN_COLOR_COUNT {
            return Err(PipelineError::InvalidSettings(format!(
                "color count must be at least {}, got {}",
                Self::MIN_COLOR_COUNT,
                self.color_count
            )));
        }
        let expected = usize::from(self.color_count - 1);
        if !self.thresholds.is_empty() && self.thresholds.len() != expected {
            return Err(PipelineError::InvalidSettings(format!(
                "expected {expected} thresholds for {} colors, got {}",
                self.color_count,
                self.thresholds.len()
            )));
        }
        let mut thresholds = self.thresholds.clone();
        thresholds.sort_unstable();
        Ok(Self {
            thresholds,
            ..self.clone()
        })
    }

    /// `true` when the caller supplied explicit thresholds.
    #[must_use]
    pub fn has_custom_thresholds(&self) -> bool {
        !self.thresholds.is_empty()
    }

    /// The thresholds bucketization uses: the supplied ones, or evenly
    /// spaced ones when none were given.
    #[must_use]
    pub fn effective_thresholds(&self) -> Vec<u8> {
        if self.has_custom_thresholds() {
            self.thresholds.clone()
        } else {
            even_thresholds(self.color_count)
        }
    }
}

impl Default for PosterizeSettings {
    fn default() -> Self {
        Self {
            color_count: Self::DEFAULT_COLOR_COUNT,
            thresholds: Vec::new(),
            noise_settings: NoiseSettings::default(),
            smooth_settings: SmoothSettings::default(),
            border_settings: BorderSettings::default(),
        }
    }
}

/// Evenly spaced cut points: `round(255 * (i + 1) / color_count)`.
#[must_use]
pub fn even_thresholds(color_count: u8) -> Vec<u8> {
    let n = f64::from(color_count.max(2));
    (1..color_count.max(2))
        .map(|i| round_to_u8(255.0 * f64::from(i) / n))
        .collect()
}

/// Round and clamp a tone value into a byte.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn round_to_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Overall look of the vector output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStyle {
    /// Regions are filled with their bucket color.
    #[default]
    Filled,
    /// Regions are outlined only.
    Outline,
    /// Regions are outlined and hatched to simulate tone.
    Crosshatched,
}

/// Cross-hatching parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CrossHatchingSettings {
    /// Whether hatching lines are generated.
    pub enabled: bool,
    /// Line density, 1 (sparse) to 10 (dense).
    pub density: u8,
    /// Primary hatching angle in degrees, `[0, 180)`.
    pub angle: f64,
    /// Stroke width of hatching lines.
    pub line_width: f64,
    /// Whether hole boundaries are drawn in addition to outer outlines.
    pub outline_regions: bool,
}

impl CrossHatchingSettings {
    /// Default hatch density.
    pub const DEFAULT_DENSITY: u8 = 5;
    /// Default hatch angle in degrees.
    pub const DEFAULT_ANGLE: f64 = 45.0;
    /// Default hatch stroke width.
    pub const DEFAULT_LINE_WIDTH: f64 = 1.0;
    /// Lowest accepted density.
    pub const MIN_DENSITY: u8 = 1;
    /// Highest accepted density.
    pub const MAX_DENSITY: u8 = 10;

    /// Clamp density, wrap the angle into `[0, 180)`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] if the angle is not
    /// finite or the line width is not a positive finite number.
    pub fn normalized(&self) -> Result<Self, PipelineError> {
        if !self.angle.is_finite() {
            return Err(PipelineError::InvalidSettings(format!(
                "hatch angle must be finite, got {}",
                self.angle
            )));
        }
        if !self.line_width.is_finite() || self.line_width <= 0.0 {
            return Err(PipelineError::InvalidSettings(format!(
                "hatch line width must be positive, got {}",
                self.line_width
            )));
        }
        Ok(Self {
            density: self.density.clamp(Self::MIN_DENSITY, Self::MAX_DENSITY),
            angle: self.angle.rem_euclid(180.0),
            ..*self
        })
    }
}

impl Default for CrossHatchingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            density: Self::DEFAULT_DENSITY,
            angle: Self::DEFAULT_ANGLE,
            line_width: Self::DEFAULT_LINE_WIDTH,
            outline_regions: true,
        }
    }
}

/// How bucketized pixels become vector layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VectorSettings {
    /// Fill, outline or hatch.
    #[serde(rename = "type")]
    pub style: VectorStyle,
    /// Curve fitting tolerance in pixels; 0 keeps straight pixel edges.
    pub curve_smoothing: f64,
    /// Whether exporters keep one group/file per layer.
    pub export_layers: bool,
    /// Which conversion strategy assembles the layers.
    pub strategy: StrategyKind,
    /// Which contour extractor backs the strategies.
    pub contour_extractor: ContourExtractorKind,
    /// Hatching parameters.
    pub cross_hatching_settings: CrossHatchingSettings,
}

impl VectorSettings {
    /// Validate and normalize, including the nested hatching settings.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] if `curve_smoothing`
    /// is negative or not finite, or if the hatching settings are
    /// invalid.
    pub fn normalized(&self) -> Result<Self, PipelineError> {
        if !self.curve_smoothing.is_finite() || self.curve_smoothing < 0.0 {
            return Err(PipelineError::InvalidSettings(format!(
                "curve smoothing must be a non-negative number, got {}",
                self.curve_smoothing
            )));
        }
        Ok(Self {
            cross_hatching_settings: self.cross_hatching_settings.normalized()?,
            ..*self
        })
    }

    /// Hatching runs when enabled explicitly or implied by the style.
    #[must_use]
    pub fn hatching_enabled(&self) -> bool {
        self.cross_hatching_settings.enabled || self.style == VectorStyle::Crosshatched
    }
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self {
            style: VectorStyle::default(),
            curve_smoothing: 0.0,
            export_layers: true,
            strategy: StrategyKind::default(),
            contour_extractor: ContourExtractorKind::default(),
            cross_hatching_settings: CrossHatchingSettings::default(),
        }
    }
}

/// Optional crop applied before bucketization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CropSettings {
    /// Whether the crop is applied.
    pub enabled: bool,
    /// Left edge in source pixels.
    pub x: u32,
    /// Top edge in source pixels.
    pub y: u32,
    /// Crop width in source pixels.
    pub width: u32,
    /// Crop height in source pixels.
    pub height: u32,
}

impl CropSettings {
    /// Clamp the crop rectangle to the image and return it as
    /// `(x, y, width, height)`, or `None` when cropping is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] if the clamped
    /// rectangle is empty.
    pub fn resolve(&self, image: Dimensions) -> Result<Option<(u32, u32, u32, u32)>, PipelineError> {
        if !self.enabled {
            return Ok(None);
        }
        let x = self.x.min(image.width);
        let y = self.y.min(image.height);
        let width = self.width.min(image.width - x);
        let height = self.height.min(image.height - y);
        if width == 0 || height == 0 {
            return Err(PipelineError::InvalidSettings(format!(
                "crop {}x{}+{}+{} is empty within a {}x{} image",
                self.width, self.height, self.x, self.y, image.width, image.height
            )));
        }
        Ok(Some((x, y, width, height)))
    }
}

/// Everything the pipeline consumes, as persisted by the UI.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Bucketization and raster post-processing.
    pub posterize: PosterizeSettings,
    /// Vector conversion.
    pub vector: VectorSettings,
    /// Pre-bucketization crop.
    pub crop: CropSettings,
}

impl Settings {
    /// Parse persisted settings JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] if the JSON is
    /// malformed.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(json)
            .map_err(|e| PipelineError::InvalidSettings(format!("malformed settings JSON: {e}")))
    }

    /// Serialize for persistence.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] if a value cannot be
    /// represented (e.g. a non-finite float).
    pub fn to_json(&self) -> Result<String, PipelineError> {
        serde_json::to_string(self)
            .map_err(|e| PipelineError::InvalidSettings(format!("unserializable settings: {e}")))
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Propagates the first [`PipelineError::InvalidSettings`] found.
    pub fn normalized(&self) -> Result<Self, PipelineError> {
        Ok(Self {
            posterize: self.posterize.normalized()?,
            vector: self.vector.normalized()?,
            crop: self.crop,
        })
    }
}
