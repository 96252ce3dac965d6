//! Shared types for the posterize pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference per-bucket
/// masks without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference pixel grids
/// without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(f64::from(x), f64::from(y))
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Per-pixel bucket (tone level) indices for one image.
///
/// Every stored value is strictly less than [`color_count`](Self::color_count).
/// The constructor enforces this and the in-crate post-processors only
/// ever write values they read from the grid, so the invariant holds for
/// the lifetime of the grid. Deserialization goes through
/// [`BucketGrid::new`] as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BucketGridRaw")]
pub struct BucketGrid {
    width: u32,
    height: u32,
    color_count: u8,
    data: Vec<u8>,
}

/// Unchecked wire form of [`BucketGrid`].
#[derive(Deserialize)]
struct BucketGridRaw {
    width: u32,
    height: u32,
    color_count: u8,
    data: Vec<u8>,
}

impl TryFrom<BucketGridRaw> for BucketGrid {
    type Error = PipelineError;

    fn try_from(raw: BucketGridRaw) -> Result<Self, Self::Error> {
        Self::new(raw.width, raw.height, raw.color_count, raw.data)
    }
}

impl BucketGrid {
    /// Build a grid from raw row-major bucket values.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidSettings`] if `color_count < 2`,
    /// if `data.len()` does not equal `width * height`, or if any value
    /// is out of range.
    pub fn new(
        width: u32,
        height: u32,
        color_count: u8,
        data: Vec<u8>,
    ) -> Result<Self, PipelineError> {
        if color_count < 2 {
            return Err(PipelineError::InvalidSettings(format!(
                "color count must be at least 2, got {color_count}"
            )));
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(PipelineError::InvalidSettings(format!(
                "bucket data has {} values, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        if let Some(&bad) = data.iter().find(|&&b| b >= color_count) {
            return Err(PipelineError::InvalidSettings(format!(
                "bucket value {bad} out of range for color count {color_count}"
            )));
        }
        Ok(Self {
            width,
            height,
            color_count,
            data,
        })
    }

    /// A grid with every pixel set to `value` (clamped into range).
    #[must_use]
    pub fn filled(width: u32, height: u32, color_count: u8, value: u8) -> Self {
        let color_count = color_count.max(2);
        Self {
            width,
            height,
            color_count,
            data: vec![value.min(color_count - 1); width as usize * height as usize],
        }
    }

    /// Construct without validation. Callers guarantee the invariant.
    pub(crate) const fn from_parts(
        width: u32,
        height: u32,
        color_count: u8,
        data: Vec<u8>,
    ) -> Self {
        Self {
            width,
            height,
            color_count,
            data,
        }
    }

    /// Grid width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Grid dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Number of buckets (tone levels).
    #[must_use]
    pub const fn color_count(&self) -> u8 {
        self.color_count
    }

    /// Bucket at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Row-major bucket values.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Pixel count per bucket, indexed by bucket.
    #[must_use]
    pub fn histogram(&self) -> Vec<usize> {
        let mut counts = vec![0; usize::from(self.color_count)];
        for &b in &self.data {
            if let Some(c) = counts.get_mut(usize::from(b)) {
                *c += 1;
            }
        }
        counts
    }

    /// Binary mask for one bucket: 255 where the pixel belongs to
    /// `bucket`, 0 elsewhere.
    #[must_use]
    pub fn mask(&self, bucket: u8) -> GrayImage {
        let raw = self
            .data
            .iter()
            .map(|&b| if b == bucket { 255 } else { 0 })
            .collect();
        GrayImage::from_raw(self.width, self.height, raw)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }
}

/// Semantic role of a [`VectorPath`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionType {
    /// Filled region boundary (with hole sub-paths, even-odd rule).
    Fill,
    /// Stroke-only region outline.
    Outline,
    /// Tone-simulating hatching line set.
    Hatch,
    /// Stand-in geometry emitted when contour extraction is unavailable.
    Placeholder,
}

/// One drawable path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorPath {
    /// SVG path data.
    pub d: String,
    /// Fill paint (`"none"` for stroke-only paths).
    pub fill: String,
    /// Stroke paint (`"none"` for unstroked paths).
    pub stroke: String,
    /// Stroke width in pixels.
    pub stroke_width: f64,
    /// What the path represents, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_type: Option<RegionType>,
}

impl VectorPath {
    /// A filled path with a border stroke.
    #[must_use]
    pub fn filled(
        d: String,
        fill: impl Into<String>,
        stroke: impl Into<String>,
        stroke_width: f64,
    ) -> Self {
        Self {
            d,
            fill: fill.into(),
            stroke: stroke.into(),
            stroke_width,
            region_type: Some(RegionType::Fill),
        }
    }

    /// A stroke-only path (`fill="none"`).
    #[must_use]
    pub fn stroked(d: String, stroke: impl Into<String>, stroke_width: f64) -> Self {
        Self {
            d,
            fill: NO_PAINT.to_string(),
            stroke: stroke.into(),
            stroke_width,
            region_type: Some(RegionType::Outline),
        }
    }

    /// Replace the region type.
    #[must_use]
    pub const fn with_region_type(mut self, region_type: RegionType) -> Self {
        self.region_type = Some(region_type);
        self
    }

    /// `true` when the path has a fill paint.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.fill != NO_PAINT
    }
}

/// The paint value meaning "no fill" / "no stroke".
pub const NO_PAINT: &str = "none";

/// An ordered set of paths that share one drawing layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorLayer {
    /// Stable identifier, unique within a [`VectorOutput`].
    pub id: String,
    /// Human-readable label.
    pub label: String,
    /// Paths in drawing order.
    pub paths: Vec<VectorPath>,
    /// Whether renderers and exporters include this layer.
    pub visible: bool,
}

impl VectorLayer {
    /// A visible layer whose label equals its id.
    #[must_use]
    pub fn new(id: impl Into<String>, paths: Vec<VectorPath>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            paths,
            visible: true,
        }
    }

    /// Replace the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Terminal artifact of a conversion: layers in z-order (first = bottom).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorOutput {
    /// Canvas dimensions in pixels.
    pub dimensions: Dimensions,
    /// Layers, bottom to top.
    pub layers: Vec<VectorLayer>,
    /// Background paint.
    pub background: String,
}

impl VectorOutput {
    /// Layers with `visible == true`, in z-order.
    pub fn visible_layers(&self) -> impl Iterator<Item = &VectorLayer> {
        self.layers.iter().filter(|l| l.visible)
    }

    /// Toggle one layer's visibility without re-running the pipeline.
    ///
    /// Returns `false` if no layer has the given id.
    pub fn set_layer_visibility(&mut self, id: &str, visible: bool) -> bool {
        match self.layers.iter_mut().find(|l| l.id == id) {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Total number of paths across all layers.
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.layers.iter().map(|l| l.paths.len()).sum()
    }
}

/// Errors that can occur during pipeline processing.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Settings were rejected before processing began.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// Serde-compatible proxy for `PipelineError`.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidSettings(String),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidSettings(s) => PipelineErrorProxy::InvalidSettings(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The typed image error cannot be rebuilt; keep the message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidSettings(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidSettings(s) => Self::InvalidSettings(s),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
        assert!((a.distance_squared(b) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bucket_grid_rejects_out_of_range_values() {
        let result = BucketGrid::new(2, 1, 2, vec![0, 2]);
        assert!(matches!(result, Err(PipelineError::InvalidSettings(_))));
    }

    #[test]
    fn bucket_grid_rejects_wrong_length() {
        let result = BucketGrid::new(2, 2, 3, vec![0, 1, 2]);
        assert!(matches!(result, Err(PipelineError::InvalidSettings(_))));
    }

    #[test]
    fn bucket_grid_rejects_single_color() {
        let result = BucketGrid::new(1, 1, 1, vec![0]);
        assert!(matches!(result, Err(PipelineError::InvalidSettings(_))));
    }

    #[test]
    fn bucket_grid_deserialize_validates() {
        let ok: BucketGrid =
            serde_json::from_str(r#"{"width":2,"height":1,"color_count":2,"data":[0,1]}"#)
                .unwrap();
        assert_eq!(ok.as_slice(), &[0, 1]);

        for bad in [
            r#"{"width":1,"height":1,"color_count":2,"data":[5]}"#,
            r#"{"width":4,"height":4,"color_count":2,"data":[1]}"#,
            r#"{"width":1,"height":1,"color_count":1,"data":[0]}"#,
        ] {
            let err = serde_json::from_str::<BucketGrid>(bad).unwrap_err();
            assert!(err.to_string().contains("invalid settings"), "{err}");
        }
    }

    #[test]
    fn bucket_grid_get_and_histogram() {
        let grid = BucketGrid::new(3, 2, 3, vec![0, 1, 2, 2, 2, 1]).unwrap();
        assert_eq!(grid.get(2, 0), Some(2));
        assert_eq!(grid.get(1, 1), Some(2));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.histogram(), vec![1, 2, 3]);
    }

    #[test]
    fn bucket_grid_mask_marks_only_matching_bucket() {
        let grid = BucketGrid::new(2, 2, 2, vec![0, 1, 1, 0]).unwrap();
        let mask = grid.mask(1);
        assert_eq!(mask.as_raw(), &vec![0, 255, 255, 0]);
    }

    #[test]
    fn filled_grid_clamps_value() {
        let grid = BucketGrid::filled(2, 2, 3, 9);
        assert!(grid.as_slice().iter().all(|&b| b == 2));
    }

    #[test]
    fn layer_visibility_toggle() {
        let mut output = VectorOutput {
            dimensions: Dimensions {
                width: 4,
                height: 4,
            },
            layers: vec![
                VectorLayer::new("a", vec![]),
                VectorLayer::new("b", vec![]),
            ],
            background: "#ffffff".to_string(),
        };
        assert!(output.set_layer_visibility("b", false));
        assert!(!output.set_layer_visibility("missing", false));
        let ids: Vec<_> = output.visible_layers().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn stroked_path_has_no_fill() {
        let path = VectorPath::stroked("M0 0 Z".to_string(), "#000000", 1.0);
        assert!(!path.is_filled());
        assert_eq!(path.region_type, Some(RegionType::Outline));
    }

    #[test]
    fn error_display() {
        let err = PipelineError::InvalidSettings("color count must be at least 2".to_string());
        assert_eq!(
            err.to_string(),
            "invalid settings: color count must be at least 2"
        );
        assert_eq!(PipelineError::EmptyInput.to_string(), "input image data is empty");
    }

    #[test]
    fn pipeline_error_serde_round_trip() {
        let err = PipelineError::InvalidSettings("bad".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let back: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, PipelineError::InvalidSettings(ref s) if s == "bad"));
    }

    #[test]
    fn vector_output_serde_round_trip() {
        let output = VectorOutput {
            dimensions: Dimensions {
                width: 8,
                height: 6,
            },
            layers: vec![VectorLayer::new(
                "bucket-1",
                vec![VectorPath::filled(
                    "M0 0 L1 0 L1 1 Z".to_string(),
                    "#ff0000",
                    "#333333",
                    0.5,
                )],
            )],
            background: "#ffffff".to_string(),
        };
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"strokeWidth\":0.5"));
        let back: VectorOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(output, back);
    }
}
