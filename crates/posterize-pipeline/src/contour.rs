//! Contour extraction with nesting hierarchy from a binary mask.
//!
//! This module defines the [`ContourExtractor`] trait, the capability
//! the conversion strategies consume ("find contours with hierarchy in
//! this mask"), and [`ContourExtractorKind`] for selecting an
//! implementation at runtime.
//!
//! Contours live in a [`ContourSet`] arena and refer to each other by
//! index, so parent/child links never form ownership cycles. Depth
//! parity carries meaning: even depth is a filled region boundary (or
//! an island inside a hole), odd depth is a hole.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::moore;

/// Which contours a caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    /// Only outermost boundaries (contours without a parent).
    External,
    /// Every boundary with the full nesting tree.
    Tree,
}

/// Whether a contour bounds a filled region or a hole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    /// Boundary between a foreground region and the background around it.
    Outer,
    /// Boundary between a foreground region and a hole inside it.
    Hole,
}

/// One closed boundary and its position in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    /// Boundary pixels in traversal order; the ring closes implicitly.
    pub points: Vec<(i32, i32)>,
    /// Outer or hole border.
    pub kind: BorderKind,
    /// Index of the enclosing contour, `None` for roots.
    pub parent: Option<usize>,
    /// Indices of directly enclosed contours, ascending.
    pub children: Vec<usize>,
}

/// Arena of contours addressed by index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContourSet {
    contours: Vec<Contour>,
}

impl ContourSet {
    /// Build a set from `(points, kind, parent)` entries, deriving the
    /// child lists.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::MalformedContour`] if a parent index is
    /// out of range or the parent links contain a cycle.
    pub fn from_parents(
        entries: Vec<(Vec<(i32, i32)>, BorderKind, Option<usize>)>,
    ) -> Result<Self, ExtractError> {
        let len = entries.len();
        let mut contours: Vec<Contour> = entries
            .into_iter()
            .map(|(points, kind, parent)| Contour {
                points,
                kind,
                parent,
                children: Vec::new(),
            })
            .collect();

        for index in 0..len {
            match contours[index].parent {
                Some(p) if p >= len || p == index => {
                    return Err(ExtractError::MalformedContour { index });
                }
                Some(p) => contours[p].children.push(index),
                None => {}
            }
        }

        let set = Self { contours };
        for index in 0..len {
            if set.try_depth(index).is_none() {
                return Err(ExtractError::MalformedContour { index });
            }
        }
        Ok(set)
    }

    /// Number of contours.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.contours.len()
    }

    /// `true` when no contour was found.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    /// Contour at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Contour> {
        self.contours.get(index)
    }

    /// All contours in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Contour> {
        self.contours.iter()
    }

    /// Indices of contours without a parent, ascending.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.contours
            .iter()
            .enumerate()
            .filter(|(_, c)| c.parent.is_none())
            .map(|(i, _)| i)
    }

    /// Nesting depth of `index` (roots are 0). Out-of-range indices
    /// report 0.
    #[must_use]
    pub fn depth(&self, index: usize) -> usize {
        self.try_depth(index).unwrap_or(0)
    }

    fn try_depth(&self, index: usize) -> Option<usize> {
        let mut depth = 0;
        let mut current = self.contours.get(index)?.parent;
        while let Some(p) = current {
            depth += 1;
            if depth > self.contours.len() {
                return None;
            }
            current = self.contours.get(p)?.parent;
        }
        Some(depth)
    }

    /// Keep only the root contours, re-indexed, with no children.
    #[must_use]
    pub fn into_external(self) -> Self {
        let contours = self
            .contours
            .into_iter()
            .filter(|c| c.parent.is_none())
            .map(|c| Contour {
                children: Vec::new(),
                ..c
            })
            .collect();
        Self { contours }
    }
}

/// Failures of the contour capability.
///
/// None of these escape a conversion strategy: they select a local
/// recovery (placeholder output, skipped bucket, minimal path).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The capability is not loaded or not ready.
    #[error("contour extraction is unavailable: {0}")]
    Unavailable(String),

    /// Contour data came back without the expected shape.
    #[error("malformed contour data at index {index}")]
    MalformedContour {
        /// Offending contour index.
        index: usize,
    },

    /// Scratch memory for the extraction could not be obtained.
    #[error("contour extraction resource error: {0}")]
    Resource(String),
}

/// Trait for contour extraction capabilities.
///
/// Input: a binary mask (non-zero pixels are foreground).
/// Output: boundaries with their nesting hierarchy.
pub trait ContourExtractor {
    /// Find contours in `mask`.
    ///
    /// # Errors
    ///
    /// See [`ExtractError`].
    fn find_contours(
        &self,
        mask: &GrayImage,
        mode: RetrievalMode,
    ) -> Result<ContourSet, ExtractError>;
}

/// Selects which contour extractor to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourExtractorKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`.
    #[default]
    BorderFollowing,

    /// Connected-component labelling plus Moore-neighbor boundary
    /// tracing.
    MooreNeighbor,
}

impl ContourExtractor for ContourExtractorKind {
    fn find_contours(
        &self,
        mask: &GrayImage,
        mode: RetrievalMode,
    ) -> Result<ContourSet, ExtractError> {
        let set = match *self {
            Self::BorderFollowing => find_border_following(mask)?,
            Self::MooreNeighbor => ContourSet::from_parents(moore::trace_contours(mask)?)?,
        };
        Ok(match mode {
            RetrievalMode::External => set.into_external(),
            RetrievalMode::Tree => set,
        })
    }
}

/// Suzuki-Abe border following via `imageproc`.
fn find_border_following(mask: &GrayImage) -> Result<ContourSet, ExtractError> {
    if mask.width() == 0 || mask.height() == 0 {
        return Ok(ContourSet::default());
    }
    let contours: Vec<imageproc::contours::Contour<i32>> =
        imageproc::contours::find_contours(mask);
    let entries = contours
        .into_iter()
        .map(|c| {
            let kind = match c.border_type {
                imageproc::contours::BorderType::Outer => BorderKind::Outer,
                imageproc::contours::BorderType::Hole => BorderKind::Hole,
            };
            let points = c.points.into_iter().map(|p| (p.x, p.y)).collect();
            (points, kind, c.parent)
        })
        .collect();
    ContourSet::from_parents(entries)
}
