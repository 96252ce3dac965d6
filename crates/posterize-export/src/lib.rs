//! posterize-export: Pure format serializers (sans-IO)
//!
//! Converts layered vector output into SVG, either as one document or
//! one document per layer. Packaging the per-layer documents (ZIP,
//! directory) is left to the caller.

pub mod svg;

pub use svg::{ExportError, LayerSvg, SvgMetadata, to_layer_svgs, to_svg};
