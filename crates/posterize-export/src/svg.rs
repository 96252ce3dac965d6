//! SVG export serializer.
//!
//! Converts a [`VectorOutput`] into SVG strings using the [`svg`] crate
//! for document construction and XML escaping. Every visible layer
//! becomes an Inkscape-style `<g>` layer (or a run of flat `<path>`
//! elements when grouping is off). Fill paths carry
//! `fill-rule="evenodd"` so hole sub-paths punch through.
//!
//! Optional [`SvgMetadata`] embeds `<title>`, `<desc>` and the settings
//! JSON for reproducibility.
//!
//! These are pure functions with no I/O -- they return `String`s.

use svg::Document;
use svg::node::element::{Description, Element, Group, Path, Rectangle, Title};
use svg::node::{Node, Text};

use posterize_pipeline::{Dimensions, VectorLayer, VectorOutput, VectorPath};

/// Namespace of the Inkscape layer attributes.
const INKSCAPE_NS: &str = "http://www.inkscape.org/namespaces/inkscape";

/// Namespace of the embedded settings element.
const POSTERIZE_NS: &str = "https://posterize.dev/ns/1";

/// Metadata to embed in the SVG document.
///
/// When present, a `<title>` and/or `<desc>` element is emitted
/// immediately after the opening `<svg>` tag. Text values are
/// XML-escaped by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized `Settings` JSON, emitted inside `<metadata>` wrapped
    /// in a namespaced `<posterize:settings>` element.
    pub config_json: Option<&'a str>,

    /// Wrap each layer in a `<g>` with an Inkscape layer label.
    ///
    /// Usually mirrors `VectorSettings::export_layers`.
    pub group_layers: bool,
}

/// One per-layer SVG document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSvg {
    /// Layer id.
    pub id: String,
    /// Suggested file name: `{index:02}-{id}.svg`.
    pub file_name: String,
    /// Complete SVG document.
    pub svg: String,
}

/// Errors from per-layer export.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExportError {
    /// There is no visible layer to export.
    #[error("vector output has no visible layers")]
    EmptyOutput,
}

fn document(
    dimensions: Dimensions,
    background: &str,
    metadata: &SvgMetadata<'_>,
    layered: bool,
) -> Document {
    let w = dimensions.width;
    let h = dimensions.height;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));
    if layered {
        doc = doc.set("xmlns:inkscape", INKSCAPE_NS);
    }

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut settings_el = Element::new("posterize:settings");
        settings_el.assign("xmlns:posterize", POSTERIZE_NS);
        settings_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(settings_el);
        doc = doc.add(metadata_el);
    }

    doc.add(
        Rectangle::new()
            .set("width", "100%")
            .set("height", "100%")
            .set("fill", background),
    )
}

fn path_element(path: &VectorPath) -> Path {
    let mut element = Path::new()
        .set("d", path.d.as_str())
        .set("fill", path.fill.as_str())
        .set("stroke", path.stroke.as_str())
        .set("stroke-width", path.stroke_width);
    if path.is_filled() {
        element = element.set("fill-rule", "evenodd");
    }
    element
}

fn layer_group(layer: &VectorLayer) -> Group {
    layer.paths.iter().fold(
        Group::new()
            .set("id", layer.id.as_str())
            .set("inkscape:label", layer.label.as_str())
            .set("inkscape:groupmode", "layer"),
        |group, path| group.add(path_element(path)),
    )
}

fn add_layer(doc: Document, layer: &VectorLayer, group: bool) -> Document {
    if group {
        doc.add(layer_group(layer))
    } else {
        layer
            .paths
            .iter()
            .fold(doc, |doc, path| doc.add(path_element(path)))
    }
}

/// The svg crate omits the XML declaration, so we prepend it.
fn finish(doc: &Document) -> String {
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}

/// Serialize every visible layer into one SVG document.
///
/// Layers are emitted in z-order after a full-canvas background
/// rectangle. Hidden layers are skipped.
#[must_use]
pub fn to_svg(output: &VectorOutput, metadata: &SvgMetadata<'_>) -> String {
    let doc = output.visible_layers().fold(
        document(
            output.dimensions,
            &output.background,
            metadata,
            metadata.group_layers,
        ),
        |doc, layer| add_layer(doc, layer, metadata.group_layers),
    );
    finish(&doc)
}

/// Serialize each visible layer into its own SVG document.
///
/// Every document repeats the canvas size, metadata and background so
/// the files can be stacked or cut independently.
///
/// # Errors
///
/// Returns [`ExportError::EmptyOutput`] when no layer is visible.
pub fn to_layer_svgs(
    output: &VectorOutput,
    metadata: &SvgMetadata<'_>,
) -> Result<Vec<LayerSvg>, ExportError> {
    let svgs: Vec<LayerSvg> = output
        .visible_layers()
        .enumerate()
        .map(|(index, layer)| {
            let doc = add_layer(
                document(output.dimensions, &output.background, metadata, true),
                layer,
                true,
            );
            LayerSvg {
                id: layer.id.clone(),
                file_name: format!("{index:02}-{}.svg", layer.id),
                svg: finish(&doc),
            }
        })
        .collect();
    if svgs.is_empty() {
        return Err(ExportError::EmptyOutput);
    }
    Ok(svgs)
}
