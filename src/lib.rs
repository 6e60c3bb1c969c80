mod builder;
mod canvas;
mod color;
mod error;
mod matrix;
mod paint;
mod path_data;
mod raster;
mod render;
mod scene;
mod types;

pub use canvas::{Canvas, Command, Document};
pub use color::{Paint, parse_color, parse_paint};
pub use error::SvgError;
pub use matrix::{Matrix, parse_transform};
pub use paint::{Brush, Coord, Gradient, GradientKind, GradientStop, GradientUnits, PaintCatalog};
pub use path_data::{Segment, parse_path_data};
pub use raster::{SystemFontCatalog, rasterize, to_png};
pub use render::{FontCatalog, StyleContext, render, resolve_font_family};
pub use scene::{Element, LineCap, LineJoin, RawStyle, Scene, Shape};
pub use types::{Color, Pt, Shading, ShadingStop, Size, Spread, TextAnchor};

/// Parses a document from markup. The only hard failures are unparsable XML
/// and a missing `<svg>` root; malformed elements inside an otherwise valid
/// document degrade individually.
pub fn load_str(text: &str) -> Result<Scene, SvgError> {
    let doc = roxmltree::Document::parse(text)?;
    builder::build(&doc)
}

/// Reads and parses a document from disk.
pub fn load_file(path: impl AsRef<std::path::Path>) -> Result<Scene, SvgError> {
    let text = std::fs::read_to_string(path)?;
    load_str(&text)
}
