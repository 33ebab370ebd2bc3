//! SVG path emission and document assembly.
//!
//! Path data is formatted by hand so every coordinate carries exactly
//! [`COORDINATE_PRECISION`] decimals; the [`svg`] crate builds the elements and
//! the enclosing document.

use crate::error::VectorizeResult;
use crate::vectorizer::{PathCommand, Point, VectorPath, VectorizedData};
use rgb::RGB8;
use std::fs;
use std::path::Path;
use svg::Document;
use svg::node::element::Path as PathElement;

/// Decimals written for every coordinate.
pub const COORDINATE_PRECISION: usize = 2;

/// Lowercase `#rrggbb`.
pub fn hex_color(color: RGB8) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

fn fmt_coord(v: f64) -> String {
    let s = format!("{:.*}", COORDINATE_PRECISION, v);
    // "-0.00" would otherwise leak out of tiny negative values.
    if s.starts_with('-') && s[1..].bytes().all(|b| b == b'0' || b == b'.') {
        s[1..].to_string()
    } else {
        s
    }
}

fn fmt_point(p: &Point) -> String {
    format!("{},{}", fmt_coord(p.x), fmt_coord(p.y))
}

/// The `d` attribute for `path`: `M x,y`, `L x,y`, `C x1,y1 x2,y2 x,y` and `Z`,
/// separated by single spaces.
pub fn path_data(path: &VectorPath) -> String {
    let mut d = String::new();
    for cmd in &path.commands {
        if !d.is_empty() {
            d.push(' ');
        }
        let segment = match cmd {
            PathCommand::MoveTo(p) => format!("M {}", fmt_point(p)),
            PathCommand::LineTo(p) => format!("L {}", fmt_point(p)),
            PathCommand::CubicTo(c1, c2, p) => {
                format!("C {} {} {}", fmt_point(c1), fmt_point(c2), fmt_point(p))
            }
            PathCommand::Close => "Z".to_string(),
        };
        d.push_str(&segment);
    }
    d
}

/// A filled `<path>` element for one traced outline.
pub fn path_element(path: &VectorPath, fill: &str) -> PathElement {
    PathElement::new()
        .set("d", path_data(path))
        .set("fill", fill)
}

/// Serialize one outline as a standalone `<path>` element.
pub fn emit(path: &VectorPath, fill: &str) -> String {
    path_element(path, fill).to_string()
}

/// Build the document: one `<path>` per outline, layers in the given order.
/// Outlines with no commands are left out.
pub fn assemble(width: u32, height: u32, layers: &[(&str, &[VectorPath])]) -> String {
    let mut document = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0, 0, width, height));

    for (fill, paths) in layers {
        for path in paths.iter().filter(|p| !p.commands.is_empty()) {
            document = document.add(path_element(path, fill));
        }
    }

    document.to_string()
}

/// Write the assembled document for `data` to `output_path`.
pub fn generate_svg(data: &VectorizedData, output_path: &Path) -> VectorizeResult<()> {
    fs::write(output_path, data.to_svg())?;
    Ok(())
}
