use crate::contour::Winding;
use crate::error::{VectorizeError, VectorizeResult};
use crate::image_processor::RasterImage;
use crate::mask::{build_mask, LayerMask};
use crate::quantizer::{quantize, Palette, PosterizedImage};
use crate::svg_generator::{assemble, hex_color};
use crate::tracer::trace;
use crate::VectorizeOptions;
use rayon::prelude::*;
use rgb::RGB8;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        self.lerp(other, 0.5)
    }

    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// One drawing command in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    /// First control point, second control point, end point.
    CubicTo(Point, Point, Point),
    Close,
}

/// A filled outline: one sub-path per contour, each opened by `MoveTo` and
/// ended by `Close`. Holes run opposite to their outer boundary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorPath {
    pub commands: Vec<PathCommand>,
}

impl VectorPath {
    pub fn subpaths(&self) -> Vec<&[PathCommand]> {
        self.commands
            .split_inclusive(|c| *c == PathCommand::Close)
            .collect()
    }

    pub fn subpath_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| **c == PathCommand::Close)
            .count()
    }

    pub fn curve_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, PathCommand::CubicTo(..)))
            .count()
    }

    /// Orientation of each sub-path, from the signed area of its control
    /// polygon in y-down coordinates.
    pub fn windings(&self) -> Vec<Winding> {
        self.subpaths()
            .into_iter()
            .map(|sub| {
                let mut points = Vec::new();
                for cmd in sub {
                    match *cmd {
                        PathCommand::MoveTo(p) | PathCommand::LineTo(p) => points.push(p),
                        PathCommand::CubicTo(c1, c2, p) => points.extend([c1, c2, p]),
                        PathCommand::Close => {}
                    }
                }
                let n = points.len();
                let twice_area: f64 = (0..n)
                    .map(|i| {
                        let a = points[i];
                        let b = points[(i + 1) % n];
                        a.x * b.y - b.x * a.y
                    })
                    .sum();
                if twice_area >= 0.0 {
                    Winding::Clockwise
                } else {
                    Winding::CounterClockwise
                }
            })
            .collect()
    }
}

/// Traced outlines of one palette color.
#[derive(Debug, Clone)]
pub struct Layer {
    pub color: RGB8,
    pub pixel_count: usize,
    pub paths: Vec<VectorPath>,
}

impl Layer {
    pub fn hex(&self) -> String {
        hex_color(self.color)
    }
}

#[derive(Debug, Clone)]
pub struct VectorizedData {
    pub width: u32,
    pub height: u32,
    pub palette: Palette,
    /// Non-empty layers in palette order.
    pub layers: Vec<Layer>,
    /// Layers dropped because their outlines could not be traced.
    pub skipped_layers: usize,
}

impl VectorizedData {
    pub fn to_svg(&self) -> String {
        let hexes: Vec<String> = self.layers.iter().map(Layer::hex).collect();
        let layers: Vec<(&str, &[VectorPath])> = hexes
            .iter()
            .zip(&self.layers)
            .map(|(hex, layer)| (hex.as_str(), layer.paths.as_slice()))
            .collect();
        assemble(self.width, self.height, &layers)
    }

    pub fn report(&self) -> VectorizeReport {
        VectorizeReport {
            width: self.width,
            height: self.height,
            palette: self.palette.hex_codes(),
            layers: self
                .layers
                .iter()
                .map(|layer| LayerReport {
                    color: layer.hex(),
                    pixel_count: layer.pixel_count,
                    paths: layer.paths.len(),
                    subpaths: layer.paths.iter().map(VectorPath::subpath_count).sum(),
                    curves: layer.paths.iter().map(VectorPath::curve_count).sum(),
                })
                .collect(),
            skipped_layers: self.skipped_layers,
        }
    }
}

/// Serializable summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct VectorizeReport {
    pub width: u32,
    pub height: u32,
    pub palette: Vec<String>,
    pub layers: Vec<LayerReport>,
    pub skipped_layers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerReport {
    pub color: String,
    pub pixel_count: usize,
    pub paths: usize,
    pub subpaths: usize,
    pub curves: usize,
}

enum LayerOutcome {
    Traced(Layer),
    Empty,
    Failed(String),
}

/// Posterize `image` and trace every palette color into outlines.
///
/// Layers are traced in parallel and collected back in palette order. A layer
/// whose tracing fails is left out and counted in `skipped_layers`.
pub fn vectorize(image: &RasterImage, options: &VectorizeOptions) -> VectorizeResult<VectorizedData> {
    image.validate()?;
    options.validate()?;

    let (posterized, palette) = quantize(image, options.num_colors, &options.quantize)?;
    let (layers, skipped_layers) =
        trace_layers(&posterized, &palette, |mask| trace(mask, &options.trace))?;

    Ok(VectorizedData {
        width: image.width,
        height: image.height,
        palette,
        layers,
        skipped_layers,
    })
}

/// Run `tracer` over the mask of every distinct, non-empty palette color.
///
/// Returns the traced layers in palette order and the number of layers
/// dropped because `tracer` reported a `TracingFailure`. Any other error
/// aborts.
fn trace_layers<F>(
    posterized: &PosterizedImage,
    palette: &Palette,
    tracer: F,
) -> VectorizeResult<(Vec<Layer>, usize)>
where
    F: Fn(&LayerMask) -> VectorizeResult<Vec<VectorPath>> + Sync,
{
    let outcomes: Vec<LayerOutcome> = palette
        .entries
        .par_iter()
        .enumerate()
        .map(|(index, entry)| {
            let duplicate = palette.entries[..index].iter().any(|e| e.color == entry.color);
            if entry.pixel_count == 0 || duplicate {
                return Ok(LayerOutcome::Empty);
            }
            let Some(mask) = build_mask(posterized, entry.color) else {
                return Ok(LayerOutcome::Empty);
            };
            match tracer(&mask) {
                Ok(paths) if paths.is_empty() => Ok(LayerOutcome::Empty),
                Ok(paths) => Ok(LayerOutcome::Traced(Layer {
                    color: entry.color,
                    pixel_count: entry.pixel_count,
                    paths,
                })),
                Err(VectorizeError::TracingFailure(message)) => Ok(LayerOutcome::Failed(message)),
                Err(e) => Err(e),
            }
        })
        .collect::<VectorizeResult<_>>()?;

    let mut layers = Vec::with_capacity(outcomes.len());
    let mut skipped_layers = 0;
    for (entry, outcome) in palette.entries.iter().zip(outcomes) {
        match outcome {
            LayerOutcome::Traced(layer) => {
                tracing::debug!(
                    color = %layer.hex(),
                    paths = layer.paths.len(),
                    curves = layer.paths.iter().map(VectorPath::curve_count).sum::<usize>(),
                    "layer traced"
                );
                layers.push(layer);
            }
            LayerOutcome::Empty => {
                tracing::debug!(color = %hex_color(entry.color), "layer has nothing to trace");
            }
            LayerOutcome::Failed(message) => {
                tracing::warn!(color = %hex_color(entry.color), %message, "skipping layer");
                skipped_layers += 1;
            }
        }
    }

    Ok((layers, skipped_layers))
}
