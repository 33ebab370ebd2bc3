//! Layer mask to closed vector outlines.
//!
//! The stages run in order: crack-following boundary extraction, speckle
//! removal, hole nesting, polygon reduction with corner classification, and
//! curve fitting. Every contour becomes one sub-path ending in `Close`; an
//! outer boundary and its holes share one [`VectorPath`].

use crate::bezier_fitter::{smooth_vertex_curve, BezierCurve, BezierFitter};
use crate::contour::{extract_contours, group_contours, remove_speckles, Contour};
use crate::error::{VectorizeError, VectorizeResult};
use crate::mask::LayerMask;
use crate::path_simplifier::{classify_vertices, dedup_closed, simplify_closed, VertexKind};
use crate::vectorizer::{PathCommand, Point, VectorPath};
use serde::{Deserialize, Serialize};

/// Options for tracing one layer mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceOptions {
    /// Contours enclosing this many pixels or fewer are dropped (default: 2)
    pub speckle_area: u32,
    /// Turn angle in radians above which a vertex stays a sharp corner (default: 1.0)
    pub corner_threshold: f64,
    /// Maximum deviation in pixels when reducing a boundary to a polygon (default: 1.0)
    pub simplify_tolerance: f64,
    /// Maximum deviation in pixels when merging smooth runs (default: 0.2)
    pub curve_tolerance: f64,
    /// Merge consecutive smooth segments into fewer curves (default: true)
    pub optimize_curves: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            speckle_area: 2,
            corner_threshold: 1.0,
            simplify_tolerance: 1.0,
            curve_tolerance: 0.2,
            optimize_curves: true,
        }
    }
}

impl TraceOptions {
    pub fn validate(&self) -> VectorizeResult<()> {
        let checks = [
            ("corner_threshold", self.corner_threshold),
            ("simplify_tolerance", self.simplify_tolerance),
            ("curve_tolerance", self.curve_tolerance),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(VectorizeError::InvalidInput(format!(
                    "{name} must be a finite, non-negative number (got {value})"
                )));
            }
        }
        Ok(())
    }
}

/// Trace `mask` into filled outlines. Returns no paths when every region is
/// a speckle.
pub fn trace(mask: &LayerMask, options: &TraceOptions) -> VectorizeResult<Vec<VectorPath>> {
    options.validate()?;

    let contours = extract_contours(mask)?;
    let found = contours.len();
    let contours = remove_speckles(contours, options.speckle_area);
    let kept = contours.len();
    let shapes = group_contours(contours)?;
    tracing::debug!(found, kept, shapes = shapes.len(), "contours extracted");

    let fitter = BezierFitter::new(options.curve_tolerance);
    let paths = shapes
        .iter()
        .map(|shape| {
            let mut path = VectorPath::default();
            for contour in std::iter::once(&shape.outer).chain(&shape.holes) {
                path.commands.extend(outline_commands(contour, options, &fitter));
            }
            path
        })
        .collect();
    Ok(paths)
}

fn outline_commands(contour: &Contour, options: &TraceOptions, fitter: &BezierFitter) -> Vec<PathCommand> {
    let raw: Vec<Point> = contour
        .points
        .iter()
        .map(|&(x, y)| Point::new(x as f64, y as f64))
        .collect();

    let mut polygon = dedup_closed(&simplify_closed(&raw, options.simplify_tolerance));
    if polygon.len() < 3 {
        polygon = raw;
    }
    let kinds = classify_vertices(&polygon, options.corner_threshold);
    fit_outline(&polygon, &kinds, fitter, options.optimize_curves)
}

/// Corners are joined with lines; every run of smooth vertices becomes a
/// chain of cubics entered and left at edge midpoints.
fn fit_outline(
    polygon: &[Point],
    kinds: &[VertexKind],
    fitter: &BezierFitter,
    optimize: bool,
) -> Vec<PathCommand> {
    let m = polygon.len();
    let smooth_piece = |j: usize| {
        let prev = polygon[(j + m - 1) % m];
        let next = polygon[(j + 1) % m];
        smooth_vertex_curve(prev.midpoint(&polygon[j]), polygon[j], polygon[j].midpoint(&next))
    };
    let merge = |pieces: Vec<BezierCurve>| {
        if optimize {
            fitter.merge_chain(&pieces)
        } else {
            pieces
        }
    };

    let mut commands = Vec::with_capacity(m + 2);
    match kinds.iter().position(|k| *k == VertexKind::Corner) {
        None => {
            let pieces: Vec<BezierCurve> = (0..m).map(&smooth_piece).collect();
            commands.push(PathCommand::MoveTo(pieces[0].start));
            push_curves(&mut commands, merge(pieces));
        }
        Some(first) => {
            commands.push(PathCommand::MoveTo(polygon[first]));
            let mut corner = first;
            loop {
                let mut next = (corner + 1) % m;
                let mut run = Vec::new();
                while kinds[next] == VertexKind::Smooth {
                    run.push(smooth_piece(next));
                    next = (next + 1) % m;
                }
                if !run.is_empty() {
                    commands.push(PathCommand::LineTo(run[0].start));
                    push_curves(&mut commands, merge(run));
                }
                if next == first {
                    break;
                }
                commands.push(PathCommand::LineTo(polygon[next]));
                corner = next;
            }
        }
    }
    commands.push(PathCommand::Close);
    commands
}

fn push_curves(commands: &mut Vec<PathCommand>, curves: Vec<BezierCurve>) {
    commands.extend(
        curves
            .into_iter()
            .map(|c| PathCommand::CubicTo(c.control1, c.control2, c.end)),
    );
}
