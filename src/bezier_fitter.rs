//! Cubic Bézier construction for smooth outline vertices and least-squares
//! merging of smooth runs.
//!
//! Every smooth vertex of the simplified polygon becomes one cubic running
//! between the midpoints of its two edges, with both handles pulled toward
//! the vertex so the piece follows the circle inscribed in that corner. A run
//! of such pieces is then replaced by as few cubics as the tolerance allows:
//! one cubic is fitted to dense samples of the run with its end tangents
//! fixed (so joins stay smooth), Newton–Raphson reparameterization refines
//! the fit, and the run is split and retried when the fit is off.

use crate::path_simplifier::{signed_turn, turn_angle};
use crate::vectorizer::Point;

/// Samples taken per piece when fitting a merged curve.
const SAMPLES_PER_PIECE: usize = 8;

/// Runs turning further than this are never merged into one cubic.
const MAX_MERGE_TURN: f64 = std::f64::consts::PI * 179.0 / 180.0;

/// A cubic Bézier curve segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierCurve {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl BezierCurve {
    pub fn evaluate(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        Point::new(
            a * self.start.x + b * self.control1.x + c * self.control2.x + d * self.end.x,
            a * self.start.y + b * self.control1.y + c * self.control2.y + d * self.end.y,
        )
    }

    fn derivative(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        let a = 3.0 * mt * mt;
        let b = 6.0 * mt * t;
        let c = 3.0 * t * t;
        Point::new(
            a * (self.control1.x - self.start.x)
                + b * (self.control2.x - self.control1.x)
                + c * (self.end.x - self.control2.x),
            a * (self.control1.y - self.start.y)
                + b * (self.control2.y - self.control1.y)
                + c * (self.end.y - self.control2.y),
        )
    }

    fn second_derivative(&self, t: f64) -> Point {
        let mt = 1.0 - t;
        Point::new(
            6.0 * mt * (self.control2.x - 2.0 * self.control1.x + self.start.x)
                + 6.0 * t * (self.end.x - 2.0 * self.control2.x + self.control1.x),
            6.0 * mt * (self.control2.y - 2.0 * self.control1.y + self.start.y)
                + 6.0 * t * (self.end.y - 2.0 * self.control2.y + self.control1.y),
        )
    }

    /// Direction of travel leaving `start`, if the curve has one.
    fn start_direction(&self) -> Option<(f64, f64)> {
        [self.control1, self.control2, self.end]
            .iter()
            .map(|p| (p.x - self.start.x, p.y - self.start.y))
            .find(|d| d.0.hypot(d.1) > 1e-9)
    }

    /// Direction of travel arriving at `end`, if the curve has one.
    fn end_direction(&self) -> Option<(f64, f64)> {
        [self.control2, self.control1, self.start]
            .iter()
            .map(|p| (self.end.x - p.x, self.end.y - p.y))
            .find(|d| d.0.hypot(d.1) > 1e-9)
    }
}

/// The piece of outline around a smooth vertex: from `from` (midpoint of the
/// incoming edge) to `to` (midpoint of the outgoing edge).
pub fn smooth_vertex_curve(from: Point, vertex: Point, to: Point) -> BezierCurve {
    let phi = turn_angle(&from, &vertex, &to);
    let pull = if phi < 1e-6 {
        2.0 / 3.0
    } else {
        (4.0 / 3.0) * (phi / 4.0).tan() / (phi / 2.0).tan()
    };
    let pull = pull.clamp(0.0, 1.0);
    BezierCurve {
        start: from,
        control1: from.lerp(&vertex, pull),
        control2: to.lerp(&vertex, pull),
        end: to,
    }
}

/// Merges chains of G1-continuous cubics.
pub struct BezierFitter {
    tolerance: f64,
    max_iterations: usize,
}

impl BezierFitter {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            max_iterations: 12,
        }
    }

    /// Replace `chain` by fewer cubics that stay within the tolerance of it.
    pub fn merge_chain(&self, chain: &[BezierCurve]) -> Vec<BezierCurve> {
        let mut merged = Vec::with_capacity(chain.len());
        self.merge_into(chain, &mut merged);
        merged
    }

    fn merge_into(&self, chain: &[BezierCurve], out: &mut Vec<BezierCurve>) {
        if chain.len() <= 1 {
            out.extend_from_slice(chain);
            return;
        }
        match self.fit_chain(chain) {
            Ok(curve) => out.push(curve),
            Err(split) => {
                self.merge_into(&chain[..split], out);
                self.merge_into(&chain[split..], out);
            }
        }
    }

    /// One cubic for the whole chain, or the piece index to split at.
    fn fit_chain(&self, chain: &[BezierCurve]) -> Result<BezierCurve, usize> {
        let mid = chain.len() / 2;
        if !is_convex_run(chain) {
            return Err(mid);
        }
        let first = &chain[0];
        let last = &chain[chain.len() - 1];
        let (Some(lead), Some(trail)) = (first.start_direction(), last.end_direction()) else {
            return Err(mid);
        };
        let tangent_start = unit(lead);
        let tangent_end = unit((-trail.0, -trail.1));

        let points = sample_chain(chain);
        let mut t_values = chord_length_parameterize(&points);
        let mut best_curve = least_squares_fit(&points, &t_values, tangent_start, tangent_end);
        let (mut best_err, mut best_idx) = max_fitting_error(&best_curve, &points, &t_values);

        for _ in 0..self.max_iterations {
            if best_err <= self.tolerance {
                break;
            }
            t_values = newton_raphson_reparameterize(&best_curve, &points, &t_values);
            let curve = least_squares_fit(&points, &t_values, tangent_start, tangent_end);
            let (err, idx) = max_fitting_error(&curve, &points, &t_values);
            if err < best_err {
                best_curve = curve;
                best_err = err;
                best_idx = idx;
            } else {
                break;
            }
        }

        if best_err <= self.tolerance {
            Ok(best_curve)
        } else {
            let split = (best_idx as f64 / SAMPLES_PER_PIECE as f64).round() as usize;
            Err(split.clamp(1, chain.len() - 1))
        }
    }
}

fn unit(v: (f64, f64)) -> (f64, f64) {
    let len = v.0.hypot(v.1);
    (v.0 / len, v.1 / len)
}

/// True when the chain bends one way only and by less than `MAX_MERGE_TURN`.
fn is_convex_run(chain: &[BezierCurve]) -> bool {
    let mut total = 0.0f64;
    let mut sign = 0.0f64;
    let mut prev: Option<(f64, f64)> = None;
    let directions = chain
        .iter()
        .flat_map(|c| [c.start_direction(), c.end_direction()])
        .flatten();
    for dir in directions {
        if let Some(p) = prev {
            let turn = signed_turn(p, dir);
            if turn.abs() > 1e-9 {
                if sign * turn < 0.0 {
                    return false;
                }
                sign = turn.signum();
                total += turn;
            }
        }
        prev = Some(dir);
    }
    total.abs() <= MAX_MERGE_TURN
}

fn sample_chain(chain: &[BezierCurve]) -> Vec<Point> {
    let mut points = Vec::with_capacity(chain.len() * SAMPLES_PER_PIECE + 1);
    points.push(chain[0].start);
    for curve in chain {
        for j in 1..=SAMPLES_PER_PIECE {
            points.push(curve.evaluate(j as f64 / SAMPLES_PER_PIECE as f64));
        }
    }
    points
}

fn chord_length_parameterize(points: &[Point]) -> Vec<f64> {
    let n = points.len();
    let mut t = vec![0.0; n];
    for i in 1..n {
        t[i] = t[i - 1] + points[i].distance(&points[i - 1]);
    }
    let total = t[n - 1];
    if total > 0.0 {
        for ti in t.iter_mut() {
            *ti /= total;
        }
    }
    t[n - 1] = 1.0;
    t
}

/// Least-squares cubic through the first and last point with fixed end
/// tangents; only the two handle lengths are solved for.
fn least_squares_fit(
    points: &[Point],
    t_values: &[f64],
    tangent_start: (f64, f64),
    tangent_end: (f64, f64),
) -> BezierCurve {
    let start = points[0];
    let end = points[points.len() - 1];

    let mut c00 = 0.0;
    let mut c01 = 0.0;
    let mut c11 = 0.0;
    let mut x0 = 0.0;
    let mut x1 = 0.0;

    for (p, &t) in points.iter().zip(t_values) {
        let mt = 1.0 - t;
        let b0 = mt * mt * mt;
        let b1 = 3.0 * mt * mt * t;
        let b2 = 3.0 * mt * t * t;
        let b3 = t * t * t;

        let a1 = (tangent_start.0 * b1, tangent_start.1 * b1);
        let a2 = (tangent_end.0 * b2, tangent_end.1 * b2);

        c00 += a1.0 * a1.0 + a1.1 * a1.1;
        c01 += a1.0 * a2.0 + a1.1 * a2.1;
        c11 += a2.0 * a2.0 + a2.1 * a2.1;

        let rx = p.x - (b0 + b1) * start.x - (b2 + b3) * end.x;
        let ry = p.y - (b0 + b1) * start.y - (b2 + b3) * end.y;
        x0 += a1.0 * rx + a1.1 * ry;
        x1 += a2.0 * rx + a2.1 * ry;
    }

    let chord = start.distance(&end);
    let det = c00 * c11 - c01 * c01;
    let (mut alpha1, mut alpha2) = if det.abs() > 1e-12 {
        ((x0 * c11 - x1 * c01) / det, (c00 * x1 - c01 * x0) / det)
    } else {
        (chord / 3.0, chord / 3.0)
    };
    if alpha1 < 1e-6 * chord || alpha2 < 1e-6 * chord {
        alpha1 = chord / 3.0;
        alpha2 = chord / 3.0;
    }

    BezierCurve {
        start,
        control1: Point::new(start.x + tangent_start.0 * alpha1, start.y + tangent_start.1 * alpha1),
        control2: Point::new(end.x + tangent_end.0 * alpha2, end.y + tangent_end.1 * alpha2),
        end,
    }
}

/// Newton–Raphson step on each parameter, minimizing |B(t) - P|².
fn newton_raphson_reparameterize(curve: &BezierCurve, points: &[Point], t_values: &[f64]) -> Vec<f64> {
    let mut new_t = t_values.to_vec();
    for i in 1..points.len() - 1 {
        let t = t_values[i];
        let p = &points[i];

        let bt = curve.evaluate(t);
        let d1 = curve.derivative(t);
        let d2 = curve.second_derivative(t);

        let dx = bt.x - p.x;
        let dy = bt.y - p.y;
        let numerator = dx * d1.x + dy * d1.y;
        let denominator = d1.x * d1.x + d1.y * d1.y + dx * d2.x + dy * d2.y;

        if denominator.abs() > 1e-12 {
            new_t[i] = (t - numerator / denominator).clamp(0.0, 1.0);
        }
    }
    for i in 1..new_t.len() {
        if new_t[i] <= new_t[i - 1] {
            new_t[i] = new_t[i - 1] + 1e-10;
        }
    }
    let last = new_t.len() - 1;
    new_t[0] = 0.0;
    new_t[last] = 1.0;
    new_t
}

/// Largest distance between a sample and the curve at its parameter, and where.
fn max_fitting_error(curve: &BezierCurve, points: &[Point], t_values: &[f64]) -> (f64, usize) {
    let mut max_err = 0.0;
    let mut max_idx = 0;
    for (i, (p, &t)) in points.iter().zip(t_values).enumerate() {
        let err = curve.evaluate(t).distance(p);
        if err > max_err {
            max_err = err;
            max_idx = i;
        }
    }
    (max_err, max_idx)
}
