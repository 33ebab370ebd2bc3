//! Polygon reduction and corner classification for traced contours.
//!
//! A raw contour follows every pixel step. Closed Ramer–Douglas–Peucker keeps
//! only the dominant vertices, then each vertex is labelled by how sharply the
//! outline turns there.

use crate::vectorizer::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexKind {
    /// Kept sharp; reached with straight segments.
    Corner,
    /// Rounded off by curve fitting.
    Smooth,
}

/// Closed Ramer–Douglas–Peucker. The loop is cut at the first vertex and at
/// the vertex farthest from it, and both halves are simplified as open chains.
pub fn simplify_closed(points: &[Point], tolerance: f64) -> Vec<Point> {
    let n = points.len();
    if n <= 3 {
        return points.to_vec();
    }

    let anchor = points[0];
    let far = (1..n)
        .max_by(|&a, &b| {
            anchor
                .distance(&points[a])
                .total_cmp(&anchor.distance(&points[b]))
        })
        .unwrap_or(n / 2);

    let mut simplified = rdp_simplify(&points[..=far], tolerance);
    let mut tail = points[far..].to_vec();
    tail.push(anchor);
    let tail = rdp_simplify(&tail, tolerance);

    simplified.pop();
    simplified.extend_from_slice(&tail[..tail.len() - 1]);
    simplified
}

fn rdp_simplify(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut max_dist = 0.0;
    let mut max_idx = 0;
    let first = &points[0];
    let last = &points[points.len() - 1];

    for i in 1..points.len() - 1 {
        let d = point_to_segment_distance(&points[i], first, last);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        let mut left = rdp_simplify(&points[..=max_idx], epsilon);
        let right = rdp_simplify(&points[max_idx..], epsilon);
        left.pop();
        left.extend(right);
        left
    } else {
        vec![*first, *last]
    }
}

pub(crate) fn point_to_segment_distance(point: &Point, seg_start: &Point, seg_end: &Point) -> f64 {
    let dx = seg_end.x - seg_start.x;
    let dy = seg_end.y - seg_start.y;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-10 {
        return point.distance(seg_start);
    }

    let t = (((point.x - seg_start.x) * dx + (point.y - seg_start.y) * dy) / len_sq).clamp(0.0, 1.0);
    point.distance(&Point::new(seg_start.x + t * dx, seg_start.y + t * dy))
}

/// Remove consecutive duplicates, including the pair that wraps around.
pub fn dedup_closed(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points {
        if out.last().is_none_or(|q| q.distance(p) > 1e-9) {
            out.push(*p);
        }
    }
    while out.len() > 1 && out[0].distance(&out[out.len() - 1]) <= 1e-9 {
        out.pop();
    }
    out
}

/// Signed angle from direction `a` to direction `b`, in `(-π, π]`.
/// Positive turns are clockwise on screen (y grows downward).
pub fn signed_turn(a: (f64, f64), b: (f64, f64)) -> f64 {
    let cross = a.0 * b.1 - a.1 * b.0;
    let dot = a.0 * b.0 + a.1 * b.1;
    cross.atan2(dot)
}

/// How far the outline turns at `curr`: 0 for straight, π for a U-turn.
pub fn turn_angle(prev: &Point, curr: &Point, next: &Point) -> f64 {
    let v1 = (curr.x - prev.x, curr.y - prev.y);
    let v2 = (next.x - curr.x, next.y - curr.y);
    if v1.0.hypot(v1.1) < 1e-9 || v2.0.hypot(v2.1) < 1e-9 {
        return 0.0;
    }
    signed_turn(v1, v2).abs()
}

/// Label each vertex of a closed polygon.
pub fn classify_vertices(points: &[Point], corner_threshold: f64) -> Vec<VertexKind> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let prev = &points[(i + n - 1) % n];
            let next = &points[(i + 1) % n];
            if turn_angle(prev, &points[i], next) > corner_threshold {
                VertexKind::Corner
            } else {
                VertexKind::Smooth
            }
        })
        .collect()
}
