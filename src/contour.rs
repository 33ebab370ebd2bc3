//! Boundary extraction on the pixel-corner lattice.
//!
//! Every contour walks the cracks between set and unset pixels with the set
//! pixels on its right-hand side. In image coordinates (y grows downward) that
//! makes outer boundaries clockwise and hole boundaries counter-clockwise.
//! Where two set pixels touch only at a corner the walk turns toward them, so
//! set pixels are 8-connected and unset pixels 4-connected.
//!
//! Each contour records the 8-connected component of the pixel it started
//! from. A component has exactly one outer boundary, and every hole boundary
//! started from one of its pixels belongs to it, so grouping is a lookup.

use crate::error::{VectorizeError, VectorizeResult};
use crate::mask::LayerMask;
use std::collections::HashMap;

const UNLABELED: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    Clockwise,
    CounterClockwise,
}

/// A closed lattice polygon. Only the vertices where the walk changes
/// direction are stored; the closing edge back to the first vertex is implied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
    area: i64,
    seed: (i32, i32),
    component: usize,
}

impl Contour {
    fn new(points: Vec<(i32, i32)>, seed: (i32, i32), component: usize) -> Self {
        let area = shoelace_twice(&points) / 2;
        Self {
            points,
            area,
            seed,
            component,
        }
    }

    /// Enclosed area in pixels, positive for clockwise loops.
    pub fn signed_area(&self) -> i64 {
        self.area
    }

    pub fn winding(&self) -> Winding {
        if self.area >= 0 {
            Winding::Clockwise
        } else {
            Winding::CounterClockwise
        }
    }

    pub fn is_hole(&self) -> bool {
        self.winding() == Winding::CounterClockwise
    }

    /// Set pixel whose top edge started this walk.
    pub fn seed_pixel(&self) -> (i32, i32) {
        self.seed
    }

    /// 8-connected component of the set pixels this contour bounds.
    pub fn component(&self) -> usize {
        self.component
    }
}

/// One outer boundary together with the holes it directly encloses.
#[derive(Debug, Clone)]
pub struct Shape {
    pub outer: Contour,
    pub holes: Vec<Contour>,
}

fn shoelace_twice(points: &[(i32, i32)]) -> i64 {
    let n = points.len();
    let mut sum = 0i64;
    for i in 0..n {
        let (x1, y1) = points[i];
        let (x2, y2) = points[(i + 1) % n];
        sum += x1 as i64 * y2 as i64 - x2 as i64 * y1 as i64;
    }
    sum
}

/// Trace every outer and hole boundary of `mask`, in raster order of their
/// first top edge.
pub fn extract_contours(mask: &LayerMask) -> VectorizeResult<Vec<Contour>> {
    let labels = label_components(mask);
    let mut visited = vec![false; mask.width() * mask.height()];
    let mut contours = Vec::new();

    for y in 0..mask.height() as i32 {
        for x in 0..mask.width() as i32 {
            let idx = pixel_index(mask, x, y);
            if visited[idx] || !mask.get(x, y) || mask.get(x, y - 1) {
                continue;
            }
            let points = follow_cracks(mask, x, y, &mut visited)?;
            contours.push(Contour::new(points, (x, y), labels[idx]));
        }
    }

    Ok(contours)
}

#[inline]
fn pixel_index(mask: &LayerMask, x: i32, y: i32) -> usize {
    y as usize * mask.width() + x as usize
}

/// Label the 8-connected components of the set pixels; unset pixels keep
/// `UNLABELED`.
fn label_components(mask: &LayerMask) -> Vec<usize> {
    let mut labels = vec![UNLABELED; mask.width() * mask.height()];
    let mut next = 0;
    let mut stack = Vec::new();

    for y in 0..mask.height() as i32 {
        for x in 0..mask.width() as i32 {
            let idx = pixel_index(mask, x, y);
            if labels[idx] != UNLABELED || !mask.get(x, y) {
                continue;
            }
            labels[idx] = next;
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                for ny in cy - 1..=cy + 1 {
                    for nx in cx - 1..=cx + 1 {
                        if !mask.get(nx, ny) {
                            continue;
                        }
                        let n = pixel_index(mask, nx, ny);
                        if labels[n] == UNLABELED {
                            labels[n] = next;
                            stack.push((nx, ny));
                        }
                    }
                }
            }
            next += 1;
        }
    }

    labels
}

/// Walk from the top-left corner of pixel `(x0, y0)` heading east until the
/// walk is about to repeat its first edge.
fn follow_cracks(
    mask: &LayerMask,
    x0: i32,
    y0: i32,
    visited: &mut [bool],
) -> VectorizeResult<Vec<(i32, i32)>> {
    let max_steps = 4 * mask.width() * mask.height() + 4;

    let start = (x0, y0);
    let (mut x, mut y) = start;
    let (mut dx, mut dy) = (1i32, 0i32);
    let mut points = vec![start];

    for _ in 0..max_steps {
        if dx == 1 {
            // Heading east along the top edge of pixel (x, y).
            visited[pixel_index(mask, x, y)] = true;
        }
        x += dx;
        y += dy;

        let left = mask.get(x + (dx + dy - 1) / 2, y + (dy - dx - 1) / 2);
        let right = mask.get(x + (dx - dy - 1) / 2, y + (dy + dx - 1) / 2);
        let (ndx, ndy) = if left {
            (dy, -dx)
        } else if right {
            (dx, dy)
        } else {
            (-dy, dx)
        };

        if (x, y) == start && (ndx, ndy) == (1, 0) {
            return Ok(points);
        }
        if (ndx, ndy) != (dx, dy) {
            points.push((x, y));
        }
        dx = ndx;
        dy = ndy;
    }

    Err(VectorizeError::TracingFailure(format!(
        "boundary walk from pixel ({x0}, {y0}) did not close within {max_steps} steps"
    )))
}

/// Drop contours enclosing `max_area` pixels or fewer.
pub fn remove_speckles(contours: Vec<Contour>, max_area: u32) -> Vec<Contour> {
    contours
        .into_iter()
        .filter(|c| c.signed_area().unsigned_abs() > max_area as u64)
        .collect()
}

/// Attach each hole to the outer boundary of the component it was traced from.
pub fn group_contours(contours: Vec<Contour>) -> VectorizeResult<Vec<Shape>> {
    let (holes, outers): (Vec<Contour>, Vec<Contour>) =
        contours.into_iter().partition(|c| c.is_hole());

    let owners: HashMap<usize, usize> = outers
        .iter()
        .enumerate()
        .map(|(i, outer)| (outer.component, i))
        .collect();
    let mut shapes: Vec<Shape> = outers
        .into_iter()
        .map(|outer| Shape {
            outer,
            holes: Vec::new(),
        })
        .collect();

    for hole in holes {
        match owners.get(&hole.component) {
            Some(&i) => shapes[i].holes.push(hole),
            None => {
                let (px, py) = hole.seed_pixel();
                return Err(VectorizeError::TracingFailure(format!(
                    "hole seeded at pixel ({px}, {py}) has no enclosing outer boundary"
                )));
            }
        }
    }

    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> LayerMask {
        let height = rows.len();
        let width = rows[0].len();
        let bits = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| c == '#'))
            .collect();
        LayerMask::from_bits(width, height, bits).unwrap()
    }

    #[test]
    fn test_single_pixel() {
        let mask = mask_from_rows(&["...", ".#.", "..."]);
        let contours = extract_contours(&mask).unwrap();
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points, vec![(1, 1), (2, 1), (2, 2), (1, 2)]);
        assert_eq!(contours[0].signed_area(), 1);
        assert_eq!(contours[0].winding(), Winding::Clockwise);
    }

    #[test]
    fn test_full_mask_covers_grid() {
        let mask = mask_from_rows(&["####", "####", "####", "####"]);
        let contours = extract_contours(&mask).unwrap();
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points, vec![(0, 0), (4, 0), (4, 4), (0, 4)]);
        assert_eq!(contours[0].signed_area(), 16);
    }

    #[test]
    fn test_hole_has_opposite_winding() {
        let mask = mask_from_rows(&["#####", "#...#", "#...#", "#...#", "#####"]);
        let contours = extract_contours(&mask).unwrap();
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0].winding(), Winding::Clockwise);
        assert_eq!(contours[0].signed_area(), 25);
        assert_eq!(contours[1].winding(), Winding::CounterClockwise);
        assert_eq!(contours[1].signed_area(), -9);
        assert_eq!(
            contours[0].signed_area() + contours[1].signed_area(),
            mask.count() as i64
        );
    }

    #[test]
    fn test_diagonal_pixels_are_one_contour() {
        let mask = mask_from_rows(&["#..", ".#.", "..#"]);
        let contours = extract_contours(&mask).unwrap();
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].signed_area(), 3);
    }

    #[test]
    fn test_diagonal_touch_closes_hole() {
        // Set pixels meeting at a corner seal the background cell in.
        let mask = mask_from_rows(&["###", "#.#", "##."]);
        let contours = extract_contours(&mask).unwrap();
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0].signed_area(), 8);
        assert_eq!(contours[1].points, vec![(1, 2), (2, 2), (2, 1), (1, 1)]);
        assert_eq!(contours[1].signed_area(), -1);
    }

    #[test]
    fn test_area_matches_pixel_count_for_disc() {
        let size = 21;
        let mut bits = vec![false; size * size];
        for y in 0..size {
            for x in 0..size {
                let dx = x as f64 - 10.0;
                let dy = y as f64 - 10.0;
                bits[y * size + x] = dx * dx + dy * dy <= 64.0;
            }
        }
        let mask = LayerMask::from_bits(size, size, bits).unwrap();
        let contours = extract_contours(&mask).unwrap();
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].signed_area(), mask.count() as i64);
    }

    #[test]
    fn test_remove_speckles() {
        let mask = mask_from_rows(&["#...##", "....##", "......"]);
        let contours = extract_contours(&mask).unwrap();
        assert_eq!(contours.len(), 2);
        let kept = remove_speckles(contours, 2);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].signed_area(), 4);
    }

    #[test]
    fn test_group_assigns_holes_to_innermost_outer() {
        let mask = mask_from_rows(&[
            "#######",
            "#.....#",
            "#.###.#",
            "#.#.#.#",
            "#.###.#",
            "#.....#",
            "#######",
        ]);
        let shapes = group_contours(extract_contours(&mask).unwrap()).unwrap();
        assert_eq!(shapes.len(), 2);
        let big = shapes.iter().find(|s| s.outer.signed_area() == 49).unwrap();
        let small = shapes.iter().find(|s| s.outer.signed_area() == 9).unwrap();
        assert_eq!(big.holes.len(), 1);
        assert_eq!(big.holes[0].signed_area(), -25);
        assert_eq!(small.holes.len(), 1);
        assert_eq!(small.holes[0].signed_area(), -1);
    }

    #[test]
    fn test_contours_carry_component() {
        let mask = mask_from_rows(&["##..#", "#.#.#", "##..#"]);
        let contours = extract_contours(&mask).unwrap();
        assert_eq!(contours.len(), 3);
        let (holes, outers): (Vec<_>, Vec<_>) = contours.iter().partition(|c| c.is_hole());
        assert_eq!(outers.len(), 2);
        assert_eq!(holes.len(), 1);
        assert_ne!(outers[0].component(), outers[1].component());
        assert_eq!(holes[0].component(), outers[0].component());
    }

    #[test]
    fn test_group_many_rings() {
        // A grid of 3x3 rings, each with a one-pixel hole.
        let cells = 40;
        let size = cells * 4;
        let mut bits = vec![false; size * size];
        for y in 0..size {
            for x in 0..size {
                let (lx, ly) = (x % 4, y % 4);
                bits[y * size + x] = lx < 3 && ly < 3 && (lx, ly) != (1, 1);
            }
        }
        let mask = LayerMask::from_bits(size, size, bits).unwrap();
        let shapes = group_contours(extract_contours(&mask).unwrap()).unwrap();
        assert_eq!(shapes.len(), cells * cells);
        for shape in &shapes {
            assert_eq!(shape.outer.signed_area(), 9);
            assert_eq!(shape.holes.len(), 1);
            assert_eq!(shape.holes[0].signed_area(), -1);
            assert_eq!(shape.holes[0].component(), shape.outer.component());
        }
    }

    #[test]
    fn test_orphan_hole_is_tracing_failure() {
        let hole = Contour::new(vec![(0, 0), (0, 1), (1, 1), (1, 0)], (0, 1), 7);
        assert!(hole.is_hole());
        let err = group_contours(vec![hole]).unwrap_err();
        assert!(matches!(err, VectorizeError::TracingFailure(_)));
    }
}
