//! K-means color quantization in RGB space.
//!
//! Clustering runs over the image's color histogram, so each distinct color is
//! weighted by the number of pixels carrying it and the result is exact for the
//! full image. Centroids are seeded with k-means++ from an explicit seed,
//! refined with Lloyd iterations, and the whole run is repeated for several
//! attempts in parallel; the lowest-distortion attempt wins.

use crate::error::{VectorizeError, VectorizeResult};
use crate::image_processor::RasterImage;
use crate::svg_generator::hex_color;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rgb::RGB8;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tuning knobs for the k-means run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizeOptions {
    /// Lloyd iteration cap per attempt (default: 10)
    pub max_iterations: usize,
    /// Convergence threshold on the largest centroid move, in 8-bit channel units (default: 1.0)
    pub epsilon: f64,
    /// Independent restarts; the lowest total distortion is kept (default: 10)
    pub attempts: usize,
    /// Seed for centroid initialization (default: 0)
    pub seed: u64,
}

impl Default for QuantizeOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            epsilon: 1.0,
            attempts: 10,
            seed: 0,
        }
    }
}

impl QuantizeOptions {
    pub fn validate(&self) -> VectorizeResult<()> {
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations must be at least 1"));
        }
        if self.attempts == 0 {
            return Err(invalid("attempts must be at least 1"));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(invalid("epsilon must be a finite, non-negative number"));
        }
        Ok(())
    }
}

/// One palette color and the number of pixels snapped to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub color: RGB8,
    pub pixel_count: usize,
}

/// Palette ordered by descending pixel count, then ascending color.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    pub entries: Vec<PaletteEntry>,
}

impl Palette {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn colors(&self) -> Vec<RGB8> {
        self.entries.iter().map(|e| e.color).collect()
    }

    pub fn hex_codes(&self) -> Vec<String> {
        self.entries.iter().map(|e| hex_color(e.color)).collect()
    }
}

/// An image whose every pixel is exactly one palette color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterizedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<RGB8>,
}

impl PosterizedImage {
    pub fn to_raster(&self) -> RasterImage {
        RasterImage {
            width: self.width,
            height: self.height,
            pixels: self.pixels.clone(),
        }
    }
}

struct Clustering {
    centroids: Vec<[f64; 3]>,
    distortion: f64,
    iterations: usize,
}

/// Reduce `image` to exactly `num_colors` palette entries.
///
/// The palette may contain duplicate colors or entries with a zero pixel count
/// when the image has fewer distinct colors than requested.
pub fn quantize(
    image: &RasterImage,
    num_colors: usize,
    options: &QuantizeOptions,
) -> VectorizeResult<(PosterizedImage, Palette)> {
    if num_colors == 0 {
        return Err(invalid("num_colors must be at least 1"));
    }
    if image.pixels.is_empty() {
        return Err(invalid("image has no pixels"));
    }
    options.validate()?;

    let histogram = color_histogram(&image.pixels);
    let samples: Vec<[f64; 3]> = histogram.iter().map(|&(c, _)| to_point(c)).collect();
    let weights: Vec<f64> = histogram.iter().map(|&(_, n)| n as f64).collect();

    let (attempt, clustering) = (0..options.attempts)
        .into_par_iter()
        .map(|attempt| {
            let mut rng = StdRng::seed_from_u64(attempt_seed(options.seed, attempt));
            let initial = kmeans_plusplus_init(&samples, &weights, num_colors, &mut rng);
            (attempt, lloyd(&samples, &weights, initial, options))
        })
        .min_by(|a, b| {
            a.1.distortion
                .total_cmp(&b.1.distortion)
                .then(a.0.cmp(&b.0))
        })
        .ok_or_else(|| invalid("no clustering attempt was run"))?;

    let finite = clustering.distortion.is_finite()
        && clustering.centroids.iter().flatten().all(|v| v.is_finite());
    if !finite {
        return Err(invalid("k-means produced a non-finite centroid"));
    }

    tracing::debug!(
        attempt,
        iterations = clustering.iterations,
        distortion = clustering.distortion,
        distinct_colors = histogram.len(),
        "k-means finished"
    );

    let centroids: Vec<RGB8> = clustering.centroids.iter().map(round_centroid).collect();

    let mut counts = vec![0usize; centroids.len()];
    let mut assignment: HashMap<(u8, u8, u8), RGB8> = HashMap::with_capacity(histogram.len());
    for &(color, count) in &histogram {
        let idx = nearest_palette_index(color, &centroids);
        counts[idx] += count;
        assignment.insert(key(color), centroids[idx]);
    }

    let mut order: Vec<usize> = (0..centroids.len()).collect();
    order.sort_by(|&a, &b| {
        counts[b]
            .cmp(&counts[a])
            .then_with(|| key(centroids[a]).cmp(&key(centroids[b])))
    });

    let palette = Palette {
        entries: order
            .into_iter()
            .map(|i| PaletteEntry {
                color: centroids[i],
                pixel_count: counts[i],
            })
            .collect(),
    };

    let pixels = image.pixels.iter().map(|p| assignment[&key(*p)]).collect();

    Ok((
        PosterizedImage {
            width: image.width,
            height: image.height,
            pixels,
        },
        palette,
    ))
}

fn invalid(message: &str) -> VectorizeError {
    VectorizeError::InvalidInput(message.to_string())
}

#[inline]
fn key(c: RGB8) -> (u8, u8, u8) {
    (c.r, c.g, c.b)
}

#[inline]
fn to_point(c: RGB8) -> [f64; 3] {
    [c.r as f64, c.g as f64, c.b as f64]
}

#[inline]
fn dist_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr * dr + dg * dg + db * db
}

fn round_centroid(c: &[f64; 3]) -> RGB8 {
    let [r, g, b] = c.map(|v| v.round().clamp(0.0, 255.0) as u8);
    RGB8::new(r, g, b)
}

fn attempt_seed(seed: u64, attempt: usize) -> u64 {
    seed.wrapping_add((attempt as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Distinct colors with their pixel counts, sorted by color.
fn color_histogram(pixels: &[RGB8]) -> Vec<(RGB8, usize)> {
    let mut counts: HashMap<(u8, u8, u8), usize> = HashMap::new();
    for p in pixels {
        *counts.entry(key(*p)).or_insert(0) += 1;
    }
    let mut histogram: Vec<(RGB8, usize)> = counts
        .into_iter()
        .map(|((r, g, b), n)| (RGB8::new(r, g, b), n))
        .collect();
    histogram.sort_unstable_by_key(|&(c, _)| key(c));
    histogram
}

/// Index of the first entry with positive weight whose running sum passes `target`.
fn weighted_choice(weights: &[f64], mut target: f64) -> usize {
    let mut last_positive = 0;
    for (i, &w) in weights.iter().enumerate() {
        if w <= 0.0 {
            continue;
        }
        last_positive = i;
        target -= w;
        if target < 0.0 {
            return i;
        }
    }
    last_positive
}

/// K-means++ initialization over weighted samples: each new centroid is drawn
/// with probability proportional to weight times squared distance to the
/// nearest centroid chosen so far.
fn kmeans_plusplus_init(
    samples: &[[f64; 3]],
    weights: &[f64],
    k: usize,
    rng: &mut StdRng,
) -> Vec<[f64; 3]> {
    let total_weight: f64 = weights.iter().sum();
    let first = weighted_choice(weights, rng.r#gen::<f64>() * total_weight);

    let mut centroids = Vec::with_capacity(k);
    centroids.push(samples[first]);
    let mut distances: Vec<f64> = samples.iter().map(|s| dist_sq(s, &samples[first])).collect();

    while centroids.len() < k {
        let scores: Vec<f64> = distances.iter().zip(weights).map(|(d, w)| d * w).collect();
        let total: f64 = scores.iter().sum();
        if total <= 0.0 {
            // Every distinct color already has a centroid.
            let fill = centroids[0];
            centroids.resize(k, fill);
            break;
        }
        let next = weighted_choice(&scores, rng.r#gen::<f64>() * total);
        centroids.push(samples[next]);
        for (d, s) in distances.iter_mut().zip(samples) {
            *d = d.min(dist_sq(s, &samples[next]));
        }
    }

    centroids
}

/// Label every sample with its nearest centroid (ties go to the lower index),
/// record the squared distance, and return the weighted total distortion.
fn assign(
    samples: &[[f64; 3]],
    weights: &[f64],
    centroids: &[[f64; 3]],
    labels: &mut [usize],
    nearest: &mut [f64],
) -> f64 {
    let mut distortion = 0.0;
    for (i, s) in samples.iter().enumerate() {
        let mut best_idx = 0;
        let mut best_dist = f64::INFINITY;
        for (j, c) in centroids.iter().enumerate() {
            let d = dist_sq(s, c);
            if d < best_dist {
                best_dist = d;
                best_idx = j;
            }
        }
        labels[i] = best_idx;
        nearest[i] = best_dist;
        distortion += best_dist * weights[i];
    }
    distortion
}

fn farthest_sample(nearest: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &d) in nearest.iter().enumerate() {
        if d > 0.0 && best.is_none_or(|(_, bd)| d > bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

fn lloyd(
    samples: &[[f64; 3]],
    weights: &[f64],
    mut centroids: Vec<[f64; 3]>,
    options: &QuantizeOptions,
) -> Clustering {
    let k = centroids.len();
    let mut labels = vec![0usize; samples.len()];
    let mut nearest = vec![0.0f64; samples.len()];
    let mut iterations = 0;

    for _ in 0..options.max_iterations {
        iterations += 1;
        assign(samples, weights, &centroids, &mut labels, &mut nearest);

        let mut sums = vec![[0.0f64; 3]; k];
        let mut mass = vec![0.0f64; k];
        for ((s, &w), &label) in samples.iter().zip(weights).zip(&labels) {
            for c in 0..3 {
                sums[label][c] += s[c] * w;
            }
            mass[label] += w;
        }

        let mut updated = centroids.clone();
        for j in 0..k {
            if mass[j] > 0.0 {
                updated[j] = sums[j].map(|v| v / mass[j]);
            } else if let Some(far) = farthest_sample(&nearest) {
                // Empty cluster: move it onto the worst-served color.
                updated[j] = samples[far];
                nearest[far] = 0.0;
            }
        }

        let shift = centroids
            .iter()
            .zip(&updated)
            .map(|(a, b)| dist_sq(a, b))
            .fold(0.0, f64::max)
            .sqrt();
        centroids = updated;
        if shift <= options.epsilon {
            break;
        }
    }

    let distortion = assign(samples, weights, &centroids, &mut labels, &mut nearest);
    Clustering {
        centroids,
        distortion,
        iterations,
    }
}

/// Nearest palette color by squared RGB distance; ties go to the lower index.
#[inline]
fn nearest_palette_index(pixel: RGB8, palette: &[RGB8]) -> usize {
    let mut best_idx = 0usize;
    let mut best_dist = i32::MAX;
    for (idx, c) in palette.iter().enumerate() {
        let dr = c.r as i32 - pixel.r as i32;
        let dg = c.g as i32 - pixel.g as i32;
        let db = c.b as i32 - pixel.b as i32;
        let d = dr * dr + dg * dg + db * db;
        if d < best_dist {
            best_dist = d;
            best_idx = idx;
        }
    }
    best_idx
}
