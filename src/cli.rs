use anyhow::{Context, Result};
use clap::Parser;
use layertrace::VectorizeOptions;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "layertrace")]
#[command(about = "Posterize an image and trace every color layer into an SVG")]
#[command(version)]
pub struct Cli {
    /// Input image file
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output SVG file (default: input path with .svg extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of palette colors (default: 8)
    #[arg(short, long)]
    pub colors: Option<usize>,

    /// Seed for k-means initialization
    #[arg(long)]
    pub seed: Option<u64>,

    /// Drop regions of this many pixels or fewer
    #[arg(long)]
    pub speckle: Option<u32>,

    /// Turn angle in radians above which a vertex stays sharp
    #[arg(long)]
    pub corner_threshold: Option<f64>,

    /// Maximum error in pixels when merging curves
    #[arg(long)]
    pub curve_tolerance: Option<f64>,

    /// Keep one curve per smooth vertex instead of merging runs
    #[arg(long)]
    pub no_optimize: bool,

    /// JSON file with options; flags given on the command line win
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print a JSON summary of the result to stdout
    #[arg(long)]
    pub report: bool,
}

impl Cli {
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let mut path = self.input.clone();
            path.set_extension("svg");
            path
        })
    }

    /// Options from `--config` (or the defaults) with command-line overrides applied.
    pub fn options(&self) -> Result<VectorizeOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                VectorizeOptions::from_json(&json)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => VectorizeOptions::default(),
        };

        if let Some(colors) = self.colors {
            options.num_colors = colors;
        }
        if let Some(seed) = self.seed {
            options.quantize.seed = seed;
        }
        if let Some(speckle) = self.speckle {
            options.trace.speckle_area = speckle;
        }
        if let Some(threshold) = self.corner_threshold {
            options.trace.corner_threshold = threshold;
        }
        if let Some(tolerance) = self.curve_tolerance {
            options.trace.curve_tolerance = tolerance;
        }
        if self.no_optimize {
            options.trace.optimize_curves = false;
        }

        options.validate()?;
        Ok(options)
    }
}
