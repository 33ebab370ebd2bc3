//! layertrace - posterize a raster image and trace it into a layered SVG
//!
//! The image is reduced to a small palette with k-means, every palette color
//! becomes a binary layer mask, and each mask is traced into closed outlines
//! made of straight segments and cubic Bézier curves. The layers are stacked
//! into one SVG document, most frequent color first.
//!
//! ## Pipeline
//!
//! - **K-means quantization** over the color histogram, seeded k-means++
//! - **Crack-following contour tracing** with exact hole nesting
//! - **Closed Ramer-Douglas-Peucker** reduction and corner detection
//! - **Least-squares Bézier merging** of smooth runs
//!
//! ## Example
//!
//! ```rust,no_run
//! use layertrace::{convert, VectorizeOptions};
//! use std::path::Path;
//!
//! let options = VectorizeOptions {
//!     num_colors: 6,
//!     ..Default::default()
//! };
//!
//! convert(Path::new("input.png"), Path::new("output.svg"), &options)
//!     .expect("Conversion failed");
//! ```

pub mod bezier_fitter;
pub mod contour;
pub mod error;
pub mod image_processor;
pub mod mask;
pub mod path_simplifier;
pub mod quantizer;
pub mod svg_generator;
pub mod tracer;
pub mod vectorizer;

pub use contour::Winding;
pub use error::{VectorizeError, VectorizeResult};
pub use image_processor::{decode_image, load_image, RasterImage};
pub use mask::{build_mask, LayerMask};
pub use quantizer::{quantize, Palette, PaletteEntry, PosterizedImage, QuantizeOptions};
pub use svg_generator::{assemble, emit, generate_svg, hex_color};
pub use tracer::{trace, TraceOptions};
pub use vectorizer::{
    vectorize, Layer, PathCommand, Point, VectorPath, VectorizeReport, VectorizedData,
};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options for one vectorization run. Every field has a default, so a JSON
/// config only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizeOptions {
    /// Number of palette colors (default: 8)
    pub num_colors: usize,
    pub quantize: QuantizeOptions,
    pub trace: TraceOptions,
}

impl Default for VectorizeOptions {
    fn default() -> Self {
        Self {
            num_colors: 8,
            quantize: QuantizeOptions::default(),
            trace: TraceOptions::default(),
        }
    }
}

impl VectorizeOptions {
    pub fn validate(&self) -> VectorizeResult<()> {
        if self.num_colors == 0 {
            return Err(VectorizeError::InvalidInput(
                "num_colors must be at least 1".to_string(),
            ));
        }
        self.quantize.validate()?;
        self.trace.validate()
    }

    /// Parse options from JSON and validate them.
    pub fn from_json(json: &str) -> VectorizeResult<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| VectorizeError::InvalidInput(format!("bad options: {e}")))?;
        options.validate()?;
        Ok(options)
    }
}

/// Convert an image file to an SVG file.
///
/// # Example
///
/// ```rust,no_run
/// use layertrace::{convert, VectorizeOptions};
/// use std::path::Path;
///
/// let data = convert(Path::new("input.png"), Path::new("output.svg"), &VectorizeOptions::default())?;
/// println!("{} layers", data.layers.len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn convert(
    input_path: &Path,
    output_path: &Path,
    options: &VectorizeOptions,
) -> VectorizeResult<VectorizedData> {
    let image = load_image(input_path)?;
    let data = vectorize(&image, options)?;
    generate_svg(&data, output_path)?;
    Ok(data)
}

/// Vectorize an in-memory image and return the SVG document.
pub fn convert_to_svg_string(image: &RasterImage, options: &VectorizeOptions) -> VectorizeResult<String> {
    Ok(vectorize(image, options)?.to_svg())
}

/// Decode an encoded image (PNG, JPEG, ...) and return the SVG document.
pub fn convert_bytes(bytes: &[u8], options: &VectorizeOptions) -> VectorizeResult<String> {
    let image = decode_image(bytes)?;
    convert_to_svg_string(&image, options)
}
