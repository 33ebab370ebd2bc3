use crate::error::{VectorizeError, VectorizeResult};
use rgb::RGB8;
use std::path::Path;

/// Decoded 8-bit RGB raster, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<RGB8>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, pixels: Vec<RGB8>) -> VectorizeResult<Self> {
        let image = Self { width, height, pixels };
        image.validate()?;
        Ok(image)
    }

    /// Build an image from packed `r, g, b` bytes.
    pub fn from_raw_rgb(width: u32, height: u32, data: &[u8]) -> VectorizeResult<Self> {
        if data.len() % 3 != 0 {
            return Err(VectorizeError::InvalidInput(format!(
                "pixel buffer length {} is not a multiple of 3",
                data.len()
            )));
        }
        let pixels = data
            .chunks_exact(3)
            .map(|c| RGB8::new(c[0], c[1], c[2]))
            .collect();
        Self::new(width, height, pixels)
    }

    /// Check dimensions against the buffer. Fields are public, so the pipeline
    /// calls this again before doing any work.
    pub fn validate(&self) -> VectorizeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(VectorizeError::InvalidInput(format!(
                "image has zero size ({}x{})",
                self.width, self.height
            )));
        }
        if self.width > i32::MAX as u32 / 2 || self.height > i32::MAX as u32 / 2 {
            return Err(VectorizeError::InvalidInput(format!(
                "image dimensions {}x{} are too large",
                self.width, self.height
            )));
        }
        let expected = self.width as u64 * self.height as u64;
        if self.pixels.len() as u64 != expected {
            return Err(VectorizeError::InvalidInput(format!(
                "pixel buffer holds {} pixels, expected {}",
                self.pixels.len(),
                expected
            )));
        }
        Ok(())
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    /// Pixel at `(x, y)`, or `None` outside the image.
    pub fn get(&self, x: u32, y: u32) -> Option<RGB8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.pixels.get(idx).copied()
    }
}

pub fn load_image(path: &Path) -> VectorizeResult<RasterImage> {
    let img = image::open(path)?;
    from_dynamic(img)
}

/// Decode an encoded image (PNG, JPEG, ...) held in memory.
pub fn decode_image(bytes: &[u8]) -> VectorizeResult<RasterImage> {
    let img = image::load_from_memory(bytes)?;
    from_dynamic(img)
}

// Alpha is discarded, as a plain color decode would.
fn from_dynamic(img: image::DynamicImage) -> VectorizeResult<RasterImage> {
    let rgb = img.to_rgb8();
    let pixels: Vec<RGB8> = rgb.pixels().map(|p| RGB8::new(p[0], p[1], p[2])).collect();
    RasterImage::new(rgb.width(), rgb.height(), pixels)
}
