use crate::error::{VectorizeError, VectorizeResult};
use crate::quantizer::PosterizedImage;
use rgb::RGB8;

/// Binary occupancy grid for one palette color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerMask {
    width: usize,
    height: usize,
    bits: Vec<bool>,
    count: usize,
}

impl LayerMask {
    pub fn from_bits(width: usize, height: usize, bits: Vec<bool>) -> VectorizeResult<Self> {
        if bits.len() != width * height {
            return Err(VectorizeError::InvalidInput(format!(
                "mask holds {} cells, expected {}x{}",
                bits.len(),
                width,
                height
            )));
        }
        let count = bits.iter().filter(|&&b| b).count();
        Ok(Self {
            width,
            height,
            bits,
            count,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Pixel lookup; anything outside the grid reads as unset.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return false;
        }
        self.bits[y as usize * self.width + x as usize]
    }
}

/// Mask of the pixels exactly equal to `color`, or `None` when no pixel is.
pub fn build_mask(image: &PosterizedImage, color: RGB8) -> Option<LayerMask> {
    let bits: Vec<bool> = image.pixels.iter().map(|p| *p == color).collect();
    let count = bits.iter().filter(|&&b| b).count();
    if count == 0 {
        return None;
    }
    Some(LayerMask {
        width: image.width as usize,
        height: image.height as usize,
        bits,
        count,
    })
}
