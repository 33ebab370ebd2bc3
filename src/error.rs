use thiserror::Error;

/// Errors produced by the vectorization pipeline.
#[derive(Debug, Error)]
pub enum VectorizeError {
    /// Zero-size image, bad color count, malformed buffer or options.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("could not decode image: {0}")]
    DecodeFailure(#[from] image::ImageError),

    /// A contour broke a geometric invariant, e.g. a boundary walk that never closed.
    #[error("tracing failed: {0}")]
    TracingFailure(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VectorizeError {
    /// True for failures caused by the caller's input rather than by the pipeline.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::DecodeFailure(_))
    }
}

pub type VectorizeResult<T> = std::result::Result<T, VectorizeError>;
