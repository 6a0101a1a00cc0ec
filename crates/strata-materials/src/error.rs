use thiserror::Error;

/// Errors from rendering or encoding texture images.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image codec error: {0}")]
    Codec(#[from] image::ImageError),

    /// The host renderer could not produce the image.
    #[error("render failed: {0}")]
    Render(String),

    #[error("image size {width}x{height} is empty")]
    EmptySize { width: u32, height: u32 },

    #[error("no image with index {0}")]
    UnknownIndex(usize),
}

/// Errors from building a material payload.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("no material with index {0}")]
    UnknownIndex(usize),

    #[error("material image: {0}")]
    Image(#[from] ImageError),
}
