use strata_coords::ExtentError;
use thiserror::Error;

/// Errors opening or reading an elevation source.
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("raster holds {actual} values, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("raster geotransform is not invertible")]
    SingularGeotransform,

    #[error("cannot read a {width}x{height} grid")]
    EmptyRequest { width: u32, height: u32 },

    #[error("extent: {0}")]
    Extent(#[from] ExtentError),
}
