//! Extent and grid construction errors.

/// Errors raised when building extents or grid windows from caller input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtentError {
    /// Width or height is zero, negative, or not finite.
    #[error("degenerate extent: width={width}, height={height}")]
    Degenerate {
        /// Requested width.
        width: f64,
        /// Requested height.
        height: f64,
    },

    /// The raster geotransform has rotation/shear terms.
    #[error("rotated geotransforms are not supported for grid windows")]
    RotatedGeotransform,

    /// The geotransform has a zero pixel size.
    #[error("geotransform has zero resolution")]
    ZeroResolution,

    /// The extent does not cover at least two grid points along each axis.
    #[error("extent covers {cols}x{rows} raster points, need at least 2x2")]
    EmptyWindow {
        /// Covered columns.
        cols: i64,
        /// Covered rows.
        rows: i64,
    },
}
