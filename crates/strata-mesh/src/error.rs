//! Mesh construction errors.

/// Errors raised while building grids or triangulating polygons.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    /// The grid value array does not match the segment counts.
    #[error("grid value count mismatch: expected {expected}, got {actual}")]
    GridSize {
        /// `(seg_x + 1) * (seg_y + 1)`.
        expected: usize,
        /// Supplied value count.
        actual: usize,
    },

    /// A grid needs at least one segment along each axis.
    #[error("grid needs at least one segment per axis, got {seg_x}x{seg_y}")]
    NoSegments {
        /// Segments along x.
        seg_x: u32,
        /// Segments along y.
        seg_y: u32,
    },

    /// The ear-clipping triangulator rejected the input.
    #[error("ear clipping failed: {0}")]
    Earcut(String),
}
