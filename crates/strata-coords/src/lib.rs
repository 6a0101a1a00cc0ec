//! Extent and grid addressing: rotated map extents, raster-aligned grid windows,
//! affine geotransforms, and the map-to-scene coordinate transform.
//!
//! All types here are pure coordinate geometry. Nothing in this crate performs I/O.
//!
//! # Coordinate Spaces
//!
//! 1. **Map space**: source CRS coordinates (`f64`, x east, y north)
//! 2. **Extent-local space**: map space translated to the extent center and
//!    rotated back by the extent rotation, so the extent is axis aligned
//! 3. **Grid space**: fractional column/row indices of a sampling grid,
//!    rows increasing southwards
//! 4. **Scene space**: map space translated to the scene origin with the
//!    vertical exaggeration applied (see [`MapTo3D`])

mod error;
mod extent;
mod geotransform;
mod grid_rect;
mod map_to_3d;
mod rect;

pub use error::ExtentError;
pub use extent::{MapExtent, rotate_point};
pub use geotransform::GeoTransform;
pub use grid_rect::GridRectangle;
pub use map_to_3d::MapTo3D;
pub use rect::Rect2;
