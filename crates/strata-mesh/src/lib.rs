//! Triangulation for terrain and polygon features: sampling grids, grid-clip
//! triangulation, boundary segmentation, ear-clipping TIN building, and
//! deduplicated triangle buffers.

pub mod clip;
pub mod error;
pub mod grid_geometry;
pub mod indexed;
pub mod ring;
pub mod tin;

pub use clip::{clip_to_extent, dissolve, extent_polygon};
pub use error::MeshError;
pub use grid_geometry::GridGeometry;
pub use indexed::IndexedTriangleMesh;
pub use ring::{PolygonZ, Ring, is_ccw, orient_ring, signed_area};
pub use tin::{TinBuilder, TinMesh, ZMode, triangle_area_2d};
