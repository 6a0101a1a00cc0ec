//! Terrain blocks from elevation rasters.
//!
//! Two tiling modes: native-resolution tiles read pixel for pixel from the
//! raster, or a resampled mosaic of a center tile and surrounding tiles at a
//! coarser roughness, with edges stitched so neighbors agree exactly.

mod builder;
mod error;
mod mosaic;
mod sampler;
mod stitch;

pub use builder::{DemLayerBuilder, DemLayerInput, DemTask, TerrainBlock};
pub use error::SamplerError;
pub use mosaic::{Corner, Edge, TileSpec, mosaic_layout};
pub use sampler::{ElevationSampler, FlatSampler, RasterSampler, Resample, open_or_flat};
pub use stitch::{EdgeStitcher, TileGrid, resample_edge};
