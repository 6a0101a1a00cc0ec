//! Material and texture deduplication for a build pass.
//!
//! Every distinct material request gets a small stable index; the payload
//! (including any rendered texture) is built lazily the first time the index
//! is built, and reused afterwards.

mod error;
mod images;
mod manager;
mod material;

pub use error::{ImageError, MaterialError};
pub use images::{ImageManager, ImageRenderer, ImageRequest, ImageSource};
pub use manager::MaterialManager;
pub use material::{ImageRef, MaterialDescriptor, MaterialRequest, MaterialType, Shading};
