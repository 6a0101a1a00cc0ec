//! strata application: turns a layer manifest into scene blocks on disk.

pub mod error;
pub mod export;
pub mod manifest;
pub mod platform;
pub mod render;

pub use error::AppError;
pub use export::{ExportSummary, run_export};
pub use manifest::{DemSource, ExtentSpec, Manifest};
pub use platform::AppDirs;
pub use render::ColorRampRenderer;
