//! Build configuration for strata.
//!
//! One explicit, versioned settings tree replaces per-layer property maps.
//! It persists to disk as RON, accepts CLI overrides via clap, and is
//! validated once before a build pass starts.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_VERSION, Config, DebugConfig, DemConfig, DemMaterialConfig, ExportConfig,
    GridEncoding, LineStyle, MaterialSource, SideConfig, SurroundingsConfig, Tiling,
    VectorConfig,
};
pub use error::ConfigError;
