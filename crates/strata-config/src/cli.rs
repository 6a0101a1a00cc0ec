//! Command-line argument parsing for the `strata` binary.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, GridEncoding, Tiling};

/// strata command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "Terrain and vector scene block builder")]
pub struct CliArgs {
    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON layer manifest to build.
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Output directory.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Grid payload encoding.
    #[arg(long, value_enum)]
    pub grid_encoding: Option<GridEncoding>,

    /// Terrain tiling strategy.
    #[arg(long, value_enum)]
    pub tiling: Option<Tiling>,

    /// Segments per side of the resampled center tile.
    #[arg(long)]
    pub grid_segments: Option<u32>,

    /// Tiles per side of the terrain mosaic.
    #[arg(long)]
    pub surroundings: Option<u32>,

    /// Decimation factor of surrounding tiles.
    #[arg(long)]
    pub roughness: Option<u32>,

    /// Build as an interactive preview pass.
    #[arg(long)]
    pub preview: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref dir) = args.output {
            self.export.output_dir = dir.clone();
        }
        if let Some(encoding) = args.grid_encoding {
            self.export.grid_encoding = encoding;
        }
        if let Some(tiling) = args.tiling {
            self.dem.tiling = tiling;
        }
        if let Some(segments) = args.grid_segments {
            self.dem.grid_segments = segments;
        }
        if let Some(size) = args.surroundings {
            self.dem.surroundings.size = size;
        }
        if let Some(roughness) = args.roughness {
            self.dem.surroundings.roughness = roughness;
        }
        if args.preview {
            self.export.preview = true;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
