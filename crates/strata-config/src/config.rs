//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Version written into new config files.
pub const CONFIG_VERSION: u32 = 1;

/// Top-level build configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Format version of this file.
    pub version: u32,
    /// Output settings.
    pub export: ExportConfig,
    /// Terrain settings.
    pub dem: DemConfig,
    /// Vector layer settings.
    pub vector: VectorConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// How elevation grids are written into DEM blocks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum GridEncoding {
    /// Inline JSON number array.
    #[default]
    Array,
    /// Base64 of little-endian `f32` values.
    Binary,
    /// Companion `.bin` file referenced by URL.
    Url,
}

/// Terrain tiling strategy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum Tiling {
    /// Resample into a center tile plus optional surrounding tiles.
    #[default]
    Resampled,
    /// Tile the raster at native resolution.
    Original,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Grid payload encoding.
    pub grid_encoding: GridEncoding,
    /// Directory for block files and companion files.
    pub output_dir: PathBuf,
    /// Interactive preview pass (one overlay feature per block).
    pub preview: bool,
}

/// What a terrain material shows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum MaterialSource {
    /// Solid colour, `0xRRGGBB`.
    Color(u32),
    /// The map canvas as rendered by the host.
    MapCanvas,
    /// A list of layers rendered to a texture.
    Layers(Vec<String>),
    /// An image file.
    File(PathBuf),
}

/// One terrain material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemMaterialConfig {
    /// Colour or texture source.
    pub source: MaterialSource,
    /// Texture width in pixels; height follows the extent aspect ratio.
    pub image_width: u32,
    /// Opacity (0.0 - 1.0).
    pub opacity: f32,
    /// Keep the texture background transparent.
    pub transparent_background: bool,
    /// Lit (Lambert) when true, unlit otherwise.
    pub shading: bool,
}

/// Sides and bottom skirt of the terrain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SideConfig {
    /// Side colour, `0xRRGGBB`.
    pub color: u32,
    /// Elevation of the bottom plane, before z scaling.
    pub bottom: f64,
}

/// Colour and opacity of a line overlay (edges, wireframe).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LineStyle {
    /// Line colour, `0xRRGGBB`.
    pub color: u32,
    /// Opacity (0.0 - 1.0).
    pub opacity: f32,
}

/// Tiles around the center tile in resampled mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SurroundingsConfig {
    /// Tiles per side of the mosaic (odd; 1 = center only).
    pub size: u32,
    /// Decimation factor of the surrounding tiles.
    pub roughness: u32,
}

/// Terrain configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DemConfig {
    /// Tiling strategy.
    pub tiling: Tiling,
    /// Pixels per native tile side.
    pub tile_segments: u32,
    /// Segments per side of the resampled center tile.
    pub grid_segments: u32,
    /// Surrounding tiles.
    pub surroundings: SurroundingsConfig,
    /// Materials of the layer.
    pub materials: Vec<DemMaterialConfig>,
    /// Index into `materials` built with the grid.
    pub current_material: usize,
    /// Emit materials only, no grids.
    pub material_only: bool,
    /// Emit every material, not just the current one.
    pub all_materials: bool,
    /// Optional side skirt.
    pub sides: Option<SideConfig>,
    /// Optional outline of the terrain extent.
    pub edges: Option<LineStyle>,
    /// Optional wireframe overlay.
    pub wireframe: Option<LineStyle>,
    /// Name of the polygon layer the center tile is clipped to.
    pub clip_layer: Option<String>,
    /// Elevation used when the raster cannot be opened.
    pub flat_value: f32,
}

/// Vector layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VectorConfig {
    /// Features per block.
    pub page_size: usize,
    /// Include feature attributes in block payloads.
    pub export_attributes: bool,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            export: ExportConfig::default(),
            dem: DemConfig::default(),
            vector: VectorConfig::default(),
            debug: DebugConfig::default(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            grid_encoding: GridEncoding::Array,
            output_dir: PathBuf::from("output"),
            preview: false,
        }
    }
}

impl Default for DemMaterialConfig {
    fn default() -> Self {
        Self {
            source: MaterialSource::MapCanvas,
            image_width: 1024,
            opacity: 1.0,
            transparent_background: false,
            shading: true,
        }
    }
}

impl Default for SideConfig {
    fn default() -> Self {
        Self {
            color: 0xc7ac92,
            bottom: -1.0,
        }
    }
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: 0x000000,
            opacity: 1.0,
        }
    }
}

impl Default for SurroundingsConfig {
    fn default() -> Self {
        Self {
            size: 1,
            roughness: 1,
        }
    }
}

impl Default for DemConfig {
    fn default() -> Self {
        Self {
            tiling: Tiling::Resampled,
            tile_segments: 512,
            grid_segments: 256,
            surroundings: SurroundingsConfig::default(),
            materials: vec![DemMaterialConfig::default()],
            current_material: 0,
            material_only: false,
            all_materials: false,
            sides: None,
            edges: None,
            wireframe: None,
            clip_layer: None,
            flat_value: 0.0,
        }
    }
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            export_attributes: true,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Validation ---

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl Config {
    /// Check every setting the builders rely on. Run once at pass start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
                expected: CONFIG_VERSION,
            });
        }
        let dem = &self.dem;
        if dem.tile_segments == 0 {
            return Err(invalid("dem.tile_segments", "must be positive"));
        }
        if dem.grid_segments == 0 {
            return Err(invalid("dem.grid_segments", "must be positive"));
        }
        if dem.surroundings.size % 2 == 0 {
            return Err(invalid(
                "dem.surroundings.size",
                format!("must be odd, got {}", dem.surroundings.size),
            ));
        }
        if dem.surroundings.roughness == 0 {
            return Err(invalid("dem.surroundings.roughness", "must be at least 1"));
        }
        if !dem.materials.is_empty() && dem.current_material >= dem.materials.len() {
            return Err(invalid(
                "dem.current_material",
                format!("{} out of range for {} materials", dem.current_material, dem.materials.len()),
            ));
        }
        for m in &dem.materials {
            if !(0.0..=1.0).contains(&m.opacity) {
                return Err(invalid("dem.materials.opacity", format!("{} outside [0, 1]", m.opacity)));
            }
        }
        for style in [&dem.edges, &dem.wireframe].into_iter().flatten() {
            if !(0.0..=1.0).contains(&style.opacity) {
                return Err(invalid("dem.line_style.opacity", format!("{} outside [0, 1]", style.opacity)));
            }
        }
        if self.vector.page_size == 0 {
            return Err(invalid("vector.page_size", "must be positive"));
        }
        Ok(())
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::Read)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::Parse)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::Write)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::Write)?;
        Ok(())
    }

    /// Re-read the file: `Some(new_config)` if it changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::Read)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::Parse)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
