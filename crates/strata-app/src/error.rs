use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config: {0}")]
    Config(#[from] strata_config::ConfigError),

    #[error("manifest io: {0}")]
    Io(#[from] std::io::Error),

    #[error("manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("extent: {0}")]
    Extent(#[from] strata_coords::ExtentError),

    #[error("dem surface: {0}")]
    Mesh(#[from] strata_mesh::MeshError),

    /// The OS did not provide a configuration directory.
    #[error("could not determine OS configuration directory")]
    NoConfigDir,
}
