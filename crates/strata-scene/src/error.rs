use thiserror::Error;

/// Failure of a single build task. The pass driver logs it and moves on.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("material: {0}")]
    Material(#[from] strata_materials::MaterialError),

    #[error("mesh: {0}")]
    Mesh(#[from] strata_mesh::MeshError),

    /// The layer settings cannot be built.
    #[error("configuration: {0}")]
    Config(String),
}
