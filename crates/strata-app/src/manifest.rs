//! JSON layer manifest: the scene extent, the DEM raster and vector layers.

use std::path::{Path, PathBuf};

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use strata_coords::{ExtentError, GeoTransform, MapExtent, MapTo3D};
use strata_mesh::PolygonZ;
use strata_terrain::{ElevationSampler, open_or_flat};
use strata_vector::{FeatureGeometry, VectorLayer};

use crate::error::AppError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtentSpec {
    pub center: [f64; 2],
    pub width: f64,
    pub height: f64,
    /// Degrees counter-clockwise.
    #[serde(default)]
    pub rotation: f64,
}

impl ExtentSpec {
    pub fn to_extent(&self) -> Result<MapExtent, ExtentError> {
        MapExtent::new(DVec2::from(self.center), self.width, self.height, self.rotation)
    }
}

/// Headerless little-endian `f32` raster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DemSource {
    #[serde(default = "default_dem_id")]
    pub id: String,
    /// Relative paths resolve against the manifest's directory.
    pub path: PathBuf,
    pub cols: u32,
    pub rows: u32,
    pub geotransform: [f64; 6],
    #[serde(default)]
    pub nodata: Option<f32>,
}

fn default_dem_id() -> String {
    "dem".into()
}

impl DemSource {
    /// Open the raster, or a flat surface at `flat_value` if it cannot be read.
    pub fn open(&self, base_dir: &Path, flat_value: f32) -> Box<dyn ElevationSampler> {
        open_or_flat(
            &base_dir.join(&self.path),
            self.cols,
            self.rows,
            GeoTransform(self.geotransform),
            self.nodata,
            flat_value,
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub base_extent: ExtentSpec,
    /// Scene origin in map units; defaults to the extent center at z = 0.
    #[serde(default)]
    pub origin: Option<[f64; 3]>,
    #[serde(default = "default_z_scale")]
    pub z_scale: f64,
    #[serde(default)]
    pub dem: Option<DemSource>,
    #[serde(default)]
    pub vector_layers: Vec<VectorLayer>,
}

fn default_z_scale() -> f64 {
    1.0
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let contents = std::fs::read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            vector_layers = manifest.vector_layers.len(),
            dem = manifest.dem.is_some(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    pub fn map_to_3d(&self) -> MapTo3D {
        let origin = match self.origin {
            Some(o) => DVec3::from(o),
            None => DVec3::new(self.base_extent.center[0], self.base_extent.center[1], 0.0),
        };
        MapTo3D::new(origin, self.z_scale)
    }

    /// Polygons of the vector layer `id`, for clipping the DEM.
    pub fn clip_polygons(&self, id: &str) -> Option<Vec<PolygonZ>> {
        let layer = self.vector_layers.iter().find(|l| l.id == id)?;
        Some(
            layer
                .features
                .iter()
                .filter_map(|f| match &f.geometry {
                    FeatureGeometry::Polygons(p) => Some(p.iter().cloned()),
                    _ => None,
                })
                .flatten()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "base_extent": {"center": [500.0, 500.0], "width": 1000.0, "height": 800.0},
        "z_scale": 1.5,
        "dem": {"path": "dem.f32", "cols": 10, "rows": 10,
                "geotransform": [0.0, 100.0, 0.0, 1000.0, 0.0, -100.0]},
        "vector_layers": [{
            "id": "lakes",
            "fields": ["name"],
            "style": {"kind": "overlay", "altitude_mode": "relative_to_dem"},
            "features": [{
                "geometry": {"polygons": [{"exterior": [[0,0,0],[10,0,0],[10,10,0]], "interiors": []}]},
                "attributes": ["a"]
            }]
        }]
    }"#;

    #[test]
    fn test_parse_manifest() {
        let m: Manifest = serde_json::from_str(MANIFEST).unwrap();
        assert_eq!(m.base_extent.to_extent().unwrap().height(), 800.0);
        assert_eq!(m.dem.as_ref().unwrap().id, "dem", "default DEM id");
        assert_eq!(m.vector_layers[0].features.len(), 1);
        let t = m.map_to_3d();
        assert_eq!(t.origin, DVec3::new(500.0, 500.0, 0.0));
        assert_eq!(t.z_scale, 1.5);
    }

    #[test]
    fn test_clip_polygons() {
        let m: Manifest = serde_json::from_str(MANIFEST).unwrap();
        assert_eq!(m.clip_polygons("lakes").map(|p| p.len()), Some(1));
        assert!(m.clip_polygons("rivers").is_none());
    }

    #[test]
    fn test_missing_raster_falls_back_to_flat() {
        let m: Manifest = serde_json::from_str(MANIFEST).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let sampler = m.dem.unwrap().open(dir.path(), 7.0);
        assert_eq!(sampler.read_value(1.0, 1.0).unwrap(), 7.0);
        assert!(sampler.native_grid().is_none());
    }
}
