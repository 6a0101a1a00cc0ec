//! Block payloads. Field names are consumed by the browser renderer and
//! must not change.

use std::path::{Path, PathBuf};

use serde::Serialize;
use strata_materials::MaterialDescriptor;
use strata_mesh::IndexedTriangleMesh;

use crate::error::BuildError;
use crate::grid::GridPayload;

/// Value of the `type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Block,
    Material,
}

/// A serializable unit of build output.
pub trait BlockOutput: Serialize {
    /// File name without extension, unique within the pass.
    fn file_stem(&self) -> String;
}

/// Reference to a material index.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MaterialRef {
    pub mtl: usize,
}

/// Side skirt material and bottom elevation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SidesRef {
    pub mtl: usize,
    pub bottom: f64,
}

/// Terrain clipped to a polygon: a shared-vertex mesh plus the segmented
/// outline of every polygon (closed rings of `[x, y, z]`).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClippedGeometry {
    pub triangles: IndexedTriangleMesh,
    pub polygons: Vec<Vec<Vec<[f64; 3]>>>,
}

fn is_zero(v: &f64) -> bool {
    *v == 0.0
}

/// One terrain tile.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DemBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub layer: String,
    pub block: usize,
    /// Plane size in scene units.
    pub width: f64,
    pub height: f64,
    /// Plane center relative to the scene origin.
    pub translate: [f64; 3],
    /// Counter-clockwise rotation of the plane, degrees.
    #[serde(rename = "rotateZ", skip_serializing_if = "is_zero")]
    pub rotation: f64,
    #[serde(rename = "zScale")]
    pub z_scale: f64,
    #[serde(rename = "zShift")]
    pub z_shift: f64,
    /// Material drawn on the surface.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtl: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid: Option<GridPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geom: Option<ClippedGeometry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sides: Option<SidesRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edges: Option<MaterialRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wireframe: Option<MaterialRef>,
}

impl BlockOutput for DemBlock {
    fn file_stem(&self) -> String {
        format!("{}_{}", self.layer, self.block)
    }
}

/// One built material of a layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MaterialBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub layer: String,
    /// Material index.
    pub block: usize,
    pub materials: Vec<MaterialDescriptor>,
}

impl MaterialBlock {
    pub fn new(layer: impl Into<String>, index: usize, descriptor: MaterialDescriptor) -> Self {
        Self {
            kind: BlockKind::Material,
            layer: layer.into(),
            block: index,
            materials: vec![descriptor],
        }
    }
}

impl BlockOutput for MaterialBlock {
    fn file_stem(&self) -> String {
        format!("{}_mtl{}", self.layer, self.block)
    }
}

/// A page of vector features.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureBlock<F> {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub layer: String,
    pub block: usize,
    pub features: Vec<F>,
    #[serde(rename = "featureCount")]
    pub feature_count: usize,
    /// Absolute index of the first feature.
    #[serde(rename = "startIndex")]
    pub start_index: usize,
}

impl<F> FeatureBlock<F> {
    pub fn new(layer: impl Into<String>, block: usize, start_index: usize, features: Vec<F>) -> Self {
        Self {
            kind: BlockKind::Block,
            layer: layer.into(),
            block,
            feature_count: features.len(),
            features,
            start_index,
        }
    }
}

impl<F: Serialize> BlockOutput for FeatureBlock<F> {
    fn file_stem(&self) -> String {
        format!("{}_{}", self.layer, self.block)
    }
}

/// Write `block` as `<dir>/<file_stem>.json`.
pub fn write_block<B: BlockOutput>(block: &B, dir: &Path) -> Result<PathBuf, BuildError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", block.file_stem()));
    let file = std::io::BufWriter::new(std::fs::File::create(&path)?);
    serde_json::to_writer(file, block)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use glam::DVec3;
    use strata_config::GridEncoding;

    use super::*;
    use crate::context::BuildContext;
    use crate::grid::encode_grid;

    fn dem_block() -> DemBlock {
        let ctx = BuildContext::new("unused", GridEncoding::Array);
        DemBlock {
            kind: BlockKind::Block,
            layer: "dem".into(),
            block: 2,
            width: 100.0,
            height: 50.0,
            translate: [10.0, -5.0, 0.0],
            rotation: 0.0,
            z_scale: 1.5,
            z_shift: -20.0,
            mtl: Some(0),
            grid: Some(encode_grid(vec![0.0; 4], 2, 2, &ctx, "dem_2").unwrap()),
            geom: None,
            sides: Some(SidesRef { mtl: 1, bottom: -1.0 }),
            edges: None,
            wireframe: None,
        }
    }

    #[test]
    fn test_dem_block_field_names() {
        let json = serde_json::to_value(dem_block()).unwrap();
        assert_eq!(json["type"], "block");
        assert_eq!(json["layer"], "dem");
        assert_eq!(json["block"], 2);
        assert_eq!(json["zScale"], 1.5);
        assert_eq!(json["zShift"], -20.0);
        assert_eq!(json["translate"], serde_json::json!([10.0, -5.0, 0.0]));
        assert_eq!(json["grid"]["width"], 2);
        assert_eq!(json["sides"]["mtl"], 1);
        assert!(json.get("geom").is_none());
        assert!(json.get("rotateZ").is_none(), "zero rotation omitted");
    }

    #[test]
    fn test_clipped_geometry_shape() {
        let mesh = IndexedTriangleMesh::from_triangles(&[[DVec3::ZERO, DVec3::X, DVec3::Y]], false);
        let mut block = dem_block();
        block.grid = None;
        block.geom = Some(ClippedGeometry {
            triangles: mesh,
            polygons: vec![vec![vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]]],
        });
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["geom"]["triangles"]["f"], serde_json::json!([0, 1, 2]));
        assert_eq!(json["geom"]["polygons"][0][0].as_array().map(Vec::len), Some(4));
    }

    #[test]
    fn test_feature_block_counts() {
        let block = FeatureBlock::new("roads", 1, 50, vec![1, 2, 3]);
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["featureCount"], 3);
        assert_eq!(json["startIndex"], 50);
        assert_eq!(block.file_stem(), "roads_1");
    }

    #[test]
    fn test_write_block_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_block(&dem_block(), dir.path()).unwrap();
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("dem_2.json"));
        let back: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back["block"], 2);
    }
}
