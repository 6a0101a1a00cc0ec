//! Object kinds. Each kind maps to one material function and one geometry
//! function; the builder dispatches through [`ObjectKind::handlers`].

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strata_coords::MapTo3D;
use strata_materials::{MaterialManager, Shading};
use strata_mesh::{GridGeometry, IndexedTriangleMesh, PolygonZ, TinBuilder, TinMesh, ZMode};

use crate::feature::{AltitudeMode, ColorValue, FeatureGeometry, GeometryClass, PropertyValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    // points
    Sphere,
    Cylinder,
    Cone,
    Box,
    Disk,
    Plane,
    // lines
    Line,
    Pipe,
    ConeLine,
    BoxLine,
    Wall,
    // polygons
    Extruded,
    Overlay,
    Polygon,
}

pub type MaterialFn = fn(&mut MaterialManager, u32, f32) -> usize;
pub type GeometryFn = fn(&FeatureGeometry, &Placement<'_>, f64) -> GeometryPayload;

/// Dispatch entry of an object kind.
#[derive(Clone, Copy)]
pub struct ObjectHandlers {
    pub class: GeometryClass,
    pub material: MaterialFn,
    /// `(geometry, placement, altitude)`.
    pub geometry: GeometryFn,
    /// Emits the `size` property (radius, width or side length).
    pub sized: bool,
    /// Emits the `h` property.
    pub tall: bool,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 14] = [
        Self::Sphere,
        Self::Cylinder,
        Self::Cone,
        Self::Box,
        Self::Disk,
        Self::Plane,
        Self::Line,
        Self::Pipe,
        Self::ConeLine,
        Self::BoxLine,
        Self::Wall,
        Self::Extruded,
        Self::Overlay,
        Self::Polygon,
    ];

    pub fn handlers(self) -> ObjectHandlers {
        use GeometryClass as G;
        match self {
            Self::Sphere => entry(G::Point, mesh_material, points, true, false),
            Self::Cylinder | Self::Cone | Self::Box => entry(G::Point, mesh_material, points, true, true),
            Self::Disk | Self::Plane => entry(G::Point, double_sided_material, points, true, false),
            Self::Line => entry(G::Line, line_material, lines, false, false),
            Self::Pipe => entry(G::Line, mesh_material, lines, true, false),
            Self::ConeLine | Self::BoxLine => entry(G::Line, mesh_material, lines, true, true),
            Self::Wall => entry(G::Line, double_sided_material, lines, false, true),
            Self::Extruded => entry(G::Polygon, mesh_material, extruded, false, true),
            Self::Overlay => entry(G::Polygon, double_sided_material, overlay, false, false),
            Self::Polygon => entry(G::Polygon, double_sided_material, polygon, false, false),
        }
    }

    pub fn class(self) -> GeometryClass {
        self.handlers().class
    }
}

fn entry(class: GeometryClass, material: MaterialFn, geometry: GeometryFn, sized: bool, tall: bool) -> ObjectHandlers {
    ObjectHandlers {
        class,
        material,
        geometry,
        sized,
        tall,
    }
}

/// Per-layer object style.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectStyle {
    pub kind: ObjectKind,
    #[serde(default)]
    pub color: ColorValue,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub altitude_mode: AltitudeMode,
    /// Added to the feature (or DEM) elevation.
    #[serde(default)]
    pub altitude: PropertyValue,
    #[serde(default = "default_size")]
    pub size: PropertyValue,
    #[serde(default)]
    pub height: PropertyValue,
}

fn default_opacity() -> f32 {
    1.0
}

fn default_size() -> PropertyValue {
    PropertyValue::Constant(1.0)
}

impl ObjectStyle {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            color: ColorValue::default(),
            opacity: default_opacity(),
            altitude_mode: AltitudeMode::default(),
            altitude: PropertyValue::default(),
            size: default_size(),
            height: PropertyValue::default(),
        }
    }
}

/// Where features land: map-to-scene transform plus the elevation policy.
#[derive(Clone, Copy)]
pub struct Placement<'a> {
    pub map_to_3d: MapTo3D,
    pub altitude_mode: AltitudeMode,
    /// DEM surface for [`AltitudeMode::RelativeToDem`]. Without one the
    /// surface is taken as zero.
    pub dem: Option<&'a GridGeometry>,
}

impl Placement<'_> {
    /// Map-space elevation of a point.
    pub fn elevation(&self, xy: DVec2, own_z: f64, altitude: f64) -> f64 {
        match self.altitude_mode {
            AltitudeMode::Absolute => own_z + altitude,
            AltitudeMode::RelativeToDem => self.dem.map_or(0.0, |g| g.value(xy.x, xy.y)) + altitude,
        }
    }

    /// Scene-space position of a map point.
    pub fn place(&self, p: DVec3, altitude: f64) -> DVec3 {
        let z = self.elevation(p.truncate(), p.z, altitude);
        self.map_to_3d.transform(p.x, p.y, z)
    }
}

/// Scene-space geometry of one feature.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeometryPayload {
    Points {
        pts: Vec<[f64; 3]>,
    },
    Lines {
        lines: Vec<Vec<[f64; 3]>>,
    },
    /// Closed rings (exterior CCW, holes CW) at the base elevation, with one
    /// centroid per polygon.
    Polygons {
        polygons: Vec<Vec<Vec<[f64; 3]>>>,
        centroids: Vec<[f64; 3]>,
    },
    Mesh {
        triangles: IndexedTriangleMesh,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        polygons: Vec<Vec<Vec<[f64; 3]>>>,
    },
}

impl GeometryPayload {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Points { pts } => pts.is_empty(),
            Self::Lines { lines } => lines.is_empty(),
            Self::Polygons { polygons, .. } => polygons.is_empty(),
            Self::Mesh { triangles, .. } => triangles.is_empty(),
        }
    }
}

/// One feature inside a feature block.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeaturePayload {
    #[serde(flatten)]
    pub geom: GeometryPayload,
    pub mtl: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(rename = "h", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Attribute values, when attribute export is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prop: Option<Vec<Value>>,
}

// ---- Material functions ----

fn mesh_material(m: &mut MaterialManager, color: u32, opacity: f32) -> usize {
    m.mesh_color_index(color, opacity, Shading::Lambert, false)
}

fn double_sided_material(m: &mut MaterialManager, color: u32, opacity: f32) -> usize {
    m.mesh_color_index(color, opacity, Shading::Lambert, true)
}

fn line_material(m: &mut MaterialManager, color: u32, opacity: f32) -> usize {
    m.line_index(color, opacity, false)
}

// ---- Geometry functions ----

fn points(geometry: &FeatureGeometry, at: &Placement<'_>, altitude: f64) -> GeometryPayload {
    let pts = match geometry {
        FeatureGeometry::Points(pts) => pts.iter().map(|p| at.place(*p, altitude).to_array()).collect(),
        _ => Vec::new(),
    };
    GeometryPayload::Points { pts }
}

fn lines(geometry: &FeatureGeometry, at: &Placement<'_>, altitude: f64) -> GeometryPayload {
    let lines = match geometry {
        FeatureGeometry::Lines(lines) => lines
            .iter()
            .filter(|l| l.len() >= 2)
            .map(|l| l.iter().map(|p| at.place(*p, altitude).to_array()).collect())
            .collect(),
        _ => Vec::new(),
    };
    GeometryPayload::Lines { lines }
}

fn polygons_of(geometry: &FeatureGeometry) -> &[PolygonZ] {
    match geometry {
        FeatureGeometry::Polygons(p) => p,
        _ => &[],
    }
}

fn close(ring: &[DVec3]) -> Vec<[f64; 3]> {
    let mut pts: Vec<[f64; 3]> = ring.iter().map(|p| p.to_array()).collect();
    if let Some(&first) = pts.first()
        && pts.last() != Some(&first)
    {
        pts.push(first);
    }
    pts
}

fn outlines(mesh: &TinMesh) -> Vec<Vec<Vec<[f64; 3]>>> {
    mesh.boundaries
        .iter()
        .map(|rings| rings.iter().map(|r| close(r)).collect())
        .collect()
}

fn tin(geometry: &FeatureGeometry, at: &Placement<'_>, altitude: f64, z_mode: ZMode) -> TinMesh {
    TinBuilder::new(
        z_mode,
        |xy: DVec2, z: f64| at.elevation(xy, z, altitude),
        |p: DVec3| at.map_to_3d.transform_point(p),
    )
    .ccw2d(true)
    .build(polygons_of(geometry))
}

/// Footprints flattened to the elevation of each polygon's centroid.
fn extruded(geometry: &FeatureGeometry, at: &Placement<'_>, altitude: f64) -> GeometryPayload {
    let mesh = tin(geometry, at, altitude, ZMode::PerPolygonCentroid);
    GeometryPayload::Polygons {
        polygons: outlines(&mesh),
        centroids: mesh.centroids.iter().map(|c| c.to_array()).collect(),
    }
}

fn polygon(geometry: &FeatureGeometry, at: &Placement<'_>, altitude: f64) -> GeometryPayload {
    GeometryPayload::Mesh {
        triangles: tin(geometry, at, altitude, ZMode::Absolute).to_indexed(false),
        polygons: Vec::new(),
    }
}

/// Polygons draped on the DEM: split along the DEM grid so every vertex lies
/// on the surface, with outlines segmented at grid lines. Without a DEM each
/// polygon lies flat at its centroid height.
fn overlay(geometry: &FeatureGeometry, at: &Placement<'_>, altitude: f64) -> GeometryPayload {
    let mesh = match (at.altitude_mode, at.dem) {
        (AltitudeMode::RelativeToDem, Some(dem)) => {
            let lift = |p: DVec3| at.map_to_3d.transform(p.x, p.y, p.z + altitude);
            let mut mesh = TinMesh::default();
            for polygon in polygons_of(geometry).iter().filter(|p| !p.is_degenerate()) {
                mesh.append(dem.triangulate_polygon(polygon, lift));
            }
            mesh
        }
        _ => tin(geometry, at, altitude, ZMode::CentroidHeight),
    };
    GeometryPayload::Mesh {
        triangles: mesh.to_indexed(false),
        polygons: outlines(&mesh),
    }
}
