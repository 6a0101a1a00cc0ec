//! Triangulated irregular networks built from polygons by ear clipping.

use glam::{DVec2, DVec3};

use crate::error::MeshError;
use crate::indexed::IndexedTriangleMesh;
use crate::ring::{PolygonZ, Ring};

/// How vertex elevations are derived while building a TIN.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ZMode {
    /// Every vertex gets `z_func(xy, own_z)`.
    #[default]
    Absolute,
    /// Every vertex of a polygon gets `z_func(centroid, mean exterior z)`.
    CentroidHeight,
    /// Like [`ZMode::CentroidHeight`], and the transformed centroid of each
    /// polygon is also recorded in [`TinMesh::centroids`].
    PerPolygonCentroid,
}

/// Signed XY area of a triangle (positive when counter-clockwise).
pub fn triangle_area_2d(a: DVec3, b: DVec3, c: DVec3) -> f64 {
    0.5 * ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y))
}

/// Soup of triangles plus per-polygon side data.
#[derive(Clone, Debug, Default)]
pub struct TinMesh {
    pub triangles: Vec<[DVec3; 3]>,
    /// One per input polygon in [`ZMode::PerPolygonCentroid`].
    pub centroids: Vec<DVec3>,
    /// Boundary rings (open, exterior CCW, holes CW) of every triangulated
    /// polygon, placed like its vertices. Parallel to `centroids` in
    /// [`ZMode::PerPolygonCentroid`].
    pub boundaries: Vec<Vec<Ring>>,
    /// Polygons or fragments that could not be triangulated.
    pub skipped: usize,
}

impl TinMesh {
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn append(&mut self, other: TinMesh) {
        self.triangles.extend(other.triangles);
        self.centroids.extend(other.centroids);
        self.boundaries.extend(other.boundaries);
        self.skipped += other.skipped;
    }

    /// Shared-vertex form. `flat` keeps XY only.
    pub fn to_indexed(&self, flat: bool) -> IndexedTriangleMesh {
        IndexedTriangleMesh::from_triangles(&self.triangles, flat)
    }
}

/// Ear-clip a polygon. Indices refer to `polygon.rings().flatten()`.
pub(crate) fn ear_clip(polygon: &PolygonZ) -> Result<Vec<[usize; 3]>, MeshError> {
    let mut coords = Vec::with_capacity(polygon.vertex_count() * 2);
    let mut hole_starts = Vec::with_capacity(polygon.interiors.len());
    for (i, ring) in polygon.rings().enumerate() {
        if i > 0 {
            hole_starts.push(coords.len() / 2);
        }
        for p in ring {
            coords.push(p.x);
            coords.push(p.y);
        }
    }
    let indices = earcutr::earcut(&coords, &hole_starts, 2)
        .map_err(|e| MeshError::Earcut(format!("{e:?}")))?;
    Ok(indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect())
}

/// Builds a [`TinMesh`] from polygons (or pre-tessellated triangles).
///
/// `z_func(xy, own_z)` yields the elevation of a point before `transform`
/// maps it into scene space.
pub struct TinBuilder<Z, T> {
    z_mode: ZMode,
    z_func: Z,
    transform: T,
    ccw2d: bool,
}

impl<Z, T> TinBuilder<Z, T>
where
    Z: Fn(DVec2, f64) -> f64,
    T: Fn(DVec3) -> DVec3,
{
    pub fn new(z_mode: ZMode, z_func: Z, transform: T) -> Self {
        Self {
            z_mode,
            z_func,
            transform,
            ccw2d: false,
        }
    }

    /// Force every output triangle counter-clockwise in XY.
    pub fn ccw2d(mut self, on: bool) -> Self {
        self.ccw2d = on;
        self
    }

    pub fn build(&self, polygons: &[PolygonZ]) -> TinMesh {
        let mut mesh = TinMesh::default();
        for polygon in polygons {
            if polygon.is_degenerate() {
                tracing::debug!(
                    vertices = polygon.exterior.len(),
                    "skipping degenerate polygon"
                );
                mesh.skipped += 1;
                continue;
            }
            let triangles = match ear_clip(polygon) {
                Ok(t) => t,
                Err(e) => {
                    tracing::debug!("skipping polygon: {e}");
                    mesh.skipped += 1;
                    continue;
                }
            };
            let vertices: Vec<DVec3> = polygon.rings().flatten().copied().collect();

            let centroid_z = match self.z_mode {
                ZMode::Absolute => None,
                ZMode::CentroidHeight | ZMode::PerPolygonCentroid => {
                    let c = polygon
                        .centroid()
                        .unwrap_or_else(|| vertices[0].truncate());
                    let own_z = polygon.exterior.iter().map(|p| p.z).sum::<f64>()
                        / polygon.exterior.len() as f64;
                    let z = (self.z_func)(c, own_z);
                    if self.z_mode == ZMode::PerPolygonCentroid {
                        mesh.centroids.push((self.transform)(c.extend(z)));
                    }
                    Some(z)
                }
            };
            let place = |p: DVec3| {
                let z = centroid_z.unwrap_or_else(|| (self.z_func)(p.truncate(), p.z));
                (self.transform)(p.truncate().extend(z))
            };

            for [a, b, c] in triangles {
                let tri = [vertices[a], vertices[b], vertices[c]].map(place);
                self.push_triangle(&mut mesh, tri);
            }
            mesh.boundaries.push(
                polygon
                    .oriented()
                    .rings()
                    .map(|r| r.iter().copied().map(place).collect())
                    .collect(),
            );
        }
        mesh
    }

    /// Apply Z and transform to already tessellated triangles.
    pub fn build_triangles(&self, triangles: &[[DVec3; 3]]) -> TinMesh {
        let mut mesh = TinMesh::default();
        for tri in triangles {
            let out = tri.map(|p| {
                let z = (self.z_func)(p.truncate(), p.z);
                (self.transform)(p.truncate().extend(z))
            });
            self.push_triangle(&mut mesh, out);
        }
        mesh
    }

    fn push_triangle(&self, mesh: &mut TinMesh, mut tri: [DVec3; 3]) {
        let area = triangle_area_2d(tri[0], tri[1], tri[2]);
        if area == 0.0 {
            return;
        }
        if self.ccw2d && area < 0.0 {
            tri.swap(1, 2);
        }
        mesh.triangles.push(tri);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64, z: f64) -> PolygonZ {
        PolygonZ::new(
            vec![
                DVec3::new(x0, y0, z),
                DVec3::new(x0 + size, y0, z),
                DVec3::new(x0 + size, y0 + size, z),
                DVec3::new(x0, y0 + size, z),
            ],
            vec![],
        )
    }

    #[test]
    fn test_absolute_mode_uses_own_z() {
        let b = TinBuilder::new(ZMode::Absolute, |_, z| z * 2.0, |p| p);
        let mesh = b.build(&[square(0.0, 0.0, 1.0, 5.0)]);
        assert_eq!(mesh.triangles.len(), 2);
        assert!(mesh.triangles.iter().flatten().all(|p| p.z == 10.0));
        assert!(mesh.centroids.is_empty());
    }

    #[test]
    fn test_centroid_modes() {
        let z_func = |xy: DVec2, _: f64| xy.x + xy.y;
        let flat = TinBuilder::new(ZMode::CentroidHeight, z_func, |p| p).build(&[square(0.0, 0.0, 2.0, 0.0)]);
        assert!(flat.triangles.iter().flatten().all(|p| (p.z - 2.0).abs() < 1e-12));
        assert!(flat.centroids.is_empty());

        let polys = [square(0.0, 0.0, 2.0, 0.0), square(10.0, 0.0, 2.0, 0.0)];
        let mesh = TinBuilder::new(ZMode::PerPolygonCentroid, z_func, |p| p + DVec3::Z).build(&polys);
        assert_eq!(mesh.centroids.len(), 2);
        assert!((mesh.centroids[1] - DVec3::new(11.0, 1.0, 13.0)).length() < 1e-9);
    }

    #[test]
    fn test_centroid_height_uses_mean_own_z() {
        let mut p = square(0.0, 0.0, 2.0, 0.0);
        for (v, z) in p.exterior.iter_mut().zip([1.0, 2.0, 3.0, 6.0]) {
            v.z = z;
        }
        let mesh = TinBuilder::new(ZMode::CentroidHeight, |_, z| z + 0.5, |p| p).build(&[p]);
        assert!(mesh.triangles.iter().flatten().all(|p| p.z == 3.5), "mean of 1, 2, 3, 6 plus 0.5");
    }

    #[test]
    fn test_boundaries_follow_polygons() {
        // clockwise input
        let cw = PolygonZ::new(
            vec![DVec3::ZERO, DVec3::new(0.0, 2.0, 0.0), DVec3::new(2.0, 2.0, 0.0), DVec3::new(2.0, 0.0, 0.0)],
            vec![],
        );
        let line = PolygonZ::new(vec![DVec3::ZERO, DVec3::X, DVec3::ZERO], vec![]);
        let mesh = TinBuilder::new(ZMode::PerPolygonCentroid, |_, _| 4.0, |p| p).build(&[cw, line]);
        assert_eq!(mesh.boundaries.len(), 1, "degenerate polygons have no boundary");
        assert_eq!(mesh.boundaries.len(), mesh.centroids.len());
        let ring = &mesh.boundaries[0][0];
        assert_eq!(ring.len(), 4);
        assert!(crate::ring::is_ccw(ring), "exterior reoriented counter-clockwise");
        assert!(ring.iter().all(|p| p.z == 4.0));
    }

    #[test]
    fn test_ccw2d_flips_mirrored_triangles() {
        // mirroring in x reverses winding
        let mirror = |p: DVec3| DVec3::new(-p.x, p.y, p.z);
        let polys = [square(0.0, 0.0, 1.0, 0.0)];
        let plain = TinBuilder::new(ZMode::Absolute, |_, z| z, |p| p).build(&polys);
        let raw = TinBuilder::new(ZMode::Absolute, |_, z| z, mirror).build(&polys);
        for (a, b) in plain.triangles.iter().zip(&raw.triangles) {
            let (sa, sb) = (triangle_area_2d(a[0], a[1], a[2]), triangle_area_2d(b[0], b[1], b[2]));
            assert!(sa * sb < 0.0, "mirroring must reverse winding");
        }
        let fixed = TinBuilder::new(ZMode::Absolute, |_, z| z, mirror).ccw2d(true).build(&polys);
        assert!(fixed.triangles.iter().all(|t| triangle_area_2d(t[0], t[1], t[2]) > 0.0));
    }

    #[test]
    fn test_degenerate_polygons_skipped() {
        let line = PolygonZ::new(vec![DVec3::ZERO, DVec3::X, DVec3::ZERO], vec![]);
        let mesh = TinBuilder::new(ZMode::Absolute, |_, z| z, |p| p)
            .build(&[line, square(0.0, 0.0, 1.0, 0.0)]);
        assert_eq!(mesh.skipped, 1);
        assert_eq!(mesh.triangles.len(), 2);
    }

    #[test]
    fn test_polygon_with_hole_area() {
        let mut p = square(0.0, 0.0, 4.0, 0.0);
        p.interiors.push(square(1.0, 1.0, 2.0, 0.0).exterior);
        let mesh = TinBuilder::new(ZMode::Absolute, |_, z| z, |p| p).ccw2d(true).build(&[p]);
        let area: f64 = mesh.triangles.iter().map(|t| triangle_area_2d(t[0], t[1], t[2])).sum();
        assert!((area - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_build_triangles_applies_transform() {
        let tri = [[DVec3::ZERO, DVec3::X, DVec3::Y]];
        let mesh = TinBuilder::new(ZMode::Absolute, |_, _| 3.0, |p| p * 2.0).build_triangles(&tri);
        assert_eq!(mesh.triangles[0][1], DVec3::new(2.0, 0.0, 6.0));
    }
}
