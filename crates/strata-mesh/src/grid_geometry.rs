//! Sampling grid over an extent, with polygon clipping and boundary
//! segmentation against the grid cells.
//!
//! All cell math runs in the extent-local frame (see
//! [`MapExtent::to_local`]), so rotated extents are handled transparently:
//! inputs and outputs are map coordinates.

use std::cell::OnceCell;

use geo::{BooleanOps, Contains};
use glam::{DVec2, DVec3};
use strata_coords::MapExtent;

use crate::error::MeshError;
use crate::ring::{PolygonZ, Ring};
use crate::tin::{TinMesh, ear_clip, triangle_area_2d};

/// Fragments and triangles smaller than this fraction of a cell are slivers.
const SLIVER_AREA_RATIO: f64 = 1e-6;

/// A regular grid of `(seg_x + 1) × (seg_y + 1)` elevation values over an
/// extent. Row 0 is the top (north) edge of the extent, column 0 the left.
#[derive(Debug)]
pub struct GridGeometry {
    extent: MapExtent,
    seg_x: u32,
    seg_y: u32,
    values: Vec<f32>,
    /// Cell rectangles in the local frame, built on first clip.
    cells: OnceCell<Vec<geo::Polygon<f64>>>,
}

impl GridGeometry {
    pub fn new(extent: MapExtent, seg_x: u32, seg_y: u32, values: Vec<f32>) -> Result<Self, MeshError> {
        if seg_x == 0 || seg_y == 0 {
            return Err(MeshError::NoSegments { seg_x, seg_y });
        }
        let expected = (seg_x as usize + 1) * (seg_y as usize + 1);
        if values.len() != expected {
            return Err(MeshError::GridSize {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            extent,
            seg_x,
            seg_y,
            values,
            cells: OnceCell::new(),
        })
    }

    /// Grid with the same value at every node.
    pub fn flat(extent: MapExtent, seg_x: u32, seg_y: u32, z: f32) -> Result<Self, MeshError> {
        let n = (seg_x as usize + 1) * (seg_y as usize + 1);
        Self::new(extent, seg_x, seg_y, vec![z; n])
    }

    pub fn extent(&self) -> &MapExtent {
        &self.extent
    }

    /// `(seg_x, seg_y)`.
    pub fn segments(&self) -> (u32, u32) {
        (self.seg_x, self.seg_y)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn x_res(&self) -> f64 {
        self.extent.width() / self.seg_x as f64
    }

    pub fn y_res(&self) -> f64 {
        self.extent.height() / self.seg_y as f64
    }

    fn cell_area(&self) -> f64 {
        self.x_res() * self.y_res()
    }

    fn node(&self, col: u32, row: u32) -> f64 {
        self.values[(row * (self.seg_x + 1) + col) as usize] as f64
    }

    /// Fractional grid coordinates `(col, row)` of an extent-local point.
    fn local_to_grid(&self, l: DVec2) -> DVec2 {
        DVec2::new(
            (l.x + self.extent.width() * 0.5) / self.x_res(),
            (self.extent.height() * 0.5 - l.y) / self.y_res(),
        )
    }

    /// Fractional grid coordinates `(col, row)` of a map point.
    pub fn grid_coords(&self, p: DVec2) -> DVec2 {
        self.local_to_grid(self.extent.to_local(p))
    }

    /// Bilinear interpolation at fractional grid coordinates, clamped to the grid.
    pub fn value_at_grid(&self, g: DVec2) -> f64 {
        let gx = g.x.clamp(0.0, self.seg_x as f64);
        let gy = g.y.clamp(0.0, self.seg_y as f64);
        let c0 = (gx.floor() as u32).min(self.seg_x - 1);
        let r0 = (gy.floor() as u32).min(self.seg_y - 1);
        let fx = gx - c0 as f64;
        let fy = gy - r0 as f64;

        let z00 = self.node(c0, r0);
        let z10 = self.node(c0 + 1, r0);
        let z01 = self.node(c0, r0 + 1);
        let z11 = self.node(c0 + 1, r0 + 1);
        let top = z00 + (z10 - z00) * fx;
        let bottom = z01 + (z11 - z01) * fx;
        top + (bottom - top) * fy
    }

    fn value_local(&self, l: DVec2) -> f64 {
        self.value_at_grid(self.local_to_grid(l))
    }

    /// Elevation at map point `(x, y)` by bilinear interpolation.
    pub fn value(&self, x: f64, y: f64) -> f64 {
        self.value_at_grid(self.grid_coords(DVec2::new(x, y)))
    }

    fn cells(&self) -> &[geo::Polygon<f64>] {
        self.cells.get_or_init(|| {
            let (xr, yr) = (self.x_res(), self.y_res());
            let x0 = -self.extent.width() * 0.5;
            let y0 = self.extent.height() * 0.5;
            let mut cells = Vec::with_capacity((self.seg_x * self.seg_y) as usize);
            for row in 0..self.seg_y {
                for col in 0..self.seg_x {
                    let min = DVec2::new(x0 + col as f64 * xr, y0 - (row + 1) as f64 * yr);
                    let max = DVec2::new(x0 + (col + 1) as f64 * xr, y0 - row as f64 * yr);
                    cells.push(geo::Polygon::new(
                        geo::LineString::from(vec![
                            (min.x, min.y),
                            (max.x, min.y),
                            (max.x, max.y),
                            (min.x, max.y),
                            (min.x, min.y),
                        ]),
                        vec![],
                    ));
                }
            }
            cells
        })
    }

    /// Closed index range of cells touched by a local-frame box.
    fn cell_range(&self, min: DVec2, max: DVec2) -> Option<(u32, u32, u32, u32)> {
        // grid rows grow southwards, so max.y gives the first row
        let g0 = self.local_to_grid(DVec2::new(min.x, max.y));
        let g1 = self.local_to_grid(DVec2::new(max.x, min.y));
        if g1.x < 0.0 || g1.y < 0.0 || g0.x > self.seg_x as f64 || g0.y > self.seg_y as f64 {
            return None;
        }
        let clamp_col = |v: f64| (v.floor().max(0.0) as u32).min(self.seg_x - 1);
        let clamp_row = |v: f64| (v.floor().max(0.0) as u32).min(self.seg_y - 1);
        Some((clamp_col(g0.x), clamp_row(g0.y), clamp_col(g1.x), clamp_row(g1.y)))
    }

    /// Split a polygon along the grid cell boundaries, in the local frame.
    fn split_local(&self, local: &PolygonZ) -> Vec<PolygonZ> {
        let Some(bbox) = local.bounding_rect() else {
            return Vec::new();
        };
        let Some((c0, r0, c1, r1)) = self.cell_range(bbox.min, bbox.max) else {
            return Vec::new();
        };

        let shape = local.to_geo();
        let min_area = self.cell_area() * SLIVER_AREA_RATIO;
        let cells = self.cells();
        let mut fragments = Vec::new();
        for row in r0..=r1 {
            for col in c0..=c1 {
                let cell = &cells[(row * self.seg_x + col) as usize];
                if shape.contains(cell) {
                    fragments.push(PolygonZ::from_geo(cell));
                    continue;
                }
                for part in shape.intersection(cell) {
                    let fragment = PolygonZ::from_geo(&part);
                    if fragment.is_degenerate() || fragment.area() <= min_area {
                        continue;
                    }
                    fragments.push(fragment);
                }
            }
        }
        fragments
    }

    /// Split `polygon` into per-cell fragments (map coordinates, `z = 0`).
    /// Fragments that collapse to fewer than three vertices or to zero area
    /// are dropped.
    pub fn split_polygon(&self, polygon: &PolygonZ) -> Vec<PolygonZ> {
        let local = self.to_local_polygon(polygon);
        self.split_local(&local)
            .into_iter()
            .map(|f| f.map_points(|p| self.extent.from_local(p.truncate()).extend(p.z)))
            .collect()
    }

    /// Triangulate `polygon` clipped to the grid cells. Every vertex gets its
    /// Z from the grid surface, then passes through `transform`. Triangles are
    /// counter-clockwise in XY and slivers are dropped. When any part of the
    /// polygon lies on the grid, its [`segmentize_boundary`](Self::segmentize_boundary)
    /// rings, transformed the same way, go to [`TinMesh::boundaries`].
    pub fn triangulate_polygon(
        &self,
        polygon: &PolygonZ,
        transform: impl Fn(DVec3) -> DVec3,
    ) -> TinMesh {
        let mut mesh = TinMesh::default();
        if polygon.is_degenerate() {
            mesh.skipped += 1;
            return mesh;
        }
        let local = self.to_local_polygon(polygon);
        let min_area = self.cell_area() * SLIVER_AREA_RATIO;

        let fragments = self.split_local(&local);
        if fragments.is_empty() {
            return mesh;
        }
        for fragment in fragments {
            let vertices: Vec<DVec3> = fragment.rings().flatten().copied().collect();
            let triangles = match ear_clip(&fragment) {
                Ok(t) => t,
                Err(e) => {
                    tracing::debug!("skipping grid fragment: {e}");
                    mesh.skipped += 1;
                    continue;
                }
            };
            for [a, b, c] in triangles {
                let (mut pa, mut pb, pc) = (vertices[a], vertices[b], vertices[c]);
                let area = triangle_area_2d(pa, pb, pc);
                if area.abs() <= min_area {
                    continue;
                }
                if area < 0.0 {
                    std::mem::swap(&mut pa, &mut pb);
                }
                mesh.triangles.push([pa, pb, pc].map(|l| {
                    let z = self.value_local(l.truncate());
                    transform(self.extent.from_local(l.truncate()).extend(z))
                }));
            }
        }
        mesh.boundaries.push(
            self.segmentize_boundary(polygon)
                .into_iter()
                .map(|ring| ring.into_iter().map(&transform).collect())
                .collect(),
        );
        mesh
    }

    /// Boundary rings of `polygon` with a vertex inserted wherever an edge
    /// crosses a grid column or row line. Every vertex is given the grid
    /// surface elevation. The exterior is returned counter-clockwise and the
    /// holes clockwise.
    pub fn segmentize_boundary(&self, polygon: &PolygonZ) -> Vec<Ring> {
        let oriented = polygon.oriented();
        oriented
            .rings()
            .filter(|r| r.len() >= 3)
            .map(|ring| {
                let local: Vec<DVec2> = ring
                    .iter()
                    .map(|p| self.extent.to_local(p.truncate()))
                    .collect();
                self.segmentize_ring_local(&local)
                    .into_iter()
                    .map(|l| {
                        let z = self.value_local(l);
                        self.extent.from_local(l).extend(z)
                    })
                    .collect()
            })
            .collect()
    }

    fn segmentize_ring_local(&self, ring: &[DVec2]) -> Vec<DVec2> {
        let n = ring.len();
        let mut out = Vec::with_capacity(n * 2);
        let mut ts: Vec<f64> = Vec::new();
        for i in 0..n {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            out.push(a);

            let ga = self.local_to_grid(a);
            let gb = self.local_to_grid(b);
            ts.clear();
            push_crossings(&mut ts, ga.x, gb.x);
            push_crossings(&mut ts, ga.y, gb.y);
            ts.sort_by(f64::total_cmp);
            ts.dedup_by(|t1, t0| (*t1 - *t0).abs() < 1e-12);
            out.extend(ts.iter().map(|&t| a + (b - a) * t));
        }
        out
    }

    fn to_local_polygon(&self, polygon: &PolygonZ) -> PolygonZ {
        polygon.map_points(|p| self.extent.to_local(p.truncate()).extend(p.z))
    }
}

/// Parameters `t ∈ (0, 1)` where the segment `v0 → v1` crosses an integer grid line.
fn push_crossings(ts: &mut Vec<f64>, v0: f64, v1: f64) {
    if v0 == v1 {
        return;
    }
    let (lo, hi) = (v0.min(v1), v0.max(v1));
    let mut k = lo.floor() + 1.0;
    while k < hi {
        let t = (k - v0) / (v1 - v0);
        if t > 0.0 && t < 1.0 {
            ts.push(t);
        }
        k += 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::signed_area;

    const EPSILON: f64 = 1e-9;

    /// 4×4 cells over [0, 4]² with z = x + 10·y at every node.
    fn ramp_grid(rotation: f64) -> GridGeometry {
        let extent = MapExtent::new(DVec2::new(2.0, 2.0), 4.0, 4.0, rotation).unwrap();
        let mut values = Vec::new();
        for row in 0..5 {
            for col in 0..5 {
                let y = 4.0 - row as f32;
                values.push(col as f32 + 10.0 * y);
            }
        }
        GridGeometry::new(extent, 4, 4, values).unwrap()
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> PolygonZ {
        PolygonZ::from_2d(
            &[
                DVec2::new(x0, y0),
                DVec2::new(x1, y0),
                DVec2::new(x1, y1),
                DVec2::new(x0, y1),
            ],
            &[],
        )
    }

    fn tin_area(mesh: &TinMesh) -> f64 {
        mesh.triangles
            .iter()
            .map(|[a, b, c]| triangle_area_2d(*a, *b, *c))
            .sum()
    }

    #[test]
    fn test_value_count_checked() {
        let extent = MapExtent::new(DVec2::ZERO, 1.0, 1.0, 0.0).unwrap();
        assert!(matches!(
            GridGeometry::new(extent, 2, 2, vec![0.0; 8]),
            Err(MeshError::GridSize { expected: 9, actual: 8 })
        ));
        assert!(GridGeometry::flat(extent, 0, 2, 0.0).is_err());
    }

    #[test]
    fn test_bilinear_value_reproduces_plane() {
        let g = ramp_grid(0.0);
        for &(x, y) in &[(0.0, 0.0), (4.0, 4.0), (1.5, 2.25), (3.9, 0.1)] {
            let z = g.value(x, y);
            assert!((z - (x + 10.0 * y)).abs() < 1e-6, "z({x}, {y}) = {z}");
        }
        // clamped outside the grid
        assert!((g.value(-5.0, 2.0) - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_value_on_rotated_grid() {
        let g = ramp_grid(90.0);
        // local (+x) now points north: the left edge of the grid is the south side
        let z = g.value(2.0, 0.0);
        assert!((z - 20.0).abs() < 1e-6, "south midpoint maps to local left edge: {z}");
    }

    #[test]
    fn test_split_polygon_along_cells() {
        let g = ramp_grid(0.0);
        let fragments = g.split_polygon(&rect(0.5, 0.25, 2.5, 0.75));
        // spans cells in columns 0..=2 of the bottom row
        assert_eq!(fragments.len(), 3);
        let area: f64 = fragments.iter().map(PolygonZ::area).sum();
        assert!((area - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_fully_covered_cells_kept_whole() {
        let g = ramp_grid(0.0);
        let fragments = g.split_polygon(&rect(-1.0, -1.0, 5.0, 5.0));
        assert_eq!(fragments.len(), 16);
        for f in &fragments {
            assert_eq!(f.exterior.len(), 4);
        }
    }

    #[test]
    fn test_triangulation_covers_polygon_with_grid_z() {
        let g = ramp_grid(0.0);
        let polygon = PolygonZ::from_2d(
            &[DVec2::new(0.3, 0.2), DVec2::new(3.7, 0.6), DVec2::new(2.0, 3.8)],
            &[],
        );
        let mesh = g.triangulate_polygon(&polygon, |p| p);
        assert!((tin_area(&mesh) - polygon.area()).abs() < 1e-6);
        for tri in &mesh.triangles {
            assert!(triangle_area_2d(tri[0], tri[1], tri[2]) > 0.0, "triangle not ccw");
            for p in tri {
                assert!((p.z - (p.x + 10.0 * p.y)).abs() < 1e-5, "vertex {p:?}");
            }
        }
    }

    #[test]
    fn test_triangulation_with_hole() {
        let g = ramp_grid(0.0);
        let mut polygon = rect(0.0, 0.0, 4.0, 4.0);
        polygon.interiors.push(rect(1.5, 1.5, 2.5, 2.5).exterior);
        let mesh = g.triangulate_polygon(&polygon, |p| p);
        assert!((tin_area(&mesh) - 15.0).abs() < 1e-6);
    }

    #[test]
    fn test_triangulation_is_deterministic() {
        let g = ramp_grid(30.0);
        let polygon = PolygonZ::from_2d(
            &[
                DVec2::new(0.5, 0.5),
                DVec2::new(3.5, 1.0),
                DVec2::new(3.0, 3.0),
                DVec2::new(1.0, 3.5),
            ],
            &[],
        );
        let a = g.triangulate_polygon(&polygon, |p| p).to_indexed(false);
        let b = g.triangulate_polygon(&polygon, |p| p).to_indexed(false);
        assert_eq!(a, b);
    }

    #[test]
    fn test_boundary_on_cell_lines_produces_no_slivers() {
        let g = ramp_grid(0.0);
        // edges run exactly along grid lines x=1, x=3, y=1, y=3
        let mesh = g.triangulate_polygon(&rect(1.0, 1.0, 3.0, 3.0), |p| p);
        assert!(!mesh.triangles.is_empty());
        for tri in &mesh.triangles {
            let area = triangle_area_2d(tri[0], tri[1], tri[2]);
            assert!(area > 1e-6, "sliver triangle of area {area}");
        }
        assert!((tin_area(&mesh) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_outside_grid_yields_nothing() {
        let g = ramp_grid(0.0);
        let mesh = g.triangulate_polygon(&rect(10.0, 10.0, 11.0, 11.0), |p| p);
        assert!(mesh.triangles.is_empty());
        assert!(mesh.boundaries.is_empty(), "no outline for a polygon off the grid");
    }

    #[test]
    fn test_triangulation_carries_segmented_boundary() {
        let g = ramp_grid(0.0);
        let lift = |p: DVec3| p + DVec3::Z;
        let mesh = g.triangulate_polygon(&rect(0.5, 0.25, 2.5, 0.75), lift);
        assert_eq!(mesh.boundaries.len(), 1);
        let expected: Vec<DVec3> = g
            .segmentize_boundary(&rect(0.5, 0.25, 2.5, 0.75))
            .remove(0)
            .into_iter()
            .map(lift)
            .collect();
        assert_eq!(mesh.boundaries[0][0], expected, "boundary goes through the same transform");
    }

    #[test]
    fn test_segmentize_inserts_grid_crossings() {
        let g = ramp_grid(0.0);
        let rings = g.segmentize_boundary(&rect(0.5, 0.25, 2.5, 0.75));
        assert_eq!(rings.len(), 1);
        // 4 corners + 2 crossings on each horizontal edge (x = 1, 2)
        assert_eq!(rings[0].len(), 8);
        for p in &rings[0] {
            assert!((p.z - (p.x + 10.0 * p.y)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_segmentize_normalizes_orientation() {
        let g = ramp_grid(0.0);
        let mut outer = rect(0.2, 0.2, 3.8, 3.8).exterior;
        outer.reverse();
        let hole = rect(1.2, 1.2, 2.8, 2.8).exterior;
        let rings = g.segmentize_boundary(&PolygonZ::new(outer, vec![hole]));
        assert_eq!(rings.len(), 2);
        assert!(signed_area(&rings[0]) > 0.0, "exterior must be ccw");
        assert!(signed_area(&rings[1]) < 0.0, "hole must be cw");
    }
}
