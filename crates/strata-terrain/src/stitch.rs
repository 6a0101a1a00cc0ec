//! Edge stitching between mosaic tiles of different resolution.
//!
//! Tiles are stitched in build order. A tile copies every shared edge and
//! corner from neighbors that are already built, resampled to its own point
//! count. An edge that faces a rougher neighbor not built yet is decimated to
//! that neighbor's spacing and linearly interpolated in between, so the
//! neighbor can later copy the coarse points and both tiles render the same
//! line.

use rustc_hash::FxHashMap;

use crate::mosaic::{Corner, Edge, TileSpec};

/// Elevation grid of one tile: `(seg_x + 1) × (seg_y + 1)` values, row 0 north.
#[derive(Clone, Debug, PartialEq)]
pub struct TileGrid {
    pub seg_x: u32,
    pub seg_y: u32,
    pub values: Vec<f32>,
}

impl TileGrid {
    pub fn new(seg_x: u32, seg_y: u32, values: Vec<f32>) -> Self {
        debug_assert_eq!(values.len(), ((seg_x + 1) * (seg_y + 1)) as usize);
        Self { seg_x, seg_y, values }
    }

    fn cols(&self) -> usize {
        self.seg_x as usize + 1
    }

    fn rows(&self) -> usize {
        self.seg_y as usize + 1
    }

    fn edge_indices(&self, edge: Edge) -> Vec<usize> {
        let (cols, rows) = (self.cols(), self.rows());
        match edge {
            Edge::Top => (0..cols).collect(),
            Edge::Bottom => ((rows - 1) * cols..rows * cols).collect(),
            Edge::Left => (0..rows).map(|r| r * cols).collect(),
            Edge::Right => (0..rows).map(|r| r * cols + cols - 1).collect(),
        }
    }

    fn corner_index(&self, corner: Corner) -> usize {
        let (cols, rows) = (self.cols(), self.rows());
        match corner {
            Corner::TopLeft => 0,
            Corner::TopRight => cols - 1,
            Corner::BottomLeft => (rows - 1) * cols,
            Corner::BottomRight => rows * cols - 1,
        }
    }

    /// Edge values, left to right or top to bottom.
    pub fn edge(&self, edge: Edge) -> Vec<f32> {
        self.edge_indices(edge).into_iter().map(|i| self.values[i]).collect()
    }

    pub fn set_edge(&mut self, edge: Edge, values: &[f32]) {
        for (i, v) in self.edge_indices(edge).into_iter().zip(values) {
            self.values[i] = *v;
        }
    }

    pub fn corner(&self, corner: Corner) -> f32 {
        self.values[self.corner_index(corner)]
    }

    pub fn set_corner(&mut self, corner: Corner, value: f32) {
        let i = self.corner_index(corner);
        self.values[i] = value;
    }
}

/// Resample an edge to `n` points covering the same span. Points that fall
/// on a source point are copied exactly; the rest are interpolated.
pub fn resample_edge(src: &[f32], n: usize) -> Vec<f32> {
    if src.len() == n || src.len() < 2 || n < 2 {
        return src.to_vec();
    }
    let span_src = src.len() - 1;
    let span_dst = n - 1;
    (0..n)
        .map(|i| {
            let num = i * span_src;
            let (idx, rem) = (num / span_dst, num % span_dst);
            if rem == 0 {
                src[idx]
            } else {
                let t = rem as f32 / span_dst as f32;
                src[idx] + (src[idx + 1] - src[idx]) * t
            }
        })
        .collect()
}

/// Keep every `step`-th point and interpolate linearly between them.
fn decimate_interpolate(values: &mut [f32], step: usize) {
    if step < 2 || values.len() < 3 {
        return;
    }
    let last = values.len() - 1;
    let mut i0 = 0;
    while i0 < last {
        let i1 = (i0 + step).min(last);
        let (v0, v1) = (values[i0], values[i1]);
        for i in i0 + 1..i1 {
            let t = (i - i0) as f32 / (i1 - i0) as f32;
            values[i] = v0 + (v1 - v0) * t;
        }
        i0 = i1;
    }
}

struct Placed {
    order: usize,
    seg_x: u32,
    seg_y: u32,
}

/// Tracks the edges of built tiles and stitches each new tile against them.
pub struct EdgeStitcher {
    placed: FxHashMap<(i32, i32), Placed>,
    built: FxHashMap<(i32, i32), TileGrid>,
}

impl EdgeStitcher {
    /// Stitcher for `tiles`, given in build order.
    pub fn new(tiles: &[TileSpec]) -> Self {
        let placed = tiles
            .iter()
            .enumerate()
            .map(|(order, t)| {
                (
                    (t.dx, t.dy),
                    Placed {
                        order,
                        seg_x: t.seg_x,
                        seg_y: t.seg_y,
                    },
                )
            })
            .collect();
        Self {
            placed,
            built: FxHashMap::default(),
        }
    }

    /// Stored grid of a built tile.
    pub fn built(&self, dx: i32, dy: i32) -> Option<&TileGrid> {
        self.built.get(&(dx, dy))
    }

    /// Stitch `grid` of `tile` against its neighbors and record it. Returns
    /// the number of fallbacks: neighbors that should have been built
    /// earlier but were not.
    pub fn stitch(&mut self, tile: &TileSpec, grid: &mut TileGrid) -> usize {
        let key = (tile.dx, tile.dy);
        let order = self.placed.get(&key).map_or(usize::MAX, |p| p.order);
        let mut fallbacks = 0;

        for corner in Corner::ALL {
            let (ox, oy) = corner.offset();
            if let Some(n) = self.built.get(&(tile.dx + ox, tile.dy + oy)) {
                grid.set_corner(corner, n.corner(corner.opposite()));
            }
        }

        for edge in Edge::ALL {
            let (ox, oy) = edge.offset();
            let nkey = (tile.dx + ox, tile.dy + oy);
            let Some(neighbor) = self.placed.get(&nkey) else {
                continue;
            };
            let own_len = match edge {
                Edge::Top | Edge::Bottom => grid.cols(),
                Edge::Left | Edge::Right => grid.rows(),
            };

            if let Some(n) = self.built.get(&nkey) {
                let shared = resample_edge(&n.edge(edge.opposite()), own_len);
                grid.set_edge(edge, &shared);
            } else if neighbor.order < order {
                tracing::warn!(
                    tile = ?key,
                    neighbor = ?nkey,
                    "neighbor edge not available, keeping unstitched edge"
                );
                fallbacks += 1;
            } else {
                let n_len = match edge {
                    Edge::Top | Edge::Bottom => neighbor.seg_x as usize + 1,
                    Edge::Left | Edge::Right => neighbor.seg_y as usize + 1,
                };
                // only an edge facing a rougher neighbor is decimated
                if n_len < own_len && (own_len - 1) % (n_len - 1).max(1) == 0 {
                    let step = (own_len - 1) / (n_len - 1).max(1);
                    let mut values = grid.edge(edge);
                    decimate_interpolate(&mut values, step);
                    grid.set_edge(edge, &values);
                }
            }
        }

        self.built.insert(key, grid.clone());
        fallbacks
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec2;
    use strata_coords::MapExtent;

    use super::*;
    use crate::mosaic::mosaic_layout;

    fn grid_from(seg: u32, f: impl Fn(usize, usize) -> f32) -> TileGrid {
        let n = seg as usize + 1;
        let values = (0..n).flat_map(|r| (0..n).map(move |c| (r, c))).map(|(r, c)| f(r, c)).collect();
        TileGrid::new(seg, seg, values)
    }

    #[test]
    fn test_edges_and_corners() {
        let g = grid_from(2, |r, c| (r * 10 + c) as f32);
        assert_eq!(g.edge(Edge::Top), [0.0, 1.0, 2.0]);
        assert_eq!(g.edge(Edge::Bottom), [20.0, 21.0, 22.0]);
        assert_eq!(g.edge(Edge::Left), [0.0, 10.0, 20.0]);
        assert_eq!(g.edge(Edge::Right), [2.0, 12.0, 22.0]);
        assert_eq!(g.corner(Corner::BottomRight), 22.0);
    }

    #[test]
    fn test_resample_edge_subset_is_exact() {
        let src = [0.3, 1.7, 2.9, 4.1, 5.3];
        assert_eq!(resample_edge(&src, 3), [0.3, 2.9, 5.3]);
        let up = resample_edge(&[0.0, 2.0], 3);
        assert_eq!(up, [0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_decimate_interpolate() {
        let mut v = [0.0, 9.0, 2.0, 9.0, 4.0];
        decimate_interpolate(&mut v, 2);
        assert_eq!(v, [0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_missing_earlier_neighbor_falls_back() {
        let center = MapExtent::new(DVec2::ZERO, 10.0, 10.0, 0.0).unwrap();
        let tiles = mosaic_layout(&center, 4, 3, 2);
        let mut stitcher = EdgeStitcher::new(&tiles);
        // build the north tile without the center
        let north = tiles[1];
        let mut grid = grid_from(north.seg_x, |_, _| 1.0);
        assert_eq!(stitcher.stitch(&north, &mut grid), 1);
        assert_eq!(grid.values, vec![1.0; 9], "unstitched edge kept");
    }

    #[test]
    fn test_same_roughness_neighbors_share_edges() {
        let center = MapExtent::new(DVec2::ZERO, 10.0, 10.0, 0.0).unwrap();
        let tiles = mosaic_layout(&center, 4, 3, 1);
        let mut stitcher = EdgeStitcher::new(&tiles);
        for (i, t) in tiles.iter().enumerate() {
            let mut g = grid_from(t.seg_x, |r, c| (i * 100 + r * 10 + c) as f32);
            stitcher.stitch(t, &mut g);
        }
        let c = stitcher.built(0, 0).unwrap();
        let e = stitcher.built(1, 0).unwrap();
        assert_eq!(c.edge(Edge::Right), e.edge(Edge::Left));
        let ne = stitcher.built(1, 1).unwrap();
        assert_eq!(ne.corner(Corner::BottomLeft), c.corner(Corner::TopRight));
    }
}
