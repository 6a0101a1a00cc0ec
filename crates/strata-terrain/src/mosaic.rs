//! Resampled mosaic layout: a center tile plus concentric surrounding tiles.

use strata_coords::MapExtent;

/// Side of a tile grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right];

    pub fn opposite(self) -> Edge {
        match self {
            Edge::Top => Edge::Bottom,
            Edge::Bottom => Edge::Top,
            Edge::Left => Edge::Right,
            Edge::Right => Edge::Left,
        }
    }

    /// Tile offset `(dx, dy)` of the neighbor across this edge (`dy` north-positive).
    pub fn offset(self) -> (i32, i32) {
        match self {
            Edge::Top => (0, 1),
            Edge::Bottom => (0, -1),
            Edge::Left => (-1, 0),
            Edge::Right => (1, 0),
        }
    }
}

/// Corner grid point of a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }

    /// Offset of the diagonal neighbor sharing only this corner.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Corner::TopLeft => (-1, 1),
            Corner::TopRight => (1, 1),
            Corner::BottomLeft => (-1, -1),
            Corner::BottomRight => (1, -1),
        }
    }
}

/// One tile of a mosaic.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileSpec {
    /// Tile column offset from the center, positive to the right.
    pub dx: i32,
    /// Tile row offset from the center, positive to the north.
    pub dy: i32,
    /// Decimation factor relative to the center tile.
    pub roughness: u32,
    pub seg_x: u32,
    pub seg_y: u32,
    pub extent: MapExtent,
}

impl TileSpec {
    pub fn is_center(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }

    /// Grid points per row.
    pub fn cols(&self) -> u32 {
        self.seg_x + 1
    }

    /// Grid points per column.
    pub fn rows(&self) -> u32 {
        self.seg_y + 1
    }
}

/// Tiles of a `size × size` mosaic around `center`, in build order: by
/// squared distance from the center, then north to south, then west to east.
///
/// The center gets `grid_segments` segments along its longer side, both axes
/// rounded up to a multiple of `roughness`; every other tile gets the center
/// segment counts divided by `roughness`.
pub fn mosaic_layout(center: &MapExtent, grid_segments: u32, size: u32, roughness: u32) -> Vec<TileSpec> {
    let roughness = roughness.max(1);
    let (w, h) = (center.width(), center.height());
    let (sx, sy) = if w >= h {
        (grid_segments, (grid_segments as f64 * h / w).round() as u32)
    } else {
        ((grid_segments as f64 * w / h).round() as u32, grid_segments)
    };
    let round_up = |s: u32| s.max(1).div_ceil(roughness) * roughness;
    let (sx, sy) = (round_up(sx), round_up(sy));

    let half = (size.max(1) / 2) as i32;
    let mut tiles = Vec::with_capacity((size.max(1) * size.max(1)) as usize);
    for dy in -half..=half {
        for dx in -half..=half {
            let (r, seg_x, seg_y) = if dx == 0 && dy == 0 {
                (1, sx, sy)
            } else {
                (roughness, sx / roughness, sy / roughness)
            };
            tiles.push(TileSpec {
                dx,
                dy,
                roughness: r,
                seg_x,
                seg_y,
                extent: center.translated_tile(dx, dy),
            });
        }
    }
    tiles.sort_by_key(|t| (t.dx * t.dx + t.dy * t.dy, -t.dy, t.dx));
    tiles
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::*;

    fn center() -> MapExtent {
        MapExtent::new(DVec2::new(500.0, 500.0), 1000.0, 1000.0, 0.0).unwrap()
    }

    #[test]
    fn test_single_tile() {
        let tiles = mosaic_layout(&center(), 256, 1, 1);
        assert_eq!(tiles.len(), 1);
        assert!(tiles[0].is_center());
        assert_eq!((tiles[0].seg_x, tiles[0].seg_y), (256, 256));
    }

    #[test]
    fn test_order_by_distance_then_row_then_column() {
        let tiles = mosaic_layout(&center(), 100, 3, 2);
        let order: Vec<(i32, i32)> = tiles.iter().map(|t| (t.dx, t.dy)).collect();
        assert_eq!(
            order,
            [(0, 0), (0, 1), (-1, 0), (1, 0), (0, -1), (-1, 1), (1, 1), (-1, -1), (1, -1)]
        );
    }

    #[test]
    fn test_roughness_segments() {
        let tiles = mosaic_layout(&center(), 101, 3, 2);
        let c = &tiles[0];
        assert_eq!(c.seg_x, 102, "center rounded up to a multiple of roughness");
        for t in &tiles[1..] {
            assert_eq!(t.roughness, 2);
            assert_eq!(t.cols(), (c.cols() - 1) / 2 + 1);
        }
    }

    #[test]
    fn test_surrounding_extents_tile_the_plane() {
        let tiles = mosaic_layout(&center(), 64, 3, 1);
        let north = tiles.iter().find(|t| (t.dx, t.dy) == (0, 1)).unwrap();
        assert_eq!(north.extent.center(), DVec2::new(500.0, 1500.0));
    }

    #[test]
    fn test_non_square_center() {
        let extent = MapExtent::new(DVec2::ZERO, 2000.0, 1000.0, 0.0).unwrap();
        let tiles = mosaic_layout(&extent, 256, 1, 1);
        assert_eq!((tiles[0].seg_x, tiles[0].seg_y), (256, 128));
    }

    #[test]
    fn test_edge_and_corner_offsets() {
        for e in Edge::ALL {
            let (dx, dy) = e.offset();
            let (ox, oy) = e.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
        for c in Corner::ALL {
            assert_eq!(c.opposite().opposite(), c);
        }
    }
}
