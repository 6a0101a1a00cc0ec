//! Raster-aligned grid windows.
//!
//! A [`GridRectangle`] addresses raster pixels by their centers ("grid points"),
//! so a window of `cols` points spans `cols - 1` cells. Adjacent tiles from
//! [`GridRectangle::tiles`] share their boundary column/row.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::{ExtentError, GeoTransform, MapExtent};

/// A window of raster grid points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridRectangle {
    /// Map coordinate of the top-left grid point.
    pub origin: DVec2,
    /// Grid spacing along x (positive).
    pub x_res: f64,
    /// Grid spacing along y (positive, rows go south).
    pub y_res: f64,
    /// Number of grid points per row (>= 1).
    pub cols: u32,
    /// Number of grid points per column (>= 1).
    pub rows: u32,
    /// Column of `origin` within the source raster.
    pub col_offset: u32,
    /// Row of `origin` within the source raster.
    pub row_offset: u32,
}

impl GridRectangle {
    /// Pixel-center window of a north-up raster that falls inside the extent's
    /// bounding box.
    pub fn from_geotransform(
        gt: &GeoTransform,
        raster_cols: u32,
        raster_rows: u32,
        extent: &MapExtent,
    ) -> Result<Self, ExtentError> {
        if !gt.is_north_up() {
            return Err(ExtentError::RotatedGeotransform);
        }
        let x_res = gt.0[1];
        let y_res = -gt.0[5];
        if x_res <= 0.0 || y_res <= 0.0 {
            return Err(ExtentError::ZeroResolution);
        }

        let bbox = extent.bounding_box();
        let col0 = (((bbox.min.x - gt.0[0]) / x_res - 0.5).ceil() as i64).max(0);
        let col1 = (((bbox.max.x - gt.0[0]) / x_res - 0.5).floor() as i64)
            .min(raster_cols as i64 - 1);
        let row0 = (((gt.0[3] - bbox.max.y) / y_res - 0.5).ceil() as i64).max(0);
        let row1 = (((gt.0[3] - bbox.min.y) / y_res - 0.5).floor() as i64)
            .min(raster_rows as i64 - 1);

        let cols = col1 - col0 + 1;
        let rows = row1 - row0 + 1;
        if cols < 2 || rows < 2 {
            return Err(ExtentError::EmptyWindow { cols, rows });
        }

        Ok(Self {
            origin: gt.pixel_center(col0 as u32, row0 as u32),
            x_res,
            y_res,
            cols: cols as u32,
            rows: rows as u32,
            col_offset: col0 as u32,
            row_offset: row0 as u32,
        })
    }

    /// Map coordinate of grid point `(col, row)` relative to this window.
    pub fn point(&self, col: u32, row: u32) -> DVec2 {
        DVec2::new(
            self.origin.x + col as f64 * self.x_res,
            self.origin.y - row as f64 * self.y_res,
        )
    }

    /// Extent whose corners are the window's corner grid points.
    pub fn extent(&self) -> Result<MapExtent, ExtentError> {
        let width = self.cols.saturating_sub(1) as f64 * self.x_res;
        let height = self.rows.saturating_sub(1) as f64 * self.y_res;
        let center = self.origin + DVec2::new(width * 0.5, -height * 0.5);
        MapExtent::new(center, width, height, 0.0)
    }

    /// Number of tiles along x and y when split into `segments`-cell tiles.
    pub fn tile_counts(&self, segments: u32) -> (u32, u32) {
        let segments = segments.max(1);
        (
            self.cols.saturating_sub(1).div_ceil(segments).max(1),
            self.rows.saturating_sub(1).div_ceil(segments).max(1),
        )
    }

    /// Split into tiles of at most `segments` cells per side, row-major from
    /// the top-left. Neighboring tiles share their boundary grid points.
    pub fn tiles(&self, segments: u32) -> Vec<GridRectangle> {
        let segments = segments.max(1);
        let (nx, ny) = self.tile_counts(segments);
        let mut tiles = Vec::with_capacity((nx * ny) as usize);
        for ty in 0..ny {
            let row = ty * segments;
            let rows = segments.min(self.rows.saturating_sub(1) - row) + 1;
            for tx in 0..nx {
                let col = tx * segments;
                let cols = segments.min(self.cols.saturating_sub(1) - col) + 1;
                tiles.push(GridRectangle {
                    origin: self.point(col, row),
                    cols,
                    rows,
                    col_offset: self.col_offset + col,
                    row_offset: self.row_offset + row,
                    ..*self
                });
            }
        }
        tiles
    }
}
