//! Six-term affine transform between raster indices and map coordinates.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Affine raster transform in the usual GDAL term order:
///
/// ```text
/// x = t[0] + col * t[1] + row * t[2]
/// y = t[3] + col * t[4] + row * t[5]
/// ```
///
/// `(col, row) = (0, 0)` is the top-left corner of the top-left pixel, so the
/// center of pixel `(i, j)` is `apply(i + 0.5, j + 0.5)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// North-up transform with square or rectangular pixels.
    pub fn north_up(top_left: DVec2, x_res: f64, y_res: f64) -> Self {
        Self([top_left.x, x_res, 0.0, top_left.y, 0.0, -y_res])
    }

    /// Map coordinate of fractional raster position `(col, row)`.
    pub fn apply(&self, col: f64, row: f64) -> DVec2 {
        let t = &self.0;
        DVec2::new(
            t[0] + col * t[1] + row * t[2],
            t[3] + col * t[4] + row * t[5],
        )
    }

    /// Map coordinate of the center of pixel `(col, row)`.
    pub fn pixel_center(&self, col: u32, row: u32) -> DVec2 {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Returns true when the transform has no rotation or shear terms.
    pub fn is_north_up(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0
    }

    /// Inverse transform (map -> fractional raster position), or `None`
    /// when the transform is singular.
    pub fn inverse(&self) -> Option<GeoTransform> {
        let t = &self.0;
        let det = t[1] * t[5] - t[2] * t[4];
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv_det = 1.0 / det;
        let a = t[5] * inv_det;
        let b = -t[2] * inv_det;
        let d = -t[4] * inv_det;
        let e = t[1] * inv_det;
        Some(GeoTransform([
            -(a * t[0] + b * t[3]),
            a,
            b,
            -(d * t[0] + e * t[3]),
            d,
            e,
        ]))
    }

    /// Pixel size along the column and row directions.
    pub fn resolution(&self) -> (f64, f64) {
        let t = &self.0;
        (t[1].hypot(t[4]), t[2].hypot(t[5]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_pixel_center_is_half_cell_in() {
        let gt = GeoTransform::north_up(DVec2::new(100.0, 200.0), 10.0, 5.0);
        let c = gt.pixel_center(0, 0);
        assert!((c.x - 105.0).abs() < EPSILON);
        assert!((c.y - 197.5).abs() < EPSILON);
    }

    #[test]
    fn test_inverse_roundtrips_points() {
        let gt = GeoTransform([500.0, 2.0, 0.5, 1000.0, -0.25, -3.0]);
        let inv = gt.inverse().unwrap();
        for &(col, row) in &[(0.0, 0.0), (12.5, 3.25), (-4.0, 99.0)] {
            let p = gt.apply(col, row);
            let back = inv.apply(p.x, p.y);
            assert!(
                (back.x - col).abs() < EPSILON && (back.y - row).abs() < EPSILON,
                "({col}, {row}) came back as {back:?}"
            );
        }
    }

    #[test]
    fn test_singular_transform_has_no_inverse() {
        let gt = GeoTransform([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(gt.inverse().is_none());
    }

    #[test]
    fn test_north_up_detection() {
        assert!(GeoTransform::north_up(DVec2::ZERO, 1.0, 1.0).is_north_up());
        assert!(!GeoTransform([0.0, 1.0, 0.1, 0.0, 0.0, -1.0]).is_north_up());
    }
}
