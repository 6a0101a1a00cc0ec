//! Rotated rectangular map extent.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::{ExtentError, GeoTransform, Rect2};

/// Rotate `p` about `origin` by `degrees` (positive = counter-clockwise).
pub fn rotate_point(p: DVec2, degrees: f64, origin: DVec2) -> DVec2 {
    if degrees == 0.0 {
        return p;
    }
    let (s, c) = degrees.to_radians().sin_cos();
    let d = p - origin;
    origin + DVec2::new(d.x * c - d.y * s, d.x * s + d.y * c)
}

/// A rectangle in map space, rotated counter-clockwise about its center.
///
/// Invariants: `width > 0`, `height > 0`, and `rotation` is kept in `[0, 360)`.
/// The extent is immutable for the duration of a build pass; the mutating
/// helpers are meant for setting it up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExtentRepr", into = "ExtentRepr")]
pub struct MapExtent {
    center: DVec2,
    width: f64,
    height: f64,
    rotation: f64,
}

#[derive(Serialize, Deserialize)]
struct ExtentRepr {
    center: [f64; 2],
    width: f64,
    height: f64,
    #[serde(default)]
    rotation: f64,
}

impl TryFrom<ExtentRepr> for MapExtent {
    type Error = ExtentError;

    fn try_from(r: ExtentRepr) -> Result<Self, Self::Error> {
        MapExtent::new(DVec2::from(r.center), r.width, r.height, r.rotation)
    }
}

impl From<MapExtent> for ExtentRepr {
    fn from(e: MapExtent) -> Self {
        Self {
            center: e.center.to_array(),
            width: e.width,
            height: e.height,
            rotation: e.rotation,
        }
    }
}

impl MapExtent {
    /// Create an extent. Rejects non-positive or non-finite sizes.
    pub fn new(center: DVec2, width: f64, height: f64, rotation: f64) -> Result<Self, ExtentError> {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(ExtentError::Degenerate { width, height });
        }
        Ok(Self {
            center,
            width,
            height,
            rotation: normalize_degrees(rotation),
        })
    }

    /// Unrotated extent covering `rect`.
    pub fn from_rect(rect: Rect2) -> Result<Self, ExtentError> {
        Self::new(rect.center(), rect.width(), rect.height(), 0.0)
    }

    pub fn center(&self) -> DVec2 {
        self.center
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Rotation in degrees, counter-clockwise, in `[0, 360)`.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation != 0.0
    }

    /// Rotate the extent by `degrees` about `origin` (or about its own center
    /// when `origin` is `None`). Rotations accumulate.
    pub fn rotate(&mut self, degrees: f64, origin: Option<DVec2>) -> &mut Self {
        if let Some(origin) = origin {
            self.center = rotate_point(self.center, degrees, origin);
        }
        self.rotation = normalize_degrees(self.rotation + degrees);
        self
    }

    /// Scale width and height about the center.
    pub fn scale(&mut self, factor: f64) -> &mut Self {
        debug_assert!(factor > 0.0, "extent scale factor must be positive");
        self.width *= factor;
        self.height *= factor;
        self
    }

    /// The extent with rotation removed, as an axis-aligned rectangle.
    pub fn unrotated_rect(&self) -> Rect2 {
        Rect2::from_center_size(self.center, self.width, self.height)
    }

    /// Corners counter-clockwise starting at the (rotated) bottom-left.
    pub fn vertices(&self) -> [DVec2; 4] {
        let r = self.unrotated_rect();
        [
            DVec2::new(r.min.x, r.min.y),
            DVec2::new(r.max.x, r.min.y),
            DVec2::new(r.max.x, r.max.y),
            DVec2::new(r.min.x, r.max.y),
        ]
        .map(|p| rotate_point(p, self.rotation, self.center))
    }

    /// Axis-aligned box fully containing the rotated rectangle.
    pub fn bounding_box(&self) -> Rect2 {
        if !self.is_rotated() {
            return self.unrotated_rect();
        }
        let (s, c) = self.rotation.to_radians().sin_cos();
        let (s, c) = (s.abs(), c.abs());
        let w = self.width * c + self.height * s;
        let h = self.width * s + self.height * c;
        Rect2::from_center_size(self.center, w, h)
    }

    /// Map point -> extent-local frame (relative to center, rotation undone).
    pub fn to_local(&self, p: DVec2) -> DVec2 {
        rotate_point(p, -self.rotation, self.center) - self.center
    }

    /// Extent-local frame -> map point.
    pub fn from_local(&self, p: DVec2) -> DVec2 {
        rotate_point(p + self.center, self.rotation, self.center)
    }

    /// Map point -> `[0, 1]²` over the extent, x to the right and y upwards.
    pub fn normalize_point(&self, p: DVec2) -> DVec2 {
        let local = self.to_local(p);
        DVec2::new(
            local.x / self.width + 0.5,
            local.y / self.height + 0.5,
        )
    }

    /// Returns true if `p` lies inside or on the boundary of the rotated rectangle.
    pub fn contains_point(&self, p: DVec2) -> bool {
        let n = self.normalize_point(p);
        (0.0..=1.0).contains(&n.x) && (0.0..=1.0).contains(&n.y)
    }

    /// Sub-extent given in normalized coordinates (see [`MapExtent::normalize_point`]).
    /// The result keeps this extent's rotation.
    pub fn subextent(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Result<MapExtent, ExtentError> {
        let local_center = DVec2::new(
            ((x0 + x1) * 0.5 - 0.5) * self.width,
            ((y0 + y1) * 0.5 - 0.5) * self.height,
        );
        MapExtent::new(
            self.from_local(local_center),
            (x1 - x0).abs() * self.width,
            (y1 - y0).abs() * self.height,
            self.rotation,
        )
    }

    /// Same-sized extent shifted by whole tiles in the rotated frame.
    /// `dx` is positive to the right, `dy` positive upwards (north).
    pub fn translated_tile(&self, dx: i32, dy: i32) -> MapExtent {
        let offset = DVec2::new(dx as f64 * self.width, dy as f64 * self.height);
        MapExtent {
            center: self.from_local(offset),
            ..*self
        }
    }

    /// Square extent with the same center, sized by the longer side.
    pub fn square(&self) -> MapExtent {
        let side = self.width.max(self.height);
        MapExtent {
            width: side,
            height: side,
            ..*self
        }
    }

    /// Geotransform for a `cols`×`rows` raster covering this extent.
    ///
    /// With `is_grid_point` the raster's pixel centers sit on a grid whose
    /// point `(0, 0)` is exactly the extent's top-left corner and whose point
    /// `(cols-1, rows-1)` is the bottom-right corner. Tiles built by different
    /// builders over adjacent extents therefore sample identical boundary lines.
    /// Without it the pixels tile the extent edge to edge.
    pub fn geotransform(&self, cols: u32, rows: u32, is_grid_point: bool) -> GeoTransform {
        let r = self.unrotated_rect();
        let (x_res, y_res, top_left) = if is_grid_point {
            let x_res = self.width / cols.saturating_sub(1).max(1) as f64;
            let y_res = self.height / rows.saturating_sub(1).max(1) as f64;
            (
                x_res,
                y_res,
                DVec2::new(r.min.x - x_res * 0.5, r.max.y + y_res * 0.5),
            )
        } else {
            (
                self.width / cols.max(1) as f64,
                self.height / rows.max(1) as f64,
                DVec2::new(r.min.x, r.max.y),
            )
        };

        if !self.is_rotated() {
            return GeoTransform::north_up(top_left, x_res, y_res);
        }

        let ul = rotate_point(top_left, self.rotation, self.center);
        let (s, c) = self.rotation.to_radians().sin_cos();
        GeoTransform([ul.x, x_res * c, y_res * s, ul.y, x_res * s, -y_res * c])
    }
}

fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid can return 360.0 for tiny negative inputs
    if d >= 360.0 { 0.0 } else { d }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn close(a: DVec2, b: DVec2) -> bool {
        (a - b).length() < EPSILON
    }

    #[test]
    fn test_degenerate_extent_rejected() {
        assert!(MapExtent::new(DVec2::ZERO, 0.0, 10.0, 0.0).is_err());
        assert!(MapExtent::new(DVec2::ZERO, 10.0, -1.0, 0.0).is_err());
        assert!(MapExtent::new(DVec2::ZERO, f64::NAN, 1.0, 0.0).is_err());
    }

    #[test]
    fn test_rotation_normalized_mod_360() {
        let mut e = MapExtent::new(DVec2::ZERO, 10.0, 10.0, -30.0).unwrap();
        assert!((e.rotation() - 330.0).abs() < EPSILON);
        e.rotate(45.0, None);
        assert!((e.rotation() - 15.0).abs() < EPSILON);
        e.rotate(345.0, None);
        assert_eq!(e.rotation(), 0.0);
    }

    #[test]
    fn test_rotate_about_origin_moves_center() {
        let mut e = MapExtent::new(DVec2::new(10.0, 0.0), 2.0, 2.0, 0.0).unwrap();
        e.rotate(90.0, Some(DVec2::ZERO));
        assert!(close(e.center(), DVec2::new(0.0, 10.0)), "center {:?}", e.center());
        assert!((e.rotation() - 90.0).abs() < EPSILON);
    }

    #[test]
    fn test_scale_shrinks_in_place() {
        let mut e = MapExtent::new(DVec2::new(5.0, 5.0), 100.0, 50.0, 0.0).unwrap();
        e.scale(0.9999);
        assert!((e.width() - 99.99).abs() < EPSILON);
        assert!((e.height() - 49.995).abs() < EPSILON);
        assert!(close(e.center(), DVec2::new(5.0, 5.0)));
    }

    #[test]
    fn test_bounding_box_of_rotated_extent() {
        let e = MapExtent::new(DVec2::ZERO, 4.0, 2.0, 90.0).unwrap();
        let bb = e.bounding_box();
        assert!((bb.width() - 2.0).abs() < EPSILON);
        assert!((bb.height() - 4.0).abs() < EPSILON);

        let e = MapExtent::new(DVec2::ZERO, 2.0, 2.0, 45.0).unwrap();
        let bb = e.bounding_box();
        let expected = 2.0 * std::f64::consts::SQRT_2;
        assert!((bb.width() - expected).abs() < EPSILON);
        for v in e.vertices() {
            assert!(
                v.x >= bb.min.x - EPSILON
                    && v.x <= bb.max.x + EPSILON
                    && v.y >= bb.min.y - EPSILON
                    && v.y <= bb.max.y + EPSILON,
                "vertex {v:?} outside bounding box"
            );
        }
    }

    #[test]
    fn test_grid_point_geotransform_hits_corners() {
        for rotation in [0.0, 30.0, 200.0] {
            let e = MapExtent::new(DVec2::new(1000.0, 2000.0), 300.0, 200.0, rotation).unwrap();
            let gt = e.geotransform(31, 21, true);
            let [bl, br, tr, tl] = e.vertices();
            assert!(close(gt.pixel_center(0, 0), tl), "rotation {rotation}: top-left");
            assert!(close(gt.pixel_center(30, 0), tr), "rotation {rotation}: top-right");
            assert!(close(gt.pixel_center(30, 20), br), "rotation {rotation}: bottom-right");
            assert!(close(gt.pixel_center(0, 20), bl), "rotation {rotation}: bottom-left");
        }
    }

    #[test]
    fn test_pixel_geotransform_tiles_extent() {
        let e = MapExtent::new(DVec2::new(50.0, 50.0), 100.0, 100.0, 0.0).unwrap();
        let gt = e.geotransform(10, 10, false);
        assert!(close(gt.apply(0.0, 0.0), DVec2::new(0.0, 100.0)));
        assert!(close(gt.apply(10.0, 10.0), DVec2::new(100.0, 0.0)));
    }

    #[test]
    fn test_local_frame_roundtrip() {
        let e = MapExtent::new(DVec2::new(-20.0, 7.0), 40.0, 10.0, 123.0).unwrap();
        let p = DVec2::new(3.5, -8.25);
        assert!(close(e.from_local(e.to_local(p)), p));
    }

    #[test]
    fn test_normalize_point_and_contains() {
        let e = MapExtent::new(DVec2::ZERO, 10.0, 20.0, 90.0).unwrap();
        // After a 90° rotation the extent's local x axis points north.
        let n = e.normalize_point(DVec2::new(0.0, 5.0));
        assert!(close(n, DVec2::new(1.0, 0.5)), "normalized {n:?}");
        assert!(e.contains_point(DVec2::new(-9.0, 4.0)));
        assert!(!e.contains_point(DVec2::new(0.0, 6.0)));
    }

    #[test]
    fn test_translated_tile_shares_edge() {
        let e = MapExtent::new(DVec2::new(100.0, 100.0), 10.0, 20.0, 0.0).unwrap();
        let right = e.translated_tile(1, 0);
        let above = e.translated_tile(0, 1);
        assert!(close(right.center(), DVec2::new(110.0, 100.0)));
        assert!(close(above.center(), DVec2::new(100.0, 120.0)));

        let r = MapExtent::new(DVec2::ZERO, 10.0, 10.0, 90.0).unwrap();
        let next = r.translated_tile(1, 0);
        assert!(close(next.center(), DVec2::new(0.0, 10.0)), "{:?}", next.center());
    }

    #[test]
    fn test_subextent_quadrant() {
        let e = MapExtent::new(DVec2::ZERO, 100.0, 100.0, 0.0).unwrap();
        let q = e.subextent(0.5, 0.5, 1.0, 1.0).unwrap();
        assert!(close(q.center(), DVec2::new(25.0, 25.0)));
        assert!((q.width() - 50.0).abs() < EPSILON);
    }

    #[test]
    fn test_extent_serde_validates() {
        let json = r#"{"center":[1.0,2.0],"width":3.0,"height":4.0,"rotation":370.0}"#;
        let e: MapExtent = serde_json::from_str(json).unwrap();
        assert!((e.rotation() - 10.0).abs() < EPSILON);

        let bad = r#"{"center":[0.0,0.0],"width":0.0,"height":4.0}"#;
        assert!(serde_json::from_str::<MapExtent>(bad).is_err());
    }
}
