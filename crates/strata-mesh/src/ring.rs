//! Polygon rings with per-vertex Z, orientation helpers, and `geo` conversions.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};
use strata_coords::Rect2;

/// An open ring: the closing vertex is not repeated.
pub type Ring = Vec<DVec3>;

/// Signed area of a ring projected on the XY plane. Positive for
/// counter-clockwise rings, negative for clockwise ones.
pub fn signed_area(ring: &[DVec3]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

pub fn is_ccw(ring: &[DVec3]) -> bool {
    signed_area(ring) > 0.0
}

/// Reverse the ring in place if its winding differs from the requested one.
pub fn orient_ring(ring: &mut [DVec3], ccw: bool) {
    let area = signed_area(ring);
    if (ccw && area < 0.0) || (!ccw && area > 0.0) {
        ring.reverse();
    }
}

/// Drop the repeated closing vertex and consecutive duplicates.
fn clean_ring(mut ring: Ring) -> Ring {
    ring.dedup_by(|b, a| a.x == b.x && a.y == b.y);
    while ring.len() > 1 && ring.first().map(|p| (p.x, p.y)) == ring.last().map(|p| (p.x, p.y)) {
        ring.pop();
    }
    ring
}

/// Polygon with holes. Vertices carry their own Z.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonZ {
    pub exterior: Ring,
    #[serde(default)]
    pub interiors: Vec<Ring>,
}

impl PolygonZ {
    /// Build a polygon, removing closing and duplicate vertices. Holes left
    /// with fewer than three vertices are dropped.
    pub fn new(exterior: Ring, interiors: Vec<Ring>) -> Self {
        Self {
            exterior: clean_ring(exterior),
            interiors: interiors
                .into_iter()
                .map(clean_ring)
                .filter(|r| r.len() >= 3)
                .collect(),
        }
    }

    /// Polygon from 2-D rings at `z = 0`.
    pub fn from_2d(exterior: &[DVec2], interiors: &[Vec<DVec2>]) -> Self {
        let lift = |r: &[DVec2]| r.iter().map(|p| p.extend(0.0)).collect::<Ring>();
        Self::new(lift(exterior), interiors.iter().map(|r| lift(r.as_slice())).collect())
    }

    /// Fewer than three usable exterior vertices.
    pub fn is_degenerate(&self) -> bool {
        self.exterior.len() < 3
    }

    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    pub fn vertex_count(&self) -> usize {
        self.rings().map(Vec::len).sum()
    }

    /// Copy with the exterior counter-clockwise and every hole clockwise.
    pub fn oriented(&self) -> PolygonZ {
        let mut out = self.clone();
        out.orient();
        out
    }

    pub fn orient(&mut self) {
        orient_ring(&mut self.exterior, true);
        for hole in &mut self.interiors {
            orient_ring(hole, false);
        }
    }

    /// Exterior area minus hole areas, in XY.
    pub fn area(&self) -> f64 {
        signed_area(&self.exterior).abs()
            - self
                .interiors
                .iter()
                .map(|r| signed_area(r).abs())
                .sum::<f64>()
    }

    /// Area-weighted centroid in XY, or `None` for a zero-area polygon.
    pub fn centroid(&self) -> Option<DVec2> {
        use geo::Centroid;
        self.to_geo()
            .centroid()
            .map(|p| DVec2::new(p.x(), p.y()))
    }

    pub fn bounding_rect(&self) -> Option<Rect2> {
        let mut it = self.exterior.iter();
        let first = it.next()?.truncate();
        let (min, max) = it.fold((first, first), |(min, max), p| {
            (min.min(p.truncate()), max.max(p.truncate()))
        });
        Some(Rect2 { min, max })
    }

    /// Apply `f` to every vertex.
    pub fn map_points(&self, mut f: impl FnMut(DVec3) -> DVec3) -> PolygonZ {
        PolygonZ {
            exterior: self.exterior.iter().map(|&p| f(p)).collect(),
            interiors: self
                .interiors
                .iter()
                .map(|r| r.iter().map(|&p| f(p)).collect())
                .collect(),
        }
    }

    /// 2-D `geo` polygon (Z dropped).
    pub fn to_geo(&self) -> geo::Polygon<f64> {
        let ring = |r: &Ring| {
            geo::LineString::from(r.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>())
        };
        geo::Polygon::new(ring(&self.exterior), self.interiors.iter().map(ring).collect())
    }

    /// Polygon from a `geo` polygon at `z = 0`.
    pub fn from_geo(p: &geo::Polygon<f64>) -> PolygonZ {
        let ring = |ls: &geo::LineString<f64>| {
            ls.coords().map(|c| DVec3::new(c.x, c.y, 0.0)).collect::<Ring>()
        };
        PolygonZ::new(ring(p.exterior()), p.interiors().iter().map(ring).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(ccw: bool) -> Ring {
        let mut r = vec![
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        if !ccw {
            r.reverse();
        }
        r
    }

    #[test]
    fn test_signed_area_sign_follows_winding() {
        assert!((signed_area(&square(true)) - 1.0).abs() < 1e-12);
        assert!((signed_area(&square(false)) + 1.0).abs() < 1e-12);
        assert_eq!(signed_area(&square(true)[..2]), 0.0);
    }

    #[test]
    fn test_orient_forces_exterior_ccw_holes_cw() {
        let hole = vec![
            DVec3::new(0.25, 0.25, 0.0),
            DVec3::new(0.75, 0.25, 0.0),
            DVec3::new(0.75, 0.75, 0.0),
            DVec3::new(0.25, 0.75, 0.0),
        ];
        let p = PolygonZ::new(square(false), vec![hole]).oriented();
        assert!(signed_area(&p.exterior) > 0.0);
        assert!(signed_area(&p.interiors[0]) < 0.0);
        assert!((p.area() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_closing_vertex_and_duplicates_removed() {
        let mut r = square(true);
        r.insert(1, r[0]);
        r.push(r[0]);
        let p = PolygonZ::new(r, vec![vec![DVec3::ZERO, DVec3::X]]);
        assert_eq!(p.exterior.len(), 4);
        assert!(p.interiors.is_empty(), "two-vertex hole must be dropped");
    }

    #[test]
    fn test_geo_roundtrip_keeps_shape() {
        let p = PolygonZ::new(square(true), vec![]);
        let back = PolygonZ::from_geo(&p.to_geo());
        assert_eq!(back.exterior.len(), 4);
        assert!((back.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_centroid_of_square() {
        let c = PolygonZ::new(square(true), vec![]).centroid().unwrap();
        assert!((c - DVec2::new(0.5, 0.5)).length() < 1e-12);
    }
}
