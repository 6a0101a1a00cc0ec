//! Polygon dissolve and extent clipping.

use geo::BooleanOps;
use strata_coords::MapExtent;

use crate::ring::PolygonZ;

/// Rotated extent rectangle as a `geo` polygon.
pub fn extent_polygon(extent: &MapExtent) -> geo::Polygon<f64> {
    let v = extent.vertices();
    geo::Polygon::new(
        geo::LineString::from(vec![
            (v[0].x, v[0].y),
            (v[1].x, v[1].y),
            (v[2].x, v[2].y),
            (v[3].x, v[3].y),
            (v[0].x, v[0].y),
        ]),
        vec![],
    )
}

/// Union of all non-degenerate polygons.
pub fn dissolve(polygons: &[PolygonZ]) -> geo::MultiPolygon<f64> {
    polygons
        .iter()
        .filter(|p| !p.is_degenerate())
        .fold(geo::MultiPolygon::new(vec![]), |acc, p| {
            acc.union(&geo::MultiPolygon::new(vec![p.to_geo()]))
        })
}

/// Intersect `shape` with a slightly shrunken `extent`, so that clipped
/// edges stay strictly inside the outermost grid cells.
pub fn clip_to_extent(shape: &geo::MultiPolygon<f64>, extent: &MapExtent) -> Vec<PolygonZ> {
    let mut inner = *extent;
    inner.scale(0.9999);
    let frame = geo::MultiPolygon::new(vec![extent_polygon(&inner)]);
    shape
        .intersection(&frame)
        .into_iter()
        .map(|p| PolygonZ::from_geo(&p))
        .filter(|p| !p.is_degenerate() && p.area() > 0.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn square(x0: f64, y0: f64, size: f64) -> PolygonZ {
        PolygonZ::from_2d(
            &[
                DVec2::new(x0, y0),
                DVec2::new(x0 + size, y0),
                DVec2::new(x0 + size, y0 + size),
                DVec2::new(x0, y0 + size),
            ],
            &[],
        )
    }

    #[test]
    fn test_dissolve_merges_overlaps() {
        let merged = dissolve(&[square(0.0, 0.0, 2.0), square(1.0, 0.0, 2.0), square(10.0, 0.0, 1.0)]);
        assert_eq!(merged.0.len(), 2);
        let area: f64 = merged.iter().map(|p| PolygonZ::from_geo(p).area()).sum();
        assert!((area - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_to_rotated_extent() {
        let extent = MapExtent::new(DVec2::ZERO, 2.0, 2.0, 45.0).unwrap();
        let shape = dissolve(&[square(-5.0, -5.0, 10.0)]);
        let clipped = clip_to_extent(&shape, &extent);
        assert_eq!(clipped.len(), 1);
        let expected = 4.0 * 0.9999 * 0.9999;
        assert!((clipped[0].area() - expected).abs() < 1e-6);
        for p in &clipped[0].exterior {
            assert!(extent.contains_point(p.truncate()));
        }
    }

    #[test]
    fn test_clip_outside_is_empty() {
        let extent = MapExtent::new(DVec2::ZERO, 2.0, 2.0, 0.0).unwrap();
        let shape = dissolve(&[square(5.0, 5.0, 1.0)]);
        assert!(clip_to_extent(&shape, &extent).is_empty());
    }
}
