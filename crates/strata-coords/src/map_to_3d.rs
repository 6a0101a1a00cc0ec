//! Map-to-scene coordinate transform.

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Translates map coordinates to the scene origin and applies the vertical
/// exaggeration. Only Z is scaled; x/y keep map units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapTo3D {
    /// Scene origin in map coordinates (z in elevation units).
    pub origin: DVec3,
    /// Vertical exaggeration factor.
    pub z_scale: f64,
}

impl Default for MapTo3D {
    fn default() -> Self {
        Self {
            origin: DVec3::ZERO,
            z_scale: 1.0,
        }
    }
}

impl MapTo3D {
    pub fn new(origin: DVec3, z_scale: f64) -> Self {
        Self { origin, z_scale }
    }

    /// Map `(x, y, z)` -> scene coordinates.
    pub fn transform(&self, x: f64, y: f64, z: f64) -> DVec3 {
        DVec3::new(
            x - self.origin.x,
            y - self.origin.y,
            (z - self.origin.z) * self.z_scale,
        )
    }

    pub fn transform_point(&self, p: DVec3) -> DVec3 {
        self.transform(p.x, p.y, p.z)
    }

    /// Horizontal part of [`MapTo3D::transform`].
    pub fn transform_xy(&self, p: DVec2) -> DVec2 {
        DVec2::new(p.x - self.origin.x, p.y - self.origin.y)
    }

    /// Scene coordinates -> map `(x, y, z)`.
    pub fn inverse_transform(&self, p: DVec3) -> DVec3 {
        let z = if self.z_scale == 0.0 {
            self.origin.z
        } else {
            p.z / self.z_scale + self.origin.z
        };
        DVec3::new(p.x + self.origin.x, p.y + self.origin.y, z)
    }

    /// Vertical shift a renderer adds to raw elevations before scaling them
    /// by `z_scale`.
    pub fn z_shift(&self) -> f64 {
        -self.origin.z
    }
}
