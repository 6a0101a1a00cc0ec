//! Elevation samplers: read grids of elevation values over an extent.

use std::path::Path;

use glam::DVec2;
use strata_coords::{GeoTransform, MapExtent};

use crate::error::SamplerError;

/// Resampling policy for reads between raster pixel centers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Resample {
    /// Value of the containing pixel.
    Nearest,
    /// Bilinear between the four surrounding pixel centers.
    #[default]
    Bilinear,
}

/// Source of elevation values.
///
/// Grids are `width × height` points, row 0 along the extent's top edge,
/// with the corner points exactly on the extent's corners.
pub trait ElevationSampler {
    fn read_values(&self, width: u32, height: u32, extent: &MapExtent) -> Result<Vec<f32>, SamplerError>;

    /// [`read_values`](Self::read_values) as little-endian `f32` bytes.
    fn read(&self, width: u32, height: u32, extent: &MapExtent) -> Result<Vec<u8>, SamplerError> {
        Ok(self
            .read_values(width, height, extent)?
            .into_iter()
            .flat_map(f32::to_le_bytes)
            .collect())
    }

    /// Elevation at one map point.
    fn read_value(&self, x: f64, y: f64) -> Result<f32, SamplerError>;

    fn set_resample(&mut self, mode: Resample);

    fn resample(&self) -> Resample;

    /// Geotransform and size of the native raster, for samplers that can
    /// read exact pixels.
    fn native_grid(&self) -> Option<(GeoTransform, u32, u32)> {
        None
    }

    /// Independent copy, so one opened source can serve several consumers.
    fn clone_box(&self) -> Box<dyn ElevationSampler>;
}

fn grid_points(width: u32, height: u32, extent: &MapExtent) -> Result<impl Iterator<Item = DVec2>, SamplerError> {
    if width < 2 || height < 2 {
        return Err(SamplerError::EmptyRequest { width, height });
    }
    let gt = extent.geotransform(width, height, true);
    Ok((0..height).flat_map(move |row| (0..width).map(move |col| gt.pixel_center(col, row))))
}

// ---------------------------------------------------------------------------
// FlatSampler
// ---------------------------------------------------------------------------

/// Returns one constant everywhere.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlatSampler {
    value: f32,
    resample: Resample,
}

impl FlatSampler {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            resample: Resample::default(),
        }
    }
}

impl ElevationSampler for FlatSampler {
    fn read_values(&self, width: u32, height: u32, extent: &MapExtent) -> Result<Vec<f32>, SamplerError> {
        Ok(grid_points(width, height, extent)?.map(|_| self.value).collect())
    }

    fn read_value(&self, _x: f64, _y: f64) -> Result<f32, SamplerError> {
        Ok(self.value)
    }

    fn set_resample(&mut self, mode: Resample) {
        self.resample = mode;
    }

    fn resample(&self) -> Resample {
        self.resample
    }

    fn clone_box(&self) -> Box<dyn ElevationSampler> {
        Box::new(*self)
    }
}

// ---------------------------------------------------------------------------
// RasterSampler
// ---------------------------------------------------------------------------

/// In-memory single-band raster. Nodata pixels and points off the raster
/// read as `0`.
#[derive(Clone, Debug)]
pub struct RasterSampler {
    values: Vec<f32>,
    cols: u32,
    rows: u32,
    gt: GeoTransform,
    inverse: GeoTransform,
    nodata: Option<f32>,
    resample: Resample,
}

impl RasterSampler {
    pub fn new(
        values: Vec<f32>,
        cols: u32,
        rows: u32,
        gt: GeoTransform,
        nodata: Option<f32>,
    ) -> Result<Self, SamplerError> {
        let expected = cols as usize * rows as usize;
        if values.len() != expected || expected == 0 {
            return Err(SamplerError::SizeMismatch {
                expected,
                actual: values.len(),
            });
        }
        let inverse = gt.inverse().ok_or(SamplerError::SingularGeotransform)?;
        Ok(Self {
            values,
            cols,
            rows,
            gt,
            inverse,
            nodata,
            resample: Resample::default(),
        })
    }

    /// Load a headerless raster of row-major little-endian `f32` values.
    pub fn from_raw_file(
        path: &Path,
        cols: u32,
        rows: u32,
        gt: GeoTransform,
        nodata: Option<f32>,
    ) -> Result<Self, SamplerError> {
        let bytes = std::fs::read(path)?;
        if bytes.len() % 4 != 0 {
            return Err(SamplerError::SizeMismatch {
                expected: cols as usize * rows as usize * 4,
                actual: bytes.len(),
            });
        }
        let values = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Self::new(values, cols, rows, gt, nodata)
    }

    pub fn geotransform(&self) -> &GeoTransform {
        &self.gt
    }

    fn pixel(&self, col: u32, row: u32) -> f32 {
        let v = self.values[(row * self.cols + col) as usize];
        match self.nodata {
            Some(nd) if v == nd => 0.0,
            _ if v.is_nan() => 0.0,
            _ => v,
        }
    }

    fn sample(&self, p: DVec2) -> f32 {
        let r = self.inverse.apply(p.x, p.y);
        let (cols, rows) = (self.cols as f64, self.rows as f64);
        if !(0.0..=cols).contains(&r.x) || !(0.0..=rows).contains(&r.y) {
            return 0.0;
        }
        match self.resample {
            Resample::Nearest => {
                let col = (r.x.floor() as u32).min(self.cols - 1);
                let row = (r.y.floor() as u32).min(self.rows - 1);
                self.pixel(col, row)
            }
            Resample::Bilinear => {
                let u = (r.x - 0.5).clamp(0.0, cols - 1.0);
                let v = (r.y - 0.5).clamp(0.0, rows - 1.0);
                let c0 = (u.floor() as u32).min(self.cols.saturating_sub(2));
                let r0 = (v.floor() as u32).min(self.rows.saturating_sub(2));
                let c1 = (c0 + 1).min(self.cols - 1);
                let r1 = (r0 + 1).min(self.rows - 1);
                let fx = (u - c0 as f64) as f32;
                let fy = (v - r0 as f64) as f32;
                let top = self.pixel(c0, r0) + (self.pixel(c1, r0) - self.pixel(c0, r0)) * fx;
                let bottom = self.pixel(c0, r1) + (self.pixel(c1, r1) - self.pixel(c0, r1)) * fx;
                top + (bottom - top) * fy
            }
        }
    }
}

impl ElevationSampler for RasterSampler {
    fn read_values(&self, width: u32, height: u32, extent: &MapExtent) -> Result<Vec<f32>, SamplerError> {
        Ok(grid_points(width, height, extent)?.map(|p| self.sample(p)).collect())
    }

    fn read_value(&self, x: f64, y: f64) -> Result<f32, SamplerError> {
        Ok(self.sample(DVec2::new(x, y)))
    }

    fn set_resample(&mut self, mode: Resample) {
        self.resample = mode;
    }

    fn resample(&self) -> Resample {
        self.resample
    }

    fn native_grid(&self) -> Option<(GeoTransform, u32, u32)> {
        Some((self.gt, self.cols, self.rows))
    }

    fn clone_box(&self) -> Box<dyn ElevationSampler> {
        Box::new(self.clone())
    }
}

/// Open a raw raster, or fall back to a flat sampler at `flat_value` when it
/// cannot be read. The failure is logged; the pass goes on.
pub fn open_or_flat(
    path: &Path,
    cols: u32,
    rows: u32,
    gt: GeoTransform,
    nodata: Option<f32>,
    flat_value: f32,
) -> Box<dyn ElevationSampler> {
    match RasterSampler::from_raw_file(path, cols, rows, gt, nodata) {
        Ok(sampler) => Box::new(sampler),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                "cannot open elevation raster ({e}), using flat value {flat_value}"
            );
            Box::new(FlatSampler::new(flat_value))
        }
    }
}
