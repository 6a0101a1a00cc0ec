//! Map canvas stand-in: elevation shaded through a colour ramp.

use image::{Rgba, RgbaImage};
use strata_materials::{ImageError, ImageRenderer, ImageRequest, ImageSource};
use strata_terrain::ElevationSampler;

/// `(t, rgb)` stops over normalized elevation.
const RAMP: [(f32, [u8; 3]); 5] = [
    (0.0, [38, 115, 77]),
    (0.35, [120, 170, 90]),
    (0.6, [220, 200, 130]),
    (0.8, [150, 110, 80]),
    (1.0, [250, 250, 250]),
];

/// Renders map-canvas images from an elevation sampler. Layer images are not
/// available outside a host map renderer.
pub struct ColorRampRenderer {
    sampler: Box<dyn ElevationSampler>,
}

impl ColorRampRenderer {
    pub fn new(sampler: Box<dyn ElevationSampler>) -> Self {
        Self { sampler }
    }

    pub fn sampler(&self) -> &dyn ElevationSampler {
        self.sampler.as_ref()
    }
}

fn ramp(t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    for pair in RAMP.windows(2) {
        let ((t0, c0), (t1, c1)) = (pair[0], pair[1]);
        if t <= t1 {
            let f = (t - t0) / (t1 - t0);
            return std::array::from_fn(|i| (c0[i] as f32 + (c1[i] as f32 - c0[i] as f32) * f).round() as u8);
        }
    }
    RAMP[RAMP.len() - 1].1
}

impl ImageRenderer for ColorRampRenderer {
    fn render(&self, request: &ImageRequest) -> Result<RgbaImage, ImageError> {
        let (width, height) = (request.width, request.height);
        match &request.source {
            ImageSource::MapCanvas => {}
            ImageSource::Layers(ids) => {
                return Err(ImageError::Render(format!(
                    "no map renderer for layers [{}]",
                    ids.join(", ")
                )));
            }
            ImageSource::File(path) => return self.load_file(path, width, height),
        }
        if width == 0 || height == 0 {
            return Err(ImageError::EmptySize { width, height });
        }

        let gt = request.extent.geotransform(width, height, false);
        let mut values = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            for col in 0..width {
                let p = gt.pixel_center(col, row);
                let v = self
                    .sampler
                    .read_value(p.x, p.y)
                    .map_err(|e| ImageError::Render(e.to_string()))?;
                values.push(v);
            }
        }

        let (lo, hi) = values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        let span = if hi > lo { hi - lo } else { 1.0 };
        tracing::debug!(width, height, lo, hi, "rendered elevation image");
        Ok(RgbaImage::from_fn(width, height, |x, y| {
            let v = values[(y * width + x) as usize];
            let [r, g, b] = ramp((v - lo) / span);
            Rgba([r, g, b, 255])
        }))
    }
}
