//! Texture image requests, rendering seam, and per-pass image dedup.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;
use rustc_hash::FxHashMap;
use strata_coords::MapExtent;

use crate::error::ImageError;
use crate::material::KeyPart;

/// What a texture image shows.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageSource {
    /// The host's current map canvas.
    MapCanvas,
    /// The named layers, drawn in the given order.
    Layers(Vec<String>),
    File(PathBuf),
}

/// One texture to render, `width × height` pixels over `extent`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageRequest {
    pub source: ImageSource,
    pub extent: MapExtent,
    pub width: u32,
    pub height: u32,
    pub transparent_background: bool,
}

impl ImageRequest {
    /// Request whose height follows the extent's aspect ratio.
    pub fn with_width(source: ImageSource, extent: MapExtent, width: u32, transparent_background: bool) -> Self {
        let height = (width as f64 * extent.height() / extent.width()).round().max(1.0) as u32;
        Self {
            source,
            extent,
            width,
            height,
            transparent_background,
        }
    }

    pub(crate) fn key(&self) -> Vec<KeyPart> {
        use KeyPart::{Bits, Text};
        let mut key = match &self.source {
            ImageSource::MapCanvas => vec![Text("canvas".into())],
            ImageSource::Layers(ids) => {
                let mut k = vec![Text("layers".into())];
                k.extend(ids.iter().cloned().map(Text));
                k
            }
            ImageSource::File(path) => vec![Text("file".into()), Text(path.display().to_string())],
        };
        let e = &self.extent;
        key.extend([
            Bits(e.center().x.to_bits()),
            Bits(e.center().y.to_bits()),
            Bits(e.width().to_bits()),
            Bits(e.height().to_bits()),
            Bits(e.rotation().to_bits()),
            Bits(u64::from(self.width)),
            Bits(u64::from(self.height)),
            Bits(u64::from(self.transparent_background)),
        ]);
        key
    }
}

/// Host-side image production. Map and layer images come from the host's
/// map renderer; files are decoded with the `image` crate by default.
pub trait ImageRenderer {
    fn render(&self, request: &ImageRequest) -> Result<RgbaImage, ImageError>;

    fn load_file(&self, path: &Path, width: u32, height: u32) -> Result<RgbaImage, ImageError> {
        let img = image::open(path)?.to_rgba8();
        if img.width() == width && img.height() == height {
            return Ok(img);
        }
        Ok(image::imageops::resize(
            &img,
            width,
            height,
            image::imageops::FilterType::Triangle,
        ))
    }
}

/// Deduplicates texture renders within a pass and caches the rendered image.
#[derive(Default)]
pub struct ImageManager {
    requests: Vec<ImageRequest>,
    lookup: FxHashMap<Vec<KeyPart>, usize>,
    rendered: Vec<Option<RgbaImage>>,
}

impl ImageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Index of `request`, allocating a new one for an unseen request.
    pub fn index_of(&mut self, request: ImageRequest) -> usize {
        let key = request.key();
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.requests.len();
        self.lookup.insert(key, index);
        self.requests.push(request);
        self.rendered.push(None);
        index
    }

    pub fn request(&self, index: usize) -> Option<&ImageRequest> {
        self.requests.get(index)
    }

    /// Rendered image for `index`, rendering on first use.
    pub fn image(&mut self, index: usize, renderer: &dyn ImageRenderer) -> Result<&RgbaImage, ImageError> {
        let request = self.requests.get(index).ok_or(ImageError::UnknownIndex(index))?;
        if request.width == 0 || request.height == 0 {
            return Err(ImageError::EmptySize {
                width: request.width,
                height: request.height,
            });
        }
        let slot = &mut self.rendered[index];
        if slot.is_none() {
            let img = match &request.source {
                ImageSource::File(path) => renderer.load_file(path, request.width, request.height)?,
                ImageSource::MapCanvas | ImageSource::Layers(_) => renderer.render(request)?,
            };
            tracing::debug!(index, width = img.width(), height = img.height(), "rendered image");
            *slot = Some(img);
        }
        slot.as_ref().ok_or(ImageError::UnknownIndex(index))
    }

    /// Write image `index` as PNG to `path`.
    pub fn write(&mut self, index: usize, renderer: &dyn ImageRenderer, path: &Path) -> Result<(), ImageError> {
        let img = self.image(index, renderer)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        img.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    /// Image `index` as a `data:image/png;base64,` URL.
    pub fn data_url(&mut self, index: usize, renderer: &dyn ImageRenderer) -> Result<String, ImageError> {
        let img = self.image(index, renderer)?;
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
        Ok(format!("data:image/png;base64,{}", STANDARD.encode(&png)))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use glam::DVec2;

    /// Fills the image with one colour and counts calls.
    struct SolidRenderer {
        calls: Cell<usize>,
    }

    impl ImageRenderer for SolidRenderer {
        fn render(&self, request: &ImageRequest) -> Result<RgbaImage, ImageError> {
            self.calls.set(self.calls.get() + 1);
            Ok(RgbaImage::from_pixel(request.width, request.height, image::Rgba([10, 20, 30, 255])))
        }
    }

    fn extent() -> MapExtent {
        MapExtent::new(DVec2::ZERO, 200.0, 100.0, 0.0).unwrap()
    }

    #[test]
    fn test_height_follows_aspect_ratio() {
        let r = ImageRequest::with_width(ImageSource::MapCanvas, extent(), 256, false);
        assert_eq!(r.height, 128);
    }

    #[test]
    fn test_identical_requests_share_index() {
        let mut images = ImageManager::new();
        let a = images.index_of(ImageRequest::with_width(ImageSource::MapCanvas, extent(), 64, false));
        let b = images.index_of(ImageRequest::with_width(ImageSource::MapCanvas, extent(), 64, false));
        let c = images.index_of(ImageRequest::with_width(ImageSource::MapCanvas, extent(), 64, true));
        let d = images.index_of(ImageRequest::with_width(
            ImageSource::Layers(vec!["roads".into()]),
            extent(),
            64,
            false,
        ));
        assert_eq!(a, b);
        assert_eq!([a, c, d], [0, 1, 2], "distinct requests get fresh indices");
    }

    #[test]
    fn test_render_once() {
        let renderer = SolidRenderer { calls: Cell::new(0) };
        let mut images = ImageManager::new();
        let i = images.index_of(ImageRequest::with_width(ImageSource::MapCanvas, extent(), 8, false));
        images.image(i, &renderer).unwrap();
        let url = images.data_url(i, &renderer).unwrap();
        assert_eq!(renderer.calls.get(), 1, "image rendered once and cached");
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_write_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img").join("t0.png");
        let renderer = SolidRenderer { calls: Cell::new(0) };
        let mut images = ImageManager::new();
        let i = images.index_of(ImageRequest::with_width(ImageSource::MapCanvas, extent(), 4, false));
        images.write(i, &renderer, &path).unwrap();
        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!((back.width(), back.height()), (4, 2));
        assert_eq!(back.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_unknown_index() {
        let renderer = SolidRenderer { calls: Cell::new(0) };
        let mut images = ImageManager::new();
        assert!(matches!(images.image(3, &renderer), Err(ImageError::UnknownIndex(3))));
    }
}
