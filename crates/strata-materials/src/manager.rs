//! Per-pass material index table with lazy, idempotent builds.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use strata_coords::MapExtent;

use crate::error::MaterialError;
use crate::images::{ImageManager, ImageRenderer, ImageRequest, ImageSource};
use crate::material::{ImageRef, KeyPart, MaterialDescriptor, MaterialRequest, Shading};

/// Assigns stable indices to distinct material requests within one build
/// pass. Indices are monotonic and never reused; there is no eviction.
#[derive(Default)]
pub struct MaterialManager {
    requests: Vec<MaterialRequest>,
    lookup: FxHashMap<Vec<KeyPart>, usize>,
    built: Vec<Option<MaterialDescriptor>>,
    images: ImageManager,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn request(&self, index: usize) -> Option<&MaterialRequest> {
        self.requests.get(index)
    }

    /// Index for `request`; an equal earlier request returns its index.
    pub fn index_of(&mut self, request: MaterialRequest) -> usize {
        let key = request.key();
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }
        let index = self.requests.len();
        self.lookup.insert(key, index);
        self.requests.push(request);
        self.built.push(None);
        index
    }

    pub fn mesh_color_index(&mut self, color: u32, opacity: f32, shading: Shading, double_side: bool) -> usize {
        self.index_of(MaterialRequest::MeshColor {
            color,
            opacity,
            shading,
            double_side,
        })
    }

    pub fn line_index(&mut self, color: u32, opacity: f32, dashed: bool) -> usize {
        self.index_of(MaterialRequest::Line {
            color,
            opacity,
            dashed,
        })
    }

    pub fn point_index(&mut self, color: u32, opacity: f32, size: f32) -> usize {
        self.index_of(MaterialRequest::Point { color, opacity, size })
    }

    pub fn map_image_index(
        &mut self,
        extent: MapExtent,
        width: u32,
        opacity: f32,
        transparent_background: bool,
        shading: Shading,
    ) -> usize {
        let image = ImageRequest::with_width(ImageSource::MapCanvas, extent, width, transparent_background);
        self.index_of(MaterialRequest::MapImage {
            image,
            opacity,
            shading,
        })
    }

    pub fn layer_image_index(
        &mut self,
        layers: Vec<String>,
        extent: MapExtent,
        width: u32,
        opacity: f32,
        transparent_background: bool,
        shading: Shading,
    ) -> usize {
        let image = ImageRequest::with_width(ImageSource::Layers(layers), extent, width, transparent_background);
        self.index_of(MaterialRequest::LayerImage {
            image,
            opacity,
            shading,
        })
    }

    pub fn image_file_index(
        &mut self,
        path: PathBuf,
        extent: MapExtent,
        width: u32,
        opacity: f32,
        transparent_background: bool,
        shading: Shading,
    ) -> usize {
        let image = ImageRequest::with_width(ImageSource::File(path), extent, width, transparent_background);
        self.index_of(MaterialRequest::ImageFile {
            image,
            opacity,
            shading,
        })
    }

    pub fn sprite_index(&mut self, path: PathBuf, opacity: f32, size: f32) -> usize {
        self.index_of(MaterialRequest::Sprite { path, opacity, size })
    }

    /// Build the payload for `index`. Textures are written to `path` and
    /// referenced by `url` when both are given, otherwise embedded as a data
    /// URL. The first successful build is cached and returned by every later
    /// call.
    pub fn build(
        &mut self,
        index: usize,
        renderer: &dyn ImageRenderer,
        path: Option<&Path>,
        url: Option<&str>,
    ) -> Result<MaterialDescriptor, MaterialError> {
        if let Some(Some(done)) = self.built.get(index) {
            return Ok(done.clone());
        }
        let request = self
            .requests
            .get(index)
            .ok_or(MaterialError::UnknownIndex(index))?;

        let mut descriptor = MaterialDescriptor::from_request(request);
        if let Some(image) = request.image() {
            let image_index = self.images.index_of(image.clone());
            descriptor.image = Some(match (path, url) {
                (Some(path), Some(url)) => {
                    self.images.write(image_index, renderer, path)?;
                    ImageRef::Url(url.to_owned())
                }
                _ => ImageRef::Base64(self.images.data_url(image_index, renderer)?),
            });
        } else if let MaterialRequest::Sprite { path: sprite, .. } = request {
            descriptor.image = Some(ImageRef::Url(
                url.map(str::to_owned)
                    .unwrap_or_else(|| sprite.display().to_string()),
            ));
        }

        tracing::debug!(index, kind = ?descriptor.kind, "built material");
        self.built[index] = Some(descriptor.clone());
        Ok(descriptor)
    }

    /// Indices allocated so far, in allocation order.
    pub fn indices(&self) -> std::ops::Range<usize> {
        0..self.requests.len()
    }
}
