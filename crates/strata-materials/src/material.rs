//! Material requests and the descriptors they build into.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::images::ImageRequest;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Surface shading model for mesh materials.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shading {
    #[default]
    Lambert,
    Phong,
    /// Unlit.
    Basic,
}

/// A material requested by a block builder. Two requests that compare equal
/// field by field share one index within a pass.
#[derive(Clone, Debug, PartialEq)]
pub enum MaterialRequest {
    /// Solid-colour mesh material. `color` is `0xRRGGBB`.
    MeshColor {
        color: u32,
        opacity: f32,
        shading: Shading,
        double_side: bool,
    },
    Line {
        color: u32,
        opacity: f32,
        dashed: bool,
    },
    Point {
        color: u32,
        opacity: f32,
        size: f32,
    },
    /// Texture rendered from the map canvas over an extent.
    MapImage {
        image: ImageRequest,
        opacity: f32,
        shading: Shading,
    },
    /// Texture rendered from a chosen set of layers.
    LayerImage {
        image: ImageRequest,
        opacity: f32,
        shading: Shading,
    },
    /// Texture loaded from an image file.
    ImageFile {
        image: ImageRequest,
        opacity: f32,
        shading: Shading,
    },
    Sprite {
        path: PathBuf,
        opacity: f32,
        size: f32,
    },
}

/// Hashable identity of a request: floats by bit pattern.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum KeyPart {
    Bits(u64),
    Text(String),
}

impl MaterialRequest {
    pub fn material_type(&self) -> MaterialType {
        match self {
            Self::MeshColor { shading, .. }
            | Self::MapImage { shading, .. }
            | Self::LayerImage { shading, .. }
            | Self::ImageFile { shading, .. } => match shading {
                Shading::Lambert => MaterialType::MeshLambert,
                Shading::Phong => MaterialType::MeshPhong,
                Shading::Basic => MaterialType::MeshBasic,
            },
            Self::Line { dashed: false, .. } => MaterialType::LineBasic,
            Self::Line { dashed: true, .. } => MaterialType::LineDashed,
            Self::Point { .. } => MaterialType::Point,
            Self::Sprite { .. } => MaterialType::Sprite,
        }
    }

    pub fn opacity(&self) -> f32 {
        match self {
            Self::MeshColor { opacity, .. }
            | Self::Line { opacity, .. }
            | Self::Point { opacity, .. }
            | Self::MapImage { opacity, .. }
            | Self::LayerImage { opacity, .. }
            | Self::ImageFile { opacity, .. }
            | Self::Sprite { opacity, .. } => *opacity,
        }
    }

    pub fn image(&self) -> Option<&ImageRequest> {
        match self {
            Self::MapImage { image, .. }
            | Self::LayerImage { image, .. }
            | Self::ImageFile { image, .. } => Some(image),
            _ => None,
        }
    }

    pub(crate) fn key(&self) -> Vec<KeyPart> {
        use KeyPart::{Bits, Text};
        let f = |v: f32| Bits(u64::from(v.to_bits()));
        let mut key = vec![Text(format!("{:?}", self.material_type()))];
        match self {
            Self::MeshColor {
                color,
                opacity,
                double_side,
                ..
            } => key.extend([Bits(u64::from(*color)), f(*opacity), Bits(u64::from(*double_side))]),
            Self::Line { color, opacity, .. } => key.extend([Bits(u64::from(*color)), f(*opacity)]),
            Self::Point {
                color,
                opacity,
                size,
            } => key.extend([Bits(u64::from(*color)), f(*opacity), f(*size)]),
            Self::MapImage { image, opacity, .. }
            | Self::LayerImage { image, opacity, .. }
            | Self::ImageFile { image, opacity, .. } => {
                key.push(f(*opacity));
                key.extend(image.key());
            }
            Self::Sprite {
                path,
                opacity,
                size,
            } => key.extend([Text(path.display().to_string()), f(*opacity), f(*size)]),
        }
        key
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Renderer-side material class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MaterialType {
    MeshLambert,
    MeshPhong,
    MeshBasic,
    LineBasic,
    LineDashed,
    Point,
    Sprite,
}

/// Where a texture lives: a companion file or inline data.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRef {
    Url(String),
    /// `data:image/png;base64,...`
    Base64(String),
}

/// Built material payload, in wire form.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MaterialDescriptor {
    #[serde(rename = "type")]
    pub kind: MaterialType,
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(rename = "o")]
    pub opacity: f32,
    #[serde(rename = "t", skip_serializing_if = "is_false")]
    pub transparent: bool,
    #[serde(rename = "ds", skip_serializing_if = "is_false")]
    pub double_side: bool,
    #[serde(rename = "s", skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl MaterialDescriptor {
    /// Descriptor for everything except the texture reference.
    pub(crate) fn from_request(request: &MaterialRequest) -> Self {
        let opacity = request.opacity();
        let mut d = Self {
            kind: request.material_type(),
            color: None,
            opacity,
            transparent: opacity < 1.0,
            double_side: false,
            size: None,
            image: None,
        };
        match request {
            MaterialRequest::MeshColor {
                color, double_side, ..
            } => {
                d.color = Some(*color);
                d.double_side = *double_side;
            }
            MaterialRequest::Line { color, .. } => d.color = Some(*color),
            MaterialRequest::Point { color, size, .. } => {
                d.color = Some(*color);
                d.size = Some(*size);
            }
            MaterialRequest::MapImage { image, .. }
            | MaterialRequest::LayerImage { image, .. }
            | MaterialRequest::ImageFile { image, .. } => {
                d.transparent |= image.transparent_background;
            }
            MaterialRequest::Sprite { size, .. } => {
                d.size = Some(*size);
                d.transparent = true;
            }
        }
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_follows_shading_and_dash() {
        let mesh = MaterialRequest::MeshColor {
            color: 0xff0000,
            opacity: 1.0,
            shading: Shading::Phong,
            double_side: false,
        };
        assert_eq!(mesh.material_type(), MaterialType::MeshPhong);
        let line = MaterialRequest::Line {
            color: 0,
            opacity: 1.0,
            dashed: true,
        };
        assert_eq!(line.material_type(), MaterialType::LineDashed);
    }

    #[test]
    fn test_descriptor_wire_names() {
        let d = MaterialDescriptor::from_request(&MaterialRequest::MeshColor {
            color: 0x00ff00,
            opacity: 0.5,
            shading: Shading::Lambert,
            double_side: true,
        });
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["type"], "meshLambert");
        assert_eq!(json["c"], 0x00ff00);
        assert_eq!(json["o"], 0.5);
        assert_eq!(json["t"], true);
        assert_eq!(json["ds"], true);
        assert!(json.get("image").is_none(), "no texture on a colour material");
    }

    #[test]
    fn test_opaque_descriptor_omits_flags() {
        let d = MaterialDescriptor::from_request(&MaterialRequest::Line {
            color: 1,
            opacity: 1.0,
            dashed: false,
        });
        let json = serde_json::to_value(&d).unwrap();
        assert!(json.get("t").is_none());
        assert!(json.get("ds").is_none());
    }
}
