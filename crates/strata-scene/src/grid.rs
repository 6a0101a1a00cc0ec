//! Elevation grid payloads: row-major `f32`, inline, base64, or companion file.

use std::borrow::Cow;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use strata_config::GridEncoding;

use crate::context::BuildContext;
use crate::error::BuildError;

/// Grid values in one of the three encodings.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GridData {
    Array(Vec<f32>),
    /// Base64 of little-endian `f32` values.
    Binary(String),
    /// Relative URL of a `.bin` file of little-endian `f32` values.
    Url(String),
}

/// `{width, height, array | binary | url}`, where width and height count
/// grid points.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GridPayload {
    pub width: u32,
    pub height: u32,
    #[serde(flatten)]
    pub data: GridData,
}

fn le_bytes(values: &[f32]) -> Cow<'_, [u8]> {
    if cfg!(target_endian = "little") {
        Cow::Borrowed(bytemuck::cast_slice(values))
    } else {
        Cow::Owned(values.iter().flat_map(|v| v.to_le_bytes()).collect())
    }
}

fn from_le_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

/// Encode `values` (`width × height` grid points, row 0 north) per the
/// context's encoding. The `Url` encoding writes `<file_stem>.bin` into the
/// output directory.
pub fn encode_grid(
    values: Vec<f32>,
    width: u32,
    height: u32,
    ctx: &BuildContext,
    file_stem: &str,
) -> Result<GridPayload, BuildError> {
    debug_assert_eq!(values.len(), (width * height) as usize);
    let data = match ctx.grid_encoding {
        GridEncoding::Array => GridData::Array(values),
        GridEncoding::Binary => GridData::Binary(STANDARD.encode(le_bytes(&values))),
        GridEncoding::Url => {
            let (path, url) = ctx.companion(&format!("{file_stem}.bin"));
            std::fs::create_dir_all(&ctx.output_dir)?;
            std::fs::write(&path, le_bytes(&values))?;
            GridData::Url(url)
        }
    };
    Ok(GridPayload {
        width,
        height,
        data,
    })
}

impl GridData {
    /// Decoded values. `base_dir` resolves `Url` payloads.
    pub fn decode(&self, base_dir: &Path) -> Result<Vec<f32>, BuildError> {
        match self {
            Self::Array(values) => Ok(values.clone()),
            Self::Binary(text) => {
                let bytes = STANDARD
                    .decode(text)
                    .map_err(|e| BuildError::Config(format!("bad base64 grid: {e}")))?;
                Ok(from_le_bytes(&bytes))
            }
            Self::Url(url) => {
                let name = url.trim_start_matches("./");
                Ok(from_le_bytes(&std::fs::read(base_dir.join(name))?))
            }
        }
    }
}
