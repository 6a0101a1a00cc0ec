//! One build pass over a manifest: the DEM layer, then each vector layer.

use std::path::Path;

use strata_config::Config;
use strata_coords::MapExtent;
use strata_mesh::GridGeometry;
use strata_scene::{BuildContext, PassReport, TaskCursor, run_pass, write_block};
use strata_terrain::{DemLayerBuilder, DemLayerInput, ElevationSampler, FlatSampler, TileSpec, mosaic_layout};
use strata_vector::{AltitudeMode, VectorLayerBuilder, VectorLayerInput};

use crate::error::AppError;
use crate::manifest::Manifest;
use crate::render::ColorRampRenderer;

/// Totals over all layers of a pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub layers: usize,
    /// Layers rejected by a configuration error.
    pub skipped_layers: usize,
    pub blocks: usize,
    pub warnings: usize,
    pub cancelled: bool,
}

impl ExportSummary {
    fn add(&mut self, report: PassReport) {
        self.layers += 1;
        self.blocks += report.built;
        self.warnings += report.warnings;
        self.cancelled |= report.cancelled;
    }
}

fn run_layer<C: TaskCursor>(cursor: &mut C, ctx: &BuildContext) -> PassReport {
    tracing::info!(layer = cursor.layer(), tasks = cursor.total(), "building layer");
    run_pass(cursor, ctx, |block| write_block(&block, &ctx.output_dir).map(|_| ()))
}

/// DEM surface over the base extent at the center tile's resolution, for
/// draping DEM-relative vector objects. An unreadable surface is flat at
/// `flat_value`.
fn dem_surface(
    sampler: &dyn ElevationSampler,
    extent: &MapExtent,
    grid_segments: u32,
    flat_value: f32,
) -> Result<GridGeometry, AppError> {
    let (seg_x, seg_y) = mosaic_layout(extent, grid_segments, 1, 1)
        .into_iter()
        .find(TileSpec::is_center)
        .map_or((grid_segments, grid_segments), |t| (t.seg_x, t.seg_y));
    let surface = match sampler.read_values(seg_x + 1, seg_y + 1, extent) {
        Ok(values) => GridGeometry::new(*extent, seg_x, seg_y, values)?,
        Err(e) => {
            tracing::warn!("cannot read DEM surface ({e}), draping on flat value {flat_value}");
            GridGeometry::flat(*extent, seg_x, seg_y, flat_value)?
        }
    };
    Ok(surface)
}

/// Build every layer of `manifest` into `ctx.output_dir`. Relative raster
/// paths resolve against `base_dir`. Failures inside a layer are counted
/// in the summary; only an unusable manifest is an error.
pub fn run_export(
    config: &Config,
    manifest: &Manifest,
    base_dir: &Path,
    ctx: &BuildContext,
) -> Result<ExportSummary, AppError> {
    let extent = manifest.base_extent.to_extent()?;
    let map_to_3d = manifest.map_to_3d();
    let flat_value = config.dem.flat_value;
    let sampler: Box<dyn ElevationSampler> = match &manifest.dem {
        Some(src) => src.open(base_dir, flat_value),
        None => Box::new(FlatSampler::new(flat_value)),
    };
    let renderer = ColorRampRenderer::new(sampler.clone_box());
    let mut summary = ExportSummary::default();

    if let Some(src) = &manifest.dem {
        let clip = config
            .dem
            .clip_layer
            .as_deref()
            .and_then(|id| manifest.clip_polygons(id));
        let input = DemLayerInput {
            layer: src.id.clone(),
            config: &config.dem,
            sampler,
            base_extent: extent,
            map_to_3d,
            clip,
            renderer: &renderer,
        };
        match DemLayerBuilder::new(input) {
            Ok(mut builder) => summary.add(run_layer(&mut builder, ctx)),
            Err(_) => summary.skipped_layers += 1,
        }
    }

    let needs_surface = manifest
        .vector_layers
        .iter()
        .any(|l| l.style.altitude_mode == AltitudeMode::RelativeToDem);
    let surface = match needs_surface {
        true => Some(dem_surface(
            renderer.sampler(),
            &extent,
            config.dem.grid_segments,
            flat_value,
        )?),
        false => None,
    };

    for layer in &manifest.vector_layers {
        if ctx.is_cancelled() {
            summary.cancelled = true;
            break;
        }
        let input = VectorLayerInput {
            layer: layer.clone(),
            config: &config.vector,
            map_to_3d,
            dem: surface.as_ref(),
            preview: ctx.preview,
            renderer: &renderer,
        };
        match VectorLayerBuilder::new(input) {
            Ok(mut builder) => summary.add(run_layer(&mut builder, ctx)),
            Err(_) => summary.skipped_layers += 1,
        }
    }

    tracing::info!(
        layers = summary.layers,
        skipped = summary.skipped_layers,
        blocks = summary.blocks,
        warnings = summary.warnings,
        cancelled = summary.cancelled,
        "export finished"
    );
    Ok(summary)
}
