//! Vector layer builder: pages features into blocks, then emits the
//! materials the features reference.

use std::path::PathBuf;

use rustc_hash::FxHashMap;
use serde::Serialize;
use strata_config::VectorConfig;
use strata_coords::MapTo3D;
use strata_materials::{ImageRenderer, MaterialManager};
use strata_mesh::GridGeometry;
use strata_scene::{BlockOutput, BuildContext, BuildError, FeatureBlock, MaterialBlock, TaskCursor};

use crate::error::VectorError;
use crate::feature::{AltitudeMode, DEFAULT_COLOR, Feature, PropertyValue, VectorLayer};
use crate::object::{FeaturePayload, ObjectHandlers, ObjectKind, Placement};

pub struct VectorLayerInput<'a> {
    pub layer: VectorLayer,
    pub config: &'a VectorConfig,
    pub map_to_3d: MapTo3D,
    /// DEM surface over the base extent, for DEM-relative kinds.
    pub dem: Option<&'a GridGeometry>,
    /// Interactive preview pass.
    pub preview: bool,
    pub renderer: &'a dyn ImageRenderer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VectorTask {
    /// Features `start..start + count` as block `block`.
    Features { block: usize, start: usize, count: usize },
    Material { index: usize },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VectorBlock {
    Features(FeatureBlock<FeaturePayload>),
    Material(MaterialBlock),
}

impl BlockOutput for VectorBlock {
    fn file_stem(&self) -> String {
        match self {
            Self::Features(b) => b.file_stem(),
            Self::Material(b) => b.file_stem(),
        }
    }
}

/// Task cursor over one vector layer.
pub struct VectorLayerBuilder<'a> {
    layer: VectorLayer,
    handlers: ObjectHandlers,
    fields: FxHashMap<String, usize>,
    export_attributes: bool,
    placement: Placement<'a>,
    renderer: &'a dyn ImageRenderer,
    materials: MaterialManager,
    /// Material index per feature.
    feature_mtl: Vec<usize>,
    page_size: usize,
    tasks: Vec<VectorTask>,
    next: usize,
}

impl<'a> VectorLayerBuilder<'a> {
    /// Check the layer against its style and plan the blocks. A style that
    /// does not fit the layer is a configuration error for this layer only.
    pub fn new(input: VectorLayerInput<'a>) -> Result<Self, BuildError> {
        let VectorLayerInput {
            layer,
            config,
            map_to_3d,
            dem,
            preview,
            renderer,
        } = input;

        let handlers = layer.style.kind.handlers();
        let fields: FxHashMap<String, usize> = layer
            .fields
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();

        let mut materials = MaterialManager::new();
        let feature_mtl = plan_materials(&layer, &handlers, &fields, &mut materials).map_err(|e| {
            tracing::error!(layer = layer.id, "vector style does not fit layer: {e}");
            BuildError::Config(e.to_string())
        })?;

        let style = &layer.style;
        if style.altitude_mode == AltitudeMode::RelativeToDem && dem.is_none() {
            tracing::warn!(layer = layer.id, "no DEM surface, relative altitudes start at zero");
        }

        // overlays draped on the DEM are triangulated per feature; previews
        // show them one at a time
        let one_per_block =
            preview && style.kind == ObjectKind::Overlay && style.altitude_mode == AltitudeMode::RelativeToDem;
        let page_size = if one_per_block { 1 } else { config.page_size.max(1) };

        let mut builder = Self {
            placement: Placement {
                map_to_3d,
                altitude_mode: style.altitude_mode,
                dem,
            },
            layer,
            handlers,
            fields,
            export_attributes: config.export_attributes,
            renderer,
            materials,
            feature_mtl,
            page_size,
            tasks: Vec::new(),
            next: 0,
        };
        builder.plan();
        Ok(builder)
    }

    fn plan(&mut self) {
        let n = self.layer.features.len();
        for (block, start) in (0..n).step_by(self.page_size).enumerate() {
            self.tasks.push(VectorTask::Features {
                block,
                start,
                count: self.page_size.min(n - start),
            });
        }
        self.tasks
            .extend(self.materials.indices().map(|index| VectorTask::Material { index }));
        tracing::debug!(
            layer = self.layer.id,
            features = n,
            page_size = self.page_size,
            tasks = self.tasks.len(),
            "planned vector layer"
        );
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn materials(&self) -> &MaterialManager {
        &self.materials
    }

    fn payload(&self, index: usize, feature: &Feature) -> FeaturePayload {
        let style = &self.layer.style;
        let layer = self.layer.id.as_str();
        // unreadable attributes fall back to zero for this feature only
        let resolve = |value: &PropertyValue, default: f64| {
            value.resolve(&self.fields, feature).unwrap_or_else(|e| {
                tracing::debug!(layer, feature = index, "{e}, using {default}");
                default
            })
        };

        let altitude = resolve(&style.altitude, 0.0);
        let geom = (self.handlers.geometry)(&feature.geometry, &self.placement, altitude);
        if geom.is_empty() {
            tracing::debug!(layer, feature = index, "degenerate feature geometry skipped");
        }
        let z_scale = self.placement.map_to_3d.z_scale;
        FeaturePayload {
            geom,
            mtl: self.feature_mtl[index],
            size: self.handlers.sized.then(|| resolve(&style.size, 1.0)),
            height: self.handlers.tall.then(|| resolve(&style.height, 0.0) * z_scale),
            prop: self.export_attributes.then(|| feature.attributes.clone()),
        }
    }

    fn build_features(&self, block: usize, start: usize, count: usize) -> Result<VectorBlock, BuildError> {
        let features = self
            .layer
            .features
            .get(start..start + count)
            .ok_or_else(|| BuildError::Config(format!("features {start}..{} out of range", start + count)))?;
        let payloads = features
            .iter()
            .enumerate()
            .map(|(i, f)| self.payload(start + i, f))
            .collect();
        Ok(VectorBlock::Features(FeatureBlock::new(&self.layer.id, block, start, payloads)))
    }

    fn build_material(&mut self, index: usize, ctx: &BuildContext) -> Result<VectorBlock, BuildError> {
        let (path, url): (Option<PathBuf>, Option<String>) = if ctx.preview {
            (None, None)
        } else {
            let (p, u) = ctx.companion(&format!("{}_{}.png", self.layer.id, index));
            (Some(p), Some(u))
        };
        let descriptor = self
            .materials
            .build(index, self.renderer, path.as_deref(), url.as_deref())?;
        Ok(VectorBlock::Material(MaterialBlock::new(&self.layer.id, index, descriptor)))
    }
}

/// Geometry class check and material index per feature.
fn plan_materials(
    layer: &VectorLayer,
    handlers: &ObjectHandlers,
    fields: &FxHashMap<String, usize>,
    materials: &mut MaterialManager,
) -> Result<Vec<usize>, VectorError> {
    let style = &layer.style;
    for name in [
        style.color.field(),
        style.altitude.field(),
        style.size.field(),
        style.height.field(),
    ]
    .into_iter()
    .flatten()
    {
        if !fields.contains_key(name) {
            return Err(VectorError::UnknownField(name.to_string()));
        }
    }

    layer
        .features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let found = feature.geometry.class();
            if found != handlers.class {
                return Err(VectorError::GeometryMismatch {
                    index,
                    found,
                    expected: handlers.class,
                });
            }
            let color = style.color.resolve(fields, feature).unwrap_or_else(|e| {
                tracing::debug!(layer = layer.id, feature = index, "{e}, using default color");
                DEFAULT_COLOR
            });
            Ok((handlers.material)(materials, color, style.opacity))
        })
        .collect()
}

impl TaskCursor for VectorLayerBuilder<'_> {
    type Task = VectorTask;
    type Output = VectorBlock;

    fn layer(&self) -> &str {
        &self.layer.id
    }

    fn total(&self) -> usize {
        self.tasks.len()
    }

    fn has_next(&self) -> bool {
        self.next < self.tasks.len()
    }

    fn next_task(&mut self) -> Option<VectorTask> {
        let task = self.tasks.get(self.next).copied()?;
        self.next += 1;
        Some(task)
    }

    fn build(&mut self, task: VectorTask, ctx: &BuildContext) -> Result<VectorBlock, BuildError> {
        match task {
            VectorTask::Features { block, start, count } => self.build_features(block, start, count),
            VectorTask::Material { index } => self.build_material(index, ctx),
        }
    }
}
