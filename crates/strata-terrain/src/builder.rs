//! DEM layer builder: plans the tile/material task sequence and builds each
//! task on demand.

use std::path::PathBuf;

use glam::DVec3;
use serde::Serialize;
use strata_config::{DemConfig, MaterialSource, Tiling};
use strata_coords::{GridRectangle, MapExtent, MapTo3D};
use strata_materials::{ImageRenderer, MaterialManager, Shading};
use strata_mesh::{GridGeometry, PolygonZ, TinMesh, clip_to_extent, dissolve};
use strata_scene::{
    BlockKind, BlockOutput, BuildContext, BuildError, ClippedGeometry, DemBlock, MaterialBlock,
    MaterialRef, SidesRef, TaskCursor, encode_grid,
};

use crate::mosaic::{TileSpec, mosaic_layout};
use crate::sampler::{ElevationSampler, Resample};
use crate::stitch::{EdgeStitcher, TileGrid};

/// Everything a DEM layer pass needs from the orchestrator.
pub struct DemLayerInput<'a> {
    pub layer: String,
    pub config: &'a DemConfig,
    pub sampler: Box<dyn ElevationSampler>,
    pub base_extent: MapExtent,
    pub map_to_3d: MapTo3D,
    /// Polygons of the configured clip layer, in map coordinates.
    pub clip: Option<Vec<PolygonZ>>,
    pub renderer: &'a dyn ImageRenderer,
}

/// One unit of DEM work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemTask {
    /// Surface material `material` (index into the configured materials) of `tile`.
    SurfaceMaterial { tile: usize, material: usize },
    SidesMaterial,
    EdgesMaterial,
    WireframeMaterial,
    Grid { tile: usize },
}

/// Output of a DEM task.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TerrainBlock {
    Dem(DemBlock),
    Material(MaterialBlock),
}

impl BlockOutput for TerrainBlock {
    fn file_stem(&self) -> String {
        match self {
            Self::Dem(b) => b.file_stem(),
            Self::Material(b) => b.file_stem(),
        }
    }
}

enum Layout {
    Native(Vec<GridRectangle>),
    Mosaic {
        tiles: Vec<TileSpec>,
        stitcher: EdgeStitcher,
    },
}

#[derive(Default)]
struct AuxMaterials {
    sides: Option<usize>,
    edges: Option<usize>,
    wireframe: Option<usize>,
}

/// Task cursor over one DEM layer.
pub struct DemLayerBuilder<'a> {
    layer: String,
    config: DemConfig,
    sampler: Box<dyn ElevationSampler>,
    map_to_3d: MapTo3D,
    layout: Layout,
    clip: Option<Vec<PolygonZ>>,
    materials: MaterialManager,
    renderer: &'a dyn ImageRenderer,
    aux: AuxMaterials,
    tasks: Vec<DemTask>,
    next: usize,
}

impl<'a> DemLayerBuilder<'a> {
    /// Plan the layer. Configuration errors (rotated extent with native
    /// tiling, missing clip layer) are logged and returned; the caller skips
    /// this layer and continues with the others.
    pub fn new(input: DemLayerInput<'a>) -> Result<Self, BuildError> {
        let DemLayerInput {
            layer,
            config,
            mut sampler,
            base_extent,
            map_to_3d,
            clip,
            renderer,
        } = input;

        let clip = match (&config.clip_layer, clip) {
            (None, _) => None,
            (Some(name), None) => {
                tracing::error!(layer, clip_layer = name, "clip layer not found, skipping terrain");
                return Err(BuildError::Config(format!("clip layer `{name}` not found")));
            }
            (Some(_), Some(polygons)) => Some(clip_to_extent(&dissolve(&polygons), &base_extent)),
        };

        let layout = match (config.tiling, sampler.native_grid()) {
            (Tiling::Original, Some((gt, cols, rows))) => {
                if base_extent.is_rotated() {
                    tracing::error!(
                        layer,
                        rotation = base_extent.rotation(),
                        "native-resolution tiling needs an unrotated extent, skipping terrain"
                    );
                    return Err(BuildError::Config(format!(
                        "extent rotated by {} degrees cannot be tiled at native resolution",
                        base_extent.rotation()
                    )));
                }
                sampler.set_resample(Resample::Nearest);
                let window = GridRectangle::from_geotransform(&gt, cols, rows, &base_extent)
                    .map_err(|e| BuildError::Config(e.to_string()))?;
                Layout::Native(window.tiles(config.tile_segments))
            }
            (tiling, _) => {
                if tiling == Tiling::Original {
                    tracing::warn!(layer, "elevation source cannot read native pixels, resampling");
                }
                sampler.set_resample(Resample::Bilinear);
                let size = if clip.is_some() {
                    1
                } else {
                    config.surroundings.size
                };
                let tiles = mosaic_layout(
                    &base_extent,
                    config.grid_segments,
                    size,
                    config.surroundings.roughness,
                );
                let stitcher = EdgeStitcher::new(&tiles);
                Layout::Mosaic { tiles, stitcher }
            }
        };

        let mut builder = Self {
            layer,
            config: config.clone(),
            sampler,
            map_to_3d,
            layout,
            clip,
            materials: MaterialManager::new(),
            renderer,
            aux: AuxMaterials::default(),
            tasks: Vec::new(),
            next: 0,
        };
        builder.plan().inspect_err(|e| {
            tracing::error!(layer = builder.layer, "cannot plan terrain: {e}");
        })?;
        Ok(builder)
    }

    /// Queue the tasks and allocate every material index in task order, so
    /// indices do not depend on the order tasks are built in.
    fn plan(&mut self) -> Result<(), BuildError> {
        let cfg = &self.config;
        if let Some(sides) = &cfg.sides {
            self.aux.sides = Some(self.materials.mesh_color_index(sides.color, 1.0, Shading::Lambert, false));
            self.tasks.push(DemTask::SidesMaterial);
        }
        if let Some(edges) = &cfg.edges {
            self.aux.edges = Some(self.materials.line_index(edges.color, edges.opacity, false));
            self.tasks.push(DemTask::EdgesMaterial);
        }
        if let Some(wireframe) = &cfg.wireframe {
            self.aux.wireframe = Some(self.materials.line_index(wireframe.color, wireframe.opacity, false));
            self.tasks.push(DemTask::WireframeMaterial);
        }

        let has_materials = !cfg.materials.is_empty();
        for tile in 0..self.tile_count() {
            if has_materials {
                self.tasks.push(DemTask::SurfaceMaterial {
                    tile,
                    material: cfg.current_material,
                });
            }
            if !cfg.material_only {
                self.tasks.push(DemTask::Grid { tile });
            }
            if cfg.all_materials {
                for material in (0..cfg.materials.len()).filter(|&m| m != cfg.current_material) {
                    self.tasks.push(DemTask::SurfaceMaterial { tile, material });
                }
            }
        }
        let surface: Vec<(usize, usize)> = self
            .tasks
            .iter()
            .filter_map(|t| match *t {
                DemTask::SurfaceMaterial { tile, material } => Some((tile, material)),
                _ => None,
            })
            .collect();
        for (tile, material) in surface {
            self.surface_material_index(tile, material)?;
        }
        tracing::debug!(layer = self.layer, tiles = self.tile_count(), tasks = self.tasks.len(), "planned terrain");
        Ok(())
    }

    pub fn tile_count(&self) -> usize {
        match &self.layout {
            Layout::Native(tiles) => tiles.len(),
            Layout::Mosaic { tiles, .. } => tiles.len(),
        }
    }

    /// Tiles of a resampled mosaic, in build order.
    pub fn mosaic_tiles(&self) -> Option<&[TileSpec]> {
        match &self.layout {
            Layout::Mosaic { tiles, .. } => Some(tiles),
            Layout::Native(_) => None,
        }
    }

    pub fn materials(&self) -> &MaterialManager {
        &self.materials
    }

    /// Extent and grid point counts of `tile`.
    fn tile_grid(&self, tile: usize) -> Result<(MapExtent, u32, u32), BuildError> {
        match &self.layout {
            Layout::Native(tiles) => {
                let rect = tiles
                    .get(tile)
                    .ok_or_else(|| BuildError::Config(format!("no tile {tile}")))?;
                let extent = rect.extent().map_err(|e| BuildError::Config(e.to_string()))?;
                Ok((extent, rect.cols, rect.rows))
            }
            Layout::Mosaic { tiles, .. } => {
                let spec = tiles
                    .get(tile)
                    .ok_or_else(|| BuildError::Config(format!("no tile {tile}")))?;
                Ok((spec.extent, spec.cols(), spec.rows()))
            }
        }
    }

    /// Tiles that carry sides, edges and wireframe: the mosaic center, or
    /// every native tile.
    fn is_primary(&self, tile: usize) -> bool {
        match &self.layout {
            Layout::Native(_) => true,
            Layout::Mosaic { tiles, .. } => tiles.get(tile).is_some_and(TileSpec::is_center),
        }
    }

    fn surface_material_index(&mut self, tile: usize, material: usize) -> Result<usize, BuildError> {
        let (extent, _, _) = self.tile_grid(tile)?;
        let cfg = self
            .config
            .materials
            .get(material)
            .ok_or_else(|| BuildError::Config(format!("no material {material}")))?;
        let shading = if cfg.shading {
            Shading::Lambert
        } else {
            Shading::Basic
        };
        let (w, opacity, transparent) = (cfg.image_width, cfg.opacity, cfg.transparent_background);
        Ok(match &cfg.source {
            MaterialSource::Color(color) => self.materials.mesh_color_index(*color, opacity, shading, false),
            MaterialSource::MapCanvas => self.materials.map_image_index(extent, w, opacity, transparent, shading),
            MaterialSource::Layers(ids) => {
                self.materials
                    .layer_image_index(ids.clone(), extent, w, opacity, transparent, shading)
            }
            MaterialSource::File(path) => {
                self.materials
                    .image_file_index(path.clone(), extent, w, opacity, transparent, shading)
            }
        })
    }

    fn build_material(&mut self, index: usize, ctx: &BuildContext) -> Result<TerrainBlock, BuildError> {
        let (path, url): (Option<PathBuf>, Option<String>) = if ctx.preview {
            (None, None)
        } else {
            let (p, u) = ctx.companion(&format!("{}_{}.png", self.layer, index));
            (Some(p), Some(u))
        };
        let descriptor = self
            .materials
            .build(index, self.renderer, path.as_deref(), url.as_deref())?;
        Ok(TerrainBlock::Material(MaterialBlock::new(&self.layer, index, descriptor)))
    }

    fn build_grid(&mut self, tile: usize, ctx: &BuildContext) -> Result<TerrainBlock, BuildError> {
        let (extent, cols, rows) = self.tile_grid(tile)?;
        let mut values = self.sampler.read_values(cols, rows, &extent).unwrap_or_else(|e| {
            let flat = self.config.flat_value;
            tracing::warn!(layer = self.layer, tile, "cannot read elevation ({e}), tile is flat at {flat}");
            vec![flat; cols as usize * rows as usize]
        });

        if let Layout::Mosaic { tiles, stitcher } = &mut self.layout {
            let spec = tiles[tile];
            let mut grid = TileGrid::new(spec.seg_x, spec.seg_y, values);
            stitcher.stitch(&spec, &mut grid);
            values = grid.values;
        }

        let mtl = match self.config.materials.is_empty() {
            true => None,
            false => Some(self.surface_material_index(tile, self.config.current_material)?),
        };
        let primary = self.is_primary(tile);
        let translate = self.map_to_3d.transform_xy(extent.center());
        let mut block = DemBlock {
            kind: BlockKind::Block,
            layer: self.layer.clone(),
            block: tile,
            width: extent.width(),
            height: extent.height(),
            translate: [translate.x, translate.y, 0.0],
            rotation: extent.rotation(),
            z_scale: self.map_to_3d.z_scale,
            z_shift: self.map_to_3d.z_shift(),
            mtl,
            grid: None,
            geom: None,
            sides: None,
            edges: None,
            wireframe: None,
        };
        if primary {
            block.sides = self.aux.sides.zip(self.config.sides.as_ref()).map(|(mtl, s)| SidesRef {
                mtl,
                bottom: s.bottom,
            });
            block.edges = self.aux.edges.map(|mtl| MaterialRef { mtl });
            block.wireframe = self.aux.wireframe.map(|mtl| MaterialRef { mtl });
        }

        match (&self.clip, primary && matches!(self.layout, Layout::Mosaic { .. })) {
            (Some(polygons), true) => {
                block.geom = Some(self.clipped_geometry(polygons, extent, cols, rows, values)?);
            }
            _ => {
                let stem = format!("{}_{}", self.layer, tile);
                block.grid = Some(encode_grid(values, cols, rows, ctx, &stem)?);
            }
        }
        Ok(TerrainBlock::Dem(block))
    }

    /// Terrain of the center tile clipped to the clip polygons. Vertices are
    /// relative to the block center in the extent's unrotated frame, with
    /// z already shifted and scaled.
    fn clipped_geometry(
        &self,
        polygons: &[PolygonZ],
        extent: MapExtent,
        cols: u32,
        rows: u32,
        values: Vec<f32>,
    ) -> Result<ClippedGeometry, BuildError> {
        let grid = GridGeometry::new(extent, cols - 1, rows - 1, values)?;
        let m = self.map_to_3d;
        let to_block = |p: DVec3| {
            let l = extent.to_local(p.truncate());
            DVec3::new(l.x, l.y, m.transform(p.x, p.y, p.z).z)
        };

        let mut mesh = TinMesh::default();
        for polygon in polygons {
            mesh.append(grid.triangulate_polygon(polygon, &to_block));
        }
        if mesh.skipped > 0 {
            tracing::debug!(layer = self.layer, skipped = mesh.skipped, "clip fragments skipped");
        }
        let outlines = mesh
            .boundaries
            .iter()
            .map(|rings| {
                rings
                    .iter()
                    .map(|ring| {
                        let mut pts: Vec<[f64; 3]> = ring.iter().map(|p| p.to_array()).collect();
                        if let Some(&first) = pts.first() {
                            pts.push(first);
                        }
                        pts
                    })
                    .collect()
            })
            .collect();
        Ok(ClippedGeometry {
            triangles: mesh.to_indexed(false),
            polygons: outlines,
        })
    }
}

impl TaskCursor for DemLayerBuilder<'_> {
    type Task = DemTask;
    type Output = TerrainBlock;

    fn layer(&self) -> &str {
        &self.layer
    }

    fn total(&self) -> usize {
        self.tasks.len()
    }

    fn has_next(&self) -> bool {
        self.next < self.tasks.len()
    }

    fn next_task(&mut self) -> Option<DemTask> {
        let task = self.tasks.get(self.next).copied()?;
        self.next += 1;
        Some(task)
    }

    fn build(&mut self, task: DemTask, ctx: &BuildContext) -> Result<TerrainBlock, BuildError> {
        match task {
            DemTask::SurfaceMaterial { tile, material } => {
                let index = self.surface_material_index(tile, material)?;
                self.build_material(index, ctx)
            }
            DemTask::SidesMaterial | DemTask::EdgesMaterial | DemTask::WireframeMaterial => {
                let index = match task {
                    DemTask::SidesMaterial => self.aux.sides,
                    DemTask::EdgesMaterial => self.aux.edges,
                    _ => self.aux.wireframe,
                }
                .ok_or_else(|| BuildError::Config("material not planned".into()))?;
                self.build_material(index, ctx)
            }
            DemTask::Grid { tile } => self.build_grid(tile, ctx),
        }
    }
}
