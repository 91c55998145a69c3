use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::import::{self, ImportError, ImportedMap};
use crate::math::Vec2;
use crate::render::camera::{Camera2D, Viewport};
use crate::render::compositor::IntermediateSurface;
use crate::render::transform::screen_to_world_px;
use crate::render::visibility::{visible_tile_rect, VisibilityState};

use super::atlas::TileAtlas;
use super::layer::{Layer, TileId, EMPTY_TILE};
use super::topology::{GridGeometry, Topology};

/// Layer roles, by index. Bounded maps carry four layers and use the
/// decoration layer as their foreground pass; Toroidal maps add a fifth
/// foreground layer that draws over entities.
pub const LAYER_BACKGROUND: usize = 0;
pub const LAYER_GROUND: usize = 1;
pub const LAYER_BLOCKING: usize = 2;
pub const LAYER_DECOR: usize = 3;
pub const LAYER_FOREGROUND: usize = 4;

pub const MAX_LAYERS: usize = 5;
pub const BOUNDED_LAYER_COUNT: usize = 4;
pub const TOROIDAL_LAYER_COUNT: usize = 5;

pub fn expected_layer_count(topology: Topology) -> usize {
    match topology {
        Topology::Bounded => BOUNDED_LAYER_COUNT,
        Topology::Toroidal => TOROIDAL_LAYER_COUNT,
    }
}

#[derive(Debug, Error)]
pub enum WorldInitError {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("expected {expected} layers for {topology:?} topology, got {actual}")]
    LayerCount {
        topology: Topology,
        expected: usize,
        actual: usize,
    },
    #[error("layer {index} is {width}x{height} tiles, world is {world_width}x{world_height}")]
    LayerSizeMismatch {
        index: usize,
        width: u32,
        height: u32,
        world_width: u32,
        world_height: u32,
    },
    #[error("world has zero extent: {width}x{height} tiles, tile size {tile_size}px")]
    ZeroExtent {
        width: u32,
        height: u32,
        tile_size: u32,
    },
}

/// The active tile world: grid geometry, up to five read-only layers, the
/// atlas lookup, one visibility cache per layer and (Toroidal only, once
/// rendering starts) the intermediate surface.
///
/// Owned by the active scene and passed by reference to every query; there
/// is no ambient global instance. Buckets and the surface are released on
/// drop.
#[derive(Debug)]
pub struct TilemapWorld {
    geometry: GridGeometry,
    layers: Vec<Layer>,
    atlas: TileAtlas,
    visibility: Vec<VisibilityState>,
    surface: Option<IntermediateSurface>,
}

impl TilemapWorld {
    /// Load a map folder through the importer and build the world.
    /// Failure leaves nothing partially initialized behind.
    pub fn init(folder: &Path, topology: Topology) -> Result<Self, WorldInitError> {
        let imported = import::load_map_folder(folder, topology)?;
        Self::from_imported(imported, topology)
    }

    /// Build a world from already-imported data. This is the importer
    /// boundary: tests and custom importers enter here.
    pub fn from_imported(imported: ImportedMap, topology: Topology) -> Result<Self, WorldInitError> {
        let expected = expected_layer_count(topology);
        if imported.layers.len() != expected {
            return Err(WorldInitError::LayerCount {
                topology,
                expected,
                actual: imported.layers.len(),
            });
        }
        if imported.width_tiles == 0 || imported.height_tiles == 0 || imported.tile_size_px == 0 {
            return Err(WorldInitError::ZeroExtent {
                width: imported.width_tiles,
                height: imported.height_tiles,
                tile_size: imported.tile_size_px,
            });
        }
        for (index, layer) in imported.layers.iter().enumerate() {
            if layer.width() != imported.width_tiles || layer.height() != imported.height_tiles {
                return Err(WorldInitError::LayerSizeMismatch {
                    index,
                    width: layer.width(),
                    height: layer.height(),
                    world_width: imported.width_tiles,
                    world_height: imported.height_tiles,
                });
            }
        }

        let geometry = GridGeometry::new(
            imported.width_tiles,
            imported.height_tiles,
            imported.tile_size_px,
            topology,
        );
        let visibility = imported
            .layers
            .iter()
            .map(|_| VisibilityState::default())
            .collect();
        info!(
            width_tiles = imported.width_tiles,
            height_tiles = imported.height_tiles,
            tile_size_px = imported.tile_size_px,
            layers = imported.layers.len(),
            pages = imported.atlas.page_count(),
            topology = ?topology,
            "world_initialized"
        );
        Ok(Self {
            geometry,
            layers: imported.layers,
            atlas: imported.atlas,
            visibility,
            surface: None,
        })
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn topology(&self) -> Topology {
        self.geometry.topology()
    }

    pub fn atlas(&self) -> &TileAtlas {
        &self.atlas
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Index of the layer drawn over entities.
    pub fn foreground_layer(&self) -> usize {
        match self.topology() {
            Topology::Bounded => LAYER_DECOR,
            Topology::Toroidal => LAYER_FOREGROUND,
        }
    }

    /// Tile on `layer_index` at an unbounded tile coordinate, resolved
    /// through the topology. Out-of-range layer indices and invalid layers
    /// answer the empty sentinel, never an error.
    pub fn tile_at(&self, layer_index: usize, tx: i32, ty: i32) -> TileId {
        let Some(layer) = self.layers.get(layer_index) else {
            return EMPTY_TILE;
        };
        if !layer.is_valid() {
            return EMPTY_TILE;
        }
        let (x, y) = self.geometry.resolve_tile(tx, ty);
        layer.tile_at(x, y)
    }

    /// Tile at a world-pixel position.
    pub fn tile_at_world(&self, layer_index: usize, world: Vec2) -> TileId {
        let tx = self.geometry.tile_of_px(world.x);
        let ty = self.geometry.tile_of_px(world.y);
        self.tile_at(layer_index, tx, ty)
    }

    /// Highest non-empty layer under a screen point, for depth/occlusion
    /// decisions such as shadow placement.
    pub fn highest_layer_at(
        &self,
        camera: &Camera2D,
        viewport: Viewport,
        screen_px: Vec2,
    ) -> Option<usize> {
        let world = screen_to_world_px(camera, viewport, screen_px);
        (0..self.layers.len())
            .rev()
            .find(|&index| self.tile_at_world(index, world) != EMPTY_TILE)
    }

    /// Recompute bucket state for every layer whose integer visible rect
    /// changed. Cheap when the camera has not crossed a tile boundary.
    pub fn update_visibility(&mut self, camera: &Camera2D, viewport: Viewport) {
        let rect = visible_tile_rect(&self.geometry, camera, viewport);
        for (layer, state) in self.layers.iter().zip(self.visibility.iter_mut()) {
            state.update(layer, &self.geometry, &self.atlas, rect);
        }
    }

    pub fn visibility(&self, layer_index: usize) -> Option<&VisibilityState> {
        self.visibility.get(layer_index)
    }

    pub(crate) fn take_surface(&mut self) -> Option<IntermediateSurface> {
        self.surface.take()
    }

    pub(crate) fn store_surface(&mut self, surface: IntermediateSurface) {
        self.surface = Some(surface);
    }

    pub fn surface(&self) -> Option<&IntermediateSurface> {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut IntermediateSurface> {
        self.surface.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::import::ImportedMap;
    use crate::map::atlas::{AtlasEntry, TexelRect};

    fn blank_layers(count: usize) -> Vec<Layer> {
        (0..count)
            .map(|_| Layer::dense(8, 8, vec![0; 64]).expect("layer"))
            .collect()
    }

    fn imported(layers: Vec<Layer>) -> ImportedMap {
        ImportedMap {
            width_tiles: 8,
            height_tiles: 8,
            tile_size_px: 16,
            layers,
            atlas: TileAtlas::default(),
        }
    }

    #[test]
    fn layer_count_must_match_topology() {
        let error = TilemapWorld::from_imported(imported(blank_layers(4)), Topology::Toroidal)
            .unwrap_err();
        assert!(matches!(
            error,
            WorldInitError::LayerCount {
                expected: 5,
                actual: 4,
                ..
            }
        ));
        assert!(TilemapWorld::from_imported(imported(blank_layers(4)), Topology::Bounded).is_ok());
    }

    #[test]
    fn mismatched_layer_size_is_rejected() {
        let mut layers = blank_layers(4);
        layers[2] = Layer::dense(4, 8, vec![0; 32]).expect("layer");
        let error =
            TilemapWorld::from_imported(imported(layers), Topology::Bounded).unwrap_err();
        assert!(matches!(
            error,
            WorldInitError::LayerSizeMismatch { index: 2, .. }
        ));
    }

    #[test]
    fn out_of_range_layer_index_answers_empty() {
        let world =
            TilemapWorld::from_imported(imported(blank_layers(4)), Topology::Bounded).expect("world");
        assert_eq!(world.tile_at(17, 0, 0), EMPTY_TILE);
    }

    #[test]
    fn foreground_layer_depends_on_topology() {
        let bounded =
            TilemapWorld::from_imported(imported(blank_layers(4)), Topology::Bounded).expect("world");
        assert_eq!(bounded.foreground_layer(), LAYER_DECOR);
        let toroidal = TilemapWorld::from_imported(imported(blank_layers(5)), Topology::Toroidal)
            .expect("world");
        assert_eq!(toroidal.foreground_layer(), LAYER_FOREGROUND);
    }

    #[test]
    fn highest_layer_scans_top_down() {
        let mut layers = blank_layers(5);
        let mut ground = vec![0u8; 64];
        ground[0] = 1;
        layers[LAYER_GROUND] = Layer::dense(8, 8, ground).expect("layer");
        let mut decor = HashMap::new();
        decor.insert((0u32, 0u32), 2 as TileId);
        layers[LAYER_DECOR] = Layer::sparse(8, 8, decor).expect("layer");
        let world =
            TilemapWorld::from_imported(imported(layers), Topology::Toroidal).expect("world");

        let camera = Camera2D {
            position: Vec2::new(8.0, 8.0),
            zoom: 1.0,
        };
        let viewport = Viewport {
            width: 64,
            height: 64,
        };
        // Viewport center sits over tile (0, 0).
        let center = Vec2::new(32.0, 32.0);
        assert_eq!(
            world.highest_layer_at(&camera, viewport, center),
            Some(LAYER_DECOR)
        );
    }

    #[test]
    fn update_visibility_short_circuits_on_stable_rect() {
        let mut layers = blank_layers(5);
        layers[LAYER_GROUND] = Layer::single(8, 8, 3);
        let mut entries = HashMap::new();
        entries.insert(
            3,
            AtlasEntry {
                page: 0,
                uv: TexelRect { x: 0, y: 0, w: 16, h: 16 },
                trim: None,
            },
        );
        let mut world = TilemapWorld::from_imported(
            ImportedMap {
                width_tiles: 8,
                height_tiles: 8,
                tile_size_px: 16,
                layers,
                atlas: TileAtlas::new(entries, Vec::new()),
            },
            Topology::Toroidal,
        )
        .expect("world");

        let viewport = Viewport {
            width: 64,
            height: 64,
        };
        let mut camera = Camera2D {
            position: Vec2::new(64.0, 64.0),
            zoom: 1.0,
        };
        world.update_visibility(&camera, viewport);
        let first = world.visibility(LAYER_GROUND).expect("state").recompute_count();

        // Sub-tile camera motion keeps the integer rect stable.
        camera.position.x += 3.0;
        world.update_visibility(&camera, viewport);
        assert_eq!(
            world.visibility(LAYER_GROUND).expect("state").recompute_count(),
            first
        );

        camera.position.x += 16.0;
        world.update_visibility(&camera, viewport);
        assert_eq!(
            world.visibility(LAYER_GROUND).expect("state").recompute_count(),
            first + 1
        );
    }
}
