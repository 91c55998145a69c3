//! Multi-layer tile-world engine: tile storage with wrap/clamp
//! topologies, page-bucketed visibility, walkability and swept-AABB
//! collision, and a row-band distortion compositor for planet-surface
//! maps.

pub mod collision;
pub mod import;
pub mod map;
pub mod math;
pub mod render;
pub mod shell;

pub use collision::{is_box_walkable, is_point_walkable, sweep_box, BoxWalkOptions, SweepResult};
pub use import::{load_map_folder, ImportError, ImportedMap};
pub use map::atlas::{AtlasEntry, PageId, PageTexels, TexelRect, TileAtlas, TrimRect};
pub use map::layer::{Layer, LayerError, LayerStorage, TileId, EMPTY_TILE};
pub use map::topology::{GridGeometry, Topology};
pub use map::world::{
    expected_layer_count, TilemapWorld, WorldInitError, LAYER_BACKGROUND, LAYER_BLOCKING,
    LAYER_DECOR, LAYER_FOREGROUND, LAYER_GROUND,
};
pub use math::{Aabb, Vec2};
pub use render::backend::{RenderBackend, SoftwareBackend};
pub use render::camera::{Camera2D, Viewport};
pub use render::compositor::{Compositor, IntermediateSurface, SURFACE_MARGIN_PX};
pub use render::transform::{screen_to_world_px, world_to_screen_px};
pub use render::visibility::{visible_tile_rect, TileRect, VisibilityState};
pub use shell::{run_shell, ShellConfig, ShellError};
