use tracing::warn;

use crate::map::atlas::{PageId, TileAtlas};
use crate::map::layer::{Layer, LayerStorage, TileId, EMPTY_TILE};
use crate::map::topology::{GridGeometry, Topology};

use super::camera::{Camera2D, Viewport};
use super::fence;

/// Maximum number of buckets (distinct atlas pages) per layer per frame.
pub const BUCKET_CAPACITY: usize = 16;
/// Page ids addressable by the page→bucket side table.
pub const PAGE_TABLE_CAPACITY: usize = 64;
/// Entries one bucket can hold before further tiles are dropped.
pub const BUCKET_TILE_CAPACITY: usize = 512;
/// Total visible tiles per layer per frame. Overflow is dropped silently:
/// a fixed-budget policy, not an error.
pub const VISIBLE_TILE_CAPACITY: usize = 2048;
/// Horizontal inflate of the visible rect, in tiles, so the distortion
/// compositor has overscan to sample from.
pub const OVERSCAN_MARGIN_TILES: i32 = 4;

/// Inclusive tile rectangle in unwrapped tile indices. May extend past
/// `[0, width)`; cells are resolved through the topology when sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl TileRect {
    pub fn contains(&self, tx: i32, ty: i32) -> bool {
        tx >= self.left && tx <= self.right && ty >= self.top && ty <= self.bottom
    }

    pub fn is_empty(&self) -> bool {
        self.left > self.right || self.top > self.bottom
    }
}

/// Camera-visible tile rectangle: viewport half-extents divided by zoom,
/// converted to tile units, inflated horizontally for distortion overscan.
pub fn visible_tile_rect(
    geometry: &GridGeometry,
    camera: &Camera2D,
    viewport: Viewport,
) -> TileRect {
    let half = viewport.half_extents_world(camera);
    TileRect {
        left: geometry.tile_of_px(camera.position.x - half.x) - OVERSCAN_MARGIN_TILES,
        right: geometry.tile_of_px(camera.position.x + half.x) + OVERSCAN_MARGIN_TILES,
        top: geometry.tile_of_px(camera.position.y - half.y),
        bottom: geometry.tile_of_px(camera.position.y + half.y),
    }
}

/// One visible tile, positioned in unwrapped tile indices so seam-crossing
/// tiles project continuously relative to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketEntry {
    pub tile_x: i32,
    pub tile_y: i32,
    pub tile: TileId,
}

/// Visible tiles sharing one atlas page, so the page is uploaded once per
/// frame instead of once per tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    page: PageId,
    entries: Vec<BucketEntry>,
}

impl Bucket {
    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn entries(&self) -> &[BucketEntry] {
        &self.entries
    }
}

/// Per-layer visibility cache: the last-computed visible rect plus the
/// page buckets built from it. Buckets are only rebuilt when the integer
/// rect changes.
#[derive(Debug, Clone)]
pub struct VisibilityState {
    cached_rect: Option<TileRect>,
    buckets: Vec<Bucket>,
    page_slots: [Option<u8>; PAGE_TABLE_CAPACITY],
    total_tiles: usize,
    recompute_count: u64,
    warned_drop: bool,
}

impl Default for VisibilityState {
    fn default() -> Self {
        Self {
            cached_rect: None,
            buckets: Vec::new(),
            page_slots: [None; PAGE_TABLE_CAPACITY],
            total_tiles: 0,
            recompute_count: 0,
            warned_drop: false,
        }
    }
}

impl VisibilityState {
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn cached_rect(&self) -> Option<TileRect> {
        self.cached_rect
    }

    pub fn total_tiles(&self) -> usize {
        self.total_tiles
    }

    /// Number of bucket rebuilds since creation. Lets callers observe the
    /// cached-rect short-circuit.
    pub fn recompute_count(&self) -> u64 {
        self.recompute_count
    }

    pub fn invalidate(&mut self) {
        self.cached_rect = None;
    }

    /// Rebuild the buckets for `rect` unless it matches the cached rect.
    /// Returns true when a rebuild happened.
    pub fn update(
        &mut self,
        layer: &Layer,
        geometry: &GridGeometry,
        atlas: &TileAtlas,
        rect: TileRect,
    ) -> bool {
        if self.cached_rect == Some(rect) {
            return false;
        }
        self.recompute_count += 1;
        self.buckets.clear();
        self.page_slots = [None; PAGE_TABLE_CAPACITY];
        self.total_tiles = 0;

        if layer.is_valid() && !rect.is_empty() {
            match layer.storage() {
                LayerStorage::Sparse { tiles } => {
                    self.populate_sparse(tiles, geometry, atlas, rect);
                }
                LayerStorage::Dense { .. } | LayerStorage::Single { .. } => {
                    self.populate_per_cell(layer, geometry, atlas, rect);
                }
            }
        }

        fence::publish();
        self.cached_rect = Some(rect);
        true
    }

    fn populate_per_cell(
        &mut self,
        layer: &Layer,
        geometry: &GridGeometry,
        atlas: &TileAtlas,
        rect: TileRect,
    ) {
        for ty in rect.top..=rect.bottom {
            for tx in rect.left..=rect.right {
                let (rx, ry) = geometry.resolve_tile(tx, ty);
                let tile = layer.tile_at(rx, ry);
                if tile == EMPTY_TILE {
                    continue;
                }
                self.push_tile(atlas, tx, ty, tile);
            }
        }
    }

    /// Sparse layers skip the per-cell scan: each stored entry is tested
    /// against the rect directly plus its wrap-minus and wrap-plus
    /// tile-index variants, so seam-adjacent tiles are found without
    /// walking the whole rectangle.
    fn populate_sparse(
        &mut self,
        tiles: &std::collections::HashMap<(u32, u32), TileId>,
        geometry: &GridGeometry,
        atlas: &TileAtlas,
        rect: TileRect,
    ) {
        let width = geometry.width_tiles() as i32;
        let wrapping = geometry.topology() == Topology::Toroidal && width > 0;
        for (&(sx, sy), &tile) in tiles {
            if tile == EMPTY_TILE {
                continue;
            }
            let sy = sy as i32;
            if sy < rect.top || sy > rect.bottom {
                continue;
            }
            let sx = sx as i32;
            let candidates = if wrapping {
                [Some(sx), Some(sx - width), Some(sx + width)]
            } else {
                [Some(sx), None, None]
            };
            for cx in candidates.into_iter().flatten() {
                if cx >= rect.left && cx <= rect.right {
                    self.push_tile(atlas, cx, sy, tile);
                }
            }
        }
    }

    fn push_tile(&mut self, atlas: &TileAtlas, tx: i32, ty: i32, tile: TileId) {
        if self.total_tiles >= VISIBLE_TILE_CAPACITY {
            self.warn_drop_once("visible_tile_cap");
            return;
        }
        let Some(entry) = atlas.entry(tile) else {
            return;
        };
        let Some(slot) = self.bucket_slot_for_page(entry.page) else {
            self.warn_drop_once("bucket_table_full");
            return;
        };
        if self.buckets[slot].entries.len() >= BUCKET_TILE_CAPACITY {
            self.warn_drop_once("bucket_tile_cap");
            return;
        }
        self.buckets[slot].entries.push(BucketEntry {
            tile_x: tx,
            tile_y: ty,
            tile,
        });
        self.total_tiles += 1;
    }

    fn bucket_slot_for_page(&mut self, page: PageId) -> Option<usize> {
        let table_index = page as usize;
        if table_index >= PAGE_TABLE_CAPACITY {
            return None;
        }
        if let Some(slot) = self.page_slots[table_index] {
            return Some(slot as usize);
        }
        if self.buckets.len() >= BUCKET_CAPACITY {
            return None;
        }
        let slot = self.buckets.len();
        self.buckets.push(Bucket {
            page,
            entries: Vec::new(),
        });
        self.page_slots[table_index] = Some(slot as u8);
        Some(slot)
    }

    fn warn_drop_once(&mut self, reason: &'static str) {
        if self.warned_drop {
            return;
        }
        self.warned_drop = true;
        warn!(reason, "visible_tiles_dropped_at_capacity");
    }
}
