//! Walkability and continuous-collision queries against the tile layers.
//!
//! Queries run in unquantized world pixels, independent of the render
//! path. Everything degrades to the conservative answer (not walkable, no
//! contact) when the layers involved are invalid.

use crate::map::layer::EMPTY_TILE;
use crate::map::topology::Topology;
use crate::map::world::{TilemapWorld, LAYER_BLOCKING, LAYER_DECOR, LAYER_FOREGROUND, LAYER_GROUND};
use crate::math::{Aabb, Vec2};

/// Entry times closer than this are treated as a simultaneous two-axis
/// (corner) contact and tie-broken by the displacement's dominant axis.
pub const SWEEP_AXIS_EPSILON: f32 = 1e-4;

/// Half-extent of the infinite-width boxes standing in for the world's
/// top and bottom edges.
const EDGE_BOX_REACH: f32 = 1.0e9;

/// Outcome of a swept-AABB query. `time` is the fraction of the frame's
/// displacement elapsed before first contact; 1.0 means the whole
/// displacement is free.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepResult {
    pub time: f32,
    pub normal: Vec2,
    pub hit: bool,
    /// Both axes reached their entry time within [`SWEEP_AXIS_EPSILON`]:
    /// a near-simultaneous corner contact.
    pub cornerish: bool,
}

impl SweepResult {
    pub fn no_contact() -> Self {
        Self {
            time: 1.0,
            normal: Vec2::ZERO,
            hit: false,
            cornerish: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoxWalkOptions {
    /// Test blocking tiles against their importer-provided trimmed
    /// sub-rect instead of the full tile square.
    pub use_trim_rects: bool,
    /// Landing mode: additionally reject overlap with the decoration
    /// layers' tiles.
    pub landing: bool,
}

/// A point is walkable iff the ground layer has a tile there and the
/// blocking layer does not.
pub fn is_point_walkable(world: &TilemapWorld, point: Vec2) -> bool {
    let geometry = world.geometry();
    let tx = geometry.tile_of_px(point.x);
    let ty = geometry.tile_of_px(point.y);
    world.tile_at(LAYER_GROUND, tx, ty) != EMPTY_TILE
        && world.tile_at(LAYER_BLOCKING, tx, ty) == EMPTY_TILE
}

/// A box is walkable iff all four corners stand on ground tiles, the box
/// overlaps no blocking tile, and (landing mode) no decoration tile.
pub fn is_box_walkable(
    world: &TilemapWorld,
    center: Vec2,
    half: Vec2,
    options: BoxWalkOptions,
) -> bool {
    let ground_valid = world
        .layer(LAYER_GROUND)
        .is_some_and(|layer| layer.is_valid());
    if !ground_valid {
        return false;
    }

    let geometry = world.geometry();
    let corners = [
        Vec2::new(center.x - half.x, center.y - half.y),
        Vec2::new(center.x + half.x, center.y - half.y),
        Vec2::new(center.x - half.x, center.y + half.y),
        Vec2::new(center.x + half.x, center.y + half.y),
    ];
    for corner in corners {
        let tx = geometry.tile_of_px(corner.x);
        let ty = geometry.tile_of_px(corner.y);
        if world.tile_at(LAYER_GROUND, tx, ty) == EMPTY_TILE {
            return false;
        }
    }

    let mover = Aabb::from_center_half(center, half);
    if overlaps_layer_tiles(world, LAYER_BLOCKING, &mover, options.use_trim_rects) {
        return false;
    }
    if options.landing {
        for layer_index in [LAYER_DECOR, LAYER_FOREGROUND] {
            if overlaps_layer_tiles(world, layer_index, &mover, false) {
                return false;
            }
        }
    }
    true
}

fn overlaps_layer_tiles(
    world: &TilemapWorld,
    layer_index: usize,
    mover: &Aabb,
    use_trim_rects: bool,
) -> bool {
    let Some(layer) = world.layer(layer_index) else {
        return false;
    };
    if !layer.is_valid() {
        return false;
    }
    let geometry = world.geometry();
    let left = geometry.tile_of_px(mover.min.x);
    let right = geometry.tile_of_px(mover.max.x);
    let top = geometry.tile_of_px(mover.min.y);
    let bottom = geometry.tile_of_px(mover.max.y);
    for ty in top..=bottom {
        for tx in left..=right {
            let tile = world.tile_at(layer_index, tx, ty);
            if tile == EMPTY_TILE {
                continue;
            }
            let tile_box = tile_box_px(world, tx, ty, tile, use_trim_rects);
            if mover.overlaps(&tile_box) {
                return true;
            }
        }
    }
    false
}

/// World-pixel box of a tile at its unwrapped index, optionally shrunk to
/// the atlas trim rect.
fn tile_box_px(world: &TilemapWorld, tx: i32, ty: i32, tile: u16, use_trim_rects: bool) -> Aabb {
    let tile_size = world.geometry().tile_size_px() as f32;
    let base = Vec2::new(tx as f32 * tile_size, ty as f32 * tile_size);
    if use_trim_rects {
        if let Some(trim) = world.atlas().entry(tile).and_then(|entry| entry.trim) {
            let min = Vec2::new(base.x + trim.x as f32, base.y + trim.y as f32);
            return Aabb {
                min,
                max: Vec2::new(min.x + trim.w as f32, min.y + trim.h as f32),
            };
        }
    }
    Aabb {
        min: base,
        max: Vec2::new(base.x + tile_size, base.y + tile_size),
    }
}

/// Swept-AABB query: move a box of `half` extents from `start` along
/// `delta` and report the first contact against blocking tiles and the
/// world's top/bottom edges.
///
/// A box already overlapping a blocker still yields a defined zero time
/// and a push-out normal, so slide responses stay possible.
pub fn sweep_box(world: &TilemapWorld, start: Vec2, half: Vec2, delta: Vec2) -> SweepResult {
    let mut best = SweepResult::no_contact();

    let start_box = Aabb::from_center_half(start, half);
    let end_box = Aabb::from_center_half(
        Vec2::new(start.x + delta.x, start.y + delta.y),
        half,
    );
    let bounds = start_box.union(&end_box);
    let geometry = world.geometry();

    if has_valid_collision_layers(world) {
        // Candidates: tile rect bounding the swept volume, one tile slack.
        let left = geometry.tile_of_px(bounds.min.x) - 1;
        let right = geometry.tile_of_px(bounds.max.x) + 1;
        let top = geometry.tile_of_px(bounds.min.y) - 1;
        let bottom = geometry.tile_of_px(bounds.max.y) + 1;
        for ty in top..=bottom {
            for tx in left..=right {
                if !tile_blocks_sweep(world, tx, ty) {
                    continue;
                }
                let tile_box = tile_box_px(world, tx, ty, EMPTY_TILE, false);
                let expanded = expand_box(&tile_box, half);
                if let Some(candidate) = sweep_point_vs_aabb(start, delta, &expanded) {
                    if candidate.time < best.time || !best.hit {
                        best = candidate;
                    }
                }
            }
        }
    }

    // The world's top and bottom edges block as two infinite-width boxes.
    let world_height = geometry.world_height_px();
    let edges = [
        Aabb {
            min: Vec2::new(-EDGE_BOX_REACH, -EDGE_BOX_REACH),
            max: Vec2::new(EDGE_BOX_REACH, 0.0),
        },
        Aabb {
            min: Vec2::new(-EDGE_BOX_REACH, world_height),
            max: Vec2::new(EDGE_BOX_REACH, EDGE_BOX_REACH),
        },
    ];
    for edge in edges {
        let expanded = expand_box(&edge, half);
        if let Some(candidate) = sweep_point_vs_aabb(start, delta, &expanded) {
            if candidate.time < best.time || !best.hit {
                best = candidate;
            }
        }
    }

    best
}

fn has_valid_collision_layers(world: &TilemapWorld) -> bool {
    let blocking_valid = world
        .layer(LAYER_BLOCKING)
        .is_some_and(|layer| layer.is_valid());
    match world.topology() {
        Topology::Bounded => blocking_valid,
        Topology::Toroidal => {
            blocking_valid
                || world
                    .layer(LAYER_GROUND)
                    .is_some_and(|layer| layer.is_valid())
        }
    }
}

/// Blocking classification is topology-dependent: Bounded worlds block on
/// the collision layer alone; Toroidal worlds also treat a hole in the
/// ground layer as solid so nothing slides off the planet surface.
fn tile_blocks_sweep(world: &TilemapWorld, tx: i32, ty: i32) -> bool {
    if world.tile_at(LAYER_BLOCKING, tx, ty) != EMPTY_TILE {
        return true;
    }
    match world.topology() {
        Topology::Bounded => false,
        Topology::Toroidal => world.tile_at(LAYER_GROUND, tx, ty) == EMPTY_TILE,
    }
}

fn expand_box(tile_box: &Aabb, half: Vec2) -> Aabb {
    Aabb {
        min: Vec2::new(tile_box.min.x - half.x, tile_box.min.y - half.y),
        max: Vec2::new(tile_box.max.x + half.x, tile_box.max.y + half.y),
    }
}

/// Slab intersection of the displacement ray against one Minkowski-expanded
/// box. Returns the first-contact result, or `None` for a clean miss.
fn sweep_point_vs_aabb(start: Vec2, delta: Vec2, expanded: &Aabb) -> Option<SweepResult> {
    let (x_near, x_far) = axis_entry_exit(start.x, delta.x, expanded.min.x, expanded.max.x)?;
    let (y_near, y_far) = axis_entry_exit(start.y, delta.y, expanded.min.y, expanded.max.y)?;

    let entry = x_near.max(y_near);
    let exit = x_far.min(y_far);
    if entry > exit || exit <= 0.0 || entry >= 1.0 {
        return None;
    }

    if entry <= 0.0 {
        // Already overlapping at the start of the sweep: zero time and a
        // push-out normal along the axis of least penetration.
        return Some(SweepResult {
            time: 0.0,
            normal: least_penetration_normal(start, expanded),
            hit: true,
            cornerish: false,
        });
    }

    let cornerish = (x_near - y_near).abs() < SWEEP_AXIS_EPSILON;
    let use_x_axis = if cornerish {
        // Dominant displacement component wins; horizontal on an exact
        // diagonal tie.
        delta.x.abs() >= delta.y.abs()
    } else {
        x_near > y_near
    };
    let normal = if use_x_axis {
        Vec2::new(if delta.x > 0.0 { -1.0 } else { 1.0 }, 0.0)
    } else {
        Vec2::new(0.0, if delta.y > 0.0 { -1.0 } else { 1.0 })
    };

    Some(SweepResult {
        time: entry,
        normal,
        hit: true,
        cornerish,
    })
}

/// Entry/exit times of one axis of the slab test. `None` means the ray
/// can never be inside this axis's slab.
fn axis_entry_exit(start: f32, delta: f32, min: f32, max: f32) -> Option<(f32, f32)> {
    if delta == 0.0 {
        if start > min && start < max {
            Some((f32::NEG_INFINITY, f32::INFINITY))
        } else {
            None
        }
    } else {
        let t1 = (min - start) / delta;
        let t2 = (max - start) / delta;
        Some((t1.min(t2), t1.max(t2)))
    }
}

fn least_penetration_normal(start: Vec2, expanded: &Aabb) -> Vec2 {
    let pen_left = start.x - expanded.min.x;
    let pen_right = expanded.max.x - start.x;
    let pen_up = start.y - expanded.min.y;
    let pen_down = expanded.max.y - start.y;
    let min_pen = pen_left.min(pen_right).min(pen_up).min(pen_down);
    if min_pen == pen_left {
        Vec2::new(-1.0, 0.0)
    } else if min_pen == pen_right {
        Vec2::new(1.0, 0.0)
    } else if min_pen == pen_up {
        Vec2::new(0.0, -1.0)
    } else {
        Vec2::new(0.0, 1.0)
    }
}
