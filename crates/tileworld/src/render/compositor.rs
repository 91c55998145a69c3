//! Scene compositing: tile layers into the intermediate surface (or
//! straight to the frame on bounded maps), an entity window between the
//! begin and end passes, and the row-band horizon distortion that turns a
//! cylindrical map into something that reads as a planet surface.

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

use crate::map::topology::Topology;
use crate::map::world::TilemapWorld;
use crate::math::Vec2;

use super::backend::RenderBackend;
use super::camera::{Camera2D, Viewport};
use super::fence;
use super::transform::{world_to_screen_px, world_to_surface_px};

/// Horizontal overscan on each side of the intermediate surface, so band
/// narrowing near the top and bottom of the screen still has source
/// pixels to sample.
pub const SURFACE_MARGIN_PX: u32 = 64;
/// Number of horizontal row bands the screen is split into for
/// compositing. Sized so one band's rows fit a texture-cache upload.
pub const DISTORTION_BAND_COUNT: u32 = 24;
/// How far the band width shrinks at the screen's top and bottom edges.
/// 0.0 disables the curvature illusion entirely.
pub const DISTORTION_STRENGTH: f32 = 0.22;

const SURFACE_CLEAR_COLOR: [u8; 4] = [0, 0, 0, 255];

/// Offscreen pixel buffer the toroidal render path draws into before
/// distortion: the screen plus [`SURFACE_MARGIN_PX`] of overscan on each
/// side. Written by the rasterizer, read back row-band-wise by the
/// compositor. Exclusively owned by the active [`TilemapWorld`].
#[derive(Debug)]
pub struct IntermediateSurface {
    screen_width: u32,
    width: u32,
    height: u32,
    margin: u32,
    rgba: Vec<u8>,
}

impl IntermediateSurface {
    pub fn new(screen_width: u32, screen_height: u32, margin: u32) -> Self {
        let width = screen_width + 2 * margin;
        Self {
            screen_width,
            width,
            height: screen_height,
            margin,
            rgba: vec![0; width as usize * screen_height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    /// True when the surface was allocated for this screen size. A stale
    /// surface is discarded and reallocated rather than resized in place.
    pub fn matches(&self, screen_width: u32, screen_height: u32, margin: u32) -> bool {
        self.screen_width == screen_width && self.height == screen_height && self.margin == margin
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn rgba_mut(&mut self) -> &mut [u8] {
        &mut self.rgba
    }

    pub fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.rgba.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }
}

/// Per-band horizontal scale, cached by absolute pixel distance from the
/// vertical screen center. Top/bottom symmetry means each distinct
/// distance is evaluated once. Keyed to a fixed half-height; a resize
/// clears the cache.
#[derive(Debug, Default)]
struct DistortionScales {
    half_height: u32,
    by_distance: HashMap<u32, f32>,
}

impl DistortionScales {
    fn ensure_half_height(&mut self, half_height: u32) {
        if self.half_height != half_height {
            self.half_height = half_height;
            self.by_distance.clear();
        }
    }

    fn scale(&mut self, distance_px: u32) -> f32 {
        let half_height = self.half_height;
        *self
            .by_distance
            .entry(distance_px)
            .or_insert_with(|| band_scale(distance_px, half_height))
    }
}

/// Cosine falloff: full width at the screen center, narrowing toward the
/// top and bottom edges by [`DISTORTION_STRENGTH`].
fn band_scale(distance_px: u32, half_height: u32) -> f32 {
    if half_height == 0 {
        return 1.0;
    }
    let t = (distance_px as f32 / half_height as f32).min(1.0);
    1.0 - DISTORTION_STRENGTH * (1.0 - (t * FRAC_PI_2).cos())
}

/// Drives a frame's tile passes against a [`RenderBackend`]. Call
/// [`Compositor::begin_scene`], render entities (into the world's surface
/// on toroidal maps, straight to the frame on bounded ones), then
/// [`Compositor::end_scene`].
#[derive(Debug, Default)]
pub struct Compositor {
    distortion: DistortionScales,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render every layer below the foreground. Toroidal maps draw into
    /// the intermediate surface (allocating or replacing it on resize);
    /// bounded maps draw straight to the frame.
    pub fn begin_scene(
        &mut self,
        world: &mut TilemapWorld,
        camera: &Camera2D,
        viewport: Viewport,
        backend: &mut dyn RenderBackend,
    ) {
        world.update_visibility(camera, viewport);
        let foreground = world.foreground_layer();
        match world.topology() {
            Topology::Toroidal => {
                let mut surface = world
                    .take_surface()
                    .filter(|surface| {
                        surface.matches(viewport.width, viewport.height, SURFACE_MARGIN_PX)
                    })
                    .unwrap_or_else(|| {
                        IntermediateSurface::new(viewport.width, viewport.height, SURFACE_MARGIN_PX)
                    });
                surface.clear(SURFACE_CLEAR_COLOR);
                for layer_index in 0..foreground {
                    draw_layer_to_surface(
                        world,
                        layer_index,
                        camera,
                        viewport,
                        backend,
                        &mut surface,
                    );
                }
                world.store_surface(surface);
            }
            Topology::Bounded => {
                for layer_index in 0..foreground {
                    draw_layer_to_frame(world, layer_index, camera, viewport, backend);
                }
            }
        }
    }

    /// Render the foreground layer over the entities, then (toroidal
    /// only) composite the surface to the frame band by band.
    pub fn end_scene(
        &mut self,
        world: &mut TilemapWorld,
        camera: &Camera2D,
        viewport: Viewport,
        backend: &mut dyn RenderBackend,
    ) {
        let foreground = world.foreground_layer();
        match world.topology() {
            Topology::Toroidal => {
                let Some(mut surface) = world.take_surface() else {
                    return;
                };
                draw_layer_to_surface(world, foreground, camera, viewport, backend, &mut surface);
                fence::publish();
                fence::acquire();
                self.composite_bands(&surface, viewport, backend);
                world.store_surface(surface);
            }
            Topology::Bounded => {
                draw_layer_to_frame(world, foreground, camera, viewport, backend);
            }
        }
    }

    fn composite_bands(
        &mut self,
        surface: &IntermediateSurface,
        viewport: Viewport,
        backend: &mut dyn RenderBackend,
    ) {
        let screen_height = viewport.height;
        if screen_height == 0 || viewport.width == 0 {
            return;
        }
        self.distortion.ensure_half_height(screen_height / 2);
        let band_height = screen_height.div_ceil(DISTORTION_BAND_COUNT).max(1);
        let half = screen_height as f32 * 0.5;
        let surface_center = surface.width() as f32 * 0.5;

        let mut band_top = 0u32;
        while band_top < screen_height {
            let rows = band_height.min(screen_height - band_top);
            let band_center = band_top as f32 + rows as f32 * 0.5;
            let distance = (band_center - half).abs().round() as u32;
            let factor = self.distortion.scale(distance);
            let src_width = viewport.width as f32 * factor;
            let src_left = surface_center - src_width * 0.5;
            backend.upload_surface_band(surface, band_top, rows);
            backend.draw_surface_band_scaled(band_top, rows, src_left, src_width);
            band_top += rows;
        }
    }
}

fn draw_layer_to_surface(
    world: &TilemapWorld,
    layer_index: usize,
    camera: &Camera2D,
    viewport: Viewport,
    backend: &mut dyn RenderBackend,
    surface: &mut IntermediateSurface,
) {
    let Some(state) = world.visibility(layer_index) else {
        return;
    };
    let tile_size = world.geometry().tile_size_px() as f32;
    let zoom = camera.effective_zoom();
    for bucket in state.buckets() {
        if let Some(texels) = world.atlas().page_texels(bucket.page()) {
            backend.upload_page(bucket.page(), texels);
        }
        for entry in bucket.entries() {
            let Some(atlas_entry) = world.atlas().entry(entry.tile) else {
                continue;
            };
            let world_pos = Vec2::new(
                entry.tile_x as f32 * tile_size,
                entry.tile_y as f32 * tile_size,
            );
            let (sx, sy) = world_to_surface_px(camera, viewport, surface.margin(), world_pos);
            backend.draw_page_to_surface(surface, bucket.page(), atlas_entry.uv, sx, sy, zoom);
        }
    }
}

fn draw_layer_to_frame(
    world: &TilemapWorld,
    layer_index: usize,
    camera: &Camera2D,
    viewport: Viewport,
    backend: &mut dyn RenderBackend,
) {
    let Some(state) = world.visibility(layer_index) else {
        return;
    };
    let tile_size = world.geometry().tile_size_px() as f32;
    let zoom = camera.effective_zoom();
    for bucket in state.buckets() {
        if let Some(texels) = world.atlas().page_texels(bucket.page()) {
            backend.upload_page(bucket.page(), texels);
        }
        for entry in bucket.entries() {
            let Some(atlas_entry) = world.atlas().entry(entry.tile) else {
                continue;
            };
            let world_pos = Vec2::new(
                entry.tile_x as f32 * tile_size,
                entry.tile_y as f32 * tile_size,
            );
            let (sx, sy) = world_to_screen_px(camera, viewport, world_pos);
            backend.draw_page_to_frame(bucket.page(), atlas_entry.uv, sx, sy, zoom);
        }
    }
}
