use crate::math::Vec2;

use super::camera::{Camera2D, Viewport};

/// Project a world-pixel position to screen pixels. Y grows downward in
/// both spaces; the camera position lands on the viewport center.
pub fn world_to_screen_px(camera: &Camera2D, viewport: Viewport, world: Vec2) -> (i32, i32) {
    let zoom = camera.effective_zoom();
    let x = (world.x - camera.position.x) * zoom + viewport.width as f32 * 0.5;
    let y = (world.y - camera.position.y) * zoom + viewport.height as f32 * 0.5;
    (x.round() as i32, y.round() as i32)
}

pub fn screen_to_world_px(camera: &Camera2D, viewport: Viewport, screen: Vec2) -> Vec2 {
    let zoom = camera.effective_zoom();
    Vec2::new(
        (screen.x - viewport.width as f32 * 0.5) / zoom + camera.position.x,
        (screen.y - viewport.height as f32 * 0.5) / zoom + camera.position.y,
    )
}

/// Camera position rounded to the nearest device pixel at the current
/// zoom. The pre-distortion surface is rendered against this quantized
/// position to suppress sub-pixel jitter; collision and physics always use
/// the true position.
pub fn quantized_camera(camera: &Camera2D) -> Camera2D {
    let zoom = camera.effective_zoom();
    Camera2D {
        position: Vec2::new(
            (camera.position.x * zoom).round() / zoom,
            (camera.position.y * zoom).round() / zoom,
        ),
        zoom: camera.zoom,
    }
}

/// Project a world-pixel position into intermediate-surface pixels. The
/// surface is the screen plus `margin_px` of horizontal overscan on each
/// side, so the screen center maps to the surface center.
pub fn world_to_surface_px(
    camera: &Camera2D,
    viewport: Viewport,
    margin_px: u32,
    world: Vec2,
) -> (i32, i32) {
    let quantized = quantized_camera(camera);
    let (x, y) = world_to_screen_px(&quantized, viewport, world);
    (x + margin_px as i32, y)
}
