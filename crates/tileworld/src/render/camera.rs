use crate::math::Vec2;

pub const CAMERA_ZOOM_DEFAULT: f32 = 1.0;
pub const CAMERA_ZOOM_MIN: f32 = 0.5;
pub const CAMERA_ZOOM_MAX: f32 = 4.0;
pub const CAMERA_ZOOM_STEP: f32 = 0.25;

/// Camera collaborator: world position in pixels plus zoom. The viewport
/// half-extents come in separately as [`Viewport`].
#[derive(Debug, Clone, Copy)]
pub struct Camera2D {
    pub position: Vec2,
    pub zoom: f32,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: CAMERA_ZOOM_DEFAULT,
        }
    }
}

impl Camera2D {
    pub fn effective_zoom(&self) -> f32 {
        clamp_camera_zoom(self.zoom)
    }

    pub fn set_zoom_clamped(&mut self, zoom: f32) {
        self.zoom = clamp_camera_zoom(zoom);
    }

    pub fn apply_zoom_steps(&mut self, steps: i32) {
        if steps == 0 {
            return;
        }
        let target_zoom = self.zoom + steps as f32 * CAMERA_ZOOM_STEP;
        self.set_zoom_clamped(target_zoom);
    }
}

fn clamp_camera_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() {
        return CAMERA_ZOOM_DEFAULT;
    }
    zoom.clamp(CAMERA_ZOOM_MIN, CAMERA_ZOOM_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn half_extents_world(&self, camera: &Camera2D) -> Vec2 {
        let zoom = camera.effective_zoom();
        Vec2::new(
            self.width as f32 / (2.0 * zoom),
            self.height as f32 / (2.0 * zoom),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_is_clamped_and_non_finite_resets_to_default() {
        let mut camera = Camera2D::default();
        camera.set_zoom_clamped(100.0);
        assert_eq!(camera.zoom, CAMERA_ZOOM_MAX);
        camera.set_zoom_clamped(0.01);
        assert_eq!(camera.zoom, CAMERA_ZOOM_MIN);
        camera.zoom = f32::NAN;
        assert_eq!(camera.effective_zoom(), CAMERA_ZOOM_DEFAULT);
    }

    #[test]
    fn half_extents_shrink_as_zoom_grows() {
        let viewport = Viewport {
            width: 320,
            height: 240,
        };
        let mut camera = Camera2D::default();
        camera.set_zoom_clamped(2.0);
        let half = viewport.half_extents_world(&camera);
        assert_eq!(half, Vec2::new(80.0, 60.0));
    }
}
