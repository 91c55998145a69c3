//! Interactive viewer shell: window, input and frame loop around a
//! [`TilemapWorld`]. Gameplay code would drive the compositor itself;
//! this shell exists so a map folder can be flown around and inspected.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use pixels::{Error as PixelsError, Pixels, SurfaceTexture};
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowBuilder};

use crate::map::topology::Topology;
use crate::map::world::{TilemapWorld, WorldInitError};
use crate::render::backend::SoftwareBackend;
use crate::render::camera::{Camera2D, Viewport};
use crate::render::compositor::Compositor;
use crate::math::Vec2;

const FRAME_CLEAR_COLOR: [u8; 4] = [12, 12, 20, 255];

#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub map_folder: PathBuf,
    pub topology: Topology,
    pub camera_speed_px_per_sec: f32,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            window_title: "Tileworld Viewer".to_string(),
            window_width: 1280,
            window_height: 720,
            map_folder: PathBuf::from("assets/map"),
            topology: Topology::Toroidal,
            camera_speed_px_per_sec: 240.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    World(#[from] WorldInitError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to create pixel surface: {0}")]
    CreateSurface(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

#[derive(Debug, Default, Clone, Copy)]
struct PanState {
    up: bool,
    down: bool,
    left: bool,
    right: bool,
}

impl PanState {
    fn set_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        match key {
            PhysicalKey::Code(KeyCode::KeyW) | PhysicalKey::Code(KeyCode::ArrowUp) => {
                self.up = is_pressed;
            }
            PhysicalKey::Code(KeyCode::KeyS) | PhysicalKey::Code(KeyCode::ArrowDown) => {
                self.down = is_pressed;
            }
            PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.left = is_pressed;
            }
            PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.right = is_pressed;
            }
            _ => {}
        }
    }

    fn direction(&self) -> Vec2 {
        let x = (self.right as i32 - self.left as i32) as f32;
        let y = (self.down as i32 - self.up as i32) as f32;
        Vec2::new(x, y)
    }
}

pub fn run_shell(config: ShellConfig) -> Result<(), ShellError> {
    let mut world = TilemapWorld::init(&config.map_folder, config.topology)?;

    let event_loop = EventLoop::new().map_err(ShellError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(ShellError::CreateWindow)?,
    );
    let window_for_loop = Arc::clone(&window);

    let size = window.inner_size();
    let mut pixels = build_pixels(Arc::clone(&window), size.width, size.height)
        .map_err(ShellError::CreateSurface)?;
    let mut backend = SoftwareBackend::new(size.width, size.height);
    let mut compositor = Compositor::new();
    let mut viewport = Viewport {
        width: size.width,
        height: size.height,
    };

    // Start looking at the middle of the map.
    let mut camera = Camera2D {
        position: Vec2::new(
            world.geometry().world_width_px() * 0.5,
            world.geometry().world_height_px() * 0.5,
        ),
        ..Camera2D::default()
    };
    let mut pan = PanState::default();
    let mut last_frame_instant = Instant::now();

    info!(
        map = %config.map_folder.display(),
        topology = ?config.topology,
        width = viewport.width,
        height = viewport.height,
        "shell_started"
    );

    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window_for_loop.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        info!(reason = "window_close", "shutdown_requested");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        if new_size.width == 0 || new_size.height == 0 {
                            return;
                        }
                        match build_pixels(
                            Arc::clone(&window_for_loop),
                            new_size.width,
                            new_size.height,
                        ) {
                            Ok(rebuilt) => pixels = rebuilt,
                            Err(error) => {
                                warn!(error = %error, "surface_resize_failed");
                                window_target.exit();
                                return;
                            }
                        }
                        backend.resize(new_size.width, new_size.height);
                        viewport = Viewport {
                            width: new_size.width,
                            height: new_size.height,
                        };
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        let is_pressed = event.state == ElementState::Pressed;
                        pan.set_key(event.physical_key, is_pressed);
                        if is_pressed
                            && matches!(event.physical_key, PhysicalKey::Code(KeyCode::Escape))
                        {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                        }
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        camera.apply_zoom_steps(zoom_steps_from_scroll_delta(delta));
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let dt = now
                            .saturating_duration_since(last_frame_instant)
                            .as_secs_f32()
                            .min(0.25);
                        last_frame_instant = now;

                        advance_camera(&mut camera, &world, pan, config.camera_speed_px_per_sec, dt);

                        backend.clear(FRAME_CLEAR_COLOR);
                        compositor.begin_scene(&mut world, &camera, viewport, &mut backend);
                        // Entities would render here, between the passes.
                        compositor.end_scene(&mut world, &camera, viewport, &mut backend);

                        let frame = pixels.frame_mut();
                        let rendered = backend.frame();
                        let len = frame.len().min(rendered.len());
                        frame[..len].copy_from_slice(&rendered[..len]);
                        if let Err(error) = pixels.render() {
                            warn!(error = %error, "surface_present_failed");
                            window_target.exit();
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window_for_loop.request_redraw();
            }
            Event::LoopExiting => {
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(ShellError::EventLoopRun)
}

fn build_pixels(window: Arc<Window>, width: u32, height: u32) -> Result<Pixels<'static>, PixelsError> {
    let surface = SurfaceTexture::new(width, height, window);
    Pixels::new(width, height, surface)
}

/// Move the camera by the held pan keys, then keep it on the map: X wraps
/// on toroidal worlds and clamps on bounded ones, Y always clamps.
fn advance_camera(
    camera: &mut Camera2D,
    world: &TilemapWorld,
    pan: PanState,
    speed_px_per_sec: f32,
    dt: f32,
) {
    let direction = pan.direction();
    let zoom = camera.effective_zoom();
    camera.position.x += direction.x * speed_px_per_sec * dt / zoom;
    camera.position.y += direction.y * speed_px_per_sec * dt / zoom;

    let geometry = world.geometry();
    camera.position.x = match world.topology() {
        Topology::Toroidal => geometry.wrap_world_x(camera.position.x),
        Topology::Bounded => camera.position.x.clamp(0.0, geometry.world_width_px()),
    };
    camera.position.y = camera.position.y.clamp(0.0, geometry.world_height_px());
}

fn zoom_steps_from_scroll_delta(delta: MouseScrollDelta) -> i32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y.round() as i32,
        MouseScrollDelta::PixelDelta(position) => {
            if position.y > 0.0 {
                1
            } else if position.y < 0.0 {
                -1
            } else {
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::ImportedMap;
    use crate::map::atlas::TileAtlas;
    use crate::map::layer::Layer;

    fn test_world(topology: Topology) -> TilemapWorld {
        let layer_count = crate::map::world::expected_layer_count(topology);
        let layers = (0..layer_count)
            .map(|_| Layer::dense(8, 8, vec![0; 64]).expect("layer"))
            .collect();
        TilemapWorld::from_imported(
            ImportedMap {
                width_tiles: 8,
                height_tiles: 8,
                tile_size_px: 16,
                layers,
                atlas: TileAtlas::default(),
            },
            topology,
        )
        .expect("world")
    }

    #[test]
    fn pan_direction_combines_held_keys() {
        let mut pan = PanState::default();
        pan.set_key(PhysicalKey::Code(KeyCode::KeyD), true);
        pan.set_key(PhysicalKey::Code(KeyCode::ArrowUp), true);
        assert_eq!(pan.direction(), Vec2::new(1.0, -1.0));
        pan.set_key(PhysicalKey::Code(KeyCode::KeyD), false);
        assert_eq!(pan.direction(), Vec2::new(0.0, -1.0));
    }

    #[test]
    fn camera_wraps_on_toroidal_and_clamps_on_bounded() {
        let toroidal = test_world(Topology::Toroidal);
        let mut camera = Camera2D {
            position: Vec2::new(126.0, 64.0),
            zoom: 1.0,
        };
        let pan = PanState {
            right: true,
            ..PanState::default()
        };
        advance_camera(&mut camera, &toroidal, pan, 100.0, 0.1);
        assert!(camera.position.x < 16.0, "x wrapped, got {}", camera.position.x);

        let bounded = test_world(Topology::Bounded);
        camera.position = Vec2::new(126.0, 200.0);
        advance_camera(&mut camera, &bounded, pan, 100.0, 0.1);
        assert_eq!(camera.position.x, 128.0);
        assert_eq!(camera.position.y, 128.0);
    }

    #[test]
    fn wheel_delta_maps_to_discrete_zoom_steps() {
        assert_eq!(
            zoom_steps_from_scroll_delta(MouseScrollDelta::LineDelta(0.0, 2.0)),
            2
        );
        let positive = zoom_steps_from_scroll_delta(MouseScrollDelta::PixelDelta(
            winit::dpi::PhysicalPosition::new(0.0, 3.0),
        ));
        let negative = zoom_steps_from_scroll_delta(MouseScrollDelta::PixelDelta(
            winit::dpi::PhysicalPosition::new(0.0, -5.0),
        ));
        assert_eq!((positive, negative), (1, -1));
    }
}
