// Frame loop and input wiring for Orrery 3D

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use log::{debug, info, warn};
use tokio::runtime::Handle;
use winit::{
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

use crate::assets::AssetLoader;
use crate::camera::{CameraState, OrbitControls, Projection, Viewport};
use crate::config::OrreryConfig;
use crate::error::AppError;
use crate::labels::layout_labels;
use crate::orbit::OrbitAnimator;
use crate::overlay::{Overlay, OverlayFrame, TitleOverlay};
use crate::pick::pick;
use crate::renderer::Renderer;
use crate::scene::{BodyId, Material, Scene};
use crate::view::{command_channel, CommandReceiver, CommandSender, ViewChange, ViewCommand, ViewController};

/// Pixels of precise scroll treated as one line.
const PIXELS_PER_LINE: f32 = 50.0;

/// Keyboard shortcuts: `1`..`9` focus a body, `Escape` returns to the overview.
pub fn key_command(key: KeyCode) -> Option<ViewCommand> {
    let index = match key {
        KeyCode::Escape => return Some(ViewCommand::Reset),
        KeyCode::Digit1 => 0,
        KeyCode::Digit2 => 1,
        KeyCode::Digit3 => 2,
        KeyCode::Digit4 => 3,
        KeyCode::Digit5 => 4,
        KeyCode::Digit6 => 5,
        KeyCode::Digit7 => 6,
        KeyCode::Digit8 => 7,
        KeyCode::Digit9 => 8,
        _ => return None,
    };
    Some(ViewCommand::Focus(BodyId(index)))
}

/// Moves the camera one frame: the focus tween while one runs, user controls otherwise.
///
/// Input gathered by `controls` during a tween is discarded so it cannot
/// pull the camera off the interpolated path.
pub fn advance_camera(
    view: &mut ViewController,
    controls: &mut OrbitControls,
    camera: &mut CameraState,
) {
    if view.is_transitioning() {
        controls.cancel();
        view.step(camera);
    } else {
        controls.update(camera);
    }
}

/// Tells a click from a drag.
#[derive(Debug, Default, Clone, Copy)]
pub struct PointerState {
    pub position: Vec2,
    pressed_at: Option<Vec2>,
}

impl PointerState {
    pub fn press(&mut self) {
        self.pressed_at = Some(self.position);
    }

    /// Moves the pointer; returns the drag delta while the button is held.
    pub fn move_to(&mut self, position: Vec2) -> Option<Vec2> {
        let delta = position - self.position;
        self.position = position;
        self.pressed_at.map(|_| delta)
    }

    /// True when the press/release pair stayed within `slop` pixels.
    pub fn release(&mut self, slop: f32) -> bool {
        self.pressed_at
            .take()
            .map(|start| start.distance(self.position) < slop)
            .unwrap_or(false)
    }
}

pub struct App {
    renderer: Renderer,
    scene: Scene,
    animator: OrbitAnimator,
    projection: Projection,
    viewport: Viewport,
    camera: CameraState,
    controls: OrbitControls,
    view: ViewController,
    commands: CommandReceiver,
    ui: CommandSender,
    assets: AssetLoader,
    overlay: Box<dyn Overlay>,
    pointer: PointerState,
    start_time: Instant,
    time_scale: f32,
}

impl App {
    pub async fn new(
        config: OrreryConfig,
        texture_dir: PathBuf,
        event_loop: &EventLoop<()>,
    ) -> Result<Self, AppError> {
        let window = Arc::new(WindowBuilder::new().with_title("Orrery").build(event_loop)?);

        let scene = Scene::from_config(&config);
        let renderer = Renderer::new(window.clone(), &scene).await?;
        let size = renderer.size();
        let viewport = Viewport::new(size.width, size.height);

        let camera = CameraState::from(&config.camera);
        let (ui, commands) = command_channel();
        let title_window = window.clone();
        let overlay = TitleOverlay::new(move |title: &str| title_window.set_title(title));

        info!(
            "scene ready: {} bodies, {} stars",
            scene.bodies().len(),
            scene.starfield.points.len()
        );

        Ok(Self {
            renderer,
            animator: OrbitAnimator::new(config.spin_per_frame),
            projection: Projection::new(&config.camera, viewport),
            viewport,
            camera,
            controls: OrbitControls::new(config.controls.clone()),
            view: ViewController::new(config.focus.clone(), camera),
            commands,
            ui,
            assets: AssetLoader::new(Handle::current(), texture_dir),
            overlay: Box::new(overlay),
            pointer: PointerState::default(),
            start_time: Instant::now(),
            time_scale: config.time_scale,
            scene,
        })
    }

    /// Handle for UI code that wants to focus or reset the view.
    pub fn command_sender(&self) -> CommandSender {
        self.ui.clone()
    }

    pub fn run(mut self, event_loop: EventLoop<()>) -> Result<(), AppError> {
        let window_id = self.renderer.window().id();
        event_loop.run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id: id, event } if id == window_id => match event {
                    WindowEvent::CloseRequested => {
                        self.assets.shutdown();
                        target.exit();
                    }
                    WindowEvent::Resized(physical_size) => self.resize(physical_size),
                    WindowEvent::RedrawRequested => self.frame(),
                    WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard_input(event),
                    WindowEvent::CursorMoved { position, .. } => {
                        let position = Vec2::new(position.x as f32, position.y as f32);
                        if let Some(delta) = self.pointer.move_to(position) {
                            self.controls.drag(delta);
                        }
                    }
                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Left,
                        ..
                    } => match state {
                        ElementState::Pressed => self.pointer.press(),
                        ElementState::Released => {
                            if self.pointer.release(self.controls.config().click_slop) {
                                self.handle_click();
                            }
                        }
                    },
                    WindowEvent::MouseWheel { delta, .. } => {
                        let lines = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_LINE,
                        };
                        self.controls.scroll(lines);
                    }
                    _ => {}
                },
                Event::AboutToWait => {
                    self.renderer.window().request_redraw();
                }
                _ => {}
            }
        })?;
        Ok(())
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.renderer.resize(new_size);
        self.viewport = Viewport::new(new_size.width, new_size.height);
        self.projection.resize(self.viewport);
    }

    fn handle_keyboard_input(&mut self, event: KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        if let PhysicalKey::Code(keycode) = event.physical_key {
            if let Some(command) = key_command(keycode) {
                self.ui.send(command);
            }
        }
    }

    fn handle_click(&mut self) {
        let hit = pick(
            &self.scene,
            &self.projection,
            &self.camera,
            self.viewport,
            self.pointer.position,
        );
        if let Some(hit) = hit {
            debug!("picked body {} at {:?}", hit.body.0, hit.point);
        }
        let change = self
            .view
            .on_pick(hit.map(|hit| hit.body), &mut self.scene, &self.camera);
        self.apply_change(change);
    }

    fn apply_change(&mut self, change: Option<ViewChange>) {
        match change {
            Some(ViewChange::Focused(id)) => {
                if let Some(body) = self.scene.body(id) {
                    if matches!(body.material, Material::Color(_)) {
                        self.assets.request(id, &body.texture);
                    }
                }
            }
            Some(ViewChange::Reset { released }) => {
                self.assets.cancel_all();
                for handle in released {
                    self.renderer.release_texture(handle);
                }
            }
            None => {}
        }
    }

    fn apply_textures(&mut self) {
        for (id, image) in self.assets.drain() {
            let Some(body) = self.scene.body_mut(id) else {
                continue;
            };
            let Some(handle) = self.renderer.upload_texture(&image) else {
                warn!("texture for {} is empty, keeping fallback colour", body.name);
                continue;
            };
            if let Material::Texture(old) = body.material {
                self.renderer.release_texture(old);
            }
            body.material = Material::Texture(handle);
            debug!("applied texture to {}", body.name);
        }
    }

    /// Everything that mutates the scene or camera happens here.
    fn frame(&mut self) {
        for command in self.commands.drain() {
            let change = self.view.apply(command, &mut self.scene, &self.camera);
            self.apply_change(change);
        }

        let elapsed = self.start_time.elapsed().as_secs_f32() * self.time_scale;
        self.animator.update(self.scene.bodies_mut(), elapsed);

        advance_camera(&mut self.view, &mut self.controls, &mut self.camera);

        self.apply_textures();

        let labels = layout_labels(&self.scene, &self.projection, &self.camera, self.viewport);
        let selected = self
            .view
            .selected()
            .and_then(|id| self.scene.body(id))
            .map(|body| body.name.clone());
        self.overlay.present(&OverlayFrame {
            labels,
            selected,
            pointer: self.pointer.position,
        });

        let view_proj = self.projection.view_projection(&self.camera);
        self.renderer
            .render(&self.scene, view_proj, self.camera.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, ControlsConfig, FocusConfig};
    use crate::focus::{focus_pose, FocusTransition};
    use glam::Vec3;

    #[test]
    fn drag_during_tween_keeps_camera_on_path() {
        let mut config = OrreryConfig::default();
        config.starfield.count = 0;
        let mut scene = Scene::from_config(&config);
        let home = CameraState::from(&CameraConfig::default());
        let mut camera = home;
        let mut view = ViewController::new(FocusConfig::default(), home);
        let mut controls = OrbitControls::new(ControlsConfig::default());

        view.on_pick(Some(BodyId(2)), &mut scene, &camera);
        let mut expected_path = FocusTransition::new(
            home,
            focus_pose(scene.body(BodyId(2)).unwrap(), FocusConfig::default().offset_factor),
            FocusConfig::default().step,
        );
        let mut expected = home;

        for _ in 0..5 {
            controls.drag(Vec2::new(400.0, -250.0));
            controls.scroll(3.0);
            advance_camera(&mut view, &mut controls, &mut camera);
            expected_path.step(&mut expected);
            assert_eq!(camera, expected);
        }
        assert!(controls.is_idle());
    }

    #[test]
    fn controls_move_camera_once_tween_is_done() {
        let home = CameraState::from(&CameraConfig::default());
        let mut camera = home;
        let mut view = ViewController::new(FocusConfig::default(), home);
        let mut controls = OrbitControls::new(ControlsConfig::default());

        controls.drag(Vec2::new(400.0, 0.0));
        advance_camera(&mut view, &mut controls, &mut camera);
        assert_ne!(camera.position, home.position);
        assert_eq!(camera.target, Vec3::ZERO);
    }

    #[test]
    fn digit_keys_focus_bodies() {
        assert_eq!(
            key_command(KeyCode::Digit1),
            Some(ViewCommand::Focus(BodyId(0)))
        );
        assert_eq!(
            key_command(KeyCode::Digit8),
            Some(ViewCommand::Focus(BodyId(7)))
        );
        assert_eq!(key_command(KeyCode::Escape), Some(ViewCommand::Reset));
        assert_eq!(key_command(KeyCode::KeyW), None);
    }

    #[test]
    fn short_press_is_click() {
        let mut pointer = PointerState::default();
        pointer.move_to(Vec2::new(100.0, 100.0));
        pointer.press();
        assert_eq!(pointer.move_to(Vec2::new(101.0, 101.0)), Some(Vec2::ONE));
        assert!(pointer.release(4.0));
    }

    #[test]
    fn long_drag_is_not_click() {
        let mut pointer = PointerState::default();
        pointer.press();
        pointer.move_to(Vec2::new(50.0, 0.0));
        assert!(!pointer.release(4.0));
        assert_eq!(pointer.move_to(Vec2::new(60.0, 0.0)), None);
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut pointer = PointerState::default();
        assert!(!pointer.release(4.0));
    }
}
