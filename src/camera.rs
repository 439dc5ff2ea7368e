//! Camera pose, projection and orbit controls.
//!
//! `CameraState` is the only thing the focus tween and the controls write to.
//! Everything else (view/projection matrices, pick rays, label anchors) is
//! derived from it on demand.

use glam::{Mat4, Vec2, Vec3};

use crate::config::{CameraConfig, ControlsConfig};
use crate::math::Ray;

/// Where the camera is and what it looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub target: Vec3,
}

impl CameraState {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self { position, target }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }
}

impl From<&CameraConfig> for CameraState {
    fn from(config: &CameraConfig) -> Self {
        Self::new(config.position.into(), config.target.into())
    }
}

/// Window size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1) as f32,
            height: height.max(1) as f32,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Pixel coordinates (origin top-left) to normalized device coordinates.
    pub fn to_ndc(&self, pixel: Vec2) -> Vec2 {
        Vec2::new(
            2.0 * pixel.x / self.width - 1.0,
            1.0 - 2.0 * pixel.y / self.height,
        )
    }

    pub fn from_ndc(&self, ndc: Vec2) -> Vec2 {
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.width,
            (1.0 - ndc.y) * 0.5 * self.height,
        )
    }
}

/// Perspective projection, depth mapped to `[0, 1]` as wgpu expects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Projection {
    pub fn new(config: &CameraConfig, viewport: Viewport) -> Self {
        Self {
            fov_y: config.fov_degrees.to_radians(),
            aspect: viewport.aspect(),
            near: config.near,
            far: config.far,
        }
    }

    /// Call on window resize.
    pub fn resize(&mut self, viewport: Viewport) {
        self.aspect = viewport.aspect();
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self, camera: &CameraState) -> Mat4 {
        self.matrix() * camera.view_matrix()
    }

    /// Ray from the eye through a pixel.
    pub fn screen_ray(&self, camera: &CameraState, viewport: Viewport, pixel: Vec2) -> Ray {
        let ndc = viewport.to_ndc(pixel);
        let inverse = self.view_projection(camera).inverse();
        let near = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc.x, ndc.y, 1.0));
        Ray::new(camera.position, far - near)
    }

    /// Pixel position of a world point, or `None` when it is not in front of the camera.
    pub fn project(&self, camera: &CameraState, viewport: Viewport, world: Vec3) -> Option<Vec2> {
        let clip = self.view_projection(camera) * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if !(0.0..=1.0).contains(&ndc.z) {
            return None;
        }
        Some(viewport.from_ndc(Vec2::new(ndc.x, ndc.y)))
    }
}

/// Drag-to-orbit and scroll-to-zoom around `CameraState::target`, with damping.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    config: ControlsConfig,
    /// Pending (azimuth, polar) change in radians.
    rotate_delta: Vec2,
    /// Pending log-distance change.
    zoom_delta: f32,
}

const POLAR_MARGIN: f32 = 0.01;

impl OrbitControls {
    pub fn new(config: ControlsConfig) -> Self {
        Self {
            config,
            rotate_delta: Vec2::ZERO,
            zoom_delta: 0.0,
        }
    }

    pub fn config(&self) -> &ControlsConfig {
        &self.config
    }

    /// Pointer dragged by `delta` pixels.
    pub fn drag(&mut self, delta: Vec2) {
        self.rotate_delta -= delta * self.config.rotate_speed;
    }

    /// Scrolled by `lines`; positive moves closer.
    pub fn scroll(&mut self, lines: f32) {
        self.zoom_delta -= lines * self.config.zoom_speed;
    }

    /// Drops pending motion, e.g. when a focus transition takes over.
    pub fn cancel(&mut self) {
        self.rotate_delta = Vec2::ZERO;
        self.zoom_delta = 0.0;
    }

    pub fn is_idle(&self) -> bool {
        self.rotate_delta.length_squared() < 1e-12 && self.zoom_delta.abs() < 1e-6
    }

    /// Applies a damped share of the pending motion to `camera`.
    pub fn update(&mut self, camera: &mut CameraState) {
        if self.is_idle() {
            self.cancel();
            return;
        }
        let damping = self.config.damping_factor.clamp(0.0, 1.0);

        let offset = camera.position - camera.target;
        let mut radius = offset.length();
        if radius <= f32::EPSILON {
            self.cancel();
            return;
        }
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        azimuth += self.rotate_delta.x * damping;
        polar = (polar + self.rotate_delta.y * damping)
            .clamp(POLAR_MARGIN, std::f32::consts::PI - POLAR_MARGIN);
        radius = (radius * (self.zoom_delta * damping).exp())
            .clamp(self.config.min_distance, self.config.max_distance);

        let (sin_polar, cos_polar) = polar.sin_cos();
        let (sin_az, cos_az) = azimuth.sin_cos();
        camera.position = camera.target
            + Vec3::new(
                radius * sin_polar * sin_az,
                radius * cos_polar,
                radius * sin_polar * cos_az,
            );

        self.rotate_delta *= 1.0 - damping;
        self.zoom_delta *= 1.0 - damping;
    }
}
