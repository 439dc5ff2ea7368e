//! Camera tween toward a focused body and back to the overview pose.

use glam::Vec3;

use crate::camera::CameraState;
use crate::config::FocusConfig;
use crate::math::lerp_exact;
use crate::scene::OrbitBody;

/// Linear interpolation of camera position and target.
///
/// Progress is derived from a step counter rather than accumulated, so it is
/// exactly 1.0 after `ceil(1 / increment)` steps.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusTransition {
    pub start_position: Vec3,
    pub end_position: Vec3,
    pub start_target: Vec3,
    pub end_target: Vec3,
    increment: f32,
    steps: u32,
    steps_required: u32,
}

impl FocusTransition {
    pub fn new(from: CameraState, to: CameraState, increment: f32) -> Self {
        Self {
            start_position: from.position,
            end_position: to.position,
            start_target: from.target,
            end_target: to.target,
            increment,
            steps: 0,
            steps_required: steps_required(increment),
        }
    }

    pub fn progress(&self) -> f32 {
        if self.steps >= self.steps_required {
            1.0
        } else {
            (self.steps as f32 * self.increment).min(1.0)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.steps >= self.steps_required
    }

    /// Camera pose at the current progress.
    pub fn sample(&self) -> CameraState {
        let t = self.progress();
        CameraState::new(
            lerp_exact(self.start_position, self.end_position, t),
            lerp_exact(self.start_target, self.end_target, t),
        )
    }

    /// Advances one increment and writes the result to `camera`. No-op once finished.
    pub fn step(&mut self, camera: &mut CameraState) {
        if self.is_finished() {
            return;
        }
        self.steps += 1;
        *camera = self.sample();
    }
}

/// Number of steps a transition with this increment takes.
pub fn steps_required(increment: f32) -> u32 {
    ((1.0 / increment).ceil() as u32).max(1)
}

/// Camera pose looking at `body` from `+Z`, backed off by its size.
pub fn focus_pose(body: &OrbitBody, offset_factor: f32) -> CameraState {
    CameraState::new(
        body.position + Vec3::Z * body.visual_size * offset_factor,
        body.position,
    )
}

/// Holds at most one active transition.
#[derive(Debug, Clone)]
pub struct FocusAnimator {
    config: FocusConfig,
    home: CameraState,
    active: Option<FocusTransition>,
}

impl FocusAnimator {
    /// `home` is the overview pose a reset returns to.
    pub fn new(config: FocusConfig, home: CameraState) -> Self {
        Self {
            config,
            home,
            active: None,
        }
    }

    pub fn config(&self) -> &FocusConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn active(&self) -> Option<&FocusTransition> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Starts from wherever `camera` is now, replacing any in-flight transition.
    pub fn begin_focus(&mut self, camera: &CameraState, body: &OrbitBody) {
        let end = focus_pose(body, self.config.offset_factor);
        self.active = Some(FocusTransition::new(*camera, end, self.config.step));
    }

    pub fn begin_reset(&mut self, camera: &CameraState) {
        self.active = Some(FocusTransition::new(*camera, self.home, self.config.step));
    }

    /// Advances the active transition and drops it once it reaches the end.
    pub fn step(&mut self, camera: &mut CameraState) {
        if let Some(transition) = &mut self.active {
            transition.step(camera);
            if transition.is_finished() {
                self.active = None;
            }
        }
    }
}
