//! Per-frame orbit update.

use glam::Vec3;

use crate::scene::OrbitBody;

/// Position on a circular orbit in the XZ plane.
pub fn orbit_position(orbit_radius: f32, angular_speed: f32, elapsed: f32) -> Vec3 {
    let (sin, cos) = (elapsed * angular_speed).sin_cos();
    Vec3::new(orbit_radius * cos, 0.0, orbit_radius * sin)
}

/// Moves every body along its orbit and spins it.
#[derive(Debug, Clone, Copy)]
pub struct OrbitAnimator {
    spin_per_frame: f32,
}

impl OrbitAnimator {
    pub fn new(spin_per_frame: f32) -> Self {
        Self { spin_per_frame }
    }

    /// Positions depend only on `elapsed`; rotation grows by one spin step per call.
    pub fn update(&self, bodies: &mut [OrbitBody], elapsed: f32) {
        for body in bodies {
            body.position = orbit_position(body.orbit_radius, body.angular_speed, elapsed);
            body.rotation = (body.rotation + self.spin_per_frame) % std::f32::consts::TAU;
        }
    }
}
