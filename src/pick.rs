//! Pointer picking against body spheres.

use glam::{Vec2, Vec3};

use crate::camera::{CameraState, Projection, Viewport};
use crate::math::Ray;
use crate::scene::{BodyId, Scene};

/// A body under the pointer and how far along the ray it was hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub body: BodyId,
    pub distance: f32,
    /// World-space point where the ray enters the sphere.
    pub point: Vec3,
}

/// Nearest body intersected by `ray`.
pub fn pick_ray(scene: &Scene, ray: &Ray) -> Option<PickHit> {
    scene
        .ids()
        .zip(scene.bodies())
        .filter_map(|(id, body)| {
            ray.intersect_sphere(body.position, body.display_radius())
                .map(|distance| PickHit {
                    body: id,
                    distance,
                    point: ray.at(distance),
                })
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Nearest body under a pixel.
pub fn pick(
    scene: &Scene,
    projection: &Projection,
    camera: &CameraState,
    viewport: Viewport,
    pointer: Vec2,
) -> Option<PickHit> {
    let ray = projection.screen_ray(camera, viewport, pointer);
    pick_ray(scene, &ray)
}
