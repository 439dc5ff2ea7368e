//! Screen-space label anchors.

use glam::Vec2;

use crate::camera::{CameraState, Projection, Viewport};
use crate::scene::{BodyId, Scene};

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub body: BodyId,
    pub name: String,
    /// Pixel position, origin top-left.
    pub anchor: Vec2,
}

/// One label per body in front of the camera.
pub fn layout_labels(
    scene: &Scene,
    projection: &Projection,
    camera: &CameraState,
    viewport: Viewport,
) -> Vec<Label> {
    scene
        .ids()
        .zip(scene.bodies())
        .filter_map(|(id, body)| {
            projection
                .project(camera, viewport, body.position)
                .map(|anchor| Label {
                    body: id,
                    name: body.name.clone(),
                    anchor,
                })
        })
        .collect()
}

/// Label whose anchor is closest to `pointer`, within `radius` pixels.
pub fn nearest_label(labels: &[Label], pointer: Vec2, radius: f32) -> Option<&Label> {
    labels
        .iter()
        .map(|label| (label, label.anchor.distance(pointer)))
        .filter(|(_, d)| *d <= radius)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(label, _)| label)
}
