//! UI sink fed once per frame.

use glam::Vec2;

use crate::labels::{nearest_label, Label};

/// Hover radius around a label anchor, in pixels.
pub const HOVER_RADIUS: f32 = 24.0;

/// Per-frame snapshot handed to the UI layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayFrame {
    pub labels: Vec<Label>,
    pub selected: Option<String>,
    /// Cursor position in pixels.
    pub pointer: Vec2,
}

impl OverlayFrame {
    /// Name of the label under the pointer, if any.
    pub fn hovered(&self) -> Option<&str> {
        nearest_label(&self.labels, self.pointer, HOVER_RADIUS).map(|label| label.name.as_str())
    }
}

pub trait Overlay {
    fn present(&mut self, frame: &OverlayFrame);
}

/// Caption for the window title bar.
pub fn title_for(frame: &OverlayFrame) -> String {
    let mut title = String::from("Orrery");
    if let Some(selected) = &frame.selected {
        title.push_str(" - ");
        title.push_str(selected);
    }
    if let Some(hovered) = frame.hovered() {
        if frame.selected.as_deref() != Some(hovered) {
            title.push_str(&format!(" ({hovered})"));
        }
    }
    title
}

/// Shows the selection and the label under the cursor in the window title.
pub struct TitleOverlay<F: FnMut(&str)> {
    set_title: F,
    last: String,
}

impl<F: FnMut(&str)> TitleOverlay<F> {
    pub fn new(set_title: F) -> Self {
        Self {
            set_title,
            last: String::new(),
        }
    }
}

impl<F: FnMut(&str)> Overlay for TitleOverlay<F> {
    fn present(&mut self, frame: &OverlayFrame) {
        let title = title_for(frame);
        if title != self.last {
            (self.set_title)(&title);
            self.last = title;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::BodyId;

    fn label(id: usize, name: &str, x: f32, y: f32) -> Label {
        Label {
            body: BodyId(id),
            name: name.into(),
            anchor: Vec2::new(x, y),
        }
    }

    fn frame_with_labels() -> OverlayFrame {
        OverlayFrame {
            labels: vec![label(2, "Earth", 100.0, 100.0), label(3, "Mars", 300.0, 120.0)],
            ..OverlayFrame::default()
        }
    }

    #[test]
    fn hover_follows_label_anchors() {
        let mut frame = frame_with_labels();
        frame.pointer = Vec2::new(295.0, 118.0);
        assert_eq!(frame.hovered(), Some("Mars"));
        frame.pointer = Vec2::new(200.0, 300.0);
        assert_eq!(frame.hovered(), None);
    }

    #[test]
    fn title_variants() {
        let mut frame = frame_with_labels();
        frame.pointer = Vec2::new(-100.0, -100.0);
        assert_eq!(title_for(&frame), "Orrery");
        frame.pointer = Vec2::new(300.0, 120.0);
        assert_eq!(title_for(&frame), "Orrery (Mars)");
        frame.selected = Some("Earth".into());
        assert_eq!(title_for(&frame), "Orrery - Earth (Mars)");
        frame.pointer = Vec2::new(101.0, 99.0);
        assert_eq!(title_for(&frame), "Orrery - Earth");
    }

    #[test]
    fn no_labels_means_no_hover() {
        let frame = OverlayFrame {
            pointer: Vec2::new(100.0, 100.0),
            ..OverlayFrame::default()
        };
        assert_eq!(title_for(&frame), "Orrery");
    }

    #[test]
    fn title_overlay_only_writes_changes() {
        let mut writes = Vec::new();
        {
            let mut overlay = TitleOverlay::new(|t: &str| writes.push(t.to_string()));
            let frame = OverlayFrame {
                selected: Some("Venus".into()),
                ..OverlayFrame::default()
            };
            overlay.present(&frame);
            overlay.present(&frame);
            overlay.present(&OverlayFrame::default());
        }
        assert_eq!(writes, vec!["Orrery - Venus", "Orrery"]);
    }
}
