//! Overview/focused view state and the command handle given to the UI layer.

use log::{debug, info};
use tokio::sync::mpsc;

use crate::camera::CameraState;
use crate::config::FocusConfig;
use crate::focus::FocusAnimator;
use crate::scene::{BodyId, Scene, TextureHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Overview,
    Focused(BodyId),
}

/// Requests from the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    Focus(BodyId),
    FocusByName(String),
    Reset,
}

/// Cloneable handle the UI uses to drive the view.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<ViewCommand>,
}

impl CommandSender {
    /// Returns false once the view has been torn down.
    pub fn send(&self, command: ViewCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn focus_by_name(&self, name: impl Into<String>) -> bool {
        self.send(ViewCommand::FocusByName(name.into()))
    }
}

/// Frame-side end of the command channel.
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::UnboundedReceiver<ViewCommand>,
}

impl CommandReceiver {
    /// Everything queued since the last frame.
    pub fn drain(&mut self) -> Vec<ViewCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = self.rx.try_recv() {
            commands.push(command);
        }
        commands
    }
}

pub fn command_channel() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandSender { tx }, CommandReceiver { rx })
}

/// What changed, so the caller can request or release textures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewChange {
    Focused(BodyId),
    Reset { released: Vec<TextureHandle> },
}

/// `Overview -> Focused(body) -> Overview`, plus the camera tween that goes with it.
#[derive(Debug)]
pub struct ViewController {
    state: ViewState,
    focus: FocusAnimator,
}

impl ViewController {
    pub fn new(config: FocusConfig, home: CameraState) -> Self {
        Self {
            state: ViewState::Overview,
            focus: FocusAnimator::new(config, home),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn selected(&self) -> Option<BodyId> {
        match self.state {
            ViewState::Focused(id) => Some(id),
            ViewState::Overview => None,
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.focus.is_active()
    }

    /// A hit focuses; a miss resets only when something is focused.
    pub fn on_pick(
        &mut self,
        hit: Option<BodyId>,
        scene: &mut Scene,
        camera: &CameraState,
    ) -> Option<ViewChange> {
        match hit {
            Some(id) => self.focus_on(id, scene, camera),
            None => self.reset(scene, camera),
        }
    }

    pub fn apply(
        &mut self,
        command: ViewCommand,
        scene: &mut Scene,
        camera: &CameraState,
    ) -> Option<ViewChange> {
        match command {
            ViewCommand::Focus(id) => self.focus_on(id, scene, camera),
            ViewCommand::FocusByName(name) => match scene.find(&name) {
                Some(id) => self.focus_on(id, scene, camera),
                None => {
                    debug!("ignoring focus request for unknown body {name:?}");
                    None
                }
            },
            ViewCommand::Reset => self.reset(scene, camera),
        }
    }

    pub fn focus_on(
        &mut self,
        id: BodyId,
        scene: &mut Scene,
        camera: &CameraState,
    ) -> Option<ViewChange> {
        let magnification = self.focus.config().magnification;
        let body = scene.body(id)?;
        info!("focusing {}", body.name);
        self.focus.begin_focus(camera, body);
        scene.highlight(id, magnification);
        self.state = ViewState::Focused(id);
        Some(ViewChange::Focused(id))
    }

    /// No-op in `Overview`.
    pub fn reset(&mut self, scene: &mut Scene, camera: &CameraState) -> Option<ViewChange> {
        if self.state == ViewState::Overview {
            return None;
        }
        info!("returning to overview");
        self.focus.begin_reset(camera);
        let released = scene.clear_highlight();
        self.state = ViewState::Overview;
        Some(ViewChange::Reset { released })
    }

    /// Advances the camera tween, if any.
    pub fn step(&mut self, camera: &mut CameraState) {
        self.focus.step(camera);
    }
}
