use engine::{ActorHandle, ActorKind, SingletonRegistry, Vec3};
use tracing::debug;

use super::health::HealthState;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlayerActor {
    pub(crate) position: Vec3,
    /// Inactive players are hidden: no movement and no snapshot-worthy state changes.
    pub(crate) active: bool,
    pub(crate) stamina: u32,
    pub(crate) max_stamina: u32,
}

impl PlayerActor {
    fn spawn(position: Vec3, max_stamina: u32) -> Self {
        Self {
            position,
            active: true,
            stamina: max_stamina,
            max_stamina,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CameraRig {
    pub(crate) follow: Option<ActorHandle>,
}

/// Carries the process-wide transition tag plus session counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SessionRoot {
    pub(crate) transition_tag: String,
    pub(crate) gold: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UiRoot {
    pub(crate) hud_visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SessionActor {
    Player(PlayerActor),
    Camera(CameraRig),
    HealthTracker(HealthState),
    SessionRoot(SessionRoot),
    UiRoot(UiRoot),
}

#[derive(Debug, Default)]
pub(crate) struct SessionActors {
    registry: SingletonRegistry<SessionActor>,
}

impl SessionActors {
    /// Registers whichever session actors are missing. Live ones carry over untouched.
    pub(crate) fn ensure_all(&mut self, player_start: Vec3, max_health: i32, max_stamina: u32) {
        self.registry.register_with(ActorKind::Player, || {
            SessionActor::Player(PlayerActor::spawn(player_start, max_stamina))
        });
        self.registry.register_with(ActorKind::HealthTracker, || {
            SessionActor::HealthTracker(HealthState::new(max_health))
        });
        self.registry.register_with(ActorKind::SessionRoot, || {
            SessionActor::SessionRoot(SessionRoot::default())
        });
        self.registry.register_with(ActorKind::UiRoot, || {
            SessionActor::UiRoot(UiRoot { hud_visible: true })
        });
        let fresh_camera = !self.contains(ActorKind::Camera);
        self.registry
            .register_with(ActorKind::Camera, || SessionActor::Camera(CameraRig::default()));
        if fresh_camera {
            self.bind_camera_to_player();
        }
    }

    pub(crate) fn teardown_all(&mut self, kinds: &[ActorKind]) -> Vec<ActorKind> {
        self.registry.teardown_all(kinds)
    }

    pub(crate) fn contains(&self, kind: ActorKind) -> bool {
        self.registry.contains(kind)
    }

    pub(crate) fn live_count(&self) -> usize {
        self.registry.live_count()
    }

    pub(crate) fn player(&self) -> Option<&PlayerActor> {
        match self.registry.lookup(ActorKind::Player)? {
            SessionActor::Player(player) => Some(player),
            _ => None,
        }
    }

    pub(crate) fn player_mut(&mut self) -> Option<&mut PlayerActor> {
        match self.registry.lookup_mut(ActorKind::Player)? {
            SessionActor::Player(player) => Some(player),
            _ => None,
        }
    }

    pub(crate) fn health(&self) -> Option<&HealthState> {
        match self.registry.lookup(ActorKind::HealthTracker)? {
            SessionActor::HealthTracker(health) => Some(health),
            _ => None,
        }
    }

    pub(crate) fn health_mut(&mut self) -> Option<&mut HealthState> {
        match self.registry.lookup_mut(ActorKind::HealthTracker)? {
            SessionActor::HealthTracker(health) => Some(health),
            _ => None,
        }
    }

    pub(crate) fn root(&self) -> Option<&SessionRoot> {
        match self.registry.lookup(ActorKind::SessionRoot)? {
            SessionActor::SessionRoot(root) => Some(root),
            _ => None,
        }
    }

    pub(crate) fn root_mut(&mut self) -> Option<&mut SessionRoot> {
        match self.registry.lookup_mut(ActorKind::SessionRoot)? {
            SessionActor::SessionRoot(root) => Some(root),
            _ => None,
        }
    }

    pub(crate) fn ui(&self) -> Option<&UiRoot> {
        match self.registry.lookup(ActorKind::UiRoot)? {
            SessionActor::UiRoot(ui) => Some(ui),
            _ => None,
        }
    }

    fn camera_mut(&mut self) -> Option<&mut CameraRig> {
        match self.registry.lookup_mut(ActorKind::Camera)? {
            SessionActor::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Points the camera at the live player. Returns false when either is missing.
    pub(crate) fn bind_camera_to_player(&mut self) -> bool {
        let Some(player) = self.registry.handle(ActorKind::Player) else {
            debug!("camera_bind_skipped; no player");
            return false;
        };
        let Some(camera) = self.camera_mut() else {
            debug!("camera_bind_skipped; no camera");
            return false;
        };
        camera.follow = Some(player);
        true
    }

    /// The player the camera is following, if that exact registration is still live.
    pub(crate) fn camera_target(&self) -> Option<&PlayerActor> {
        let SessionActor::Camera(camera) = self.registry.lookup(ActorKind::Camera)? else {
            return None;
        };
        match self.registry.resolve(camera.follow?)? {
            SessionActor::Player(player) => Some(player),
            _ => None,
        }
    }

    pub(crate) fn transition_tag(&self) -> &str {
        self.root()
            .map(|root| root.transition_tag.as_str())
            .unwrap_or_default()
    }

    pub(crate) fn set_transition_tag(&mut self, tag: &str) {
        match self.root_mut() {
            Some(root) => root.transition_tag = tag.to_string(),
            None => debug!(tag, "transition_tag_skipped; no session root"),
        }
    }

    pub(crate) fn clear_transition_tag(&mut self) {
        if let Some(root) = self.root_mut() {
            root.transition_tag.clear();
        }
    }
}
