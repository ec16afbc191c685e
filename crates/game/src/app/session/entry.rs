use engine::PrefsStore;
use tracing::{debug, info};

use super::presentation::Presentation;
use super::snapshot::{self, SessionSnapshot};
use super::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryOutcome {
    Resumed,
    TaggedSpawn,
    Cold,
}

impl<S: PrefsStore, P: Presentation> Session<S, P> {
    /// Runs once per gameplay level load, after the session actors exist. A stored snapshot
    /// for this level wins over the transition tag; the tag is consumed either way.
    pub(super) fn enter_gameplay_level(&mut self) -> EntryOutcome {
        let Some(level_name) = self.current_level_name().map(str::to_string) else {
            return EntryOutcome::Cold;
        };

        if let Some(player) = self.actors.player_mut() {
            if !player.active {
                player.active = true;
                info!(level = %level_name, "player_reactivated");
            }
        }

        if let Some(snapshot) = snapshot::try_resume(&mut self.prefs, &level_name) {
            self.apply_snapshot(&snapshot);
            self.actors.clear_transition_tag();
            return EntryOutcome::Resumed;
        }

        let tag = self.actors.transition_tag().to_string();
        self.actors.clear_transition_tag();
        if tag.is_empty() {
            return EntryOutcome::Cold;
        }

        let spawn = self
            .level
            .as_ref()
            .and_then(|level| level.def.entry_for_tag(&tag))
            .map(|entry| entry.position);
        let Some(spawn) = spawn else {
            debug!(level = %level_name, tag = %tag, "no_entry_for_tag; cold entry");
            return EntryOutcome::Cold;
        };

        match self.actors.player_mut() {
            Some(player) => player.position = spawn,
            None => debug!("tagged_spawn_skipped; no player"),
        }
        self.actors.bind_camera_to_player();
        self.presentation.fade_in();
        info!(level = %level_name, tag = %tag, position = %spawn, "player_placed_at_entry");
        EntryOutcome::TaggedSpawn
    }

    fn apply_snapshot(&mut self, snapshot: &SessionSnapshot) {
        match self.actors.player_mut() {
            Some(player) => player.position = snapshot.position,
            None => debug!("snapshot_position_skipped; no player"),
        }

        if let Some(value) = snapshot.health {
            let newly_dead = match self.actors.health_mut() {
                Some(health) => health.set_health(value),
                None => {
                    debug!("snapshot_health_skipped; no health tracker");
                    false
                }
            };
            if newly_dead {
                self.on_player_died();
            }
        }

        self.actors.bind_camera_to_player();
        self.presentation.fade_in();
        info!(
            level = %snapshot.level_name,
            position = %snapshot.position,
            health = ?snapshot.health,
            "snapshot_restored"
        );
    }
}
