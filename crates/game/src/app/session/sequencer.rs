use engine::PrefsStore;
use tracing::{debug, info, warn};

use super::presentation::{Cue, Presentation};
use super::{Session, SessionConfig, SessionTask};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransitionKind {
    /// Exit gate into `target`. The spawn tag rides on the session root.
    Standard { target: String },
    Terminal,
    Defeat,
    Immediate { target: String },
}

/// Single-slot guard: at most one transition runs, and it ends when its level loads.
#[derive(Debug, Default)]
pub(crate) struct TransitionSequencer {
    in_flight: Option<TransitionKind>,
}

impl TransitionSequencer {
    pub(crate) fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub(crate) fn try_begin(&mut self, kind: TransitionKind) -> bool {
        if let Some(current) = &self.in_flight {
            debug!(
                current = ?current,
                requested = ?kind,
                "transition_suppressed; already in flight"
            );
            return false;
        }
        self.in_flight = Some(kind);
        true
    }

    pub(crate) fn complete(&mut self) -> Option<TransitionKind> {
        self.in_flight.take()
    }

    pub(crate) fn target_level(&self, config: &SessionConfig) -> Option<String> {
        match self.in_flight.as_ref()? {
            TransitionKind::Standard { target } | TransitionKind::Immediate { target } => {
                Some(target.clone())
            }
            TransitionKind::Terminal => Some(config.victory_level.clone()),
            TransitionKind::Defeat => Some(config.defeat_level.clone()),
        }
    }
}

impl<S: PrefsStore, P: Presentation> Session<S, P> {
    /// Tag, cue, fade-out, teardown when leaving gameplay, then load after the settle wait.
    pub(crate) fn run_standard(&mut self, target: &str, tag: &str) -> bool {
        let Some(target_is_gameplay) = self.catalog.level(target).map(|def| def.role.is_gameplay())
        else {
            warn!(target, "transition_rejected; unknown target level");
            return false;
        };
        if !self.sequencer.try_begin(TransitionKind::Standard {
            target: target.to_string(),
        }) {
            return false;
        }

        info!(target, tag, "transition_started");
        self.actors.set_transition_tag(tag);
        self.presentation.play_cue(Cue::SceneTransition);
        self.presentation.fade_out();
        if !target_is_gameplay {
            self.teardown_session_actors("transition_to_non_gameplay");
        }
        self.schedule_pending_load();
        true
    }

    pub(crate) fn run_terminal(&mut self) -> bool {
        if !self.sequencer.try_begin(TransitionKind::Terminal) {
            return false;
        }

        info!(target = %self.config.victory_level, "terminal_transition_started");
        self.presentation.play_cue(Cue::SceneTransition);
        self.presentation.fade_out();
        self.teardown_session_actors("terminal_transition");
        self.schedule_pending_load();
        true
    }

    /// A running transition always lands first; defeat then follows from its target.
    pub(crate) fn run_defeat(&mut self) {
        if !self.sequencer.try_begin(TransitionKind::Defeat) {
            info!("defeat_deferred; waiting for running transition");
            self.defeat_deferred = true;
            return;
        }
        info!(target = %self.config.defeat_level, "defeat_transition_started");
        self.teardown_session_actors("defeat");
        let target = self.config.defeat_level.clone();
        if let Err(error) = self.load_level(&target) {
            warn!(error = %error, "defeat_load_failed");
            self.sequencer.complete();
        }
    }

    pub(crate) fn run_immediate(&mut self, target: &str) -> bool {
        if !self.sequencer.try_begin(TransitionKind::Immediate {
            target: target.to_string(),
        }) {
            return false;
        }
        if let Err(error) = self.load_level(target) {
            warn!(error = %error, "immediate_load_failed");
            self.sequencer.complete();
            return false;
        }
        true
    }

    fn schedule_pending_load(&mut self) {
        self.scheduler
            .schedule_after(self.config.settle_delay, SessionTask::LoadPending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_refused_until_complete() {
        let mut sequencer = TransitionSequencer::default();
        assert!(sequencer.try_begin(TransitionKind::Terminal));
        assert!(!sequencer.try_begin(TransitionKind::Defeat));

        assert_eq!(sequencer.complete(), Some(TransitionKind::Terminal));
        assert!(!sequencer.is_in_flight());
        assert!(sequencer.try_begin(TransitionKind::Defeat));
    }

    #[test]
    fn target_follows_kind() {
        let config = SessionConfig::default();
        let mut sequencer = TransitionSequencer::default();
        assert_eq!(sequencer.target_level(&config), None);

        sequencer.try_begin(TransitionKind::Standard {
            target: "Scene2".to_string(),
        });
        assert_eq!(sequencer.target_level(&config).as_deref(), Some("Scene2"));

        sequencer.complete();
        sequencer.try_begin(TransitionKind::Terminal);
        assert_eq!(sequencer.target_level(&config).as_deref(), Some("Win"));
    }
}
