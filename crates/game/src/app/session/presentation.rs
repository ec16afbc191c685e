use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cue {
    SceneTransition,
    ButtonClick,
    PlayerHurt,
    PlayerDeath,
    EnemyDeath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MusicTrack {
    Menu,
    Gameplay,
    Boss,
    Defeat,
}

/// One-way calls into audio, fades and HUD widgets. Implementations hold no session state.
pub(crate) trait Presentation {
    fn fade_out(&mut self);
    fn fade_in(&mut self);
    fn play_cue(&mut self, cue: Cue);
    fn play_music(&mut self, track: MusicTrack);
    fn set_health_bar(&mut self, current: i32, max: i32);
}

#[derive(Debug, Default)]
pub(crate) struct TracingPresentation {
    current_track: Option<MusicTrack>,
}

impl Presentation for TracingPresentation {
    fn fade_out(&mut self) {
        debug!("fade_out");
    }

    fn fade_in(&mut self) {
        debug!("fade_in");
    }

    fn play_cue(&mut self, cue: Cue) {
        debug!(cue = ?cue, "cue_played");
    }

    fn play_music(&mut self, track: MusicTrack) {
        if self.current_track == Some(track) {
            return;
        }
        self.current_track = Some(track);
        info!(track = ?track, "music_changed");
    }

    fn set_health_bar(&mut self, current: i32, max: i32) {
        debug!(current, max, "health_bar_updated");
    }
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PresentationEvent {
    FadeOut,
    FadeIn,
    Cue(Cue),
    Music(MusicTrack),
    HealthBar { current: i32, max: i32 },
}

#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingPresentation {
    pub(crate) events: Vec<PresentationEvent>,
}

#[cfg(test)]
impl RecordingPresentation {
    pub(crate) fn count(&self, event: &PresentationEvent) -> usize {
        self.events.iter().filter(|seen| *seen == event).count()
    }

    pub(crate) fn last_music(&self) -> Option<MusicTrack> {
        self.events.iter().rev().find_map(|event| match event {
            PresentationEvent::Music(track) => Some(*track),
            _ => None,
        })
    }

    pub(crate) fn last_health_bar(&self) -> Option<(i32, i32)> {
        self.events.iter().rev().find_map(|event| match event {
            PresentationEvent::HealthBar { current, max } => Some((*current, *max)),
            _ => None,
        })
    }
}

#[cfg(test)]
impl Presentation for RecordingPresentation {
    fn fade_out(&mut self) {
        self.events.push(PresentationEvent::FadeOut);
    }

    fn fade_in(&mut self) {
        self.events.push(PresentationEvent::FadeIn);
    }

    fn play_cue(&mut self, cue: Cue) {
        self.events.push(PresentationEvent::Cue(cue));
    }

    fn play_music(&mut self, track: MusicTrack) {
        self.events.push(PresentationEvent::Music(track));
    }

    fn set_health_bar(&mut self, current: i32, max: i32) {
        self.events.push(PresentationEvent::HealthBar { current, max });
    }
}
