mod actors;
mod config;
mod entry;
mod gate;
mod health;
mod pickup;
mod presentation;
mod sequencer;
mod snapshot;


use std::collections::VecDeque;
use std::time::Duration;

use engine::{
    ActorKind, LevelCatalog, LevelDef, LevelRole, PrefsStore, SimScheduler, TaskId, Vec3,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use actors::SessionActors;
use gate::{ExitGate, GateState};
use pickup::PickupKind;
use presentation::{Cue, MusicTrack};
use sequencer::TransitionSequencer;
use snapshot::SessionSnapshot;

pub(crate) use config::SessionConfig;
pub(crate) use health::DamageOutcome;
pub(crate) use presentation::{Presentation, TracingPresentation};

#[cfg(test)]
pub(crate) use presentation::RecordingPresentation;

const LOAD_HISTORY_LIMIT: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SessionError {
    #[error("{role} level '{name}' is not in the level catalog")]
    UnknownConfiguredLevel { role: &'static str, name: String },
    #[error("{role} level '{name}' must have role {expected:?} but has {actual:?}")]
    WrongConfiguredRole {
        role: &'static str,
        name: String,
        expected: LevelRole,
        actual: LevelRole,
    },
    #[error("unknown level '{0}'")]
    UnknownLevel(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionTask {
    LoadPending,
    EndDamageRecovery,
    DeathTransition,
}

#[derive(Debug, Clone)]
struct LoadedLevel {
    def: LevelDef,
    live_hostiles: u32,
    gates: Vec<ExitGate>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExitStatus {
    pub(crate) target: String,
    pub(crate) tag: String,
    pub(crate) gated: bool,
    pub(crate) state: GateState,
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionStatus {
    pub(crate) level: Option<String>,
    pub(crate) live_hostiles: u32,
    pub(crate) exits: Vec<ExitStatus>,
    pub(crate) player_position: Option<Vec3>,
    pub(crate) player_active: Option<bool>,
    pub(crate) stamina: Option<u32>,
    pub(crate) health: Option<i32>,
    pub(crate) max_health: Option<i32>,
    pub(crate) is_dead: Option<bool>,
    pub(crate) invulnerable: Option<bool>,
    pub(crate) gold: Option<u32>,
    pub(crate) hud_visible: Option<bool>,
    pub(crate) transition_tag: String,
    pub(crate) transition_in_flight: bool,
    pub(crate) live_singletons: usize,
    pub(crate) sim_time_ms: u64,
    pub(crate) recent_levels: Vec<String>,
}

/// Owns every piece of cross-level session state and drives it from the fixed tick.
pub(crate) struct Session<S: PrefsStore, P: Presentation> {
    config: SessionConfig,
    catalog: LevelCatalog,
    prefs: S,
    presentation: P,
    actors: SessionActors,
    scheduler: SimScheduler<SessionTask>,
    sequencer: TransitionSequencer,
    level: Option<LoadedLevel>,
    load_history: VecDeque<String>,
    recovery_task: Option<TaskId>,
    death_task: Option<TaskId>,
    defeat_deferred: bool,
}

impl<S: PrefsStore, P: Presentation> Session<S, P> {
    pub(crate) fn new(
        config: SessionConfig,
        catalog: LevelCatalog,
        prefs: S,
        presentation: P,
    ) -> Result<Self, SessionError> {
        validate_config(&config, &catalog)?;
        Ok(Self {
            config,
            catalog,
            prefs,
            presentation,
            actors: SessionActors::default(),
            scheduler: SimScheduler::new(),
            sequencer: TransitionSequencer::default(),
            level: None,
            load_history: VecDeque::new(),
            recovery_task: None,
            death_task: None,
            defeat_deferred: false,
        })
    }

    pub(crate) fn start(&mut self) -> Result<(), SessionError> {
        let start_level = self.config.start_level.clone();
        info!(level = %start_level, "session_start");
        self.load_level(&start_level)
    }

    /// Advances simulation time, dispatches due tasks and re-evaluates exit gates.
    pub(crate) fn tick(&mut self, dt: Duration) {
        for task in self.scheduler.advance(dt) {
            self.dispatch(task);
        }
        self.refresh_gates();
    }

    fn dispatch(&mut self, task: SessionTask) {
        match task {
            SessionTask::LoadPending => {
                match self.sequencer.target_level(&self.config) {
                    Some(target) => {
                        if let Err(error) = self.load_level(&target) {
                            warn!(error = %error, "transition_load_failed");
                            self.sequencer.complete();
                        }
                    }
                    None => debug!("pending_load_without_transition; skipping"),
                }
                if std::mem::take(&mut self.defeat_deferred) {
                    self.run_defeat();
                }
            }
            SessionTask::EndDamageRecovery => {
                self.recovery_task = None;
                match self.actors.health_mut() {
                    Some(health) => health.end_recovery(),
                    None => debug!("damage_recovery_skipped; no health tracker"),
                }
            }
            SessionTask::DeathTransition => {
                self.death_task = None;
                self.run_defeat();
            }
        }
    }

    /// Loads `name` now. Non-gameplay levels tear down every session singleton; gameplay
    /// levels recreate missing ones and run the entry handler.
    pub(crate) fn load_level(&mut self, name: &str) -> Result<(), SessionError> {
        let def = self
            .catalog
            .level(name)
            .cloned()
            .ok_or_else(|| SessionError::UnknownLevel(name.to_string()))?;

        if def.role.is_gameplay() {
            self.actors.ensure_all(
                def.player_start,
                self.config.max_health,
                self.config.max_stamina,
            );
        } else {
            self.teardown_session_actors("non_gameplay_level");
        }

        let gates = def
            .exits
            .iter()
            .map(|exit| ExitGate::new(exit, def.restricted))
            .collect();
        let is_gameplay = def.role.is_gameplay();
        let music = music_for(&def);
        self.level = Some(LoadedLevel {
            live_hostiles: def.initial_hostiles,
            gates,
            def,
        });

        if self.load_history.len() == LOAD_HISTORY_LIMIT {
            self.load_history.pop_front();
        }
        self.load_history.push_back(name.to_string());
        let completed = self.sequencer.complete();
        self.presentation.play_music(music);
        info!(
            level = name,
            transition = ?completed,
            live_singletons = self.actors.live_count(),
            "level_loaded"
        );

        if is_gameplay {
            let outcome = self.enter_gameplay_level();
            debug!(level = name, outcome = ?outcome, "level_entered");
            self.sync_health_bar();
        }
        Ok(())
    }

    pub(crate) fn request_load(&mut self, name: &str) -> Result<bool, SessionError> {
        if !self.catalog.contains(name) {
            return Err(SessionError::UnknownLevel(name.to_string()));
        }
        Ok(self.run_immediate(name))
    }

    pub(crate) fn overlap_exit(&mut self, index: usize) -> bool {
        let Some(level) = &self.level else {
            debug!(index, "exit_overlap_ignored; no level loaded");
            return false;
        };
        let Some(gate) = level.gates.get(index) else {
            debug!(index, "exit_overlap_ignored; no such exit");
            return false;
        };
        if !gate.is_open() {
            debug!(index, hostiles = level.live_hostiles, "exit_closed");
            return false;
        }
        if self.actors.health().is_some_and(|health| health.is_dead()) {
            debug!(index, "exit_overlap_ignored; player dead");
            return false;
        }

        if level.def.finale && level.live_hostiles == 0 {
            self.run_terminal()
        } else {
            let target = gate.target_level().to_string();
            let tag = gate.transition_tag().to_string();
            self.run_standard(&target, &tag)
        }
    }

    /// Saves the player's whereabouts and drops to the suspend menu.
    pub(crate) fn suspend(&mut self) -> bool {
        let Some(level) = &self.level else {
            debug!("suspend_ignored; no level loaded");
            return false;
        };
        if !level.def.role.is_gameplay() {
            debug!(level = %level.def.name, "suspend_ignored; not a gameplay level");
            return false;
        }
        let level_name = level.def.name.clone();
        let Some(position) = self.actors.player().map(|player| player.position) else {
            debug!("suspend_ignored; no player");
            return false;
        };
        if self.sequencer.is_in_flight() {
            debug!("suspend_suppressed; transition in flight");
            return false;
        }

        let snapshot = SessionSnapshot {
            level_name,
            position,
            health: self.actors.health().map(|health| health.current()),
        };
        snapshot::write_snapshot(&mut self.prefs, &snapshot);
        if let Some(player) = self.actors.player_mut() {
            player.active = false;
        }
        let target = self.config.suspend_menu_level.clone();
        self.run_immediate(&target)
    }

    pub(crate) fn continue_game(&mut self) -> bool {
        if !self.current_role_is(LevelRole::SuspendMenu) {
            debug!("continue_ignored; not in suspend menu");
            return false;
        }
        self.presentation.play_cue(Cue::ButtonClick);
        let target = match snapshot::stored_level(&self.prefs) {
            Some(level) if self.catalog.level(&level).is_some_and(|def| def.role.is_gameplay()) => {
                level
            }
            Some(level) => {
                warn!(level = %level, "stored_level_not_resumable; using default");
                self.config.default_resume_level.clone()
            }
            None => self.config.default_resume_level.clone(),
        };
        self.run_immediate(&target)
    }

    pub(crate) fn exit_to_main_menu(&mut self) -> bool {
        if !self.current_role_is(LevelRole::SuspendMenu) {
            debug!("main_menu_ignored; not in suspend menu");
            return false;
        }
        self.presentation.play_cue(Cue::ButtonClick);
        snapshot::clear(&mut self.prefs);
        let target = self.config.main_menu_level.clone();
        self.run_immediate(&target)
    }

    pub(crate) fn start_new_game(&mut self) -> bool {
        if !(self.current_role_is(LevelRole::Victory) || self.current_role_is(LevelRole::Defeat)) {
            debug!("start_ignored; not on a menu screen");
            return false;
        }
        self.presentation.play_cue(Cue::ButtonClick);
        let target = self.config.start_level.clone();
        self.run_immediate(&target)
    }

    pub(crate) fn damage_player(&mut self, amount: i32) -> DamageOutcome {
        if !self.current_is_gameplay() {
            return DamageOutcome::Ignored;
        }
        let Some(health) = self.actors.health_mut() else {
            debug!("damage_skipped; no health tracker");
            return DamageOutcome::Ignored;
        };
        let outcome = health.take_damage(amount);
        match outcome {
            DamageOutcome::Ignored => {}
            DamageOutcome::Hurt => {
                self.presentation.play_cue(Cue::PlayerHurt);
                self.start_recovery_window();
            }
            DamageOutcome::Died => {
                self.presentation.play_cue(Cue::PlayerHurt);
                self.on_player_died();
            }
        }
        self.sync_health_bar();
        outcome
    }

    pub(crate) fn heal_player(&mut self) -> bool {
        let Some(health) = self.actors.health_mut() else {
            debug!("heal_skipped; no health tracker");
            return false;
        };
        let healed = health.heal();
        if healed {
            self.sync_health_bar();
        }
        healed
    }

    pub(crate) fn collect_pickup(&mut self, raw_kind: &str) -> bool {
        let kind = match raw_kind.parse::<PickupKind>() {
            Ok(kind) => kind,
            Err(error) => {
                warn!(error = %error, "pickup_ignored");
                return false;
            }
        };
        if !self.current_is_gameplay() || self.actors.player().is_none() {
            debug!(kind = %kind, "pickup_skipped; no active gameplay");
            return false;
        }

        let applied = match kind {
            PickupKind::GoldCoin => match self.actors.root_mut() {
                Some(root) => {
                    root.gold = root.gold.saturating_add(1);
                    true
                }
                None => false,
            },
            PickupKind::HealthGlobe => self.heal_player(),
            PickupKind::StaminaGlobe => match self.actors.player_mut() {
                Some(player) if player.stamina < player.max_stamina => {
                    player.stamina += 1;
                    true
                }
                _ => false,
            },
        };
        debug!(kind = %kind, applied, "pickup_collected");
        applied
    }

    /// Moves the player by `delta` while it is active, alive and not mid-transition.
    pub(crate) fn move_player(&mut self, delta: Vec3) -> bool {
        if self.sequencer.is_in_flight() || !delta.is_finite() {
            return false;
        }
        if self.actors.health().is_some_and(|health| health.is_dead()) {
            return false;
        }
        match self.actors.player_mut() {
            Some(player) if player.active => {
                player.position = player.position.translated(delta);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn kill_hostiles(&mut self, count: u32) -> u32 {
        let Some(level) = self.level.as_mut() else {
            return 0;
        };
        let killed = count.min(level.live_hostiles);
        level.live_hostiles -= killed;
        let remaining = level.live_hostiles;
        for _ in 0..killed {
            self.presentation.play_cue(Cue::EnemyDeath);
        }
        self.refresh_gates();
        debug!(killed, remaining, "hostiles_killed");
        remaining
    }

    pub(crate) fn spawn_hostiles(&mut self, count: u32) -> u32 {
        let Some(level) = self.level.as_mut() else {
            return 0;
        };
        level.live_hostiles = level.live_hostiles.saturating_add(count);
        let remaining = level.live_hostiles;
        self.refresh_gates();
        remaining
    }

    pub(crate) fn current_level_name(&self) -> Option<&str> {
        self.level.as_ref().map(|level| level.def.name.as_str())
    }

    pub(crate) fn live_hostile_count(&self) -> u32 {
        self.level.as_ref().map_or(0, |level| level.live_hostiles)
    }

    pub(crate) fn exits(&self) -> &[ExitGate] {
        self.level
            .as_ref()
            .map(|level| level.gates.as_slice())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn actors(&self) -> &SessionActors {
        &self.actors
    }

    pub(crate) fn transition_in_flight(&self) -> bool {
        self.sequencer.is_in_flight()
    }

    pub(crate) fn load_history(&self) -> impl Iterator<Item = &str> {
        self.load_history.iter().map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn prefs(&self) -> &S {
        &self.prefs
    }

    #[cfg(test)]
    pub(crate) fn presentation(&self) -> &P {
        &self.presentation
    }

    #[cfg(test)]
    pub(crate) fn actors_mut(&mut self) -> &mut SessionActors {
        &mut self.actors
    }

    pub(crate) fn status(&self) -> SessionStatus {
        let player = self.actors.player();
        let health = self.actors.health();
        SessionStatus {
            level: self.current_level_name().map(str::to_string),
            live_hostiles: self.live_hostile_count(),
            exits: self
                .exits()
                .iter()
                .map(|gate| ExitStatus {
                    target: gate.target_level().to_string(),
                    tag: gate.transition_tag().to_string(),
                    gated: gate.is_gated(),
                    state: gate.state(),
                })
                .collect(),
            player_position: player.map(|player| player.position),
            player_active: player.map(|player| player.active),
            stamina: player.map(|player| player.stamina),
            health: health.map(|health| health.current()),
            max_health: health.map(|health| health.max()),
            is_dead: health.map(|health| health.is_dead()),
            invulnerable: health.map(|health| health.is_recovering()),
            gold: self.actors.root().map(|root| root.gold),
            hud_visible: self.actors.ui().map(|ui| ui.hud_visible),
            transition_tag: self.actors.transition_tag().to_string(),
            transition_in_flight: self.sequencer.is_in_flight(),
            live_singletons: self.actors.live_count(),
            sim_time_ms: self.scheduler.now().as_millis() as u64,
            recent_levels: self.load_history().map(str::to_string).collect(),
        }
    }

    fn refresh_gates(&mut self) {
        let Some(level) = self.level.as_mut() else {
            return;
        };
        let hostiles = level.live_hostiles;
        for gate in &mut level.gates {
            gate.evaluate(hostiles);
        }
    }

    fn current_role_is(&self, role: LevelRole) -> bool {
        self.level.as_ref().is_some_and(|level| level.def.role == role)
    }

    fn current_is_gameplay(&self) -> bool {
        self.current_role_is(LevelRole::Gameplay)
    }

    fn start_recovery_window(&mut self) {
        if let Some(previous) = self.recovery_task.take() {
            self.scheduler.cancel(previous);
        }
        self.recovery_task = Some(
            self.scheduler
                .schedule_after(self.config.damage_recovery, SessionTask::EndDamageRecovery),
        );
    }

    fn on_player_died(&mut self) {
        self.presentation.play_cue(Cue::PlayerDeath);
        if self.death_task.is_some() {
            return;
        }
        info!(delay_ms = self.config.death_delay.as_millis() as u64, "player_died");
        self.death_task = Some(
            self.scheduler
                .schedule_after(self.config.death_delay, SessionTask::DeathTransition),
        );
    }

    fn sync_health_bar(&mut self) {
        if let Some(health) = self.actors.health() {
            let (current, max) = (health.current(), health.max());
            self.presentation.set_health_bar(current, max);
        }
    }

    /// Destroys every session singleton and the timers that would touch them.
    fn teardown_session_actors(&mut self, reason: &'static str) {
        self.actors.clear_transition_tag();
        self.defeat_deferred = false;
        let removed = self.actors.teardown_all(&ActorKind::ALL);
        for task in [self.recovery_task.take(), self.death_task.take()]
            .into_iter()
            .flatten()
        {
            self.scheduler.cancel(task);
        }
        if !removed.is_empty() {
            info!(reason, removed = removed.len(), "session_actors_torn_down");
        }
    }
}

fn music_for(def: &LevelDef) -> MusicTrack {
    match def.role {
        LevelRole::Victory => MusicTrack::Menu,
        LevelRole::Defeat => MusicTrack::Defeat,
        LevelRole::Gameplay if def.finale => MusicTrack::Boss,
        LevelRole::Gameplay | LevelRole::SuspendMenu => MusicTrack::Gameplay,
    }
}

fn validate_config(config: &SessionConfig, catalog: &LevelCatalog) -> Result<(), SessionError> {
    let checks = [
        ("start", &config.start_level, Some(LevelRole::Gameplay)),
        (
            "default resume",
            &config.default_resume_level,
            Some(LevelRole::Gameplay),
        ),
        (
            "suspend menu",
            &config.suspend_menu_level,
            Some(LevelRole::SuspendMenu),
        ),
        ("victory", &config.victory_level, Some(LevelRole::Victory)),
        ("defeat", &config.defeat_level, Some(LevelRole::Defeat)),
        ("main menu", &config.main_menu_level, None),
    ];

    for (role, name, expected) in checks {
        let Some(level) = catalog.level(name) else {
            return Err(SessionError::UnknownConfiguredLevel {
                role,
                name: name.clone(),
            });
        };
        match expected {
            Some(expected) if level.role != expected => {
                return Err(SessionError::WrongConfiguredRole {
                    role,
                    name: name.clone(),
                    expected,
                    actual: level.role,
                });
            }
            None if level.role.is_gameplay() => {
                return Err(SessionError::WrongConfiguredRole {
                    role,
                    name: name.clone(),
                    expected: LevelRole::Victory,
                    actual: level.role,
                });
            }
            _ => {}
        }
    }
    Ok(())
}
