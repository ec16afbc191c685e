use engine::ExitDef;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum GateState {
    Open,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExitGate {
    target_level: String,
    transition_tag: String,
    gated: bool,
    state: GateState,
}

impl ExitGate {
    pub(crate) fn new(def: &ExitDef, restricted_level: bool) -> Self {
        Self {
            target_level: def.target_level.clone(),
            transition_tag: def.transition_tag.clone(),
            gated: restricted_level,
            state: if restricted_level {
                GateState::Closed
            } else {
                GateState::Open
            },
        }
    }

    pub(crate) fn target_level(&self) -> &str {
        &self.target_level
    }

    pub(crate) fn transition_tag(&self) -> &str {
        &self.transition_tag
    }

    pub(crate) fn is_gated(&self) -> bool {
        self.gated
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state == GateState::Open
    }

    pub(crate) fn state(&self) -> GateState {
        self.state
    }

    /// Recomputed from scratch every tick; ungated exits ignore the count.
    pub(crate) fn evaluate(&mut self, live_hostiles: u32) {
        if !self.gated {
            return;
        }
        self.state = if live_hostiles == 0 {
            GateState::Open
        } else {
            GateState::Closed
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exit_def() -> ExitDef {
        ExitDef {
            target_level: "Scene2".to_string(),
            transition_tag: "scene1_east".to_string(),
        }
    }

    #[test]
    fn restricted_gate_tracks_hostile_count_without_memory() {
        let mut gate = ExitGate::new(&exit_def(), true);
        assert_eq!(gate.state(), GateState::Closed);

        for (hostiles, open) in [(2, false), (0, true), (1, false), (0, true), (0, true)] {
            gate.evaluate(hostiles);
            assert_eq!(gate.is_open(), open, "hostiles={hostiles}");
        }
    }

    #[test]
    fn unrestricted_gate_is_always_open() {
        let mut gate = ExitGate::new(&exit_def(), false);
        assert!(gate.is_open());
        gate.evaluate(7);
        assert!(gate.is_open());
        assert!(!gate.is_gated());
        assert_eq!(gate.target_level(), "Scene2");
        assert_eq!(gate.transition_tag(), "scene1_east");
    }
}
