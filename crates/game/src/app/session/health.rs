#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DamageOutcome {
    Ignored,
    Hurt,
    Died,
}

/// Player hit points. `current` stays within `[0, max]`; death latches until an explicit
/// [`HealthState::set_health`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HealthState {
    current: i32,
    max: i32,
    is_dead: bool,
    recovering: bool,
}

impl HealthState {
    pub(crate) fn new(max: i32) -> Self {
        let max = max.max(1);
        Self {
            current: max,
            max,
            is_dead: false,
            recovering: false,
        }
    }

    pub(crate) fn current(&self) -> i32 {
        self.current
    }

    pub(crate) fn max(&self) -> i32 {
        self.max
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.is_dead
    }

    pub(crate) fn is_recovering(&self) -> bool {
        self.recovering
    }

    /// Clamps `value` into range and re-evaluates death. Returns true when this call is
    /// what killed the player.
    pub(crate) fn set_health(&mut self, value: i32) -> bool {
        self.current = value.clamp(0, self.max);
        let was_dead = self.is_dead;
        self.is_dead = self.current == 0;
        self.is_dead && !was_dead
    }

    pub(crate) fn take_damage(&mut self, amount: i32) -> DamageOutcome {
        if self.is_dead || self.recovering || amount <= 0 {
            return DamageOutcome::Ignored;
        }
        self.current = self.current.saturating_sub(amount).max(0);
        self.recovering = true;
        if self.current == 0 {
            self.is_dead = true;
            DamageOutcome::Died
        } else {
            DamageOutcome::Hurt
        }
    }

    pub(crate) fn end_recovery(&mut self) {
        self.recovering = false;
    }

    pub(crate) fn heal(&mut self) -> bool {
        if self.is_dead || self.current >= self.max {
            return false;
        }
        self.current += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_opens_recovery_window() {
        let mut health = HealthState::new(3);

        assert_eq!(health.take_damage(1), DamageOutcome::Hurt);
        assert_eq!(health.take_damage(1), DamageOutcome::Ignored);
        assert_eq!(health.current(), 2);

        health.end_recovery();
        assert_eq!(health.take_damage(1), DamageOutcome::Hurt);
        assert_eq!(health.current(), 1);
    }

    #[test]
    fn lethal_damage_latches_death_at_zero() {
        let mut health = HealthState::new(3);

        assert_eq!(health.take_damage(5), DamageOutcome::Died);
        assert_eq!(health.current(), 0);
        assert!(health.is_dead());

        health.end_recovery();
        assert_eq!(health.take_damage(1), DamageOutcome::Ignored);
        assert!(!health.heal());
    }

    #[test]
    fn set_health_clamps_and_reevaluates_death() {
        let mut health = HealthState::new(3);

        assert!(!health.set_health(9));
        assert_eq!(health.current(), 3);

        assert!(health.set_health(-2));
        assert_eq!(health.current(), 0);
        assert!(health.is_dead());

        assert!(!health.set_health(2));
        assert!(!health.is_dead());
    }

    #[test]
    fn heal_stops_at_max() {
        let mut health = HealthState::new(3);
        health.take_damage(1);

        assert!(health.heal());
        assert!(!health.heal());
        assert_eq!(health.current(), 3);
    }
}
