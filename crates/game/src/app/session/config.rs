use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SessionConfig {
    pub(crate) settle_delay: Duration,
    pub(crate) death_delay: Duration,
    pub(crate) damage_recovery: Duration,
    pub(crate) max_health: i32,
    pub(crate) max_stamina: u32,
    pub(crate) start_level: String,
    pub(crate) suspend_menu_level: String,
    pub(crate) victory_level: String,
    pub(crate) defeat_level: String,
    pub(crate) main_menu_level: String,
    pub(crate) default_resume_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            death_delay: Duration::from_secs(2),
            damage_recovery: Duration::from_secs(1),
            max_health: 3,
            max_stamina: 3,
            start_level: "Scene1".to_string(),
            suspend_menu_level: "Continue".to_string(),
            victory_level: "Win".to_string(),
            defeat_level: "Die".to_string(),
            main_menu_level: "Win".to_string(),
            default_resume_level: "Scene1".to_string(),
        }
    }
}
