use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PickupKind {
    GoldCoin,
    StaminaGlobe,
    HealthGlobe,
}

impl PickupKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::GoldCoin => "gold_coin",
            Self::StaminaGlobe => "stamina_globe",
            Self::HealthGlobe => "health_globe",
        }
    }
}

impl fmt::Display for PickupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pickup kind '{0}' (expected gold_coin|stamina_globe|health_globe)")]
pub(crate) struct UnknownPickupKind(pub(crate) String);

impl FromStr for PickupKind {
    type Err = UnknownPickupKind;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gold_coin" | "goldcoin" => Ok(Self::GoldCoin),
            "stamina_globe" | "staminaglobe" => Ok(Self::StaminaGlobe),
            "health_globe" | "healthglobe" => Ok(Self::HealthGlobe),
            _ => Err(UnknownPickupKind(raw.to_string())),
        }
    }
}
