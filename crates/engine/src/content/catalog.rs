use std::collections::HashMap;

use crate::app::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LevelRole {
    Gameplay,
    SuspendMenu,
    Victory,
    Defeat,
}

impl LevelRole {
    pub fn is_gameplay(self) -> bool {
        matches!(self, Self::Gameplay)
    }

    pub(crate) fn parse(token: &str) -> Option<Self> {
        match token {
            "Gameplay" => Some(Self::Gameplay),
            "SuspendMenu" => Some(Self::SuspendMenu),
            "Victory" => Some(Self::Victory),
            "Defeat" => Some(Self::Defeat),
            _ => None,
        }
    }
}

/// A spawn point that honors one transition tag.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPointDef {
    pub tag: String,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitDef {
    pub target_level: String,
    pub transition_tag: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelDef {
    pub name: String,
    pub role: LevelRole,
    /// Exits stay closed while hostiles remain.
    pub restricted: bool,
    /// Clearing this level and leaving through any exit wins the run.
    pub finale: bool,
    pub initial_hostiles: u32,
    pub player_start: Vec3,
    pub entries: Vec<EntryPointDef>,
    pub exits: Vec<ExitDef>,
}

impl LevelDef {
    pub fn entry_for_tag(&self, tag: &str) -> Option<&EntryPointDef> {
        if tag.is_empty() {
            return None;
        }
        self.entries.iter().find(|entry| entry.tag == tag)
    }
}

#[derive(Debug, Default, Clone)]
pub struct LevelCatalog {
    levels: Vec<LevelDef>,
    index_by_name: HashMap<String, usize>,
}

impl LevelCatalog {
    /// Callers guarantee unique names; the compiler rejects duplicates before this point.
    pub fn from_levels(levels: Vec<LevelDef>) -> Self {
        let index_by_name = levels
            .iter()
            .enumerate()
            .map(|(index, level)| (level.name.clone(), index))
            .collect();
        Self {
            levels,
            index_by_name,
        }
    }

    pub fn level(&self, name: &str) -> Option<&LevelDef> {
        let index = self.index_by_name.get(name)?;
        self.levels.get(*index)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_by_name.contains_key(name)
    }

    pub fn levels(&self) -> &[LevelDef] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
