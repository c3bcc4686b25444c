//! Default timer lengths for hunts, smudge sticks and hunt cooldowns

use crate::ghost::DifficultyMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapSize {
    Small,
    #[default]
    Medium,
    Large,
    /// Cursed hunts (Ouija, music box, ...) have their own fixed length
    Cursed,
}

impl MapSize {
    pub const ALL: [MapSize; 4] = [MapSize::Small, MapSize::Medium, MapSize::Large, MapSize::Cursed];
}

impl fmt::Display for MapSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MapSize::Small => "small",
            MapSize::Medium => "medium",
            MapSize::Large => "large",
            MapSize::Cursed => "cursed",
        })
    }
}

impl FromStr for MapSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(MapSize::Small),
            "medium" => Ok(MapSize::Medium),
            "large" => Ok(MapSize::Large),
            "cursed" => Ok(MapSize::Cursed),
            _ => Err(format!("unknown map size '{}'", s)),
        }
    }
}

/// Smudge protection differs per ghost type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmudgeVariant {
    #[default]
    Normal,
    Spirit,
    Demon,
}

impl SmudgeVariant {
    pub fn seconds(self) -> u64 {
        match self {
            SmudgeVariant::Normal => 90,
            SmudgeVariant::Spirit => 180,
            SmudgeVariant::Demon => 60,
        }
    }
}

impl FromStr for SmudgeVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(SmudgeVariant::Normal),
            "spirit" => Ok(SmudgeVariant::Spirit),
            "demon" => Ok(SmudgeVariant::Demon),
            _ => Err(format!("unknown smudge variant '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CooldownVariant {
    #[default]
    Normal,
    Demon,
}

impl CooldownVariant {
    pub fn seconds(self) -> u64 {
        match self {
            CooldownVariant::Normal => 25,
            CooldownVariant::Demon => 20,
        }
    }
}

impl FromStr for CooldownVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(CooldownVariant::Normal),
            "demon" => Ok(CooldownVariant::Demon),
            _ => Err(format!("unknown cooldown variant '{}'", s)),
        }
    }
}

/// Hunt length in seconds
///
/// Only amateur, intermediate and professional have a table; Nightmare and
/// Insanity resolve through `hard_mode_fallback`.
pub fn hunt_seconds(mode: DifficultyMode, map: MapSize, hard_mode_fallback: DifficultyMode) -> u64 {
    let table_mode = if mode.hides_evidence() {
        if hard_mode_fallback.hides_evidence() {
            log::warn!(
                "Hard mode fallback {} has no hunt table, using Professional",
                hard_mode_fallback
            );
            DifficultyMode::Professional
        } else {
            hard_mode_fallback
        }
    } else {
        mode
    };

    match (table_mode, map) {
        (_, MapSize::Cursed) => 20,
        (DifficultyMode::Amateur, MapSize::Small) => 15,
        (DifficultyMode::Amateur, MapSize::Medium) => 30,
        (DifficultyMode::Amateur, MapSize::Large) => 40,
        (DifficultyMode::Intermediate, MapSize::Small) => 20,
        (DifficultyMode::Intermediate, MapSize::Medium) => 40,
        (DifficultyMode::Intermediate, MapSize::Large) => 50,
        (_, MapSize::Small) => 30,
        (_, MapSize::Medium) => 50,
        (_, MapSize::Large) => 60,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hunt_table() {
        let p = DifficultyMode::Professional;
        assert_eq!(hunt_seconds(DifficultyMode::Amateur, MapSize::Small, p), 15);
        assert_eq!(hunt_seconds(DifficultyMode::Amateur, MapSize::Large, p), 40);
        assert_eq!(hunt_seconds(DifficultyMode::Intermediate, MapSize::Medium, p), 40);
        assert_eq!(hunt_seconds(DifficultyMode::Professional, MapSize::Large, p), 60);
        for mode in DifficultyMode::ALL {
            assert_eq!(hunt_seconds(mode, MapSize::Cursed, p), 20);
        }
    }

    #[test]
    fn test_hard_modes_use_fallback() {
        assert_eq!(
            hunt_seconds(DifficultyMode::Nightmare, MapSize::Small, DifficultyMode::Professional),
            30
        );
        assert_eq!(
            hunt_seconds(DifficultyMode::Insanity, MapSize::Small, DifficultyMode::Amateur),
            15
        );
        // A fallback that itself hides evidence has no table
        assert_eq!(
            hunt_seconds(DifficultyMode::Insanity, MapSize::Medium, DifficultyMode::Nightmare),
            50
        );
    }

    #[test]
    fn test_smudge_and_cooldown() {
        assert_eq!(SmudgeVariant::Normal.seconds(), 90);
        assert_eq!(SmudgeVariant::Spirit.seconds(), 180);
        assert_eq!(SmudgeVariant::Demon.seconds(), 60);
        assert_eq!(CooldownVariant::Normal.seconds(), 25);
        assert_eq!(CooldownVariant::Demon.seconds(), 20);
        assert_eq!("Spirit".parse::<SmudgeVariant>(), Ok(SmudgeVariant::Spirit));
    }
}
