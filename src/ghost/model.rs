//! Ghost catalog domain model and schema validation

use crate::constants::{
    HUNT_THRESHOLD_MAX, INSANITY_VISIBLE_EVIDENCES, NIGHTMARE_VISIBLE_EVIDENCES,
};
use crate::error::CompanionError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The seven evidence types a ghost can leave behind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Evidence {
    #[serde(rename = "EMF")]
    Emf,
    SpiritBox,
    Fingerprints,
    GhostOrb,
    GhostWriting,
    FreezingTemps,
    DotsProjector,
}

impl Evidence {
    pub const ALL: [Evidence; 7] = [
        Evidence::Emf,
        Evidence::SpiritBox,
        Evidence::Fingerprints,
        Evidence::GhostOrb,
        Evidence::GhostWriting,
        Evidence::FreezingTemps,
        Evidence::DotsProjector,
    ];

    /// Catalog token, as served by the ghost API
    pub fn token(self) -> &'static str {
        match self {
            Evidence::Emf => "EMF",
            Evidence::SpiritBox => "SpiritBox",
            Evidence::Fingerprints => "Fingerprints",
            Evidence::GhostOrb => "GhostOrb",
            Evidence::GhostWriting => "GhostWriting",
            Evidence::FreezingTemps => "FreezingTemps",
            Evidence::DotsProjector => "DotsProjector",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Evidence::Emf => "EMF 5",
            Evidence::SpiritBox => "Spirit Box",
            Evidence::Fingerprints => "Fingerprints",
            Evidence::GhostOrb => "Ghost Orb",
            Evidence::GhostWriting => "Ghost Writing",
            Evidence::FreezingTemps => "Freezing Temperatures",
            Evidence::DotsProjector => "D.O.T.S Projector",
        }
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Evidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "emf" | "emf5" => Ok(Evidence::Emf),
            "spiritbox" | "box" => Ok(Evidence::SpiritBox),
            "fingerprints" | "uv" => Ok(Evidence::Fingerprints),
            "ghostorb" | "orb" | "orbs" => Ok(Evidence::GhostOrb),
            "ghostwriting" | "writing" | "book" => Ok(Evidence::GhostWriting),
            "freezingtemps" | "freezing" | "freezingtemperatures" => Ok(Evidence::FreezingTemps),
            "dotsprojector" | "dots" => Ok(Evidence::DotsProjector),
            _ => Err(format!("unknown evidence '{}'", s)),
        }
    }
}

/// Game difficulty, which governs how much evidence a ghost reveals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DifficultyMode {
    Amateur,
    Intermediate,
    #[default]
    Professional,
    Nightmare,
    Insanity,
}

impl DifficultyMode {
    pub const ALL: [DifficultyMode; 5] = [
        DifficultyMode::Amateur,
        DifficultyMode::Intermediate,
        DifficultyMode::Professional,
        DifficultyMode::Nightmare,
        DifficultyMode::Insanity,
    ];

    /// Number of evidences shown in this mode, or None when nothing is hidden
    pub fn visible_evidence_total(self) -> Option<usize> {
        match self {
            DifficultyMode::Nightmare => Some(NIGHTMARE_VISIBLE_EVIDENCES),
            DifficultyMode::Insanity => Some(INSANITY_VISIBLE_EVIDENCES),
            _ => None,
        }
    }

    pub fn hides_evidence(self) -> bool {
        self.visible_evidence_total().is_some()
    }
}

impl fmt::Display for DifficultyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DifficultyMode::Amateur => "Amateur",
            DifficultyMode::Intermediate => "Intermediate",
            DifficultyMode::Professional => "Professional",
            DifficultyMode::Nightmare => "Nightmare",
            DifficultyMode::Insanity => "Insanity",
        };
        f.write_str(name)
    }
}

impl FromStr for DifficultyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amateur" => Ok(DifficultyMode::Amateur),
            "intermediate" => Ok(DifficultyMode::Intermediate),
            "professional" => Ok(DifficultyMode::Professional),
            "nightmare" => Ok(DifficultyMode::Nightmare),
            "insanity" => Ok(DifficultyMode::Insanity),
            _ => Err(format!("unknown difficulty '{}'", s)),
        }
    }
}

/// Ghost movement speed range in m/s
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedDetails {
    /// Base speed in m/s
    pub base_speed: f64,
    /// Multiplier applied while the ghost has line of sight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub los_multiplier: Option<f64>,
    pub description: String,
    /// Speed varies with distance or state (Deogen, Thaye, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_speed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostBehavior {
    pub description: String,
    /// Only relevant in this difficulty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_mode: Option<DifficultyMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Gif,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    pub description: String,
}

/// A ghost entry of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ghost {
    pub id: String,
    pub name: String,
    pub description: String,
    pub evidences: Vec<Evidence>,
    /// Always shown regardless of difficulty hiding (the Mimic's orbs)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guaranteed_evidences: Vec<Evidence>,
    pub strengths: String,
    pub weaknesses: String,
    pub behaviors: Vec<GhostBehavior>,
    /// Average sanity (%) at which the ghost can start hunting
    pub hunt_threshold: f64,
    pub speed_range: SpeedRange,
    /// Whether the ghost accelerates while it has line of sight
    #[serde(rename = "hasLOS")]
    pub has_los: bool,
    pub speed_details: SpeedDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Vec<Media>>,
}

impl Ghost {
    pub fn has_evidence(&self, evidence: Evidence) -> bool {
        self.evidences.contains(&evidence) || self.guaranteed_evidences.contains(&evidence)
    }

    pub fn is_guaranteed(&self, evidence: Evidence) -> bool {
        self.guaranteed_evidences.contains(&evidence)
    }

    /// Behaviors that apply in the given difficulty (untagged ones always apply)
    pub fn behaviors_for(&self, mode: DifficultyMode) -> impl Iterator<Item = &GhostBehavior> {
        self.behaviors
            .iter()
            .filter(move |b| b.game_mode.map_or(true, |m| m == mode))
    }

    /// Check the record against the catalog schema
    pub fn validate(&self) -> Result<(), CompanionError> {
        let invalid = |reason: &str| CompanionError::InvalidGhost {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.evidences.is_empty() {
            return Err(invalid("ghost must have at least one evidence"));
        }
        for (i, evidence) in self.evidences.iter().enumerate() {
            if self.evidences[..i].contains(evidence) {
                return Err(invalid(&format!("evidence {} listed twice", evidence)));
            }
        }
        if let Some(evidence) = self
            .guaranteed_evidences
            .iter()
            .find(|e| !self.evidences.contains(e))
        {
            return Err(CompanionError::GuaranteedNotInEvidences {
                id: self.id.clone(),
                evidence: *evidence,
            });
        }
        if !self.hunt_threshold.is_finite()
            || !(0.0..=HUNT_THRESHOLD_MAX).contains(&self.hunt_threshold)
        {
            return Err(invalid("huntThreshold must be between 0 and 100"));
        }

        let range = self.speed_range;
        if !range.min.is_finite() || !range.max.is_finite() || range.min < 0.0 {
            return Err(invalid("speedRange must be finite and non-negative"));
        }
        if range.min > range.max {
            return Err(invalid("speedRange.min must not exceed speedRange.max"));
        }
        if !self.speed_details.base_speed.is_finite() || self.speed_details.base_speed < 0.0 {
            return Err(invalid("speedDetails.baseSpeed must be finite and non-negative"));
        }
        if let Some(multiplier) = self.speed_details.los_multiplier {
            if !multiplier.is_finite() || multiplier <= 0.0 {
                return Err(invalid("speedDetails.losMultiplier must be positive"));
            }
        }

        for media in self.media.iter().flatten() {
            if !is_absolute_http_url(&media.url) {
                return Err(invalid(&format!("media url '{}' is not a valid URL", media.url)));
            }
        }

        Ok(())
    }
}

/// Absolute `http`/`https` URL with a host
pub(crate) fn is_absolute_http_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}
