//! Typed domain errors
//!
//! I/O and configuration boundaries use `anyhow` with context; these variants
//! cover the failures callers are expected to match on.

use crate::ghost::Evidence;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CompanionError {
    #[error("Invalid ghost '{id}': {reason}")]
    InvalidGhost { id: String, reason: String },

    #[error("Duplicate ghost id in catalog: {0}")]
    DuplicateGhostId(String),

    #[error("Guaranteed evidence {evidence} of ghost '{id}' is not one of its evidences")]
    GuaranteedNotInEvidences { id: String, evidence: Evidence },

    #[error("Invalid timer duration: {0} seconds")]
    InvalidTimerDuration(u64),

    #[error("Invalid key combination '{combo}': {reason}")]
    InvalidKeyCombo { combo: String, reason: String },

    #[error("Keybinds '{first}' and '{second}' share the same key combination '{combo}'")]
    DuplicateKeybind {
        first: String,
        second: String,
        combo: String,
    },

    #[error("Unknown keybind action: {0}")]
    UnknownKeybind(String),
}
