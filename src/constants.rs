//! Centralized constants for Phasmo Companion
//!
//! This module contains all configurable numerical values used throughout
//! the application. Each constant includes documentation on its purpose,
//! unit, and recommended value range.

// ============================================================================
// EVIDENCE VISIBILITY
// ============================================================================

/// Evidences shown in Nightmare difficulty (guaranteed ones included).
/// Unit: count
/// Range: Fixed by the game rules
pub const NIGHTMARE_VISIBLE_EVIDENCES: usize = 2;

/// Evidences shown in Insanity difficulty (guaranteed ones included).
/// Unit: count
/// Range: Fixed by the game rules
pub const INSANITY_VISIBLE_EVIDENCES: usize = 1;

// ============================================================================
// GHOST SPEED
// ============================================================================

/// Upper bound (exclusive) of the "slow" speed category.
/// Unit: meters per second
/// Recommended range: 1.4-1.6 (tunable, cutoffs varied across game patches)
pub const SPEED_SLOW_MAX_MS: f64 = 1.55;

/// Upper bound (inclusive) of the "normal" speed category.
/// Unit: meters per second
/// Recommended range: 1.75-1.9 (tunable)
pub const SPEED_NORMAL_MAX_MS: f64 = 1.8;

/// Distance covered by one footstep, used to convert BPM to speed.
/// Unit: meters
/// Range: Fixed (1.7 m/s == 120 BPM)
pub const FOOTSTEP_DISTANCE_M: f64 = 0.85;

/// Number of recent taps kept by the speed calculator.
/// Unit: count
/// Recommended range: 3-8 (more samples smooth out jitter)
pub const SPEED_TAP_SAMPLES: usize = 5;

/// Minimum gap between two accepted taps (debounces duplicated key events).
/// Unit: milliseconds
/// Recommended range: 100-200
pub const SPEED_TAP_DEBOUNCE_MS: i64 = 150;

// ============================================================================
// HUNT THRESHOLD
// ============================================================================

/// Maximum valid hunt sanity threshold.
/// Unit: percent
/// Range: Fixed
pub const HUNT_THRESHOLD_MAX: f64 = 100.0;

// ============================================================================
// TIMERS
// ============================================================================

/// Timer recomputation interval.
/// Unit: milliseconds
/// Recommended range: 50-1000 (lower = smoother countdown, higher = less CPU)
pub const TIMER_POLL_INTERVAL_MS: u64 = 100;

/// Minimum accepted timer poll interval override.
/// Unit: milliseconds
pub const TIMER_POLL_MIN_MS: u64 = 50;

/// Maximum accepted timer poll interval override.
/// Unit: milliseconds
pub const TIMER_POLL_MAX_MS: u64 = 1000;

/// Holding a timer keybind at least this long resets the timer.
/// Unit: milliseconds
/// Recommended range: 500-1200
pub const TIMER_LONG_PRESS_RESET_MS: u64 = 800;

/// Default completion sound volume.
/// Unit: fraction (0.0-1.0)
pub const TIMER_DEFAULT_VOLUME: f64 = 0.7;

// ============================================================================
// NOTIFICATIONS
// ============================================================================

/// Standard notification display duration.
/// Unit: milliseconds
/// Recommended range: 2000-5000 (long enough to read, short enough to not annoy)
pub const NOTIFICATION_TIMEOUT_MS: u32 = 3000;

// ============================================================================
// OVERLAY
// ============================================================================

/// Default overlay window opacity.
/// Unit: fraction (0.0-1.0)
pub const OVERLAY_DEFAULT_OPACITY: f64 = 0.8;

// ============================================================================
// CATALOG
// ============================================================================

/// Remote ghost catalog endpoint used when no override is configured.
pub const DEFAULT_CATALOG_URL: &str = "https://67f6ffce42d6c71cca63d338.mockapi.io/ghosts";

/// Timeout for the catalog HTTP request.
/// Unit: seconds
/// Recommended range: 5-30
pub const CATALOG_FETCH_TIMEOUT_SECS: u64 = 15;

// ============================================================================
// FILES
// ============================================================================

/// Directory name used under the platform config/data directories.
pub const APP_DIR_NAME: &str = "phasmo-companion";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Cached ghost catalog file name.
pub const CATALOG_CACHE_FILE_NAME: &str = "ghosts.json";

/// Game session history database (SQLite).
pub const SESSION_HISTORY_FILE_NAME: &str = "phasmo_games.db";
