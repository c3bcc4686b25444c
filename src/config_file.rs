//! Configuration file management
//!
//! This module handles loading and saving the application configuration file,
//! which holds the keybinds, overlay and theme preferences, timer settings and
//! the ghost catalog endpoint.

use crate::constants::{
    APP_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_CATALOG_URL, OVERLAY_DEFAULT_OPACITY,
    TIMER_DEFAULT_VOLUME,
};
use crate::error::CompanionError;
use crate::ghost::model::is_absolute_http_url;
use crate::ghost::DifficultyMode;
use crate::keybinds::{default_keybinds, resolve_bindings, Action, KeybindConfig};
use crate::timers::durations::{hunt_seconds, CooldownVariant, MapSize, SmudgeVariant};
use crate::timers::TimerKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub enabled: bool,
    /// Window opacity (0.0-1.0)
    pub opacity: f64,
    pub position: OverlayPosition,
    pub always_on_top: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            opacity: OVERLAY_DEFAULT_OPACITY,
            position: OverlayPosition::default(),
            always_on_top: true,
        }
    }
}

/// How ghost details are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowInfo {
    #[default]
    Modal,
    Panel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    pub show_info: ShowInfo,
    pub theme: Theme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub sound_enabled: bool,
    /// Completion sound volume (0.0-1.0)
    pub volume: f64,
    /// Custom completion sounds (file paths)
    pub hunt_sound: Option<String>,
    pub smudge_sound: Option<String>,
    pub cooldown_sound: Option<String>,
    /// Difficulty whose hunt table is used in Nightmare and Insanity
    pub hard_mode_fallback: DifficultyMode,
    pub default_map_size: MapSize,
    pub smudge_variant: SmudgeVariant,
    pub cooldown_variant: CooldownVariant,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            volume: TIMER_DEFAULT_VOLUME,
            hunt_sound: None,
            smudge_sound: None,
            cooldown_sound: None,
            hard_mode_fallback: DifficultyMode::Professional,
            default_map_size: MapSize::default(),
            smudge_variant: SmudgeVariant::default(),
            cooldown_variant: CooldownVariant::default(),
        }
    }
}

impl TimerConfig {
    /// Countdown length for a timer started in the given difficulty
    pub fn duration_secs(&self, kind: TimerKind, mode: DifficultyMode) -> u64 {
        match kind {
            TimerKind::Hunt => hunt_seconds(mode, self.default_map_size, self.hard_mode_fallback),
            TimerKind::Smudge => self.smudge_variant.seconds(),
            TimerKind::Cooldown => self.cooldown_variant.seconds(),
        }
    }

    pub fn sound_for(&self, kind: TimerKind) -> Option<&str> {
        match kind {
            TimerKind::Hunt => self.hunt_sound.as_deref(),
            TimerKind::Smudge => self.smudge_sound.as_deref(),
            TimerKind::Cooldown => self.cooldown_sound.as_deref(),
        }
    }
}

/// Application configuration stored in config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Ghost catalog endpoint
    pub catalog_url: String,
    pub keybinds: BTreeMap<String, KeybindConfig>,
    pub overlay: OverlayConfig,
    pub application: ApplicationConfig,
    pub timers: TimerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            keybinds: default_keybinds(),
            overlay: OverlayConfig::default(),
            application: ApplicationConfig::default(),
            timers: TimerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the standard config file path
    ///
    /// - macOS: `~/Library/Application Support/phasmo-companion/config.toml`
    /// - Linux: `~/.config/phasmo-companion/config.toml`
    /// - Windows: `%APPDATA%\phasmo-companion\config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Load config from standard location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load config from a specific path
    ///
    /// A missing file yields the defaults. Stored keybinds are merged over the
    /// default set so actions added in newer versions still get a binding.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Failed to read file
    /// - TOML parsing fails
    /// - A keybind does not parse or two enabled keybinds share a combination
    /// - Opacity or volume are out of range
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: AppConfig =
            toml::from_str(&contents).context("Failed to parse config file")?;
        config.keybinds = merge_keybinds(config.keybinds);

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Save config to standard location
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to_path(&path)
    }

    /// Save config to a specific path, creating its directory if needed
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        log::info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        resolve_bindings(&self.keybinds)?;

        if !(0.0..=1.0).contains(&self.overlay.opacity) {
            anyhow::bail!(
                "Overlay opacity must be between 0.0 and 1.0 (got {})",
                self.overlay.opacity
            );
        }
        if !(0.0..=1.0).contains(&self.timers.volume) {
            anyhow::bail!(
                "Timer volume must be between 0.0 and 1.0 (got {})",
                self.timers.volume
            );
        }
        if !is_absolute_http_url(&self.catalog_url) {
            anyhow::bail!(
                "Catalog URL must start with http:// or https:// (got '{}')",
                self.catalog_url
            );
        }
        Ok(())
    }

    /// Change one keybind; the config is left untouched when the result is invalid
    pub fn update_keybind(&mut self, id: &str, key: Option<&str>, enabled: Option<bool>) -> Result<()> {
        let id = Action::canonical_id(id).ok_or_else(|| CompanionError::UnknownKeybind(id.to_string()))?;

        let mut keybinds = self.keybinds.clone();
        if let Some(entry) = keybinds.get_mut(id) {
            if let Some(key) = key {
                entry.key = key.trim().to_string();
            }
            if let Some(enabled) = enabled {
                entry.enabled = enabled;
            }
        }
        resolve_bindings(&keybinds)?;

        self.keybinds = keybinds;
        log::info!("Keybind '{}' updated", id);
        Ok(())
    }

    /// Restore every setting to its default
    pub fn reset(&mut self) {
        *self = Self::default();
        log::info!("Configuration reset to defaults");
    }
}

/// Stored keybinds over the defaults; legacy ids are renamed, unknown ones dropped
fn merge_keybinds(stored: BTreeMap<String, KeybindConfig>) -> BTreeMap<String, KeybindConfig> {
    let mut merged = default_keybinds();
    for (id, keybind) in stored {
        match Action::canonical_id(&id) {
            Some(canonical) => {
                merged.insert(canonical.to_string(), keybind);
            }
            None => log::warn!("Ignoring unknown keybind '{}' in config file", id),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn temp_config_path() -> PathBuf {
        // Unique per-test directory: timestamp + thread id, so tests running
        // in parallel never share a file.
        use std::thread;
        use std::time::{SystemTime, UNIX_EPOCH};

        let mut base = std::env::temp_dir();
        base.push("phasmo_tests");
        base.push("config_file");

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let tid = format!("{:?}", thread::current().id());
        base.push(format!("t_{nanos}_{tid}"));

        let _ = fs::create_dir_all(&base);

        base.join("config.toml")
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.keybinds.len(), 13);
        assert_eq!(config.timers.hard_mode_fallback, DifficultyMode::Professional);
        assert_eq!(config.overlay.position, OverlayPosition::TopRight);
    }

    #[test]
    fn test_config_save_load_roundtrip() {
        let temp_path = temp_config_path();

        let mut original = AppConfig::default();
        original.overlay.position = OverlayPosition::BottomLeft;
        original.application.theme = Theme::Dark;
        original.timers.hunt_sound = Some("/sounds/hunt.mp3".to_string());
        original.timers.default_map_size = MapSize::Large;
        original
            .update_keybind("huntTrack", Some("Ctrl+H"), None)
            .expect("Failed to update keybind");

        original.save_to_path(&temp_path).expect("Failed to save config");
        let loaded = AppConfig::load_from_path(&temp_path).expect("Failed to load config");

        assert_eq!(loaded.overlay.position, OverlayPosition::BottomLeft);
        assert_eq!(loaded.application.theme, Theme::Dark);
        assert_eq!(loaded.timers.hunt_sound.as_deref(), Some("/sounds/hunt.mp3"));
        assert_eq!(loaded.timers.default_map_size, MapSize::Large);
        assert_eq!(loaded.keybinds["huntTrack"].key, "Ctrl+H");

        fs::remove_file(temp_path).ok();
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let missing_path = Path::new("/tmp/phasmo_missing_config_test_config.toml");
        let _ = fs::remove_file(missing_path);

        let config = AppConfig::load_from_path(missing_path).expect("Defaults for missing file");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_file_merges_defaults() {
        let temp_path = temp_config_path();
        fs::write(
            &temp_path,
            r#"
[keybinds.colldownTimer]
key = "Shift+C"
description = "Cooldown"
enabled = true

[overlay]
opacity = 0.5
"#,
        )
        .unwrap();

        let config = AppConfig::load_from_path(&temp_path).expect("Failed to load partial config");
        assert_eq!(config.keybinds.len(), 13);
        assert_eq!(config.keybinds["cooldownTimer"].key, "Shift+C");
        assert!(!config.keybinds.contains_key("colldownTimer"));
        assert_eq!(config.keybinds["EMF5"].key, "Shift+1");
        assert_eq!(config.overlay.opacity, 0.5);
        assert!(config.overlay.always_on_top);
        assert_eq!(config.catalog_url, DEFAULT_CATALOG_URL);

        fs::remove_file(temp_path).ok();
    }

    #[test]
    fn test_duplicate_keybinds_in_file_rejected() {
        let temp_path = temp_config_path();
        fs::write(
            &temp_path,
            r#"
[keybinds.SpiritBox]
key = "shift+1"
description = "Spirit Box"
"#,
        )
        .unwrap();

        let result = AppConfig::load_from_path(&temp_path);
        assert!(result.is_err(), "Should reject duplicate keybinds");
        if let Err(e) = result {
            let error_msg = format!("{:#}", e);
            assert!(
                error_msg.contains("share the same key combination"),
                "Error message should mention duplicates: {}",
                error_msg
            );
        }

        fs::remove_file(temp_path).ok();
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut config = AppConfig::default();
        config.overlay.opacity = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.timers.volume = -0.1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.catalog_url = "ftp://ghosts".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_update_keybind_validation() {
        let mut config = AppConfig::default();

        let err = config.update_keybind("launchRocket", Some("Shift+R"), None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<CompanionError>(),
            Some(&CompanionError::UnknownKeybind("launchRocket".to_string()))
        );

        // Duplicate combination leaves the config untouched
        assert!(config.update_keybind("ghostSpeed", Some("Shift+1"), None).is_err());
        assert_eq!(config.keybinds["ghostSpeed"].key, "Shift+S");

        assert!(config.update_keybind("ghostSpeed", Some("Shift+"), None).is_err());

        config.update_keybind("colldownTimer", None, Some(false)).unwrap();
        assert!(!config.keybinds["cooldownTimer"].enabled);

        config.reset();
        assert!(config.keybinds["cooldownTimer"].enabled);
    }

    #[test]
    fn test_timer_durations_follow_config() {
        let mut timers = TimerConfig::default();
        assert_eq!(timers.duration_secs(TimerKind::Hunt, DifficultyMode::Professional), 50);
        assert_eq!(timers.duration_secs(TimerKind::Hunt, DifficultyMode::Nightmare), 50);
        timers.hard_mode_fallback = DifficultyMode::Amateur;
        assert_eq!(timers.duration_secs(TimerKind::Hunt, DifficultyMode::Insanity), 30);
        timers.smudge_variant = SmudgeVariant::Spirit;
        assert_eq!(timers.duration_secs(TimerKind::Smudge, DifficultyMode::Amateur), 180);
        assert_eq!(timers.duration_secs(TimerKind::Cooldown, DifficultyMode::Amateur), 25);
    }
}
