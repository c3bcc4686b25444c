//! Global keybinds: persisted action ids, default combos and registration
//!
//! Reconciliation is a bulk replace. The desired binding set is validated
//! first (known ids, parseable combos, no shared combo), then every hotkey is
//! unregistered and the enabled bindings are registered again.

pub mod hotkeys;

use crate::error::CompanionError;
use crate::ghost::Evidence;
use crate::timers::TimerKind;
use crate::utils::keycode::KeyCombo;
use anyhow::Result;
use global_hotkey::hotkey::HotKey;
use hotkeys::HotkeyBackend;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

pub use hotkeys::GlobalHotkeyBackend;

/// Something a keybind can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ToggleEvidence(Evidence),
    ResetEvidence,
    GhostSpeedTap,
    /// Start/pause/resume the hunt timer while tracking a hunt
    HuntTrack,
    ToggleTimer(TimerKind),
}

/// Persisted id spelled the way older config files wrote the cooldown timer
const LEGACY_COOLDOWN_ID: &str = "colldownTimer";

impl Action {
    /// Every action, in the order keybinds are listed
    pub const ALL: [Action; 13] = [
        Action::ToggleEvidence(Evidence::Emf),
        Action::ToggleEvidence(Evidence::SpiritBox),
        Action::ToggleEvidence(Evidence::Fingerprints),
        Action::ToggleEvidence(Evidence::GhostOrb),
        Action::ToggleEvidence(Evidence::GhostWriting),
        Action::ToggleEvidence(Evidence::FreezingTemps),
        Action::ToggleEvidence(Evidence::DotsProjector),
        Action::ResetEvidence,
        Action::GhostSpeedTap,
        Action::HuntTrack,
        Action::ToggleTimer(TimerKind::Smudge),
        Action::ToggleTimer(TimerKind::Cooldown),
        Action::ToggleTimer(TimerKind::Hunt),
    ];

    /// Identifier stored in the config file
    pub fn id(self) -> &'static str {
        match self {
            Action::ToggleEvidence(Evidence::Emf) => "EMF5",
            Action::ToggleEvidence(Evidence::SpiritBox) => "SpiritBox",
            Action::ToggleEvidence(Evidence::Fingerprints) => "Fingerprints",
            Action::ToggleEvidence(Evidence::GhostOrb) => "GhostOrb",
            Action::ToggleEvidence(Evidence::GhostWriting) => "GhostWriting",
            Action::ToggleEvidence(Evidence::FreezingTemps) => "Freezing",
            Action::ToggleEvidence(Evidence::DotsProjector) => "DOTSProjector",
            Action::ResetEvidence => "resetEvidence",
            Action::GhostSpeedTap => "ghostSpeed",
            Action::HuntTrack => "huntTrack",
            Action::ToggleTimer(TimerKind::Smudge) => "smudgeTimer",
            Action::ToggleTimer(TimerKind::Cooldown) => "cooldownTimer",
            Action::ToggleTimer(TimerKind::Hunt) => "huntTimer",
        }
    }

    pub fn from_id(id: &str) -> Option<Action> {
        if id == LEGACY_COOLDOWN_ID {
            return Some(Action::ToggleTimer(TimerKind::Cooldown));
        }
        Action::ALL.into_iter().find(|action| action.id() == id)
    }

    /// Map a stored id to its current spelling
    pub fn canonical_id(id: &str) -> Option<&'static str> {
        Action::from_id(id).map(Action::id)
    }

    pub fn default_combo(self) -> &'static str {
        match self {
            Action::ToggleEvidence(Evidence::Emf) => "Shift+1",
            Action::ToggleEvidence(Evidence::SpiritBox) => "Shift+2",
            Action::ToggleEvidence(Evidence::Fingerprints) => "Shift+3",
            Action::ToggleEvidence(Evidence::GhostOrb) => "Shift+4",
            Action::ToggleEvidence(Evidence::GhostWriting) => "Shift+5",
            Action::ToggleEvidence(Evidence::FreezingTemps) => "Shift+6",
            Action::ToggleEvidence(Evidence::DotsProjector) => "Shift+7",
            Action::ResetEvidence => "Shift+8",
            Action::GhostSpeedTap => "Shift+S",
            Action::HuntTrack => "Space",
            Action::ToggleTimer(TimerKind::Smudge) => "Shift+9",
            Action::ToggleTimer(TimerKind::Cooldown) => "Shift+0",
            Action::ToggleTimer(TimerKind::Hunt) => "Shift+-",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Action::ToggleEvidence(evidence) => evidence.display_name(),
            Action::ResetEvidence => "Reset Evidence",
            Action::GhostSpeedTap => "Ghost Speed Tap",
            Action::HuntTrack => "Hunt Track",
            Action::ToggleTimer(TimerKind::Smudge) => "Smudge Timer",
            Action::ToggleTimer(TimerKind::Cooldown) => "Cooldown Timer",
            Action::ToggleTimer(TimerKind::Hunt) => "Hunt Timer",
        }
    }
}

/// One persisted keybind entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeybindConfig {
    pub key: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// The default binding for every action, keyed by action id
pub fn default_keybinds() -> BTreeMap<String, KeybindConfig> {
    Action::ALL
        .into_iter()
        .map(|action| {
            (
                action.id().to_string(),
                KeybindConfig {
                    key: action.default_combo().to_string(),
                    description: action.description().to_string(),
                    enabled: true,
                },
            )
        })
        .collect()
}

/// A validated, enabled binding
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub id: String,
    pub action: Action,
    pub combo: KeyCombo,
    pub hotkey: HotKey,
}

/// Validate keybinds and resolve the enabled ones to hotkeys
///
/// Fails on unknown ids, unparseable combos, or two enabled bindings that
/// share a combo.
pub fn resolve_bindings(
    keybinds: &BTreeMap<String, KeybindConfig>,
) -> Result<Vec<Binding>, CompanionError> {
    let mut bindings = Vec::new();
    let mut seen: HashMap<KeyCombo, String> = HashMap::new();

    for (id, keybind) in keybinds {
        let action = Action::from_id(id).ok_or_else(|| CompanionError::UnknownKeybind(id.clone()))?;
        if !keybind.enabled {
            continue;
        }

        let combo: KeyCombo = keybind.key.parse()?;
        if let Some(first) = seen.get(&combo) {
            return Err(CompanionError::DuplicateKeybind {
                first: first.clone(),
                second: id.clone(),
                combo: combo.to_string(),
            });
        }
        seen.insert(combo, id.clone());

        bindings.push(Binding {
            id: id.clone(),
            action,
            combo,
            hotkey: combo.to_hotkey(),
        });
    }

    Ok(bindings)
}

/// Hotkey id -> action lookup shared with the listener thread
#[derive(Clone, Default)]
pub struct KeybindTable {
    inner: Arc<Mutex<HashMap<u32, Action>>>,
}

impl KeybindTable {
    pub fn action_for(&self, hotkey_id: u32) -> Option<Action> {
        self.inner.lock().get(&hotkey_id).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    fn insert(&self, hotkey_id: u32, action: Action) {
        self.inner.lock().insert(hotkey_id, action);
    }

    fn clear(&self) {
        self.inner.lock().clear();
    }
}

/// Owns hotkey registration for the current keybind set
pub struct KeybindCoordinator {
    backend: Box<dyn HotkeyBackend>,
    desired: Vec<Binding>,
    registered: Vec<Binding>,
    table: KeybindTable,
    active: bool,
}

impl KeybindCoordinator {
    pub fn new(backend: Box<dyn HotkeyBackend>) -> Self {
        Self {
            backend,
            desired: Vec::new(),
            registered: Vec::new(),
            table: KeybindTable::default(),
            active: true,
        }
    }

    /// Replace all registrations with `keybinds`
    ///
    /// Validation failures leave the current registrations untouched.
    /// Registration failures are reported after every other binding has been
    /// registered. Returns the number of registered bindings.
    pub fn reconcile(&mut self, keybinds: &BTreeMap<String, KeybindConfig>) -> Result<usize> {
        let bindings = resolve_bindings(keybinds)?;
        self.unregister_all();
        self.desired = bindings;

        if !self.active {
            debug!("Keybinds inactive, deferring registration of {}", self.desired.len());
            return Ok(0);
        }
        self.register_desired()
    }

    /// Enable or disable keybinds (disabled while the settings page is open)
    pub fn set_active(&mut self, active: bool) -> Result<usize> {
        if active == self.active {
            return Ok(self.registered.len());
        }
        self.active = active;

        if active {
            info!("Keybinds enabled");
            self.register_desired()
        } else {
            info!("Keybinds disabled");
            self.unregister_all();
            Ok(0)
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Action for a hotkey event, or None while inactive
    pub fn action_for(&self, hotkey_id: u32) -> Option<Action> {
        if !self.active {
            return None;
        }
        self.table.action_for(hotkey_id)
    }

    pub fn table(&self) -> KeybindTable {
        self.table.clone()
    }

    pub fn registered(&self) -> &[Binding] {
        &self.registered
    }

    fn register_desired(&mut self) -> Result<usize> {
        let mut failed = Vec::new();

        for binding in &self.desired {
            match self.backend.register(binding.hotkey) {
                Ok(()) => {
                    self.table.insert(binding.hotkey.id(), binding.action);
                    self.registered.push(binding.clone());
                }
                Err(e) => {
                    warn!("Keybind '{}' ({}) not registered: {:#}", binding.id, binding.combo, e);
                    failed.push(binding.id.clone());
                }
            }
        }

        info!("{} keybinds registered", self.registered.len());
        if !failed.is_empty() {
            anyhow::bail!("Failed to register keybinds: {}", failed.join(", "));
        }
        Ok(self.registered.len())
    }

    fn unregister_all(&mut self) {
        for binding in self.registered.drain(..) {
            if let Err(e) = self.backend.unregister(binding.hotkey) {
                warn!("Failed to unregister keybind '{}': {:#}", binding.id, e);
            }
        }
        self.table.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Records registrations; combos listed in `reject` fail to register
    #[derive(Clone, Default)]
    pub(crate) struct FakeBackend {
        pub registered: Arc<Mutex<HashSet<u32>>>,
        pub reject: Arc<Mutex<HashSet<u32>>>,
    }

    impl HotkeyBackend for FakeBackend {
        fn register(&mut self, hotkey: HotKey) -> Result<()> {
            if self.reject.lock().contains(&hotkey.id()) {
                anyhow::bail!("hotkey already taken by another application");
            }
            self.registered.lock().insert(hotkey.id());
            Ok(())
        }

        fn unregister(&mut self, hotkey: HotKey) -> Result<()> {
            self.registered.lock().remove(&hotkey.id());
            Ok(())
        }
    }

    fn hotkey_id(combo: &str) -> u32 {
        combo.parse::<KeyCombo>().unwrap().to_hotkey().id()
    }

    #[test]
    fn test_action_ids_roundtrip() {
        for action in Action::ALL {
            assert_eq!(Action::from_id(action.id()), Some(action));
        }
        assert_eq!(
            Action::from_id("colldownTimer"),
            Some(Action::ToggleTimer(TimerKind::Cooldown))
        );
        assert_eq!(Action::canonical_id("colldownTimer"), Some("cooldownTimer"));
        assert_eq!(Action::from_id("launchRocket"), None);
    }

    #[test]
    fn test_default_keybinds_are_valid() {
        let defaults = default_keybinds();
        assert_eq!(defaults.len(), 13);
        assert_eq!(defaults["EMF5"].key, "Shift+1");
        assert_eq!(defaults["huntTrack"].key, "Space");
        assert_eq!(resolve_bindings(&defaults).unwrap().len(), 13);
    }

    #[test]
    fn test_duplicate_combo_rejected_before_backend() {
        let backend = FakeBackend::default();
        let mut coordinator = KeybindCoordinator::new(Box::new(backend.clone()));
        coordinator.reconcile(&default_keybinds()).unwrap();
        let before = backend.registered.lock().len();

        let mut keybinds = default_keybinds();
        keybinds.get_mut("SpiritBox").unwrap().key = "shift+1".to_string();
        let err = coordinator.reconcile(&keybinds).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CompanionError>(),
            Some(CompanionError::DuplicateKeybind { .. })
        ));
        assert_eq!(backend.registered.lock().len(), before);
        assert_eq!(coordinator.registered().len(), before);
    }

    #[test]
    fn test_disabled_bindings_may_share_combos() {
        let mut keybinds = default_keybinds();
        let spirit_box = keybinds.get_mut("SpiritBox").unwrap();
        spirit_box.key = "Shift+1".to_string();
        spirit_box.enabled = false;
        assert_eq!(resolve_bindings(&keybinds).unwrap().len(), 12);
    }

    #[test]
    fn test_reconcile_is_bulk_replace() {
        let backend = FakeBackend::default();
        let mut coordinator = KeybindCoordinator::new(Box::new(backend.clone()));
        coordinator.reconcile(&default_keybinds()).unwrap();

        let mut keybinds = default_keybinds();
        keybinds.get_mut("EMF5").unwrap().key = "Ctrl+E".to_string();
        assert_eq!(coordinator.reconcile(&keybinds).unwrap(), 13);

        let registered = backend.registered.lock();
        assert!(registered.contains(&hotkey_id("Ctrl+E")));
        assert!(!registered.contains(&hotkey_id("Shift+1")));
        drop(registered);
        assert_eq!(
            coordinator.action_for(hotkey_id("ctrl+e")),
            Some(Action::ToggleEvidence(Evidence::Emf))
        );
    }

    #[test]
    fn test_registration_failure_keeps_other_bindings() {
        let backend = FakeBackend::default();
        backend.reject.lock().insert(hotkey_id("Space"));
        let mut coordinator = KeybindCoordinator::new(Box::new(backend.clone()));

        let err = coordinator.reconcile(&default_keybinds()).unwrap_err();
        assert!(format!("{}", err).contains("huntTrack"));
        assert_eq!(coordinator.registered().len(), 12);
        assert_eq!(coordinator.action_for(hotkey_id("Space")), None);
        assert_eq!(coordinator.action_for(hotkey_id("Shift+S")), Some(Action::GhostSpeedTap));
    }

    #[test]
    fn test_inactive_coordinator_ignores_events() {
        let backend = FakeBackend::default();
        let mut coordinator = KeybindCoordinator::new(Box::new(backend.clone()));
        coordinator.reconcile(&default_keybinds()).unwrap();

        assert_eq!(coordinator.set_active(false).unwrap(), 0);
        assert!(backend.registered.lock().is_empty());
        assert_eq!(coordinator.action_for(hotkey_id("Shift+8")), None);
        assert!(coordinator.table().is_empty());

        // Reconciling while inactive defers registration
        coordinator.reconcile(&default_keybinds()).unwrap();
        assert!(backend.registered.lock().is_empty());

        assert_eq!(coordinator.set_active(true).unwrap(), 13);
        assert_eq!(coordinator.action_for(hotkey_id("Shift+8")), Some(Action::ResetEvidence));
    }

    #[test]
    fn test_unknown_id_rejected() {
        let mut keybinds = default_keybinds();
        keybinds.insert(
            "launchRocket".to_string(),
            KeybindConfig {
                key: "Shift+R".to_string(),
                description: String::new(),
                enabled: true,
            },
        );
        assert_eq!(
            resolve_bindings(&keybinds),
            Err(CompanionError::UnknownKeybind("launchRocket".to_string()))
        );
    }
}
