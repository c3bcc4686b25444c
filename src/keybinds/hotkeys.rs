use anyhow::{Context, Result};
use global_hotkey::{hotkey::HotKey, GlobalHotKeyManager};
use log::debug;

/// OS-level hotkey registration
pub trait HotkeyBackend {
    fn register(&mut self, hotkey: HotKey) -> Result<()>;
    fn unregister(&mut self, hotkey: HotKey) -> Result<()>;
}

/// Registers hotkeys system-wide through `global_hotkey`
///
/// Events arrive on `GlobalHotKeyEvent::receiver()`; the manager itself must
/// stay alive on the thread that created it.
pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
}

impl GlobalHotkeyBackend {
    pub fn new() -> Result<Self> {
        let manager =
            GlobalHotKeyManager::new().context("Failed to create global hotkey manager")?;
        Ok(Self { manager })
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn register(&mut self, hotkey: HotKey) -> Result<()> {
        self.manager
            .register(hotkey)
            .with_context(|| format!("Failed to register hotkey {}", hotkey.id()))?;
        debug!("Registered hotkey {}", hotkey.id());
        Ok(())
    }

    fn unregister(&mut self, hotkey: HotKey) -> Result<()> {
        self.manager
            .unregister(hotkey)
            .with_context(|| format!("Failed to unregister hotkey {}", hotkey.id()))?;
        debug!("Unregistered hotkey {}", hotkey.id());
        Ok(())
    }
}
