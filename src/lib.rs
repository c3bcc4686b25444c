// Library interface for Phasmo Companion
// Shared by the CLI, the tray app and the integration tests

pub mod app_state;
pub mod config;
pub mod config_file;
pub mod constants;
pub mod error;
pub mod ghost;
pub mod keybinds;
pub mod session;
pub mod timers;
pub mod ui;
pub mod utils;

pub use error::CompanionError;

use anyhow::{Context, Result};
use app_state::{AppState, Page};
use config_file::{AppConfig, TimerConfig};
use constants::TIMER_LONG_PRESS_RESET_MS;
use ghost::{CatalogStore, Evidence, Ghost, HttpCatalogSource, InclusionState, SpeedReading};
use keybinds::{Action, GlobalHotkeyBackend, KeybindCoordinator, KeybindTable};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use session::repository::SqliteSessionRepository;
use session::SessionStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use timers::{Clock, SystemClock, TimerEngine, TimerKind, TimerSnapshot, TimerStatus};
use ui::CompletionNotifier;

/// What a dispatched action changed
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Evidence(Evidence, InclusionState),
    FiltersReset,
    /// None until two footstep taps have been recorded
    Speed(Option<SpeedReading>),
    Timer(TimerKind, TimerStatus),
}

/// Applies keybind actions to the filters, timers and speed calculator
///
/// Cheap to clone; the hotkey listener thread owns one.
#[derive(Clone)]
pub struct ActionDispatcher {
    state: AppState,
    timers: Arc<Mutex<TimerEngine>>,
    timer_config: Arc<Mutex<TimerConfig>>,
    clock: Arc<dyn Clock>,
}

impl ActionDispatcher {
    pub fn new(
        state: AppState,
        timers: Arc<Mutex<TimerEngine>>,
        timer_config: TimerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state,
            timers,
            timer_config: Arc::new(Mutex::new(timer_config)),
            clock,
        }
    }

    pub fn dispatch(&self, action: Action) -> Result<DispatchOutcome, CompanionError> {
        debug!("Dispatching {}", action.id());
        let outcome = match action {
            Action::ToggleEvidence(evidence) => {
                DispatchOutcome::Evidence(evidence, self.state.toggle_evidence(evidence))
            }
            Action::ResetEvidence => {
                self.state.reset_filters();
                DispatchOutcome::FiltersReset
            }
            Action::GhostSpeedTap => {
                DispatchOutcome::Speed(self.state.speed_tap(self.clock.now_ms()))
            }
            Action::HuntTrack => self.toggle_timer(TimerKind::Hunt)?,
            Action::ToggleTimer(kind) => self.toggle_timer(kind)?,
        };
        Ok(outcome)
    }

    /// Reset the timer a keybind controls; returns false for other actions
    pub fn reset_timer_for(&self, action: Action) -> bool {
        let kind = match action {
            Action::HuntTrack => TimerKind::Hunt,
            Action::ToggleTimer(kind) => kind,
            _ => return false,
        };
        self.timers.lock().reset(kind);
        info!("{} timer reset", kind.display_name());
        true
    }

    pub fn timer_duration(&self, kind: TimerKind) -> u64 {
        self.timer_config.lock().duration_secs(kind, self.state.mode())
    }

    fn toggle_timer(&self, kind: TimerKind) -> Result<DispatchOutcome, CompanionError> {
        let duration = self.timer_duration(kind);
        let status = self.timers.lock().toggle(kind, duration)?;
        debug!("{} timer {:?}", kind.display_name(), status);
        Ok(DispatchOutcome::Timer(kind, status))
    }

    fn set_timer_config(&self, timer_config: TimerConfig) {
        *self.timer_config.lock() = timer_config;
    }
}

/// Core companion functionality shared between CLI and Tray App
pub struct CompanionCore {
    pub state: AppState,
    pub catalog: CatalogStore,
    pub sessions: SessionStore,
    timers: Arc<Mutex<TimerEngine>>,
    config: AppConfig,
    dispatcher: ActionDispatcher,
    keybinds: Option<KeybindCoordinator>,
    poll_interval_ms: u64,
}

impl CompanionCore {
    pub fn new(
        config: AppConfig,
        catalog: CatalogStore,
        sessions: SessionStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = AppState::new();
        let timers = Arc::new(Mutex::new(TimerEngine::new(clock.clone())));
        let dispatcher =
            ActionDispatcher::new(state.clone(), timers.clone(), config.timers.clone(), clock);

        Self {
            state,
            catalog,
            sessions,
            timers,
            config,
            dispatcher,
            keybinds: None,
            poll_interval_ms: crate::config::timer_poll_interval_ms(),
        }
    }

    /// Build from the standard locations: catalog cache and session history
    /// under the data dir, catalog URL from the environment or `config`
    pub fn open(config: AppConfig) -> Result<Self> {
        let url = crate::config::parse_catalog_url().unwrap_or_else(|| config.catalog_url.clone());
        let source = HttpCatalogSource::new(url)?;
        let mut catalog = CatalogStore::new(Box::new(source), Some(CatalogStore::default_cache_path()?));
        catalog.load_cached()?;

        let repo = SqliteSessionRepository::open(SqliteSessionRepository::default_path()?)
            .context("Failed to open session history")?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let sessions = SessionStore::new(Box::new(repo), clock.clone());

        Ok(Self::new(config, catalog, sessions, clock))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Validate and apply a new configuration, re-registering keybinds
    ///
    /// The caller decides whether to persist it.
    pub fn apply_config(&mut self, config: AppConfig) -> Result<()> {
        config.validate()?;
        if let Some(coordinator) = self.keybinds.as_mut() {
            coordinator.reconcile(&config.keybinds)?;
        }
        self.dispatcher.set_timer_config(config.timers.clone());
        self.config = config;
        Ok(())
    }

    pub fn possible_ghosts(&self) -> Vec<&Ghost> {
        self.state.possible_ghosts(self.catalog.catalog().iter())
    }

    pub fn refresh_catalog(&mut self) -> Result<usize> {
        self.catalog.refresh()
    }

    pub fn dispatcher(&self) -> ActionDispatcher {
        self.dispatcher.clone()
    }

    pub fn dispatch(&self, action: Action) -> Result<DispatchOutcome, CompanionError> {
        self.dispatcher.dispatch(action)
    }

    /// Switch page, suspending keybinds on the settings page
    pub fn navigate(&mut self, page: Page) -> Result<()> {
        let active = self.state.set_page(page);
        if let Some(coordinator) = self.keybinds.as_mut() {
            coordinator.set_active(active)?;
        }
        Ok(())
    }

    pub fn timers(&self) -> Arc<Mutex<TimerEngine>> {
        self.timers.clone()
    }

    pub fn timer_snapshot(&self) -> Vec<TimerSnapshot> {
        self.timers.lock().snapshot()
    }

    pub fn keybinds(&self) -> Option<&KeybindCoordinator> {
        self.keybinds.as_ref()
    }

    /// Register the configured keybinds system-wide
    ///
    /// Must be called on the thread that runs the platform event loop.
    pub fn start_hotkeys(&mut self) -> Result<usize> {
        let backend = GlobalHotkeyBackend::new()?;
        self.install_keybinds(KeybindCoordinator::new(Box::new(backend)))
    }

    /// Use `coordinator` for keybinds and register the configured set
    pub fn install_keybinds(&mut self, mut coordinator: KeybindCoordinator) -> Result<usize> {
        if !self.state.current_page().allows_keybinds() {
            coordinator.set_active(false)?;
        }
        let result = coordinator.reconcile(&self.config.keybinds);
        // Keep the coordinator even if some bindings failed to register
        self.keybinds = Some(coordinator);
        let registered = result?;
        info!("Hotkeys registered ({})", registered);
        Ok(registered)
    }

    /// Start the timer poll thread and, if hotkeys are registered, the hotkey listener
    pub fn start_background_threads(&self, notifier: Box<dyn CompletionNotifier>) -> Result<()> {
        self.start_timer_poll_thread(notifier)?;

        if let Some(coordinator) = self.keybinds.as_ref() {
            self.start_hotkey_listener_thread(coordinator.table())?;
        }

        info!("Background threads started");
        Ok(())
    }

    /// Background thread that fires timer completions
    fn start_timer_poll_thread(&self, notifier: Box<dyn CompletionNotifier>) -> Result<()> {
        let timers = self.timers.clone();
        let interval = Duration::from_millis(self.poll_interval_ms);

        thread::Builder::new()
            .name("timer-poll".to_string())
            .spawn(move || {
                debug!("Timer poll thread started ({} ms)", interval.as_millis());
                loop {
                    thread::sleep(interval);
                    // Release the lock before notifying
                    let completions = timers.lock().poll();
                    for completion in &completions {
                        notifier.notify(completion);
                    }
                }
            })
            .context("Failed to spawn timer poll thread")?;
        Ok(())
    }

    /// Background thread to dispatch hotkey events
    ///
    /// Holding a timer keybind resets that timer.
    fn start_hotkey_listener_thread(&self, table: KeybindTable) -> Result<()> {
        let dispatcher = self.dispatcher.clone();

        thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                use global_hotkey::{GlobalHotKeyEvent, HotKeyState};

                let long_press = Duration::from_millis(TIMER_LONG_PRESS_RESET_MS);
                let mut pressed_at: HashMap<u32, Instant> = HashMap::new();
                let receiver = GlobalHotKeyEvent::receiver();

                loop {
                    let event = match receiver.recv() {
                        Ok(event) => event,
                        Err(e) => {
                            error!("Hotkey event channel closed: {}", e);
                            break;
                        }
                    };
                    let Some(action) = table.action_for(event.id) else {
                        continue;
                    };

                    match event.state {
                        HotKeyState::Pressed => {
                            pressed_at.insert(event.id, Instant::now());
                            if let Err(e) = dispatcher.dispatch(action) {
                                warn!("Keybind '{}' failed: {}", action.id(), e);
                            }
                        }
                        HotKeyState::Released => {
                            let held = pressed_at.remove(&event.id).map(|t| t.elapsed());
                            if held.is_some_and(|held| held >= long_press) {
                                dispatcher.reset_timer_for(action);
                            }
                        }
                    }
                }
            })
            .context("Failed to spawn hotkey listener thread")?;
        Ok(())
    }
}
