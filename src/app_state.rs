use crate::ghost::{DifficultyMode, Evidence, FilterState, Ghost, InclusionState, SpeedCalculator, SpeedReading};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Top-level page the user is looking at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    #[default]
    Ghosts,
    Games,
    Settings,
    About,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Ghosts, Page::Games, Page::Settings, Page::About];

    /// Keybinds are suspended while the user is editing them
    pub fn allows_keybinds(self) -> bool {
        self != Page::Settings
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Page::Ghosts => "ghosts",
            Page::Games => "games",
            Page::Settings => "settings",
            Page::About => "about",
        };
        f.write_str(name)
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Page::ALL
            .into_iter()
            .find(|page| page.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown page '{}'", s))
    }
}

/// Application state shared across threads
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<AppStateInner>>,
}

pub struct AppStateInner {
    /// Difficulty, evidence/speed/LoS/hunt filters and selected ghost
    pub filters: FilterState,
    pub page: Page,
    /// Tap-tempo footstep measurement
    pub speed: SpeedCalculator,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(AppStateInner {
                filters: FilterState::new(),
                page: Page::default(),
                speed: SpeedCalculator::new(),
            })),
        }
    }

    pub fn lock(&self) -> parking_lot::MutexGuard<'_, AppStateInner> {
        self.inner.lock()
    }

    pub fn filters(&self) -> FilterState {
        self.inner.lock().filters.clone()
    }

    pub fn mode(&self) -> DifficultyMode {
        self.inner.lock().filters.mode
    }

    pub fn set_mode(&self, mode: DifficultyMode) {
        let mut state = self.inner.lock();
        if state.filters.mode != mode {
            log::info!("Difficulty changed: {} -> {}", state.filters.mode, mode);
        }
        state.filters.set_mode(mode);
    }

    pub fn toggle_evidence(&self, evidence: Evidence) -> InclusionState {
        self.inner.lock().filters.toggle_evidence(evidence)
    }

    pub fn evidence_state(&self, evidence: Evidence) -> InclusionState {
        self.inner.lock().filters.selection.evidence_state(evidence)
    }

    /// Clear every filter and the speed measurement
    pub fn reset_filters(&self) {
        let mut state = self.inner.lock();
        state.filters.reset_filters();
        state.speed.reset();
        log::debug!("Filters reset");
    }

    pub fn select_ghost(&self, id: Option<String>) {
        self.inner.lock().filters.select_ghost(id);
    }

    pub fn selected_ghost(&self) -> Option<String> {
        self.inner.lock().filters.selected_ghost.clone()
    }

    pub fn current_page(&self) -> Page {
        self.inner.lock().page
    }

    /// Switch page; returns whether keybinds should be active afterwards
    pub fn set_page(&self, page: Page) -> bool {
        let mut state = self.inner.lock();
        if state.page != page {
            log::debug!("Page: {} -> {}", state.page, page);
        }
        state.page = page;
        page.allows_keybinds()
    }

    /// Register a footstep tap; a reading narrows the speed filter to its
    /// candidate categories
    pub fn speed_tap(&self, now_ms: i64) -> Option<SpeedReading> {
        let mut state = self.inner.lock();
        let reading = state.speed.tap(now_ms).cloned()?;
        state.filters.set_speed_categories(reading.candidates.clone());
        Some(reading)
    }

    pub fn speed_reading(&self) -> Option<SpeedReading> {
        self.inner.lock().speed.reading().cloned()
    }

    /// Filter `ghosts` against the current selection
    pub fn possible_ghosts<'a, I>(&self, ghosts: I) -> Vec<&'a Ghost>
    where
        I: IntoIterator<Item = &'a Ghost>,
    {
        self.inner.lock().filters.possible_ghosts(ghosts)
    }
}
