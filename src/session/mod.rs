//! Investigation tracker: the current game and win/loss/death statistics
//!
//! Every mutation goes through the repository first; the in-memory session
//! only changes once the repository accepted the write.

pub mod repository;

use crate::timers::Clock;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use repository::{SessionCounts, SessionRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use repository::{InMemorySessionRepository, SqliteSessionRepository};

/// Default look-back window for `load_recent_history`
pub const RECENT_HISTORY_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub guessed_ghost_id: Option<String>,
    pub actual_ghost_id: Option<String>,
    pub was_correct: Option<bool>,
    pub died: bool,
    pub map_name: Option<String>,
}

impl GameSession {
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Whole minutes between start and `end_time` (or `now` while active)
    pub fn duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).num_minutes()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GameStats {
    pub total_games: usize,
    pub correct_guesses: usize,
    pub incorrect_guesses: usize,
    pub deaths: usize,
    /// Percent of guessed games that were correct
    pub win_rate: f64,
}

impl From<SessionCounts> for GameStats {
    fn from(counts: SessionCounts) -> Self {
        let win_rate = if counts.with_guess > 0 {
            counts.correct as f64 / counts.with_guess as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_games: counts.total,
            correct_guesses: counts.correct,
            incorrect_guesses: counts.incorrect,
            deaths: counts.died,
            win_rate,
        }
    }
}

pub struct SessionStore {
    repo: Box<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
    current: Option<GameSession>,
    history: Vec<GameSession>,
    history_loaded: bool,
    stats: GameStats,
}

impl SessionStore {
    pub fn new(repo: Box<dyn SessionRepository>, clock: Arc<dyn Clock>) -> Self {
        let stats = match repo.stats() {
            Ok(counts) => counts.into(),
            Err(e) => {
                warn!("Failed to load game stats: {:#}", e);
                GameStats::default()
            }
        };

        Self {
            repo,
            clock,
            current: None,
            history: Vec::new(),
            history_loaded: false,
            stats,
        }
    }

    fn now(&self) -> Result<DateTime<Utc>> {
        let ms = self.clock.now_ms();
        DateTime::<Utc>::from_timestamp_millis(ms)
            .with_context(|| format!("Clock returned an invalid instant: {}", ms))
    }

    fn next_session(&self) -> Result<GameSession> {
        let count = self.repo.count()?;
        let now = self.now()?;
        Ok(GameSession {
            id: format!("game_{}_{}", count + 1, now.timestamp_millis()),
            start_time: now,
            end_time: None,
            guessed_ghost_id: None,
            actual_ghost_id: None,
            was_correct: None,
            died: false,
            map_name: None,
        })
    }

    /// Start a game, ending the active one first
    ///
    /// If the new session cannot be saved the active game is restored.
    pub fn start_new_game(&mut self) -> Result<&GameSession> {
        let ended = match self.current.clone() {
            Some(previous) => {
                let completed = self.completed(&previous)?;
                self.repo
                    .update(&completed)
                    .context("Failed to save finished game session")?;
                Some((previous, completed))
            }
            None => None,
        };

        let fresh = match self.insert_fresh() {
            Ok(fresh) => fresh,
            Err(e) => {
                if let Some((previous, _)) = &ended {
                    self.rollback(previous);
                }
                return Err(e);
            }
        };

        if let Some((_, completed)) = ended {
            self.record_ended(completed);
        }
        info!("Started game {}", fresh.id);
        Ok(self.current.insert(fresh))
    }

    pub fn end_current_game(&mut self) -> Result<()> {
        let Some(current) = self.current.as_ref() else {
            return Ok(());
        };

        let completed = self.completed(current)?;
        self.repo
            .update(&completed)
            .context("Failed to save finished game session")?;

        self.record_ended(completed);
        self.current = None;
        Ok(())
    }

    /// End the active game and immediately start a fresh one
    pub fn reset_current_game(&mut self) -> Result<()> {
        if self.current.is_none() {
            return Ok(());
        }
        self.start_new_game().map(|_| ())
    }

    /// Copy of `session` stamped as finished now
    fn completed(&self, session: &GameSession) -> Result<GameSession> {
        let mut completed = session.clone();
        completed.end_time = Some(self.now()?);
        if let (Some(guessed), Some(actual)) = (&completed.guessed_ghost_id, &completed.actual_ghost_id) {
            completed.was_correct = Some(guessed == actual);
        }
        Ok(completed)
    }

    fn insert_fresh(&mut self) -> Result<GameSession> {
        let fresh = self.next_session()?;
        self.repo
            .insert(&fresh)
            .context("Failed to save new game session")?;
        Ok(fresh)
    }

    /// Bookkeeping once a finished game has been persisted
    fn record_ended(&mut self, completed: GameSession) {
        match self.repo.stats() {
            Ok(counts) => self.stats = counts.into(),
            Err(e) => warn!("Failed to refresh game stats: {:#}", e),
        }
        info!("Ended game {}", completed.id);
        if self.history_loaded {
            self.history.retain(|s| s.id != completed.id);
            self.history.insert(0, completed);
        }
    }

    fn rollback(&mut self, previous: &GameSession) {
        if let Err(e) = self.repo.update(previous) {
            warn!("Failed to restore game session {}: {:#}", previous.id, e);
        }
    }

    /// Persist a modified copy of the current game, then adopt it
    fn update_current<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut GameSession),
    {
        let Some(current) = self.current.as_ref() else {
            return Ok(());
        };
        let mut updated = current.clone();
        change(&mut updated);
        self.repo
            .update(&updated)
            .context("Failed to update game session")?;
        self.current = Some(updated);
        Ok(())
    }

    pub fn mark_player_died(&mut self, died: bool) -> Result<()> {
        self.update_current(|session| session.died = died)
    }

    pub fn guess_ghost(&mut self, ghost_id: &str) -> Result<()> {
        self.update_current(|session| session.guessed_ghost_id = Some(ghost_id.to_string()))
    }

    pub fn confirm_actual_ghost(&mut self, ghost_id: &str) -> Result<()> {
        self.update_current(|session| {
            session.was_correct = Some(session.guessed_ghost_id.as_deref() == Some(ghost_id));
            session.actual_ghost_id = Some(ghost_id.to_string());
        })
    }

    pub fn set_map_name(&mut self, map_name: Option<String>) -> Result<()> {
        self.update_current(|session| session.map_name = map_name)
    }

    /// Load the full history (most recent first) and refresh stats
    pub fn load_history(&mut self) -> Result<&[GameSession]> {
        let history = self.repo.list_recent_first()?;
        let counts = self.repo.stats()?;
        self.history = history;
        self.history_loaded = true;
        self.stats = counts.into();
        Ok(&self.history)
    }

    /// Sessions started within the last `days` days
    pub fn load_recent_history(&self, days: i64) -> Result<Vec<GameSession>> {
        let since = self.now()? - Duration::days(days);
        self.repo.list_since(since)
    }

    pub fn refresh_stats(&mut self) -> Result<GameStats> {
        self.stats = self.repo.stats()?.into();
        Ok(self.stats)
    }

    pub fn stats(&self) -> GameStats {
        self.stats
    }

    pub fn history(&self) -> &[GameSession] {
        &self.history
    }

    pub fn current_game(&self) -> Option<&GameSession> {
        self.current.as_ref()
    }

    pub fn current_game_id(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.id.as_str())
    }

    pub fn is_game_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn is_ghost_guessed(&self, ghost_id: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.guessed_ghost_id.as_deref() == Some(ghost_id))
    }

    pub fn is_confirmed_ghost(&self, ghost_id: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|s| s.actual_ghost_id.as_deref() == Some(ghost_id))
    }

    pub fn game_duration_minutes(&self) -> Option<i64> {
        let now = self.now().ok()?;
        self.current.as_ref().map(|s| s.duration_minutes(now))
    }
}
