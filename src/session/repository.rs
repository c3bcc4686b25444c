//! Persistence for game sessions
//!
//! Game history lives in a SQLite table (`game_sessions`). Timestamps are
//! stored as UTC epoch milliseconds so range queries and ordering stay
//! numeric. Statistics are COUNT queries and never load the table.

use crate::constants::{APP_DIR_NAME, SESSION_HISTORY_FILE_NAME};
use crate::session::GameSession;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};

/// Aggregate counts over the whole session table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounts {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub died: usize,
    pub with_guess: usize,
}

pub trait SessionRepository: Send {
    /// Insert a session, replacing one with the same id
    fn insert(&mut self, session: &GameSession) -> Result<()>;

    /// Overwrite an existing session
    fn update(&mut self, session: &GameSession) -> Result<()>;

    fn delete(&mut self, id: &str) -> Result<()>;

    /// Every stored session, oldest first
    fn all(&self) -> Result<Vec<GameSession>>;

    /// Every stored session, most recent first
    fn list_recent_first(&self) -> Result<Vec<GameSession>> {
        let mut sessions = self.all()?;
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    /// Sessions started strictly after `since`, most recent first
    fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<GameSession>> {
        let mut sessions = self.list_recent_first()?;
        sessions.retain(|s| s.start_time > since);
        Ok(sessions)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.all()?.len())
    }

    fn stats(&self) -> Result<SessionCounts> {
        let sessions = self.all()?;
        Ok(SessionCounts {
            total: sessions.len(),
            correct: sessions.iter().filter(|s| s.was_correct == Some(true)).count(),
            incorrect: sessions.iter().filter(|s| s.was_correct == Some(false)).count(),
            died: sessions.iter().filter(|s| s.died).count(),
            with_guess: sessions.iter().filter(|s| s.guessed_ghost_id.is_some()).count(),
        })
    }
}

fn upsert(table: &mut Vec<GameSession>, session: &GameSession) {
    match table.iter_mut().find(|s| s.id == session.id) {
        Some(existing) => *existing = session.clone(),
        None => table.push(session.clone()),
    }
}

fn replace_existing(table: &mut [GameSession], session: &GameSession) -> Result<()> {
    let existing = table
        .iter_mut()
        .find(|s| s.id == session.id)
        .with_context(|| format!("Game session '{}' does not exist", session.id))?;
    *existing = session.clone();
    Ok(())
}

/// Volatile repository for tests
#[derive(Debug, Default)]
pub struct InMemorySessionRepository {
    sessions: Vec<GameSession>,
    fail_writes: bool,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent mutation fail (simulates a broken disk)
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes {
            anyhow::bail!("Session repository is read-only");
        }
        Ok(())
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&mut self, session: &GameSession) -> Result<()> {
        self.check_writable()?;
        upsert(&mut self.sessions, session);
        Ok(())
    }

    fn update(&mut self, session: &GameSession) -> Result<()> {
        self.check_writable()?;
        replace_existing(&mut self.sessions, session)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.check_writable()?;
        self.sessions.retain(|s| s.id != id);
        Ok(())
    }

    fn all(&self) -> Result<Vec<GameSession>> {
        let mut sessions = self.sessions.clone();
        sessions.sort_by_key(|s| s.start_time);
        Ok(sessions)
    }
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS game_sessions (
        id TEXT PRIMARY KEY,
        start_time INTEGER NOT NULL,
        end_time INTEGER,
        guessed_ghost_id TEXT,
        actual_ghost_id TEXT,
        was_correct INTEGER,
        died INTEGER NOT NULL DEFAULT 0,
        map_name TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_game_sessions_start_time ON game_sessions(start_time);
";

const SESSION_COLUMNS: &str =
    "id, start_time, end_time, guessed_ghost_id, actual_ghost_id, was_correct, died, map_name";

/// Raw `game_sessions` row before timestamp conversion
struct SessionRow {
    id: String,
    start_ms: i64,
    end_ms: Option<i64>,
    guessed_ghost_id: Option<String>,
    actual_ghost_id: Option<String>,
    was_correct: Option<bool>,
    died: bool,
    map_name: Option<String>,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start_ms: row.get(1)?,
            end_ms: row.get(2)?,
            guessed_ghost_id: row.get(3)?,
            actual_ghost_id: row.get(4)?,
            was_correct: row.get(5)?,
            died: row.get(6)?,
            map_name: row.get(7)?,
        })
    }

    fn into_session(self) -> Result<GameSession> {
        let start_time = from_millis(self.start_ms)
            .with_context(|| format!("Game session '{}' has an invalid start time", self.id))?;
        let end_time = match self.end_ms {
            Some(ms) => Some(
                from_millis(ms)
                    .with_context(|| format!("Game session '{}' has an invalid end time", self.id))?,
            ),
            None => None,
        };
        Ok(GameSession {
            id: self.id,
            start_time,
            end_time,
            guessed_ghost_id: self.guessed_ghost_id,
            actual_ghost_id: self.actual_ghost_id,
            was_correct: self.was_correct,
            died: self.died,
            map_name: self.map_name,
        })
    }
}

fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

/// SQLite-backed repository (`phasmo_games.db` under the data directory)
pub struct SqliteSessionRepository {
    conn: Connection,
}

impl SqliteSessionRepository {
    /// Default history location: `<data dir>/phasmo-companion/phasmo_games.db`
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().context("Could not determine data directory")?;
        Ok(data_dir.join(APP_DIR_NAME).join(SESSION_HISTORY_FILE_NAME))
    }

    /// Open (or create) the history database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open game history: {}", path.display()))?;
        debug!("Opened game history at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create game_sessions table")?;
        Ok(Self { conn })
    }

    fn query_sessions(&self, sql: &str, since_ms: Option<i64>) -> Result<Vec<GameSession>> {
        let mut stmt = self.conn.prepare(sql).context("Failed to prepare session query")?;
        let rows = match since_ms {
            Some(since) => stmt.query_map(params![since], SessionRow::from_row),
            None => stmt.query_map([], SessionRow::from_row),
        }
        .context("Failed to query game sessions")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read game sessions")?;

        rows.into_iter().map(SessionRow::into_session).collect()
    }

    fn count_where(&self, condition: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM game_sessions {}", condition);
        let count: i64 = self
            .conn
            .query_row(&sql, [], |row| row.get(0))
            .with_context(|| format!("Failed to count game sessions ({})", sql))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Look up a single session
    pub fn get(&self, id: &str) -> Result<Option<GameSession>> {
        let sql = format!("SELECT {} FROM game_sessions WHERE id = ?1", SESSION_COLUMNS);
        let row = self
            .conn
            .query_row(&sql, params![id], SessionRow::from_row)
            .optional()
            .with_context(|| format!("Failed to load game session '{}'", id))?;
        row.map(SessionRow::into_session).transpose()
    }
}

impl SessionRepository for SqliteSessionRepository {
    fn insert(&mut self, session: &GameSession) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO game_sessions
                    (id, start_time, end_time, guessed_ghost_id, actual_ghost_id, was_correct, died, map_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    session.id,
                    session.start_time.timestamp_millis(),
                    session.end_time.map(|t| t.timestamp_millis()),
                    session.guessed_ghost_id,
                    session.actual_ghost_id,
                    session.was_correct,
                    session.died,
                    session.map_name,
                ],
            )
            .with_context(|| format!("Failed to save game session '{}'", session.id))?;
        Ok(())
    }

    fn update(&mut self, session: &GameSession) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE game_sessions
                 SET start_time = ?2, end_time = ?3, guessed_ghost_id = ?4, actual_ghost_id = ?5,
                     was_correct = ?6, died = ?7, map_name = ?8
                 WHERE id = ?1",
                params![
                    session.id,
                    session.start_time.timestamp_millis(),
                    session.end_time.map(|t| t.timestamp_millis()),
                    session.guessed_ghost_id,
                    session.actual_ghost_id,
                    session.was_correct,
                    session.died,
                    session.map_name,
                ],
            )
            .with_context(|| format!("Failed to update game session '{}'", session.id))?;
        if changed == 0 {
            anyhow::bail!("Game session '{}' does not exist", session.id);
        }
        Ok(())
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM game_sessions WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete game session '{}'", id))?;
        Ok(())
    }

    fn all(&self) -> Result<Vec<GameSession>> {
        let sql = format!("SELECT {} FROM game_sessions ORDER BY start_time ASC", SESSION_COLUMNS);
        self.query_sessions(&sql, None)
    }

    fn list_recent_first(&self) -> Result<Vec<GameSession>> {
        let sql = format!("SELECT {} FROM game_sessions ORDER BY start_time DESC", SESSION_COLUMNS);
        self.query_sessions(&sql, None)
    }

    fn list_since(&self, since: DateTime<Utc>) -> Result<Vec<GameSession>> {
        let sql = format!(
            "SELECT {} FROM game_sessions WHERE start_time > ?1 ORDER BY start_time DESC",
            SESSION_COLUMNS
        );
        self.query_sessions(&sql, Some(since.timestamp_millis()))
    }

    fn count(&self) -> Result<usize> {
        self.count_where("")
    }

    fn stats(&self) -> Result<SessionCounts> {
        Ok(SessionCounts {
            total: self.count_where("")?,
            correct: self.count_where("WHERE was_correct = 1")?,
            incorrect: self.count_where("WHERE was_correct = 0")?,
            died: self.count_where("WHERE died = 1")?,
            with_guess: self.count_where("WHERE guessed_ghost_id IS NOT NULL")?,
        })
    }
}
