//! Timer engine for hunt, smudge and cooldown countdowns
//!
//! Each timer kind has one slot. A slot moves Idle -> Running -> Paused ->
//! Running -> Idle and is never paused while idle. Remaining time is always
//! recomputed from wall-clock instants, so a late poll (or a machine that
//! slept) still reports the correct value.

pub mod durations;

use crate::error::CompanionError;
use chrono::Utc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of wall-clock milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// UTC wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    Hunt,
    Smudge,
    Cooldown,
}

impl TimerKind {
    pub const ALL: [TimerKind; 3] = [TimerKind::Hunt, TimerKind::Smudge, TimerKind::Cooldown];

    pub fn display_name(self) -> &'static str {
        match self {
            TimerKind::Hunt => "Hunt",
            TimerKind::Smudge => "Smudge",
            TimerKind::Cooldown => "Cooldown",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimerKind::Hunt => "hunt",
            TimerKind::Smudge => "smudge",
            TimerKind::Cooldown => "cooldown",
        })
    }
}

impl FromStr for TimerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hunt" => Ok(TimerKind::Hunt),
            "smudge" => Ok(TimerKind::Smudge),
            "cooldown" => Ok(TimerKind::Cooldown),
            _ => Err(format!("unknown timer '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
}

/// One countdown instance; replaced wholesale on every start
#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub id: u64,
    pub kind: TimerKind,
    /// Duration in seconds
    pub start_value: u64,
    pub start_time: i64,
    pub end_time: i64,
    pub paused_at: Option<i64>,
    /// Total milliseconds spent paused
    pub paused_time: i64,
    completion_fired: bool,
}

impl Timer {
    pub fn status(&self) -> TimerStatus {
        if self.paused_at.is_some() {
            TimerStatus::Paused
        } else {
            TimerStatus::Running
        }
    }

    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        let remaining = match self.paused_at {
            Some(paused_at) => {
                let elapsed = paused_at - self.start_time - self.paused_time;
                self.start_value as i64 * 1000 - elapsed
            }
            None => self.end_time - now_ms,
        };
        remaining.max(0)
    }

    /// Whole seconds left, rounded up
    pub fn remaining_seconds(&self, now_ms: i64) -> u64 {
        let ms = self.remaining_ms(now_ms);
        ((ms + 999) / 1000) as u64
    }
}

/// Emitted once per timer instance when it reaches zero
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerCompletion {
    pub kind: TimerKind,
    pub timer_id: u64,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerSnapshot {
    pub kind: TimerKind,
    pub status: TimerStatus,
    pub remaining_secs: u64,
    pub duration_secs: Option<u64>,
}

pub struct TimerEngine {
    clock: Arc<dyn Clock>,
    slots: BTreeMap<TimerKind, Timer>,
    next_id: u64,
}

impl TimerEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            slots: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn with_system_clock() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    /// Start (or restart) a countdown, replacing whatever the slot held
    pub fn start(&mut self, kind: TimerKind, duration_secs: u64) -> Result<u64, CompanionError> {
        let now = self.clock.now_ms();
        let end_time = i64::try_from(duration_secs)
            .ok()
            .filter(|&secs| secs > 0)
            .and_then(|secs| secs.checked_mul(1000))
            .and_then(|ms| now.checked_add(ms))
            .ok_or(CompanionError::InvalidTimerDuration(duration_secs))?;

        let id = self.next_id;
        self.next_id += 1;

        self.slots.insert(
            kind,
            Timer {
                id,
                kind,
                start_value: duration_secs,
                start_time: now,
                end_time,
                paused_at: None,
                paused_time: 0,
                completion_fired: false,
            },
        );
        info!("{} timer started ({}s)", kind.display_name(), duration_secs);
        Ok(id)
    }

    pub fn pause(&mut self, kind: TimerKind) {
        let now = self.clock.now_ms();
        if let Some(timer) = self.slots.get_mut(&kind) {
            if timer.paused_at.is_none() {
                timer.paused_at = Some(now);
                debug!("{} timer paused", kind.display_name());
            }
        }
    }

    pub fn resume(&mut self, kind: TimerKind) {
        let now = self.clock.now_ms();
        if let Some(timer) = self.slots.get_mut(&kind) {
            if let Some(paused_at) = timer.paused_at.take() {
                let span = now - paused_at;
                timer.end_time += span;
                timer.paused_time += span;
                debug!("{} timer resumed after {}ms pause", kind.display_name(), span);
            }
        }
    }

    pub fn reset(&mut self, kind: TimerKind) {
        if self.slots.remove(&kind).is_some() {
            debug!("{} timer reset", kind.display_name());
        }
    }

    /// Idle starts, running pauses, paused resumes
    pub fn toggle(&mut self, kind: TimerKind, duration_secs: u64) -> Result<TimerStatus, CompanionError> {
        match self.status(kind) {
            TimerStatus::Idle => {
                self.start(kind, duration_secs)?;
            }
            TimerStatus::Running => self.pause(kind),
            TimerStatus::Paused => self.resume(kind),
        }
        Ok(self.status(kind))
    }

    pub fn status(&self, kind: TimerKind) -> TimerStatus {
        self.slots
            .get(&kind)
            .map_or(TimerStatus::Idle, Timer::status)
    }

    pub fn timer(&self, kind: TimerKind) -> Option<&Timer> {
        self.slots.get(&kind)
    }

    pub fn remaining_seconds(&self, kind: TimerKind) -> u64 {
        let now = self.clock.now_ms();
        self.slots
            .get(&kind)
            .map_or(0, |timer| timer.remaining_seconds(now))
    }

    /// Report running timers that reached zero since the last poll
    pub fn poll(&mut self) -> Vec<TimerCompletion> {
        let now = self.clock.now_ms();
        let mut completions = Vec::new();

        for timer in self.slots.values_mut() {
            if timer.completion_fired || timer.paused_at.is_some() {
                continue;
            }
            if timer.remaining_ms(now) == 0 {
                timer.completion_fired = true;
                info!("{} timer finished", timer.kind.display_name());
                completions.push(TimerCompletion {
                    kind: timer.kind,
                    timer_id: timer.id,
                    duration_secs: timer.start_value,
                });
            }
        }

        completions
    }

    pub fn snapshot(&self) -> Vec<TimerSnapshot> {
        let now = self.clock.now_ms();
        TimerKind::ALL
            .into_iter()
            .map(|kind| match self.slots.get(&kind) {
                Some(timer) => TimerSnapshot {
                    kind,
                    status: timer.status(),
                    remaining_secs: timer.remaining_seconds(now),
                    duration_secs: Some(timer.start_value),
                },
                None => TimerSnapshot {
                    kind,
                    status: TimerStatus::Idle,
                    remaining_secs: 0,
                    duration_secs: None,
                },
            })
            .collect()
    }
}

/// `mm:ss` for display
pub fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
