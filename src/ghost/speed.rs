//! Speed categories and the footstep tap-tempo calculator

use crate::constants::{
    FOOTSTEP_DISTANCE_M, SPEED_NORMAL_MAX_MS, SPEED_SLOW_MAX_MS, SPEED_TAP_DEBOUNCE_MS,
    SPEED_TAP_SAMPLES,
};
use crate::ghost::model::SpeedRange;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedCategory {
    Slow,
    Normal,
    Fast,
}

impl SpeedCategory {
    pub const ALL: [SpeedCategory; 3] = [SpeedCategory::Slow, SpeedCategory::Normal, SpeedCategory::Fast];

    /// Category of a single measured speed
    pub fn of_speed(speed_ms: f64) -> SpeedCategory {
        if speed_ms < SPEED_SLOW_MAX_MS {
            SpeedCategory::Slow
        } else if speed_ms <= SPEED_NORMAL_MAX_MS {
            SpeedCategory::Normal
        } else {
            SpeedCategory::Fast
        }
    }

    /// Every category a ghost's speed range overlaps
    pub fn of_range(range: SpeedRange) -> BTreeSet<SpeedCategory> {
        SpeedCategory::ALL
            .into_iter()
            .filter(|category| category.overlaps(range))
            .collect()
    }

    fn overlaps(self, range: SpeedRange) -> bool {
        match self {
            SpeedCategory::Slow => range.min < SPEED_SLOW_MAX_MS,
            SpeedCategory::Normal => range.max >= SPEED_SLOW_MAX_MS && range.min <= SPEED_NORMAL_MAX_MS,
            SpeedCategory::Fast => range.max > SPEED_NORMAL_MAX_MS,
        }
    }

    /// The category plus its neighbours, to absorb tapping inaccuracy
    pub fn with_neighbours(self) -> BTreeSet<SpeedCategory> {
        let list: &[SpeedCategory] = match self {
            SpeedCategory::Slow => &[SpeedCategory::Slow, SpeedCategory::Normal],
            SpeedCategory::Normal => &SpeedCategory::ALL,
            SpeedCategory::Fast => &[SpeedCategory::Normal, SpeedCategory::Fast],
        };
        list.iter().copied().collect()
    }
}

impl fmt::Display for SpeedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SpeedCategory::Slow => "slow",
            SpeedCategory::Normal => "normal",
            SpeedCategory::Fast => "fast",
        })
    }
}

impl FromStr for SpeedCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(SpeedCategory::Slow),
            "normal" => Ok(SpeedCategory::Normal),
            "fast" => Ok(SpeedCategory::Fast),
            _ => Err(format!("unknown speed category '{}'", s)),
        }
    }
}

pub fn bpm_to_speed(bpm: f64) -> f64 {
    bpm * FOOTSTEP_DISTANCE_M / 60.0
}

pub fn speed_to_bpm(speed_ms: f64) -> f64 {
    speed_ms * 60.0 / FOOTSTEP_DISTANCE_M
}

/// Result of a tap-tempo measurement
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedReading {
    pub bpm: f64,
    pub speed_ms: f64,
    pub category: SpeedCategory,
    /// Candidate categories to filter by
    pub candidates: BTreeSet<SpeedCategory>,
}

/// Tap once per ghost footstep; the average interval gives the speed
#[derive(Debug, Default, Clone)]
pub struct SpeedCalculator {
    taps: VecDeque<i64>,
    last_reading: Option<SpeedReading>,
}

impl SpeedCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a footstep at `now_ms` (wall-clock milliseconds)
    ///
    /// Returns the updated reading once at least two taps are recorded.
    pub fn tap(&mut self, now_ms: i64) -> Option<&SpeedReading> {
        if let Some(&last) = self.taps.back() {
            if now_ms - last < SPEED_TAP_DEBOUNCE_MS {
                log::debug!("Ignoring speed tap {}ms after previous tap", now_ms - last);
                return self.last_reading.as_ref();
            }
        }

        self.taps.push_back(now_ms);
        while self.taps.len() > SPEED_TAP_SAMPLES {
            self.taps.pop_front();
        }

        if self.taps.len() >= 2 {
            let first = self.taps.front().copied().unwrap_or(now_ms);
            let intervals = (self.taps.len() - 1) as f64;
            let avg_interval_ms = (now_ms - first) as f64 / intervals;
            let bpm = 60_000.0 / avg_interval_ms;
            let speed_ms = bpm_to_speed(bpm);
            let category = SpeedCategory::of_speed(speed_ms);

            log::debug!(
                "Speed tap: {:.0} BPM, {:.2} m/s ({})",
                bpm,
                speed_ms,
                category
            );

            self.last_reading = Some(SpeedReading {
                bpm,
                speed_ms,
                category,
                candidates: category.with_neighbours(),
            });
        }

        self.last_reading.as_ref()
    }

    pub fn reading(&self) -> Option<&SpeedReading> {
        self.last_reading.as_ref()
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn reset(&mut self) {
        self.taps.clear();
        self.last_reading = None;
    }
}
