// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tempo tracking for beat-synchronised scene changes.
//!
//! This module handles:
//! - BPM limits
//! - Tap tempo averaging
//! - Converting wall time into beats
//! - Dividing beats into scene-change triggers

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Slowest tempo accepted
pub const MIN_BPM: f64 = 20.0;

/// Fastest tempo accepted
pub const MAX_BPM: f64 = 300.0;

/// Default tempo
pub const DEFAULT_BPM: f64 = 120.0;

/// Taps further apart than this restart the measurement
pub const TAP_RESET_MS: f64 = 2000.0;

/// Number of recent tap intervals averaged
pub const TAP_HISTORY: usize = 5;

/// Clamp a tempo into the accepted range
pub fn clamp_bpm(bpm: f64) -> f64 {
    bpm.clamp(MIN_BPM, MAX_BPM)
}

/// Tempo error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TempoError {
    /// Tempo is not a finite number
    #[error("Invalid tempo: {0}")]
    InvalidBpm(f64),
}

/// Where the auto-scene tempo comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempoSource {
    /// External (MIDI or internal) clock
    InternalClock,
    /// Fixed BPM entered by the operator
    ManualBpm,
    /// Tempo measured from taps
    #[default]
    TapTempo,
}

/// Tap tempo measurement
#[derive(Debug, Clone)]
pub struct TapTempo {
    last_tap: Option<Instant>,
    intervals: VecDeque<f64>,
    bpm: f64,
}

impl TapTempo {
    /// Create a tap tempo starting at `bpm`
    pub fn new(bpm: f64) -> Self {
        Self {
            last_tap: None,
            intervals: VecDeque::with_capacity(TAP_HISTORY + 1),
            bpm: clamp_bpm(bpm),
        }
    }

    /// Register a tap.
    ///
    /// Returns the new tempo once at least two intervals are known.
    pub fn tap(&mut self, now: Instant) -> Option<f64> {
        if let Some(last) = self.last_tap {
            let interval = now.saturating_duration_since(last).as_secs_f64() * 1000.0;
            if interval > 0.0 && interval < TAP_RESET_MS {
                self.intervals.push_back(interval);
                if self.intervals.len() > TAP_HISTORY {
                    self.intervals.pop_front();
                }
            } else {
                tracing::debug!("Tap interval {:.0} ms out of range, restarting tap tempo", interval);
                self.intervals.clear();
            }
        }
        self.last_tap = Some(now);

        if self.intervals.len() < 2 {
            return None;
        }
        let average = self.intervals.iter().sum::<f64>() / self.intervals.len() as f64;
        if average <= 0.0 {
            return None;
        }
        self.bpm = clamp_bpm(60_000.0 / average);
        Some(self.bpm)
    }

    /// Last measured tempo
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Number of intervals in the current measurement
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

/// Converts elapsed wall time into whole beats
#[derive(Debug, Clone)]
pub struct BeatClock {
    bpm: f64,
    next_beat: Option<Instant>,
}

impl BeatClock {
    /// Create a clock at a tempo (clamped into range)
    pub fn new(bpm: f64) -> Result<Self, TempoError> {
        if !bpm.is_finite() {
            return Err(TempoError::InvalidBpm(bpm));
        }
        Ok(Self {
            bpm: clamp_bpm(bpm),
            next_beat: None,
        })
    }

    /// Current tempo
    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Change tempo; the beat already scheduled keeps its time
    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), TempoError> {
        if !bpm.is_finite() {
            return Err(TempoError::InvalidBpm(bpm));
        }
        self.bpm = clamp_bpm(bpm);
        Ok(())
    }

    /// Length of one beat
    pub fn beat_interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.bpm)
    }

    /// Start counting with a beat at `now`
    pub fn start(&mut self, now: Instant) {
        self.next_beat = Some(now);
    }

    /// Stop counting; the next poll restarts the phase
    pub fn stop(&mut self) {
        self.next_beat = None;
    }

    /// Number of beats that fell due up to `now`.
    ///
    /// The first poll of a stopped clock starts it and counts the downbeat.
    pub fn poll(&mut self, now: Instant) -> u32 {
        let interval = self.beat_interval();
        let mut next = *self.next_beat.get_or_insert(now);
        let mut beats = 0;
        while next <= now {
            beats += 1;
            next += interval;
        }
        self.next_beat = Some(next);
        beats
    }
}

/// Fires once every `division` beats, starting with the first
#[derive(Debug, Clone)]
pub struct BeatDivider {
    division: u32,
    count: u32,
}

impl BeatDivider {
    /// Create a divider; divisions below one are raised to one
    pub fn new(division: u32) -> Self {
        Self {
            division: division.max(1),
            count: 0,
        }
    }

    /// Beats per trigger
    pub fn division(&self) -> u32 {
        self.division
    }

    /// Change the division and restart the count
    pub fn set_division(&mut self, division: u32) {
        self.division = division.max(1);
        self.count = 0;
    }

    /// Register one beat; true when this beat triggers
    pub fn on_beat(&mut self) -> bool {
        let fire = self.count == 0;
        self.count = (self.count + 1) % self.division;
        fire
    }

    /// Restart the count
    pub fn reset(&mut self) {
        self.count = 0;
    }
}
