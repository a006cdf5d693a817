// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted auto-scene settings.
//!
//! Only operator choices are stored. The current index and ping-pong leg
//! always start fresh.

use crate::scene::SceneId;
use crate::selector::SelectionMode;
use crate::tempo::{clamp_bpm, TempoSource, DEFAULT_BPM};
use serde::{Deserialize, Serialize};

/// Default number of beats between scene changes (one bar of 4/4)
pub const DEFAULT_BEAT_DIVISION: u32 = 4;

/// Operator settings for automatic scene cycling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoSceneSettings {
    /// Whether scenes change automatically
    pub enabled: bool,
    /// Scenes in cycling order
    pub scene_list: Vec<SceneId>,
    /// Selection mode
    pub mode: SelectionMode,
    /// Beats between scene changes
    pub beat_division: u32,
    /// Tempo used with [`TempoSource::ManualBpm`]
    pub manual_bpm: f64,
    /// Last tempo measured by tap tempo
    pub tap_tempo_bpm: f64,
    /// Which tempo drives the changes
    pub tempo_source: TempoSource,
}

impl Default for AutoSceneSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            scene_list: Vec::new(),
            mode: SelectionMode::Forward,
            beat_division: DEFAULT_BEAT_DIVISION,
            manual_bpm: DEFAULT_BPM,
            tap_tempo_bpm: DEFAULT_BPM,
            tempo_source: TempoSource::TapTempo,
        }
    }
}

impl AutoSceneSettings {
    /// Bring loaded values back into range
    pub fn normalized(mut self) -> Self {
        self.beat_division = self.beat_division.max(1);
        self.manual_bpm = Self::sane_bpm(self.manual_bpm);
        self.tap_tempo_bpm = Self::sane_bpm(self.tap_tempo_bpm);
        self
    }

    fn sane_bpm(bpm: f64) -> f64 {
        if bpm.is_finite() {
            clamp_bpm(bpm)
        } else {
            DEFAULT_BPM
        }
    }

    /// Tempo to run at.
    ///
    /// The internal clock source follows `clock_bpm` when a clock is running
    /// and the manual tempo otherwise.
    pub fn effective_bpm(&self, clock_bpm: Option<f64>) -> f64 {
        match self.tempo_source {
            TempoSource::InternalClock => clock_bpm.map_or(self.manual_bpm, clamp_bpm),
            TempoSource::ManualBpm => self.manual_bpm,
            TempoSource::TapTempo => self.tap_tempo_bpm,
        }
    }
}
