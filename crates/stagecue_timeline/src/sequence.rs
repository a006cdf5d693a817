// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequence containing multiple channel tracks.

use crate::track::ChannelTrack;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for a sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub String);

impl SequenceId {
    /// Create an identifier from a name
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a new random sequence ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SequenceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current wall-clock time in Unix milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A timeline of channel tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    /// Unique sequence ID
    pub id: SequenceId,
    /// Display name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Length in milliseconds
    pub duration: f64,
    /// Channel tracks, one per channel number
    #[serde(default)]
    pub channels: Vec<ChannelTrack>,
    /// Free-form tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Creation time (Unix milliseconds)
    #[serde(default)]
    pub created_at: u64,
    /// Last modification time (Unix milliseconds)
    #[serde(default)]
    pub modified_at: u64,
}

impl Sequence {
    /// Create a new empty sequence
    pub fn new(id: impl Into<SequenceId>, name: impl Into<String>, duration: f64) -> Self {
        let now = unix_millis();
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            duration,
            channels: Vec::new(),
            tags: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Add a track, replacing any track already bound to the same channel
    pub fn add_track(&mut self, track: ChannelTrack) {
        match self.track_mut(track.channel) {
            Some(existing) => *existing = track,
            None => self.channels.push(track),
        }
    }

    /// Builder form of [`Sequence::add_track`]
    pub fn with_track(mut self, track: ChannelTrack) -> Self {
        self.add_track(track);
        self
    }

    /// Remove the track for a channel
    pub fn remove_track(&mut self, channel: u16) -> Option<ChannelTrack> {
        let idx = self.channels.iter().position(|t| t.channel == channel)?;
        Some(self.channels.remove(idx))
    }

    /// Get the track for a channel
    pub fn track(&self, channel: u16) -> Option<&ChannelTrack> {
        self.channels.iter().find(|t| t.channel == channel)
    }

    /// Get a mutable track
    pub fn track_mut(&mut self, channel: u16) -> Option<&mut ChannelTrack> {
        self.channels.iter_mut().find(|t| t.channel == channel)
    }

    /// Get all tracks
    pub fn tracks(&self) -> impl Iterator<Item = &ChannelTrack> {
        self.channels.iter()
    }

    /// Get the duration based on track content
    pub fn content_duration(&self) -> f64 {
        self.channels.iter().map(ChannelTrack::end_time).fold(0.0, f64::max)
    }

    /// Mark the sequence as modified now
    pub fn touch(&mut self) {
        self.modified_at = unix_millis();
    }

    /// Check the structural invariants a store must uphold.
    ///
    /// Keyframes past `duration` are unreachable but accepted.
    pub fn validate(&self) -> Result<(), SequenceError> {
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(SequenceError::InvalidDuration(self.duration));
        }

        let mut seen = HashSet::new();
        for track in &self.channels {
            if !seen.insert(track.channel) {
                return Err(SequenceError::DuplicateChannel(track.channel));
            }
            if let Some(kf) = track
                .keyframes
                .iter()
                .find(|k| !(k.time.is_finite() && k.time >= 0.0) || !k.value.is_finite())
            {
                return Err(SequenceError::InvalidKeyframe {
                    channel: track.channel,
                    time: kf.time,
                });
            }
            if !track.is_sorted() {
                return Err(SequenceError::UnsortedKeyframes(track.channel));
            }
        }

        Ok(())
    }
}

/// Sequence validation error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SequenceError {
    /// Duration must be finite and positive
    #[error("Invalid sequence duration: {0}")]
    InvalidDuration(f64),

    /// Two tracks bound to the same channel
    #[error("Channel {0} has more than one track")]
    DuplicateChannel(u16),

    /// Keyframe with a negative or non-finite time or value
    #[error("Invalid keyframe on channel {channel} at time {time}")]
    InvalidKeyframe {
        /// Channel of the offending track
        channel: u16,
        /// Time of the offending keyframe
        time: f64,
    },

    /// Keyframes not ordered by time
    #[error("Keyframes on channel {0} are not sorted by time")]
    UnsortedKeyframes(u16),
}
