// SPDX-License-Identifier: MIT OR Apache-2.0
//! Channel tracks: the keyframes driving one DMX channel.

use crate::keyframe::Keyframe;
use serde::{Deserialize, Serialize};

/// The keyframes of one output channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelTrack {
    /// Channel number (DMX address)
    pub channel: u16,
    /// Keyframes ordered by time
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
}

impl ChannelTrack {
    /// Create an empty track for a channel
    pub fn new(channel: u16) -> Self {
        Self {
            channel,
            keyframes: Vec::new(),
        }
    }

    /// Build a track from keyframes, sorting them by time
    pub fn with_keyframes(channel: u16, keyframes: impl IntoIterator<Item = Keyframe>) -> Self {
        let mut track = Self {
            channel,
            keyframes: keyframes.into_iter().collect(),
        };
        track.sort_keyframes();
        track
    }

    /// Add a keyframe, keeping time order.
    ///
    /// A keyframe at an already used time lands after the existing ones.
    pub fn add_keyframe(&mut self, keyframe: Keyframe) {
        let idx = self.keyframes.partition_point(|k| k.time <= keyframe.time);
        self.keyframes.insert(idx, keyframe);
    }

    /// Remove the keyframe at an index
    pub fn remove_keyframe(&mut self, index: usize) -> Option<Keyframe> {
        (index < self.keyframes.len()).then(|| self.keyframes.remove(index))
    }

    /// Sort keyframes by time (stable, so equal times keep their order)
    pub fn sort_keyframes(&mut self) {
        self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    /// Whether keyframes are in non-decreasing time order
    pub fn is_sorted(&self) -> bool {
        self.keyframes.windows(2).all(|w| w[0].time <= w[1].time)
    }

    /// Time of the last keyframe
    pub fn end_time(&self) -> f64 {
        self.keyframes.last().map(|k| k.time).unwrap_or(0.0)
    }

    /// Get keyframes in a time range (inclusive)
    pub fn keyframes_in_range(&self, start: f64, end: f64) -> impl Iterator<Item = &Keyframe> {
        self.keyframes
            .iter()
            .filter(move |k| k.time >= start && k.time <= end)
    }

    /// Whether the track has no keyframes
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_keyframe_keeps_order() {
        let mut track = ChannelTrack::new(1);
        track.add_keyframe(Keyframe::new(500.0, 10.0));
        track.add_keyframe(Keyframe::new(0.0, 0.0));
        track.add_keyframe(Keyframe::new(500.0, 20.0));
        track.add_keyframe(Keyframe::new(250.0, 5.0));

        let times: Vec<f64> = track.keyframes.iter().map(|k| k.time).collect();
        assert_eq!(times, vec![0.0, 250.0, 500.0, 500.0]);
        // Equal-time keyframes keep insertion order
        assert_eq!(track.keyframes[3].value, 20.0);
        assert!(track.is_sorted());
        assert_eq!(track.end_time(), 500.0);
    }

    #[test]
    fn test_with_keyframes_sorts() {
        let track = ChannelTrack::with_keyframes(
            3,
            [Keyframe::new(10.0, 1.0), Keyframe::new(2.0, 2.0), Keyframe::new(5.0, 3.0)],
        );
        assert!(track.is_sorted());
        assert_eq!(track.keyframes_in_range(2.0, 5.0).count(), 2);
    }

    #[test]
    fn test_remove_keyframe() {
        let mut track = ChannelTrack::with_keyframes(0, [Keyframe::new(0.0, 1.0)]);
        assert!(track.remove_keyframe(4).is_none());
        assert_eq!(track.remove_keyframe(0).map(|k| k.value), Some(1.0));
        assert!(track.is_empty());
    }
}
