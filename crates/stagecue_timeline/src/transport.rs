// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback transport for one active sequence.
//!
//! The transport owns position, speed and direction. An external clock calls
//! [`TimelineTransport::tick`] with a monotonic instant; each tick advances
//! the position by the elapsed time since the previous tick, resolves the
//! sequence boundaries (stop, wrap or reflect) and emits one batch of channel
//! values to the sink.

use crate::curve::CurveEvaluator;
use crate::sequence::{Sequence, SequenceId};
use crate::sink::{ChannelLevel, ChannelSink};
use crate::store::SequenceStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Slowest accepted playback speed
pub const MIN_SPEED: f64 = 0.01;

/// Fastest accepted playback speed
pub const MAX_SPEED: f64 = 100.0;

/// Playback direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Towards the end of the sequence
    #[default]
    Forward,
    /// Towards the start of the sequence
    Reverse,
}

impl Direction {
    /// `+1.0` forward, `-1.0` reverse
    pub fn sign(self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Reverse => -1.0,
        }
    }

    /// The opposite direction
    pub fn flipped(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

/// Options for starting playback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayOptions {
    /// Speed multiplier
    pub speed: f64,
    /// Wrap (or reflect, with ping-pong) at the boundaries instead of stopping
    pub looping: bool,
    /// Base direction
    pub direction: Direction,
    /// Bounce between the boundaries; only takes effect while looping
    pub ping_pong: bool,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            looping: false,
            direction: Direction::Forward,
            ping_pong: false,
        }
    }
}

/// Snapshot of the transport
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// Whether ticks advance the position
    pub active: bool,
    /// Sequence being played (kept after stop)
    pub sequence_id: Option<SequenceId>,
    /// Position in milliseconds
    pub position: f64,
    /// Speed multiplier
    pub speed: f64,
    /// Looping enabled
    pub looping: bool,
    /// Base direction
    pub direction: Direction,
    /// Ping-pong enabled
    pub ping_pong: bool,
    /// Current leg of a ping-pong cycle
    pub ping_pong_direction: Direction,
}

impl Default for PlaybackState {
    fn default() -> Self {
        let options = PlayOptions::default();
        Self {
            active: false,
            sequence_id: None,
            position: 0.0,
            speed: options.speed,
            looping: options.looping,
            direction: options.direction,
            ping_pong: options.ping_pong,
            ping_pong_direction: Direction::Forward,
        }
    }
}

impl PlaybackState {
    /// Signed rate of position change per millisecond of wall time
    pub fn velocity(&self) -> f64 {
        let leg = if self.ping_pong {
            self.ping_pong_direction.sign()
        } else {
            1.0
        };
        self.speed * self.direction.sign() * leg
    }
}

/// Transport error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// The store has no sequence with this ID
    #[error("Sequence not found: {0}")]
    SequenceNotFound(SequenceId),

    /// Argument out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

fn validate_speed(speed: f64) -> Result<(), TransportError> {
    if speed.is_finite() && (MIN_SPEED..=MAX_SPEED).contains(&speed) {
        Ok(())
    } else {
        Err(TransportError::InvalidArgument(format!(
            "speed {speed} outside {MIN_SPEED}..={MAX_SPEED}"
        )))
    }
}

fn validate_duration(sequence: &Sequence) -> Result<(), TransportError> {
    if sequence.duration.is_finite() && sequence.duration > 0.0 {
        Ok(())
    } else {
        Err(TransportError::InvalidArgument(format!(
            "sequence {} has duration {}",
            sequence.id, sequence.duration
        )))
    }
}

/// Outcome of resolving a candidate position against the boundaries
#[derive(Debug, Clone, Copy, PartialEq)]
struct Resolved {
    position: f64,
    flips: u32,
    finished: bool,
}

/// Fold `candidate` back into `[0, duration]`.
///
/// Handles any overshoot in one call: whole ping-pong periods are removed
/// up front, then reflection repeats until the candidate is in range.
fn resolve_boundaries(candidate: f64, duration: f64, velocity: f64, looping: bool, ping_pong: bool) -> Resolved {
    let mut position = candidate;
    let mut flips = 0;

    if looping && ping_pong {
        let period = 2.0 * duration;
        if position > duration || position < 0.0 {
            // Whole periods reflect twice, which leaves the leg unchanged
            let whole = (position / period).floor();
            position -= whole * period;
        }
        while !(0.0..=duration).contains(&position) {
            position = if position > duration {
                2.0 * duration - position
            } else {
                -position
            };
            flips += 1;
        }
    } else if looping {
        if !(0.0..=duration).contains(&position) {
            position = position.rem_euclid(duration);
        }
    } else if (velocity > 0.0 && position >= duration) || position > duration {
        return Resolved { position: duration, flips, finished: true };
    } else if (velocity < 0.0 && position <= 0.0) || position < 0.0 {
        return Resolved { position: 0.0, flips, finished: true };
    }

    Resolved { position, flips, finished: false }
}

/// Drives one sequence at a time and emits its channel values
pub struct TimelineTransport<S, K> {
    store: S,
    sink: K,
    state: PlaybackState,
    /// Instant the position was last advanced to
    reference: Option<Instant>,
    /// Duration of the selected sequence, for clamping seeks
    duration: Option<f64>,
    /// (channel, segment) pairs already reported as degraded
    warned_segments: HashSet<(u16, usize)>,
}

impl<S: SequenceStore, K: ChannelSink> TimelineTransport<S, K> {
    /// Create an idle transport
    pub fn new(store: S, sink: K) -> Self {
        Self {
            store,
            sink,
            state: PlaybackState::default(),
            reference: None,
            duration: None,
            warned_segments: HashSet::new(),
        }
    }

    /// Start or resume playback.
    ///
    /// Resuming the sequence already selected keeps the position; a new
    /// sequence starts at the end it plays away from.
    pub fn play(&mut self, sequence_id: &SequenceId, options: PlayOptions, now: Instant) -> Result<(), TransportError> {
        validate_speed(options.speed)?;
        let sequence = self
            .store
            .load_sequence(sequence_id)
            .ok_or_else(|| TransportError::SequenceNotFound(sequence_id.clone()))?;
        validate_duration(&sequence)?;

        let resuming = self.state.sequence_id.as_ref() == Some(sequence_id);
        if resuming {
            self.state.position = self.state.position.clamp(0.0, sequence.duration);
            if !(options.ping_pong && self.state.ping_pong) {
                self.state.ping_pong_direction = Direction::Forward;
            }
        } else {
            self.state.sequence_id = Some(sequence_id.clone());
            self.state.position = match options.direction {
                Direction::Forward => 0.0,
                Direction::Reverse => sequence.duration,
            };
            self.state.ping_pong_direction = Direction::Forward;
            self.warned_segments.clear();
        }

        self.state.speed = options.speed;
        self.state.looping = options.looping;
        self.state.direction = options.direction;
        self.state.ping_pong = options.ping_pong;
        self.state.active = true;
        self.reference = Some(now);
        self.duration = Some(sequence.duration);

        tracing::debug!(
            "Playing sequence {} from {:.1} ms ({})",
            sequence_id,
            self.state.position,
            if resuming { "resumed" } else { "new" }
        );
        Ok(())
    }

    /// Stop playback, keeping the position
    pub fn stop(&mut self) {
        self.state.active = false;
        self.reference = None;
    }

    /// Move to a position, clamped to the sequence.
    ///
    /// Does not change whether the transport is playing.
    pub fn seek(&mut self, position: f64) -> Result<(), TransportError> {
        if position.is_nan() {
            return Err(TransportError::InvalidArgument("seek position is NaN".to_string()));
        }
        let upper = self.duration.unwrap_or(f64::INFINITY);
        self.state.position = position.clamp(0.0, upper);
        Ok(())
    }

    /// Change the speed multiplier
    pub fn set_speed(&mut self, speed: f64) -> Result<(), TransportError> {
        validate_speed(speed)?;
        self.state.speed = speed;
        Ok(())
    }

    /// Change the base direction
    pub fn set_direction(&mut self, direction: Direction) {
        self.state.direction = direction;
    }

    /// Enable or disable looping
    pub fn set_looping(&mut self, looping: bool) {
        self.state.looping = looping;
    }

    /// Enable or disable ping-pong; either way the next leg runs forward
    pub fn set_ping_pong(&mut self, ping_pong: bool) {
        self.state.ping_pong = ping_pong;
        self.state.ping_pong_direction = Direction::Forward;
    }

    /// Advance to `now` and emit the channel values at the new position.
    ///
    /// Returns the new position, or `None` when idle.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        if !self.state.active {
            return None;
        }
        let sequence_id = self.state.sequence_id.clone()?;

        let Some(sequence) = self.store.load_sequence(&sequence_id) else {
            tracing::warn!("Sequence {} disappeared during playback, stopping", sequence_id);
            self.stop();
            return None;
        };
        if let Err(err) = validate_duration(&sequence) {
            tracing::warn!("Stopping playback: {err}");
            self.stop();
            return None;
        }
        self.duration = Some(sequence.duration);

        let reference = self.reference.unwrap_or(now);
        let wall_ms = now.saturating_duration_since(reference).as_secs_f64() * 1000.0;
        self.reference = Some(now);

        let velocity = self.state.velocity();
        let candidate = self.state.position + wall_ms * velocity;
        let resolved = resolve_boundaries(
            candidate,
            sequence.duration,
            velocity,
            self.state.looping,
            self.state.ping_pong,
        );

        if resolved.flips % 2 == 1 {
            self.state.ping_pong_direction = self.state.ping_pong_direction.flipped();
        }
        self.state.position = resolved.position;
        if resolved.finished {
            tracing::debug!("Sequence {} finished at {:.1} ms", sequence_id, resolved.position);
            self.stop();
        }

        self.emit_frame(&sequence);
        Some(self.state.position)
    }

    /// Evaluate every track at the current position and emit one batch
    fn emit_frame(&mut self, sequence: &Arc<Sequence>) {
        let position = self.state.position;
        let mut batch = Vec::with_capacity(sequence.channels.len());

        for track in sequence.tracks() {
            let (value, degraded) = CurveEvaluator::evaluate_or_linear(track, position);
            if let Some(err) = degraded {
                let segment = CurveEvaluator::segment_at(track, position).map_or(0, |s| s.index);
                if self.warned_segments.insert((track.channel, segment)) {
                    tracing::warn!(
                        "Channel {} segment {} of sequence {}: {err}; using linear",
                        track.channel,
                        segment,
                        sequence.id
                    );
                }
            }
            if let Some(value) = value {
                batch.push(ChannelLevel::new(track.channel, value));
            }
        }

        if !batch.is_empty() {
            self.sink.emit(&batch);
        }
    }

    /// Snapshot of the playback state
    pub fn playback_state(&self) -> PlaybackState {
        self.state.clone()
    }

    /// Whether ticks currently advance the position
    pub fn is_playing(&self) -> bool {
        self.state.active
    }

    /// The sequence store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The output sink
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Mutable access to the output sink
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }
}
