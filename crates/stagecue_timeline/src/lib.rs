// SPDX-License-Identifier: MIT OR Apache-2.0
//! Keyframe timeline engine for `StageCue`.
//!
//! This crate turns authored channel curves into DMX channel values:
//! - Keyframes with per-segment interpolation curves
//! - Channel tracks and sequences
//! - Curve evaluation (step, eased, bezier)
//! - Playback transport (seek, loop, ping-pong, speed, direction)
//!
//! ## Architecture
//!
//! The engine holds no global state. A [`TimelineTransport`] is constructed
//! with a [`SequenceStore`] to read sequences from and a [`ChannelSink`] to
//! emit values to, and is driven by an external clock calling
//! [`TimelineTransport::tick`].

pub mod curve;
pub mod keyframe;
pub mod sequence;
pub mod sink;
pub mod store;
pub mod track;
pub mod transport;

pub use curve::{CurveError, CurveEvaluator, Interpolation, Segment};
pub use keyframe::{ControlPoint, CurveKind, Keyframe};
pub use sequence::{Sequence, SequenceError, SequenceId};
pub use sink::{ChannelLevel, ChannelSink, RecordingSink};
pub use store::SequenceStore;
pub use track::ChannelTrack;
pub use transport::{
    Direction, PlayOptions, PlaybackState, TimelineTransport, TransportError, MAX_SPEED, MIN_SPEED,
};
