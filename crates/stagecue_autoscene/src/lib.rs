// SPDX-License-Identifier: MIT OR Apache-2.0
//! Automatic scene cycling for `StageCue`.
//!
//! This crate provides beat-driven scene changes:
//! - Scene selection (forward, ping-pong, random)
//! - Tap tempo and BPM handling
//! - Beat division into scene-change triggers
//! - Persisted operator settings
//!
//! ## Architecture
//!
//! The selector holds no timers. A caller counts beats with a
//! [`BeatClock`], filters them through a [`BeatDivider`] and calls
//! [`AutoSceneSelector::advance`] on each trigger; the chosen scene goes to
//! the injected [`SceneSink`].

pub mod scene;
pub mod selector;
pub mod settings;
pub mod tempo;

pub use scene::{SceneId, SceneLog, SceneSink, SceneSource};
pub use selector::{Advance, AutoSceneSelector, AutoSceneState, PingPongDirection, Selection, SelectionMode};
pub use settings::{AutoSceneSettings, DEFAULT_BEAT_DIVISION};
pub use tempo::{
    clamp_bpm, BeatClock, BeatDivider, TapTempo, TempoError, TempoSource, DEFAULT_BPM, MAX_BPM, MIN_BPM,
};
