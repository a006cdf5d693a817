// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless playback runner.
//!
//! Drives the timeline transport at a fixed frame rate and the auto-scene
//! selector from a beat clock. Time comes either from a simulated clock
//! (frames are computed back to back) or from the wall clock.

use crate::config::{AppConfig, MAX_FRAME_RATE};
use crate::error::AppError;
use crate::store::ShowStore;
use crate::universe::{ChannelMapping, SceneActivator, SharedUniverse, UniverseSink};
use stagecue_autoscene::{
    Advance, AutoSceneSelector, AutoSceneState, BeatClock, BeatDivider, SceneSource,
};
use stagecue_timeline::{PlayOptions, PlaybackState, SequenceId, TimelineTransport};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Slots shown in the per-second status line
const STATUS_SLOTS: usize = 8;

/// Outcome of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Frames computed
    pub frames: u64,
    /// Scenes activated
    pub scene_changes: usize,
    /// Transport state after the last frame
    pub playback: PlaybackState,
}

struct AutoSceneDriver {
    selector: AutoSceneSelector<SceneActivator>,
    clock: BeatClock,
    divider: BeatDivider,
}

impl AutoSceneDriver {
    fn on_frame(&mut self, now: Instant) {
        for _ in 0..self.clock.poll(now) {
            if !self.divider.on_beat() {
                continue;
            }
            if let Advance::NotReady = self.selector.advance() {
                tracing::debug!("Beat trigger ignored, no scenes enrolled");
            }
        }
    }
}

/// Couples the transport and the auto-scene selector to one universe
pub struct Runner {
    transport: TimelineTransport<Arc<ShowStore>, UniverseSink>,
    auto_scene: Option<AutoSceneDriver>,
    universe: SharedUniverse,
    frame_interval: Duration,
}

impl Runner {
    /// Build a runner from configuration
    pub fn new(config: &AppConfig, store: Arc<ShowStore>, universe: SharedUniverse) -> Result<Self, AppError> {
        let sink = UniverseSink::new(universe.clone(), ChannelMapping::from(&config.output));
        let transport = TimelineTransport::new(store.clone(), sink);

        let auto_scene = if config.auto_scene.enabled {
            let settings = config.auto_scene.clone().normalized();
            let activator = SceneActivator::new(universe.clone(), store.clone());
            let selector = if settings.scene_list.is_empty() {
                AutoSceneSelector::with_entropy(store.list_auto_scene_ids(), settings.mode, activator)
            } else {
                AutoSceneSelector::with_entropy(settings.scene_list.clone(), settings.mode, activator)
            };
            let bpm = settings.effective_bpm(None);
            tracing::info!(
                "Auto-scene enabled: {} mode, {} scenes, change every {} beats at {:.1} BPM",
                settings.mode.name(),
                selector.auto_scene_state().scene_list.len(),
                settings.beat_division,
                bpm
            );
            Some(AutoSceneDriver {
                clock: BeatClock::new(bpm)?,
                divider: BeatDivider::new(settings.beat_division),
                selector,
            })
        } else {
            None
        };

        Ok(Self {
            transport,
            auto_scene,
            universe,
            frame_interval: Duration::from_secs_f64(1.0 / config.playback.frame_rate),
        })
    }

    /// Override the frame rate
    pub fn set_frame_rate(&mut self, fps: f64) -> Result<(), AppError> {
        if !(fps.is_finite() && fps > 0.0 && fps <= MAX_FRAME_RATE) {
            return Err(AppError::Config(format!("Invalid frame rate: {}", fps)));
        }
        self.frame_interval = Duration::from_secs_f64(1.0 / fps);
        Ok(())
    }

    /// Start a sequence
    pub fn play(&mut self, sequence_id: &SequenceId, options: PlayOptions, now: Instant) -> Result<(), AppError> {
        self.transport.play(sequence_id, options, now)?;
        if let Some(sequence) = self.transport.store().sequence(sequence_id) {
            tracing::info!(
                "Playing '{}' ({} ms, {} tracks) at {}x{}{}",
                sequence.name,
                sequence.duration,
                sequence.channels.len(),
                options.speed,
                if options.looping { ", looping" } else { "" },
                if options.looping && options.ping_pong { ", ping-pong" } else { "" }
            );
        }
        Ok(())
    }

    /// Compute one frame.
    ///
    /// Scene changes are applied before the timeline, so animated channels
    /// win over scene levels.
    pub fn step(&mut self, now: Instant) -> Option<f64> {
        if let Some(driver) = self.auto_scene.as_mut() {
            driver.on_frame(now);
        }
        self.transport.tick(now)
    }

    /// Run for `duration` starting at `start`.
    ///
    /// With `realtime` each frame waits for its wall-clock time. Without it
    /// frames are computed as fast as possible. The run ends early once the
    /// transport stops and no auto-scene cycling is configured.
    pub fn run_for(&mut self, start: Instant, duration: Duration, realtime: bool) -> RunSummary {
        let interval = self.frame_interval.as_secs_f64();
        let last_frame = (duration.as_secs_f64() / interval).round() as u64;
        let mut next_status = 1;
        let mut frames = 0;

        for frame in 0..=last_frame {
            let now = start + Duration::from_secs_f64(frame as f64 * interval);
            if realtime {
                let wait = now.saturating_duration_since(Instant::now());
                if !wait.is_zero() {
                    std::thread::sleep(wait);
                }
            }

            self.step(now);
            frames += 1;

            let elapsed = now.duration_since(start).as_secs();
            if elapsed >= next_status {
                self.log_status(elapsed);
                next_status = elapsed + 1;
            }

            if !self.transport.is_playing() && self.auto_scene.is_none() {
                tracing::info!("Playback finished after {} frames", frames);
                break;
            }
        }

        RunSummary {
            frames,
            scene_changes: self.scene_changes(),
            playback: self.transport.playback_state(),
        }
    }

    fn log_status(&self, elapsed_secs: u64) {
        let state = self.transport.playback_state();
        let levels: Vec<String> = self
            .universe
            .read()
            .active_slots()
            .take(STATUS_SLOTS)
            .map(|(slot, level)| format!("{}={}", slot + 1, level))
            .collect();
        let scene = self
            .auto_scene
            .as_ref()
            .and_then(|d| d.selector.current_scene())
            .map(ToString::to_string)
            .unwrap_or_else(|| "-".to_string());
        tracing::info!(
            "[{:>3}s] position {:>8.1} ms {} | scene {} | {}",
            elapsed_secs,
            state.position,
            if state.active { "playing" } else { "stopped" },
            scene,
            if levels.is_empty() { "blackout".to_string() } else { levels.join(" ") }
        );
    }

    /// Selector snapshot, when auto-scene is enabled
    pub fn auto_scene_state(&self) -> Option<AutoSceneState> {
        self.auto_scene.as_ref().map(|d| d.selector.auto_scene_state())
    }

    /// Number of scenes activated so far
    pub fn scene_changes(&self) -> usize {
        self.auto_scene
            .as_ref()
            .map_or(0, |d| d.selector.sink().activations())
    }

    /// The output universe
    pub fn universe(&self) -> &SharedUniverse {
        &self.universe
    }
}
