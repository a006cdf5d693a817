// SPDX-License-Identifier: MIT OR Apache-2.0
//! DMX output universe.
//!
//! Timeline values are continuous; the universe holds the 8-bit levels that
//! go on the wire. Both the timeline sink and the scene activator write here.

use crate::config::{OutputSettings, DMX_UNIVERSE_SIZE};
use crate::store::ShowStore;
use parking_lot::RwLock;
use stagecue_autoscene::{SceneId, SceneSink};
use stagecue_timeline::{ChannelLevel, ChannelSink};
use std::sync::Arc;

/// Universe shared between writers and readers
pub type SharedUniverse = Arc<RwLock<Universe>>;

/// Quantize a timeline value to a DMX level
pub fn dmx_level(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

/// Block of DMX slots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Universe {
    levels: Vec<u8>,
    frames: u64,
}

impl Universe {
    /// Create a blacked-out universe with `size` slots (at most 512)
    pub fn new(size: usize) -> Self {
        Self {
            levels: vec![0; size.min(DMX_UNIVERSE_SIZE)],
            frames: 0,
        }
    }

    /// Wrap in a shared handle
    pub fn shared(size: usize) -> SharedUniverse {
        Arc::new(RwLock::new(Self::new(size)))
    }

    /// Level of a slot
    #[allow(dead_code)]
    pub fn get(&self, slot: usize) -> Option<u8> {
        self.levels.get(slot).copied()
    }

    /// Set a slot; false when the slot is out of range
    pub fn set(&mut self, slot: usize, level: u8) -> bool {
        match self.levels.get_mut(slot) {
            Some(current) => {
                *current = level;
                true
            }
            None => false,
        }
    }

    /// All levels
    #[allow(dead_code)]
    pub fn levels(&self) -> &[u8] {
        &self.levels
    }

    /// Number of frames written so far
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Non-zero slots as (slot, level) pairs
    pub fn active_slots(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.levels
            .iter()
            .enumerate()
            .filter(|&(_, &level)| level > 0)
            .map(|(slot, &level)| (slot, level))
    }
}

/// Maps timeline channel numbers onto universe slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMapping {
    one_based: bool,
}

#[allow(dead_code)]
impl ChannelMapping {
    /// Channel 1 is slot 0
    pub const ONE_BASED: Self = Self { one_based: true };
    /// Channel 0 is slot 0
    pub const ZERO_BASED: Self = Self { one_based: false };

    /// Slot for a channel; in one-based numbering channel 0 also drives slot 0
    pub fn slot(&self, channel: u16) -> usize {
        if self.one_based {
            (channel as usize).saturating_sub(1)
        } else {
            channel as usize
        }
    }
}

impl From<&OutputSettings> for ChannelMapping {
    fn from(settings: &OutputSettings) -> Self {
        Self {
            one_based: settings.one_based_channels,
        }
    }
}

/// Channel sink writing timeline values into a universe
#[derive(Debug, Clone)]
pub struct UniverseSink {
    universe: SharedUniverse,
    mapping: ChannelMapping,
}

impl UniverseSink {
    /// Create a sink over a shared universe
    pub fn new(universe: SharedUniverse, mapping: ChannelMapping) -> Self {
        Self { universe, mapping }
    }
}

impl ChannelSink for UniverseSink {
    fn emit(&mut self, batch: &[ChannelLevel]) {
        let mut universe = self.universe.write();
        for level in batch {
            let slot = self.mapping.slot(level.channel);
            if !universe.set(slot, dmx_level(level.value)) {
                tracing::debug!("Channel {} is outside the universe, dropped", level.channel);
            }
        }
        universe.frames += 1;
    }
}

/// Scene sink that writes the chosen scene's levels into the universe
#[derive(Debug, Clone)]
pub struct SceneActivator {
    universe: SharedUniverse,
    store: Arc<ShowStore>,
    activations: usize,
}

impl SceneActivator {
    /// Create an activator reading scenes from `store`
    pub fn new(universe: SharedUniverse, store: Arc<ShowStore>) -> Self {
        Self {
            universe,
            store,
            activations: 0,
        }
    }

    /// Number of scenes applied
    pub fn activations(&self) -> usize {
        self.activations
    }
}

impl SceneSink for SceneActivator {
    fn emit(&mut self, scene_id: &SceneId) {
        let Some(scene) = self.store.scene(scene_id) else {
            tracing::warn!("Scene '{}' is enrolled but does not exist", scene_id);
            return;
        };

        let mut universe = self.universe.write();
        for (slot, &level) in scene.channel_values.iter().enumerate() {
            universe.set(slot, level);
        }
        self.activations += 1;
        tracing::info!("Activated scene '{}'", scene_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::show::Scene;

    #[test]
    fn test_dmx_level() {
        assert_eq!(dmx_level(0.0), 0);
        assert_eq!(dmx_level(127.5), 128);
        assert_eq!(dmx_level(127.4), 127);
        assert_eq!(dmx_level(300.0), 255);
        assert_eq!(dmx_level(-20.0), 0);
        assert_eq!(dmx_level(f64::NAN), 0);
        assert_eq!(dmx_level(f64::INFINITY), 255);
    }

    #[test]
    fn test_universe_bounds() {
        let mut universe = Universe::new(4);
        assert!(universe.set(3, 10));
        assert!(!universe.set(4, 10));
        assert_eq!(universe.get(3), Some(10));
        assert_eq!(universe.get(4), None);
        assert_eq!(Universe::new(2000).levels().len(), DMX_UNIVERSE_SIZE);
        assert_eq!(universe.active_slots().count(), 1);
    }

    #[test]
    fn test_channel_mapping() {
        assert_eq!(ChannelMapping::ONE_BASED.slot(1), 0);
        assert_eq!(ChannelMapping::ONE_BASED.slot(0), 0);
        assert_eq!(ChannelMapping::ONE_BASED.slot(512), 511);
        assert_eq!(ChannelMapping::ZERO_BASED.slot(5), 5);
        assert_eq!(ChannelMapping::from(&OutputSettings::default()), ChannelMapping::ONE_BASED);
    }

    #[test]
    fn test_universe_sink() {
        let universe = Universe::shared(512);
        let mut sink = UniverseSink::new(universe.clone(), ChannelMapping::ONE_BASED);
        sink.emit(&[
            ChannelLevel::new(1, 63.6),
            ChannelLevel::new(2, 512.0),
            ChannelLevel::new(3, -4.0),
            ChannelLevel::new(600, 99.0),
        ]);

        let universe = universe.read();
        assert_eq!(universe.get(0), Some(64));
        assert_eq!(universe.get(1), Some(255));
        assert_eq!(universe.get(2), Some(0));
        assert_eq!(universe.active_slots().count(), 2);
        assert_eq!(universe.frame_count(), 1);
    }

    #[test]
    fn test_scene_activator() {
        let mut store = ShowStore::new();
        store.insert_scene(Scene::new("Warm", vec![255, 0, 128]));
        let universe = Universe::shared(8);
        universe.write().set(5, 77);

        let mut activator = SceneActivator::new(universe.clone(), Arc::new(store));
        activator.emit(&SceneId::from("Warm"));
        activator.emit(&SceneId::from("Missing"));

        assert_eq!(activator.activations(), 1);
        assert_eq!(&universe.read().levels()[..3], &[255, 0, 128]);
        assert_eq!(universe.read().get(5), Some(77));
    }
}
