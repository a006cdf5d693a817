// SPDX-License-Identifier: MIT OR Apache-2.0
//! Auto-scene selection.
//!
//! Each call to [`AutoSceneSelector::advance`] picks the next scene from the
//! enrolled list according to the selection mode and hands it to the scene
//! sink. Modes:
//! - Forward: 0, 1, 2, 0, 1, 2, ...
//! - Ping-pong: 0, 1, 2, 1, 0, 1, 2, ... (ends are not repeated)
//! - Random: uniform, never the same index twice in a row

use crate::scene::{SceneId, SceneSink, SceneSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// How the next scene is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// In list order, wrapping at the end
    #[default]
    Forward,
    /// Back and forth between the ends
    PingPong,
    /// Uniformly random, avoiding immediate repeats
    Random,
}

impl SelectionMode {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Forward => "Forward",
            Self::PingPong => "Ping-Pong",
            Self::Random => "Random",
        }
    }
}

/// Current leg of a ping-pong cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PingPongDirection {
    /// Towards the end of the list
    #[default]
    Forward,
    /// Towards the start of the list
    Backward,
}

/// A scene picked by [`AutoSceneSelector::advance`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Index into the scene list
    pub index: usize,
    /// Scene at that index
    pub scene_id: SceneId,
    /// Leg after this step (ping-pong mode only)
    pub direction: Option<PingPongDirection>,
}

/// Result of an advance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// A scene was selected and emitted
    Selected(Selection),
    /// The scene list is empty
    NotReady,
}

impl Advance {
    /// The selection, if any
    pub fn selection(&self) -> Option<&Selection> {
        match self {
            Self::Selected(selection) => Some(selection),
            Self::NotReady => None,
        }
    }
}

/// Snapshot of the selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSceneState {
    /// Enrolled scenes
    pub scene_list: Vec<SceneId>,
    /// Last selected index; `None` until the first advance
    pub current_index: Option<usize>,
    /// Selection mode
    pub mode: SelectionMode,
    /// Current ping-pong leg
    pub ping_pong_direction: PingPongDirection,
}

/// Cycles through a list of scenes
pub struct AutoSceneSelector<K, R = StdRng> {
    scene_list: Vec<SceneId>,
    current_index: Option<usize>,
    mode: SelectionMode,
    ping_pong_direction: PingPongDirection,
    rng: R,
    sink: K,
}

impl<K: SceneSink> AutoSceneSelector<K, StdRng> {
    /// Create a selector seeded from OS entropy
    pub fn with_entropy(scene_list: Vec<SceneId>, mode: SelectionMode, sink: K) -> Self {
        Self::new(scene_list, mode, sink, StdRng::from_entropy())
    }
}

impl<K: SceneSink, R: Rng> AutoSceneSelector<K, R> {
    /// Create a selector that has not selected anything yet
    pub fn new(scene_list: Vec<SceneId>, mode: SelectionMode, sink: K, rng: R) -> Self {
        Self {
            scene_list,
            current_index: None,
            mode,
            ping_pong_direction: PingPongDirection::Forward,
            rng,
            sink,
        }
    }

    /// Create a selector over the scenes a source has enrolled
    pub fn from_source(source: &impl SceneSource, mode: SelectionMode, sink: K, rng: R) -> Self {
        Self::new(source.list_auto_scene_ids(), mode, sink, rng)
    }

    /// Select the next scene and emit it to the sink
    pub fn advance(&mut self) -> Advance {
        let len = self.scene_list.len();
        if len == 0 {
            self.current_index = None;
            return Advance::NotReady;
        }

        let (index, direction) = match self.mode {
            SelectionMode::Forward => (self.current_index.map_or(0, |i| (i + 1) % len), None),
            SelectionMode::PingPong => {
                let (index, direction) = self.next_ping_pong(len);
                self.ping_pong_direction = direction;
                (index, Some(direction))
            }
            SelectionMode::Random => (self.next_random(len), None),
        };

        self.current_index = Some(index);
        let scene_id = self.scene_list[index].clone();
        tracing::debug!("Auto-scene {} -> {} ({})", index, scene_id, self.mode.name());
        self.sink.emit(&scene_id);

        Advance::Selected(Selection { index, scene_id, direction })
    }

    fn next_ping_pong(&self, len: usize) -> (usize, PingPongDirection) {
        match (self.current_index, self.ping_pong_direction) {
            (None, _) => (0, PingPongDirection::Forward),
            (Some(i), PingPongDirection::Forward) if i + 1 >= len => {
                // Bounce off the end: second-to-last
                (len.saturating_sub(2), PingPongDirection::Backward)
            }
            (Some(i), PingPongDirection::Forward) => (i + 1, PingPongDirection::Forward),
            (Some(0), PingPongDirection::Backward) => {
                // Bounce off the start: second item
                (usize::min(1, len - 1), PingPongDirection::Forward)
            }
            (Some(i), PingPongDirection::Backward) => (i - 1, PingPongDirection::Backward),
        }
    }

    fn next_random(&mut self, len: usize) -> usize {
        match self.current_index {
            None => self.rng.gen_range(0..len),
            Some(current) if len == 1 => current,
            Some(current) => loop {
                let candidate = self.rng.gen_range(0..len);
                if candidate != current {
                    break candidate;
                }
            },
        }
    }

    /// Replace the scene list and start over
    pub fn set_scene_list(&mut self, scene_list: Vec<SceneId>) {
        self.scene_list = scene_list;
        self.current_index = None;
    }

    /// Re-read the scene list from a source and start over
    pub fn reload(&mut self, source: &impl SceneSource) {
        self.set_scene_list(source.list_auto_scene_ids());
    }

    /// Change the mode and start over
    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
        self.reset();
    }

    /// Forget the current position
    pub fn reset(&mut self) {
        self.current_index = None;
        self.ping_pong_direction = PingPongDirection::Forward;
    }

    /// Snapshot of the selector state
    pub fn auto_scene_state(&self) -> AutoSceneState {
        AutoSceneState {
            scene_list: self.scene_list.clone(),
            current_index: self.current_index,
            mode: self.mode,
            ping_pong_direction: self.ping_pong_direction,
        }
    }

    /// Scene at the current index
    pub fn current_scene(&self) -> Option<&SceneId> {
        self.current_index.and_then(|i| self.scene_list.get(i))
    }

    /// The scene sink
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Mutable access to the scene sink
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneLog;

    fn scenes(names: &[&str]) -> Vec<SceneId> {
        names.iter().map(|n| SceneId::from(*n)).collect()
    }

    fn selector(names: &[&str], mode: SelectionMode) -> AutoSceneSelector<SceneLog> {
        AutoSceneSelector::new(scenes(names), mode, SceneLog::default(), StdRng::seed_from_u64(7))
    }

    fn indices(selector: &mut AutoSceneSelector<SceneLog>, n: usize) -> Vec<usize> {
        (0..n)
            .map(|_| selector.advance().selection().map(|s| s.index).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_list_is_not_ready() {
        for mode in [SelectionMode::Forward, SelectionMode::PingPong, SelectionMode::Random] {
            let mut s = selector(&[], mode);
            assert_eq!(s.advance(), Advance::NotReady);
            assert_eq!(s.auto_scene_state().current_index, None);
            assert!(s.sink().activated.is_empty());
        }
    }

    #[test]
    fn test_forward_wraps() {
        let mut s = selector(&["a", "b", "c"], SelectionMode::Forward);
        assert_eq!(indices(&mut s, 7), vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(s.sink().activated.len(), 7);
        assert_eq!(s.current_scene(), Some(&SceneId::from("a")));
    }

    #[test]
    fn test_ping_pong_sequence() {
        let mut s = selector(&["test", "test2", "test3"], SelectionMode::PingPong);
        let expected = [
            (0, "test", PingPongDirection::Forward),
            (1, "test2", PingPongDirection::Forward),
            (2, "test3", PingPongDirection::Forward),
            (1, "test2", PingPongDirection::Backward),
            (0, "test", PingPongDirection::Backward),
            (1, "test2", PingPongDirection::Forward),
            (2, "test3", PingPongDirection::Forward),
            (1, "test2", PingPongDirection::Backward),
            (0, "test", PingPongDirection::Backward),
            (1, "test2", PingPongDirection::Forward),
        ];

        for (index, name, direction) in expected {
            let Advance::Selected(selection) = s.advance() else {
                panic!("expected a selection");
            };
            assert_eq!(selection.index, index);
            assert_eq!(selection.scene_id, SceneId::from(name));
            assert_eq!(selection.direction, Some(direction));
        }
        assert_eq!(s.auto_scene_state().ping_pong_direction, PingPongDirection::Forward);
    }

    #[test]
    fn test_ping_pong_two_scenes() {
        let mut s = selector(&["a", "b"], SelectionMode::PingPong);
        assert_eq!(indices(&mut s, 6), vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_random_never_repeats() {
        let mut s = selector(&["a", "b", "c", "d", "e"], SelectionMode::Random);
        let picks = indices(&mut s, 200);
        assert!(picks.windows(2).all(|w| w[0] != w[1]));
        assert!(picks.iter().all(|&i| i < 5));
        // Every scene shows up eventually
        for i in 0..5 {
            assert!(picks.contains(&i));
        }
    }

    #[test]
    fn test_random_two_scenes_alternate() {
        let mut s = selector(&["a", "b"], SelectionMode::Random);
        let picks = indices(&mut s, 10);
        assert!(picks.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_single_scene_modes() {
        for mode in [SelectionMode::Forward, SelectionMode::PingPong, SelectionMode::Random] {
            let mut s = selector(&["only"], mode);
            for _ in 0..5 {
                let selection = s.advance().selection().cloned().unwrap();
                assert_eq!(selection.index, 0);
                assert_eq!(selection.scene_id, SceneId::from("only"));
            }
            assert_eq!(s.sink().activated.len(), 5);
        }
    }

    #[test]
    fn test_duplicates_are_separate_entries() {
        let mut s = selector(&["a", "a", "b"], SelectionMode::Forward);
        s.advance();
        s.advance();
        assert_eq!(s.sink().activated, scenes(&["a", "a"]));
        assert_eq!(s.auto_scene_state().current_index, Some(1));
    }

    #[test]
    fn test_mode_and_list_changes_reset() {
        let mut s = selector(&["a", "b", "c"], SelectionMode::PingPong);
        indices(&mut s, 4);
        assert_eq!(s.auto_scene_state().ping_pong_direction, PingPongDirection::Backward);

        s.set_mode(SelectionMode::Forward);
        let state = s.auto_scene_state();
        assert_eq!(state.current_index, None);
        assert_eq!(state.ping_pong_direction, PingPongDirection::Forward);
        assert_eq!(indices(&mut s, 1), vec![0]);

        s.reload(&scenes(&["x", "y"]));
        assert_eq!(s.auto_scene_state().current_index, None);
        assert_eq!(s.advance().selection().map(|sel| sel.scene_id.clone()), Some(SceneId::from("x")));
    }

    #[test]
    fn test_direction_only_reported_in_ping_pong() {
        let mut s = selector(&["a", "b"], SelectionMode::Forward);
        assert_eq!(s.advance().selection().unwrap().direction, None);
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut s = AutoSceneSelector::new(
                scenes(&["a", "b"]),
                SelectionMode::Forward,
                |id: &SceneId| seen.push(id.to_string()),
                StdRng::seed_from_u64(1),
            );
            s.advance();
            s.advance();
            s.advance();
        }
        assert_eq!(seen, vec!["a", "b", "a"]);
    }
}
