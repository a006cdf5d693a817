// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory show store.
//!
//! Sequences are validated on the way in, so the transport only ever reads
//! sequences that satisfy the track invariants. Readers get `Arc` snapshots;
//! an update replaces the snapshot rather than mutating it.

use crate::error::AppError;
use crate::show::{Scene, Show};
use indexmap::IndexMap;
use stagecue_autoscene::{SceneId, SceneSource};
use stagecue_timeline::{Sequence, SequenceId, SequenceStore};
use std::sync::Arc;

/// Sequences, scenes and the auto-scene list of one show
#[derive(Debug, Clone, Default)]
pub struct ShowStore {
    sequences: IndexMap<SequenceId, Arc<Sequence>>,
    scenes: IndexMap<SceneId, Scene>,
    auto_scene_ids: Vec<SceneId>,
}

impl ShowStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a show document
    pub fn from_show(show: Show) -> Result<Self, AppError> {
        let mut store = Self::new();
        for scene in show.scenes {
            store.insert_scene(scene);
        }
        for sequence in show.sequences {
            store.insert_sequence(sequence)?;
        }
        store.set_auto_scene_ids(show.auto_scene_ids);
        Ok(store)
    }

    /// Snapshot the store as a show document
    pub fn to_show(&self) -> Show {
        Show {
            sequences: self.sequences.values().map(|s| Sequence::clone(s)).collect(),
            scenes: self.scenes.values().cloned().collect(),
            auto_scene_ids: self.auto_scene_ids.clone(),
        }
    }

    fn check(sequence: &Sequence) -> Result<(), AppError> {
        sequence.validate().map_err(|source| AppError::Sequence {
            id: sequence.id.clone(),
            source,
        })?;
        let content = sequence.content_duration();
        if content > sequence.duration {
            tracing::warn!(
                "Sequence '{}' has keyframes up to {} ms past its {} ms duration",
                sequence.id,
                content,
                sequence.duration
            );
        }
        Ok(())
    }

    /// Insert or replace a sequence
    pub fn insert_sequence(&mut self, sequence: Sequence) -> Result<(), AppError> {
        Self::check(&sequence)?;
        tracing::debug!("Stored sequence '{}' ({})", sequence.id, sequence.name);
        self.sequences.insert(sequence.id.clone(), Arc::new(sequence));
        Ok(())
    }

    /// Add an imported sequence, assigning a fresh ID if the current one is taken
    pub fn import_sequence(&mut self, mut sequence: Sequence) -> Result<SequenceId, AppError> {
        if self.sequences.contains_key(&sequence.id) {
            let id = SequenceId::generate();
            tracing::info!("Sequence ID '{}' already in use, importing as '{}'", sequence.id, id);
            sequence.id = id;
        }
        let id = sequence.id.clone();
        self.insert_sequence(sequence)?;
        Ok(id)
    }

    /// Edit a sequence.
    ///
    /// The edit runs on a copy; the stored snapshot is only replaced when the
    /// result is valid. Keyframes are re-sorted after the edit.
    pub fn update_sequence(
        &mut self,
        id: &SequenceId,
        edit: impl FnOnce(&mut Sequence),
    ) -> Result<Arc<Sequence>, AppError> {
        let current = self
            .sequences
            .get(id)
            .ok_or_else(|| AppError::SequenceNotFound(id.clone()))?;

        let mut sequence = Sequence::clone(current);
        edit(&mut sequence);
        for track in &mut sequence.channels {
            track.sort_keyframes();
        }
        if sequence.id != *id {
            return Err(AppError::SequenceIdChanged {
                id: id.clone(),
                attempted: sequence.id,
            });
        }
        Self::check(&sequence)?;
        sequence.touch();

        let sequence = Arc::new(sequence);
        self.sequences.insert(id.clone(), sequence.clone());
        Ok(sequence)
    }

    /// Remove a sequence, keeping the order of the rest
    pub fn delete_sequence(&mut self, id: &SequenceId) -> Option<Arc<Sequence>> {
        self.sequences.shift_remove(id)
    }

    /// Look up a sequence
    pub fn sequence(&self, id: &SequenceId) -> Option<&Arc<Sequence>> {
        self.sequences.get(id)
    }

    /// All sequences in insertion order
    pub fn sequences(&self) -> impl Iterator<Item = &Arc<Sequence>> {
        self.sequences.values()
    }

    /// First sequence in the show
    pub fn first_sequence_id(&self) -> Option<&SequenceId> {
        self.sequences.keys().next()
    }

    /// Insert or replace a scene
    pub fn insert_scene(&mut self, scene: Scene) {
        self.scenes.insert(scene.name.clone(), scene);
    }

    /// Look up a scene
    pub fn scene(&self, id: &SceneId) -> Option<&Scene> {
        self.scenes.get(id)
    }

    /// Number of scenes
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Replace the auto-scene list.
    ///
    /// Unknown scenes are kept; activating them logs a warning.
    pub fn set_auto_scene_ids(&mut self, ids: Vec<SceneId>) {
        for id in ids.iter().filter(|id| !self.scenes.contains_key(*id)) {
            tracing::warn!("Auto-scene list names unknown scene '{}'", id);
        }
        self.auto_scene_ids = ids;
    }
}

impl SequenceStore for ShowStore {
    fn load_sequence(&self, id: &SequenceId) -> Option<Arc<Sequence>> {
        self.sequences.get(id).cloned()
    }
}

impl SceneSource for ShowStore {
    fn list_auto_scene_ids(&self) -> Vec<SceneId> {
        self.auto_scene_ids.clone()
    }
}
