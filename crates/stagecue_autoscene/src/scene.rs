// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene identifiers and the interfaces around the selector.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Name of a saved scene
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    /// Create a scene identifier
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SceneId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SceneId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provides the scenes enrolled in auto-cycling
pub trait SceneSource {
    /// Enrolled scene IDs in cycling order (duplicates allowed)
    fn list_auto_scene_ids(&self) -> Vec<SceneId>;
}

impl<T: SceneSource + ?Sized> SceneSource for Arc<T> {
    fn list_auto_scene_ids(&self) -> Vec<SceneId> {
        (**self).list_auto_scene_ids()
    }
}

impl<T: SceneSource + ?Sized> SceneSource for &T {
    fn list_auto_scene_ids(&self) -> Vec<SceneId> {
        (**self).list_auto_scene_ids()
    }
}

impl SceneSource for Vec<SceneId> {
    fn list_auto_scene_ids(&self) -> Vec<SceneId> {
        self.clone()
    }
}

/// Receives the scene chosen by each advance
pub trait SceneSink {
    /// Activate a scene
    fn emit(&mut self, scene_id: &SceneId);
}

impl<F: FnMut(&SceneId)> SceneSink for F {
    fn emit(&mut self, scene_id: &SceneId) {
        self(scene_id);
    }
}

/// Sink that records every activated scene
#[derive(Debug, Default, Clone)]
pub struct SceneLog {
    /// Activated scenes in order
    pub activated: Vec<SceneId>,
}

impl SceneSink for SceneLog {
    fn emit(&mut self, scene_id: &SceneId) {
        self.activated.push(scene_id.clone());
    }
}
