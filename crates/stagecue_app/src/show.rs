// SPDX-License-Identifier: MIT OR Apache-2.0
//! Show files.
//!
//! A show is a JSON document holding sequences, scenes and the list of scenes
//! enrolled in automatic cycling. Single sequences are exchanged in a small
//! envelope tagged with [`SEQUENCE_EXPORT_TYPE`].

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use stagecue_autoscene::SceneId;
use stagecue_timeline::{ChannelTrack, CurveKind, Keyframe, Sequence};
use std::path::Path;

/// Type tag of an exported sequence
pub const SEQUENCE_EXPORT_TYPE: &str = "stagecue-timeline-sequence";

/// Export envelope version
pub const SEQUENCE_EXPORT_VERSION: u32 = 1;

/// A saved look: one level per DMX slot, starting at slot 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Scene name
    pub name: SceneId,
    /// Slot levels
    #[serde(default)]
    pub channel_values: Vec<u8>,
}

impl Scene {
    /// Create a scene
    pub fn new(name: impl Into<SceneId>, channel_values: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            channel_values,
        }
    }
}

/// Show document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Show {
    /// Timeline sequences
    pub sequences: Vec<Sequence>,
    /// Saved scenes
    pub scenes: Vec<Scene>,
    /// Scenes cycled by the auto-scene selector, in order
    pub auto_scene_ids: Vec<SceneId>,
}

impl Show {
    /// Parse a show from JSON
    pub fn from_json(content: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a show file
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        let show = Self::from_json(&content)?;
        tracing::info!(
            "Loaded show {:?}: {} sequences, {} scenes",
            path,
            show.sequences.len(),
            show.scenes.len()
        );
        Ok(show)
    }

    /// Save a show file
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        std::fs::write(path, self.to_json()?)?;
        tracing::info!("Saved show to {:?}", path);
        Ok(())
    }

    /// Built-in demo show
    pub fn example() -> Self {
        let at = |time: f64, value: f64| Keyframe::new(time, value).with_curve(CurveKind::Smooth);
        let pan = ChannelTrack::with_keyframes(
            1,
            vec![at(0.0, 0.0), at(2500.0, 255.0), at(5000.0, 0.0), at(7500.0, 255.0), at(10000.0, 0.0)],
        );
        let tilt = ChannelTrack::with_keyframes(
            2,
            vec![at(0.0, 127.0), at(2500.0, 255.0), at(5000.0, 127.0), at(7500.0, 0.0), at(10000.0, 127.0)],
        );

        let mut moving_head = Sequence::new("moving-head-example", "Moving Head Movement", 10_000.0)
            .with_track(pan)
            .with_track(tilt);
        moving_head.description = Some("Pan and tilt sweep for a moving head".to_string());
        moving_head.tags = vec!["example".to_string(), "movement".to_string()];

        let mut blank = Sequence::new("blank-timeline", "Blank Timeline", 5_000.0);
        blank.tags = vec!["template".to_string()];

        let wash = |level: u8| vec![level; 8];
        let scenes = vec![
            Scene::new("Warm Wash", vec![255, 180, 60, 0, 200, 140, 40, 0]),
            Scene::new("Cool Wash", vec![40, 120, 255, 0, 30, 100, 255, 0]),
            Scene::new("Full", wash(255)),
            Scene::new("Blackout", wash(0)),
        ];
        let auto_scene_ids = scenes.iter().take(3).map(|s| s.name.clone()).collect();

        Self {
            sequences: vec![moving_head, blank],
            scenes,
            auto_scene_ids,
        }
    }
}

/// Envelope for a single exported sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceExport {
    /// Always [`SEQUENCE_EXPORT_TYPE`]
    #[serde(rename = "type")]
    pub kind: String,
    /// Envelope version
    pub version: u32,
    /// Export time (Unix milliseconds)
    #[serde(default)]
    pub exported_at: u64,
    /// The sequence
    pub sequence: Sequence,
}

/// Wrap a sequence in an export envelope
pub fn export_sequence(sequence: &Sequence) -> Result<String, AppError> {
    let export = SequenceExport {
        kind: SEQUENCE_EXPORT_TYPE.to_string(),
        version: SEQUENCE_EXPORT_VERSION,
        exported_at: stagecue_timeline::sequence::unix_millis(),
        sequence: sequence.clone(),
    };
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Unwrap and validate an exported sequence
pub fn import_sequence(content: &str) -> Result<Sequence, AppError> {
    let export: SequenceExport = serde_json::from_str(content)?;
    if export.kind != SEQUENCE_EXPORT_TYPE {
        return Err(AppError::ExportType(export.kind));
    }

    let mut sequence = export.sequence;
    for track in &mut sequence.channels {
        track.sort_keyframes();
    }
    sequence.validate().map_err(|source| AppError::Sequence {
        id: sequence.id.clone(),
        source,
    })?;
    Ok(sequence)
}
