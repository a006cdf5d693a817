// SPDX-License-Identifier: MIT OR Apache-2.0
//! Application error type.

use stagecue_autoscene::TempoError;
use stagecue_timeline::{SequenceError, SequenceId, TransportError};
use thiserror::Error;

/// Errors surfaced by the show runner
#[derive(Debug, Error)]
pub enum AppError {
    /// Failed to read or write a file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed show or sequence JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed configuration file
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Configuration could not be serialized
    #[error("Config write error: {0}")]
    ConfigWrite(#[from] ron::Error),

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Sequence rejected by the store
    #[error("Invalid sequence {id}: {source}")]
    Sequence {
        /// Offending sequence
        id: SequenceId,
        /// Validation failure
        #[source]
        source: SequenceError,
    },

    /// An edit tried to change a sequence's ID
    #[error("Sequence {id} cannot change its ID to {attempted}")]
    SequenceIdChanged {
        /// Stored ID
        id: SequenceId,
        /// ID the edit produced
        attempted: SequenceId,
    },

    /// No sequence with this ID in the show
    #[error("Sequence not found: {0}")]
    SequenceNotFound(SequenceId),

    /// Exported file of the wrong kind
    #[error("Unsupported export type: {0}")]
    ExportType(String),

    /// Playback could not start
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Bad tempo settings
    #[error(transparent)]
    Tempo(#[from] TempoError),
}
