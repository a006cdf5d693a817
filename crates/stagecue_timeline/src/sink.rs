// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output of evaluated channel values.

use serde::{Deserialize, Serialize};

/// One evaluated channel value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelLevel {
    /// Channel number
    pub channel: u16,
    /// Unquantized value
    pub value: f64,
}

impl ChannelLevel {
    /// Create a channel level
    pub fn new(channel: u16, value: f64) -> Self {
        Self { channel, value }
    }
}

/// Receiver of channel batches.
///
/// Each batch is one atomic update of every channel in the active sequence,
/// in track order.
pub trait ChannelSink {
    /// Apply a batch
    fn emit(&mut self, batch: &[ChannelLevel]);
}

impl<F: FnMut(&[ChannelLevel])> ChannelSink for F {
    fn emit(&mut self, batch: &[ChannelLevel]) {
        self(batch);
    }
}

/// Sink that keeps every batch it receives
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    /// Batches in emission order
    pub batches: Vec<Vec<ChannelLevel>>,
}

impl RecordingSink {
    /// Create an empty recording
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent batch
    pub fn last(&self) -> Option<&[ChannelLevel]> {
        self.batches.last().map(Vec::as_slice)
    }
}

impl ChannelSink for RecordingSink {
    fn emit(&mut self, batch: &[ChannelLevel]) {
        self.batches.push(batch.to_vec());
    }
}
