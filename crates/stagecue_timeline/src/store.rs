// SPDX-License-Identifier: MIT OR Apache-2.0
//! Read-only access to sequence definitions.
//!
//! Sequences are created and edited elsewhere; the transport only asks for
//! a snapshot of the one it is playing.

use crate::sequence::{Sequence, SequenceId};
use std::collections::HashMap;
use std::sync::Arc;

/// Source of sequence snapshots
pub trait SequenceStore {
    /// Look up a sequence by ID
    fn load_sequence(&self, id: &SequenceId) -> Option<Arc<Sequence>>;
}

impl<T: SequenceStore + ?Sized> SequenceStore for Arc<T> {
    fn load_sequence(&self, id: &SequenceId) -> Option<Arc<Sequence>> {
        (**self).load_sequence(id)
    }
}

impl<T: SequenceStore + ?Sized> SequenceStore for &T {
    fn load_sequence(&self, id: &SequenceId) -> Option<Arc<Sequence>> {
        (**self).load_sequence(id)
    }
}

impl SequenceStore for HashMap<SequenceId, Arc<Sequence>> {
    fn load_sequence(&self, id: &SequenceId) -> Option<Arc<Sequence>> {
        self.get(id).cloned()
    }
}

impl SequenceStore for Vec<Arc<Sequence>> {
    fn load_sequence(&self, id: &SequenceId) -> Option<Arc<Sequence>> {
        self.iter().find(|s| &s.id == id).cloned()
    }
}
