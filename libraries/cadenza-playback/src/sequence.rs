//! Flattened play sequences
//!
//! A [`PlaySequence`] is the derived, process-scoped view of a source tree:
//! the depth-first list of leaf entries, each tagged with its flat index,
//! plus the tree's composed shuffle permutation over those indices. It is
//! recomputed after every structural mutation and is the single source of
//! truth for "what index does the output pipeline currently play".

use crate::tree::AudioSource;
use cadenza_core::{LoopMode, SourceId};

/// One leaf in the flattened play sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceEntry {
    /// Position in the flat sequence
    pub flat_index: usize,
    /// Id of the leaf source at this position
    pub source_id: SourceId,
}

/// The flattened play sequence of a source tree
#[derive(Debug, Clone, Default)]
pub struct PlaySequence {
    entries: Vec<SequenceEntry>,
    shuffle_indices: Vec<usize>,
}

impl PlaySequence {
    /// An empty sequence (no tree loaded)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Flatten `root` into a fresh sequence
    ///
    /// Assigns every leaf its flat index and captures the tree's composed
    /// shuffle permutation. A leaf root's trivial permutation becomes the
    /// identity traversal.
    pub fn from_tree(root: &mut AudioSource) -> Self {
        let mut entries = Vec::new();
        root.build_sequence(&mut entries, 0);
        let mut shuffle_indices = root.shuffle_indices();
        if shuffle_indices.is_empty() {
            shuffle_indices = (0..entries.len()).collect();
        }
        Self {
            entries,
            shuffle_indices,
        }
    }

    /// Number of leaves in the sequence
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the sequence has no leaves
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The sequence entries in flat order
    pub fn entries(&self) -> &[SequenceEntry] {
        &self.entries
    }

    /// Id of the leaf at `index`
    pub fn source_id_at(&self, index: usize) -> Option<&SourceId> {
        self.entries.get(index).map(|entry| &entry.source_id)
    }

    /// Flat index of the leaf with the given id
    pub fn index_of(&self, id: &SourceId) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.source_id == *id)
    }

    /// The composed shuffle permutation over flat indices
    pub fn shuffle_indices(&self) -> &[usize] {
        &self.shuffle_indices
    }

    /// First flat index in traversal order
    pub fn first_index(&self, shuffled: bool) -> Option<usize> {
        if shuffled {
            self.shuffle_indices.first().copied()
        } else if self.entries.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    /// Position of `index` within the active traversal order
    pub fn traversal_position(&self, index: usize, shuffled: bool) -> Option<usize> {
        if index >= self.entries.len() {
            return None;
        }
        if shuffled {
            self.shuffle_indices.iter().position(|&i| i == index)
        } else {
            Some(index)
        }
    }

    /// Flat index at `position` in the active traversal order
    pub fn index_at_position(&self, position: usize, shuffled: bool) -> Option<usize> {
        if shuffled {
            self.shuffle_indices.get(position).copied()
        } else if position < self.entries.len() {
            Some(position)
        } else {
            None
        }
    }

    /// Successor of `current` under the active loop mode and traversal
    ///
    /// `None` means the sequence has played to its end.
    pub fn next_index(&self, current: usize, loop_mode: LoopMode, shuffled: bool) -> Option<usize> {
        if loop_mode == LoopMode::One {
            return Some(current);
        }
        let position = self.traversal_position(current, shuffled)?;
        match self.index_at_position(position + 1, shuffled) {
            Some(next) => Some(next),
            None => match loop_mode {
                LoopMode::All => self.first_index(shuffled),
                _ => None,
            },
        }
    }
}
