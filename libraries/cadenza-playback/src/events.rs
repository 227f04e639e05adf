//! Outbound player events
//!
//! Event-based communication toward the host bridge. The player queues
//! events as it works; the host drains them with
//! [`AudioPlayer::drain_events`](crate::AudioPlayer::drain_events). Async
//! operation failures travel this channel too - they are never thrown across
//! the synchronous mutation API.

use cadenza_core::{ProcessingState, SourceId};
use serde::{Deserialize, Serialize};

/// Events emitted by a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    /// Processing state changed
    ProcessingStateChanged {
        /// The new processing state
        state: ProcessingState,
    },

    /// The currently playing sequence position changed
    ///
    /// Emitted on load, on advancement, and when a mutation shifts the
    /// current item to a new flat index.
    CurrentIndexChanged {
        /// New flat index (`None` when nothing is current)
        index: Option<usize>,
        /// Id of the source at that index
        source_id: Option<SourceId>,
    },

    /// Periodic position/buffer update for the current item
    ///
    /// All values are logical (clip-relative for clipped sources).
    PositionUpdate {
        /// Current playback position in milliseconds
        position_ms: u64,
        /// Buffered position in milliseconds
        buffered_position_ms: u64,
        /// Item duration in milliseconds, when known
        duration_ms: Option<u64>,
        /// Flat index the update refers to
        current_index: usize,
    },

    /// The flattened play sequence was rebuilt
    SequenceChanged {
        /// New sequence length
        length: usize,
    },

    /// A seek settled or was superseded
    ///
    /// Fires exactly once per issued seek; `completed` is `false` when a
    /// later seek superseded this one.
    SeekCompleted {
        /// Token returned when the seek was issued
        token: u64,
        /// Whether the pipeline actually reached the target
        completed: bool,
    },

    /// An asynchronous operation failed
    PlaybackError {
        /// Human-readable failure description
        message: String,
    },
}
