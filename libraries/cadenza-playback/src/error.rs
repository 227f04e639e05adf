//! Error types for playback sequencing

use cadenza_core::{PlayerId, SourceId};
use std::time::Duration;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// A source id is already present in the owning tree
    #[error("Duplicate source id: {0}")]
    DuplicateId(SourceId),

    /// Index argument outside valid bounds
    #[error("Index out of range: {index} (valid up to {len})")]
    IndexOutOfRange {
        /// The offending index
        index: usize,
        /// Upper bound at the time of the call
        len: usize,
    },

    /// Transport operation on a source that is not attached to the pipeline
    #[error("Transport operation on detached source: {0}")]
    Detached(SourceId),

    /// Structural mutation would make a source reachable from itself
    #[error("Insertion would make source {0} reachable from itself")]
    Cycle(SourceId),

    /// Mutation addressed a source that is not a concatenation
    #[error("Source {0} is not a concatenation")]
    NotConcatenating(SourceId),

    /// A shuffle order is not a valid permutation of the child indices
    #[error("Invalid shuffle order for source {id}: expected a permutation of 0..{expected}")]
    InvalidShuffleOrder {
        /// Id of the node the order was applied to
        id: SourceId,
        /// Number of children the permutation must cover
        expected: usize,
    },

    /// Clip bounds out of order
    #[error("Invalid clip range: start {start:?} must come before end {end:?}")]
    InvalidClipRange {
        /// Requested clip start
        start: Duration,
        /// Requested clip end
        end: Duration,
    },

    /// No source with the given id exists in the tree
    #[error("Source not found: {0}")]
    UnknownSource(SourceId),

    /// No player with the given id exists in the registry
    #[error("Player not found: {0}")]
    UnknownPlayer(PlayerId),

    /// A player with the given id already exists in the registry
    #[error("Player already exists: {0}")]
    PlayerExists(PlayerId),

    /// Operation requires a loaded source tree
    #[error("No source loaded")]
    NoSourceLoaded,

    /// Output pipeline error
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Message decoding errors
    #[error(transparent)]
    Core(#[from] cadenza_core::CoreError),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
