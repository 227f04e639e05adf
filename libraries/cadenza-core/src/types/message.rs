//! Wire shapes for source trees
//!
//! The host bridge describes an audio source tree as a nested structure of
//! `{id, kind, kind-specific fields, children?}`. Shuffle orders travel as
//! plain integer-index permutations.

use crate::error::{CoreError, Result};
use crate::types::SourceId;
use serde::{Deserialize, Serialize};

/// Serialized description of an audio source tree node
///
/// Kind-specific fields follow the discriminant:
/// - `progressive`: a single playable resource
/// - `clipping`: a sub-range view over a progressive source
/// - `concatenating`: an ordered list of child sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceMessage {
    /// A single playable resource
    Progressive {
        /// Tree-unique source id
        id: SourceId,
        /// Resource locator
        uri: String,
    },

    /// A `[start, end)` sub-range of a progressive source
    Clipping {
        /// Tree-unique source id
        id: SourceId,
        /// The wrapped progressive source
        child: Box<SourceMessage>,
        /// Clip start offset in milliseconds (absent = from the beginning)
        #[serde(skip_serializing_if = "Option::is_none")]
        start_ms: Option<u64>,
        /// Clip end offset in milliseconds (absent = until natural end)
        #[serde(skip_serializing_if = "Option::is_none")]
        end_ms: Option<u64>,
    },

    /// An ordered, shuffleable list of child sources
    Concatenating {
        /// Tree-unique source id
        id: SourceId,
        /// Child descriptions in list order
        children: Vec<SourceMessage>,
        /// Permutation of child indices (empty = generate a fresh one)
        #[serde(default)]
        shuffle_order: Vec<usize>,
        /// Probe child durations on demand rather than eagerly
        #[serde(default)]
        lazy_loading: bool,
    },
}

impl SourceMessage {
    /// The node's source id
    pub fn id(&self) -> &SourceId {
        match self {
            Self::Progressive { id, .. }
            | Self::Clipping { id, .. }
            | Self::Concatenating { id, .. } => id,
        }
    }

    /// Parse a message from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the message to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Structural validation independent of any tree context
    ///
    /// Checks the clip-range ordering invariant on every `clipping` node and
    /// that `clipping` wraps a `progressive` child. Id uniqueness is a
    /// whole-tree property checked by the playback engine on decode.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Progressive { .. } => Ok(()),
            Self::Clipping {
                id,
                child,
                start_ms,
                end_ms,
            } => {
                if let (Some(start), Some(end)) = (start_ms, end_ms) {
                    if start >= end {
                        return Err(CoreError::invalid_message(format!(
                            "clip {id}: start {start}ms must come before end {end}ms"
                        )));
                    }
                }
                if !matches!(**child, Self::Progressive { .. }) {
                    return Err(CoreError::invalid_message(format!(
                        "clip {id}: child must be a progressive source"
                    )));
                }
                Ok(())
            }
            Self::Concatenating { children, .. } => {
                for child in children {
                    child.validate()?;
                }
                Ok(())
            }
        }
    }
}

/// Nested shuffle-order restore message
///
/// Mirrors the tree description shape so per-node permutations can be
/// restored for persistence or cross-process reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuffleOrderMessage {
    /// Id of the node this order applies to
    pub id: SourceId,

    /// Permutation of the node's immediate child indices
    ///
    /// Empty for leaf nodes (the trivial permutation).
    #[serde(default)]
    pub shuffle_order: Vec<usize>,

    /// Orders for descendant nodes
    #[serde(default)]
    pub children: Vec<ShuffleOrderMessage>,
}
