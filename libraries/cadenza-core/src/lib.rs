//! Cadenza Core
//!
//! Platform-agnostic core types for Cadenza playback.
//!
//! This crate defines the vocabulary shared between the playback engine and
//! the host bridge:
//! - **Identifiers**: [`SourceId`], [`PlayerId`]
//! - **Playback enums**: [`ProcessingState`], [`LoopMode`]
//! - **Wire shapes**: [`SourceMessage`], [`ShuffleOrderMessage`] (nested tree
//!   descriptions exchanged with the host), [`LoadControl`]
//!
//! It owns no playback logic; the tree model and sequencing live in
//! `cadenza-playback`.
//!
//! # Example
//!
//! ```rust
//! use cadenza_core::{SourceId, SourceMessage};
//!
//! let msg = SourceMessage::Progressive {
//!     id: SourceId::new("intro"),
//!     uri: "file:///music/intro.mp3".to_string(),
//! };
//!
//! let json = msg.to_json().unwrap();
//! let back = SourceMessage::from_json(&json).unwrap();
//! assert_eq!(msg, back);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use types::{
    LoadControl, LoopMode, PlayerId, ProcessingState, ShuffleOrderMessage, SourceId, SourceMessage,
};
