//! Core type definitions
//!
//! Identifier newtypes, playback enums, and the wire shapes exchanged with
//! the host bridge.

mod ids;
mod load_control;
mod message;
mod playback_state;

pub use ids::{PlayerId, SourceId};
pub use load_control::LoadControl;
pub use message::{ShuffleOrderMessage, SourceMessage};
pub use playback_state::{LoopMode, ProcessingState};
