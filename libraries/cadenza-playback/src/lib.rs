//! Cadenza Playback
//!
//! Hierarchical, mutable playlists for continuous playback.
//!
//! This crate provides:
//! - Source trees ([`AudioSource`]): single resources, time-clipped views,
//!   and ordered/shuffled concatenations of sub-playlists
//! - Flattening into an indexed play sequence ([`PlaySequence`])
//! - Shuffle-order generation and in-place repair ([`ShuffleOrder`])
//! - Dynamic mutation (insert/remove/move) during active playback
//! - Per-player orchestration and event emission ([`AudioPlayer`])
//! - An explicit player registry ([`PlayerRegistry`])
//!
//! # Architecture
//!
//! `cadenza-playback` is platform-agnostic. The OS media engine (decoding,
//! buffering, hardware output) sits behind the [`OutputPipeline`] trait; the
//! host bridge sits behind wire messages (`cadenza-core`) and the
//! [`PlayerEvent`] queue. Tree and sequence mutation run synchronously on
//! the owning thread; only the leaf operations (seek settlement, duration
//! resolution) are asynchronous, reported back through the player's
//! `handle_*` methods.
//!
//! # Example
//!
//! ```rust
//! use cadenza_core::{LoadControl, PlayerId, SourceId, SourceMessage};
//! use cadenza_playback::{OutputPipeline, PipelineItem, PlayerRegistry, Result, SeekToken};
//! use std::time::Duration;
//!
//! // Implement OutputPipeline for your platform's media engine
//! struct NullPipeline;
//!
//! impl OutputPipeline for NullPipeline {
//!     fn attach(&mut self, _item: PipelineItem) -> Result<()> { Ok(()) }
//!     fn detach(&mut self, _source_id: &SourceId) -> Result<()> { Ok(()) }
//!     fn play(&mut self) -> Result<()> { Ok(()) }
//!     fn pause(&mut self) -> Result<()> { Ok(()) }
//!     fn stop(&mut self) -> Result<()> { Ok(()) }
//!     fn seek(&mut self, _source_id: &SourceId, _position: Duration, _token: SeekToken) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = PlayerRegistry::new();
//! let id = PlayerId::new("player-1");
//! let player = registry
//!     .create(id.clone(), Box::new(NullPipeline), LoadControl::default())
//!     .unwrap();
//!
//! player
//!     .load(&SourceMessage::Concatenating {
//!         id: SourceId::new("playlist"),
//!         children: vec![
//!             SourceMessage::Progressive {
//!                 id: SourceId::new("track-1"),
//!                 uri: "file:///music/one.mp3".to_string(),
//!             },
//!             SourceMessage::Progressive {
//!                 id: SourceId::new("track-2"),
//!                 uri: "file:///music/two.mp3".to_string(),
//!             },
//!         ],
//!         shuffle_order: vec![1, 0],
//!         lazy_loading: false,
//!     })
//!     .unwrap();
//!
//! player.play().unwrap();
//! for event in player.drain_events() {
//!     // forward to the host bridge
//!     let _ = event;
//! }
//! ```

mod error;
mod events;
mod pipeline;
mod player;
mod registry;
mod sequence;
mod shuffle;
mod tree;

// Public exports
pub use error::{PlaybackError, Result};
pub use events::PlayerEvent;
pub use pipeline::{OutputPipeline, PipelineItem, SeekToken};
pub use player::AudioPlayer;
pub use registry::PlayerRegistry;
pub use sequence::{PlaySequence, SequenceEntry};
pub use shuffle::{is_permutation, ShuffleOrder};
pub use tree::{
    AudioSource, ClippingAudioSource, ConcatenatingAudioSource, IndexedSource, UriAudioSource,
};
