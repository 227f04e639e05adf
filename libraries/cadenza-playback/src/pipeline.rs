//! Output-pipeline seam
//!
//! Abstracts the OS media-rendering engine (decoding, buffering, hardware
//! output). The playback engine issues commands through [`OutputPipeline`];
//! the pipeline performs the work asynchronously and reports back through the
//! player's `handle_*` methods.

use crate::error::Result;
use cadenza_core::{LoadControl, SourceId};
use std::fmt;
use std::time::Duration;

/// Completion token for an asynchronous seek
///
/// Issued when a seek is requested; resolved exactly once, either when the
/// pipeline reports the seek settled or when a later seek supersedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeekToken(u64);

impl SeekToken {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw token value (stable across the event channel)
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SeekToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seek#{}", self.0)
    }
}

/// Everything the pipeline needs to bind one playable item
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineItem {
    /// Id the pipeline uses to address the item in later commands/reports
    pub source_id: SourceId,

    /// Resource locator of the underlying audio
    pub uri: String,

    /// Position on the underlying resource's timeline to start from
    ///
    /// Non-zero for clips, which begin at their clip start.
    pub start_at: Duration,

    /// Buffering preferences
    pub load_control: LoadControl,
}

/// Command surface of the external media pipeline
///
/// Implementors bind items by id, run the transport, and report progress,
/// duration resolution, seek settlement, and item completion back to the
/// owning player asynchronously. All commands here must return promptly;
/// none may block on I/O.
pub trait OutputPipeline: Send {
    /// Bind an item so it can be played
    fn attach(&mut self, item: PipelineItem) -> Result<()>;

    /// Release a previously attached item
    ///
    /// After this returns, progress reports for the id may still arrive (the
    /// pipeline works asynchronously); the player treats them as no-ops.
    fn detach(&mut self, source_id: &SourceId) -> Result<()>;

    /// Start or resume rendering the current item
    fn play(&mut self) -> Result<()>;

    /// Pause rendering, keeping the current item bound
    fn pause(&mut self) -> Result<()>;

    /// Stop rendering the current item
    fn stop(&mut self) -> Result<()>;

    /// Request a position change on an attached item
    ///
    /// `position` is on the underlying resource's timeline. The pipeline
    /// reports settlement by completing `token`.
    fn seek(&mut self, source_id: &SourceId, position: Duration, token: SeekToken) -> Result<()>;
}
