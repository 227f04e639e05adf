//! Hierarchical audio source trees
//!
//! An [`AudioSource`] is a tree of logical sources: single playable resources
//! ([`UriAudioSource`]), time-clipped views over one resource
//! ([`ClippingAudioSource`]), and ordered, shuffleable concatenations of
//! sub-playlists ([`ConcatenatingAudioSource`]). Children are exclusively
//! owned by their parent; a clip's wrapped source is never independently
//! reachable - only the clip appears in the flattened play sequence.
//!
//! Leaves carry the [`IndexedSource`] capability: the transport contract the
//! player drives through the output pipeline, plus the logical
//! position/duration/buffer view (clip-relative for clipped sources).

use crate::error::{PlaybackError, Result};
use crate::pipeline::{OutputPipeline, PipelineItem, SeekToken};
use crate::sequence::SequenceEntry;
use crate::shuffle::ShuffleOrder;
use cadenza_core::{CoreError, LoadControl, ShuffleOrderMessage, SourceId, SourceMessage};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Playable-leaf capability
///
/// Implemented by the leaf node kinds. Transport operations are only valid
/// while the leaf is attached to the output pipeline; calling one on a
/// detached leaf is a contract violation reported as
/// [`PlaybackError::Detached`], never silently ignored.
///
/// All reported values are logical: a clipped leaf translates them onto its
/// own `[0, duration]` timeline.
pub trait IndexedSource {
    /// The leaf's tree-unique id
    fn source_id(&self) -> &SourceId;

    /// Position in the current play sequence (reassigned on every rebuild)
    fn flat_index(&self) -> Option<usize>;

    /// Whether the leaf is currently bound to the output pipeline
    fn is_attached(&self) -> bool;

    /// Logical duration, when known
    fn duration(&self) -> Option<Duration>;

    /// Logical playback position
    fn position(&self) -> Duration;

    /// Logical buffered position
    fn buffered_position(&self) -> Duration;

    /// Bind the leaf to the pipeline; idempotent while already attached
    fn attach(&mut self, pipeline: &mut dyn OutputPipeline, load_control: &LoadControl)
        -> Result<()>;

    /// Release the leaf from the pipeline; idempotent while detached
    fn detach(&mut self, pipeline: &mut dyn OutputPipeline) -> Result<()>;

    /// Start or resume playback
    fn play(&mut self, pipeline: &mut dyn OutputPipeline) -> Result<()>;

    /// Pause playback
    fn pause(&mut self, pipeline: &mut dyn OutputPipeline) -> Result<()>;

    /// Stop playback
    fn stop(&mut self, pipeline: &mut dyn OutputPipeline) -> Result<()>;

    /// Request an asynchronous position change
    ///
    /// `position` is logical and is clamped to `[0, duration]` when the
    /// duration is known. The pipeline settles the request by completing
    /// `token`.
    fn seek(
        &mut self,
        position: Duration,
        token: SeekToken,
        pipeline: &mut dyn OutputPipeline,
    ) -> Result<()>;

    /// The pipeline resolved the underlying resource's duration
    fn handle_duration_resolved(&mut self, duration: Duration);

    /// The pipeline reported raw position/buffer progress
    fn handle_progress(&mut self, position: Duration, buffered_position: Duration);

    /// Whether playback crossed the leaf's logical end boundary
    ///
    /// Only ever true for clipped leaves, whose end can precede the
    /// underlying resource's natural end.
    fn end_boundary_reached(&self) -> bool;
}

/// A single playable resource
#[derive(Debug, Clone, PartialEq)]
pub struct UriAudioSource {
    id: SourceId,
    uri: String,
    duration: Option<Duration>,
    position: Duration,
    buffered_position: Duration,
    attached: bool,
    flat_index: Option<usize>,
}

impl UriAudioSource {
    /// Create a leaf for the given resource locator
    ///
    /// A `file://` scheme prefix is stripped so local paths reach the
    /// pipeline in filesystem form.
    pub fn new(id: SourceId, uri: &str) -> Self {
        let uri = uri.strip_prefix("file://").unwrap_or(uri).to_string();
        Self {
            id,
            uri,
            duration: None,
            position: Duration::ZERO,
            buffered_position: Duration::ZERO,
            attached: false,
            flat_index: None,
        }
    }

    /// The resource locator
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl IndexedSource for UriAudioSource {
    fn source_id(&self) -> &SourceId {
        &self.id
    }

    fn flat_index(&self) -> Option<usize> {
        self.flat_index
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn buffered_position(&self) -> Duration {
        self.buffered_position
    }

    fn attach(
        &mut self,
        pipeline: &mut dyn OutputPipeline,
        load_control: &LoadControl,
    ) -> Result<()> {
        if self.attached {
            return Ok(());
        }
        pipeline.attach(PipelineItem {
            source_id: self.id.clone(),
            uri: self.uri.clone(),
            start_at: Duration::ZERO,
            load_control: load_control.clone(),
        })?;
        self.attached = true;
        Ok(())
    }

    fn detach(&mut self, pipeline: &mut dyn OutputPipeline) -> Result<()> {
        if !self.attached {
            return Ok(());
        }
        pipeline.detach(&self.id)?;
        self.attached = false;
        Ok(())
    }

    fn play(&mut self, pipeline: &mut dyn OutputPipeline) -> Result<()> {
        if !self.attached {
            return Err(PlaybackError::Detached(self.id.clone()));
        }
        pipeline.play()
    }

    fn pause(&mut self, pipeline: &mut dyn OutputPipeline) -> Result<()> {
        if !self.attached {
            return Err(PlaybackError::Detached(self.id.clone()));
        }
        pipeline.pause()
    }

    fn stop(&mut self, pipeline: &mut dyn OutputPipeline) -> Result<()> {
        if !self.attached {
            return Err(PlaybackError::Detached(self.id.clone()));
        }
        pipeline.stop()
    }

    fn seek(
        &mut self,
        position: Duration,
        token: SeekToken,
        pipeline: &mut dyn OutputPipeline,
    ) -> Result<()> {
        if !self.attached {
            return Err(PlaybackError::Detached(self.id.clone()));
        }
        let position = match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        pipeline.seek(&self.id, position, token)?;
        self.position = position;
        Ok(())
    }

    fn handle_duration_resolved(&mut self, duration: Duration) {
        self.duration = Some(duration);
    }

    fn handle_progress(&mut self, position: Duration, buffered_position: Duration) {
        self.position = match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        self.buffered_position = buffered_position.max(self.position);
    }

    fn end_boundary_reached(&self) -> bool {
        false
    }
}

/// A `[start, end)` view over a single resource, playable as its own unit
///
/// Owns the wrapped source exclusively; only the clip is visible to the
/// flattened sequence. All transport and query operations translate between
/// the clip's logical timeline and the underlying resource's raw timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippingAudioSource {
    id: SourceId,
    child: UriAudioSource,
    start: Duration,
    end: Option<Duration>,
    attached: bool,
    flat_index: Option<usize>,
}

impl ClippingAudioSource {
    /// Clip `child` down to `[start, end)`
    ///
    /// `end` absent means "until natural end". Fails with
    /// [`PlaybackError::InvalidClipRange`] unless `start < end` when both
    /// bounds are present.
    pub fn new(
        id: SourceId,
        child: UriAudioSource,
        start: Duration,
        end: Option<Duration>,
    ) -> Result<Self> {
        if let Some(end) = end {
            if start >= end {
                return Err(PlaybackError::InvalidClipRange { start, end });
            }
        }
        Ok(Self {
            id,
            child,
            start,
            end,
            attached: false,
            flat_index: None,
        })
    }

    /// Clip start offset on the underlying timeline
    pub fn start(&self) -> Duration {
        self.start
    }

    /// Clip end offset on the underlying timeline, when bounded
    pub fn end(&self) -> Option<Duration> {
        self.end
    }
}

impl IndexedSource for ClippingAudioSource {
    fn source_id(&self) -> &SourceId {
        &self.id
    }

    fn flat_index(&self) -> Option<usize> {
        self.flat_index
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn duration(&self) -> Option<Duration> {
        match (self.child.duration, self.end) {
            (Some(child), Some(end)) => Some(end.min(child).saturating_sub(self.start)),
            (Some(child), None) => Some(child.saturating_sub(self.start)),
            (None, Some(end)) => Some(end.saturating_sub(self.start)),
            (None, None) => None,
        }
    }

    fn position(&self) -> Duration {
        let raw = self.child.position.saturating_sub(self.start);
        match self.duration() {
            Some(duration) => raw.min(duration),
            None => raw,
        }
    }

    fn buffered_position(&self) -> Duration {
        let raw = self.child.buffered_position.saturating_sub(self.start);
        match self.duration() {
            Some(duration) => raw.min(duration),
            None => raw,
        }
    }

    fn attach(
        &mut self,
        pipeline: &mut dyn OutputPipeline,
        load_control: &LoadControl,
    ) -> Result<()> {
        if self.attached {
            return Ok(());
        }
        pipeline.attach(PipelineItem {
            source_id: self.id.clone(),
            uri: self.child.uri.clone(),
            start_at: self.start,
            load_control: load_control.clone(),
        })?;
        self.attached = true;
        self.child.position = self.start;
        Ok(())
    }

    fn detach(&mut self, pipeline: &mut dyn OutputPipeline) -> Result<()> {
        if !self.attached {
            return Ok(());
        }
        pipeline.detach(&self.id)?;
        self.attached = false;
        Ok(())
    }

    fn play(&mut self, pipeline: &mut dyn OutputPipeline) -> Result<()> {
        if !self.attached {
            return Err(PlaybackError::Detached(self.id.clone()));
        }
        pipeline.play()
    }

    fn pause(&mut self, pipeline: &mut dyn OutputPipeline) -> Result<()> {
        if !self.attached {
            return Err(PlaybackError::Detached(self.id.clone()));
        }
        pipeline.pause()
    }

    fn stop(&mut self, pipeline: &mut dyn OutputPipeline) -> Result<()> {
        if !self.attached {
            return Err(PlaybackError::Detached(self.id.clone()));
        }
        pipeline.stop()
    }

    fn seek(
        &mut self,
        position: Duration,
        token: SeekToken,
        pipeline: &mut dyn OutputPipeline,
    ) -> Result<()> {
        if !self.attached {
            return Err(PlaybackError::Detached(self.id.clone()));
        }
        let position = match self.duration() {
            Some(duration) => position.min(duration),
            None => position,
        };
        let raw = self.start + position;
        pipeline.seek(&self.id, raw, token)?;
        self.child.position = raw;
        Ok(())
    }

    fn handle_duration_resolved(&mut self, duration: Duration) {
        self.child.duration = Some(duration);
    }

    fn handle_progress(&mut self, position: Duration, buffered_position: Duration) {
        self.child.position = position;
        self.child.buffered_position = buffered_position.max(position);
    }

    fn end_boundary_reached(&self) -> bool {
        if self.duration().is_some_and(|d| d.is_zero()) {
            return true;
        }
        self.end.is_some_and(|end| self.child.position >= end)
    }
}

/// An ordered, mutable list of child sources
///
/// Keeps a [`ShuffleOrder`] permutation over its immediate children that
/// every structural mutation repairs in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatenatingAudioSource {
    id: SourceId,
    children: Vec<AudioSource>,
    shuffle_order: ShuffleOrder,
    lazy_loading: bool,
}

impl ConcatenatingAudioSource {
    /// Create a concatenation over `children`
    ///
    /// `shuffle_order` empty means "generate a fresh random permutation";
    /// otherwise it must be a permutation of the child indices.
    pub fn new(
        id: SourceId,
        children: Vec<AudioSource>,
        shuffle_order: Vec<usize>,
        lazy_loading: bool,
    ) -> Result<Self> {
        let order = if shuffle_order.is_empty() && !children.is_empty() {
            ShuffleOrder::random(children.len())
        } else {
            if shuffle_order.len() != children.len() {
                return Err(PlaybackError::InvalidShuffleOrder {
                    id,
                    expected: children.len(),
                });
            }
            match ShuffleOrder::from_indices(shuffle_order) {
                Some(order) => order,
                None => {
                    return Err(PlaybackError::InvalidShuffleOrder {
                        id,
                        expected: children.len(),
                    })
                }
            }
        };
        Ok(Self {
            id,
            children,
            shuffle_order: order,
            lazy_loading,
        })
    }

    /// Number of immediate children
    pub fn count(&self) -> usize {
        self.children.len()
    }

    /// Immediate children in list order
    pub fn children(&self) -> &[AudioSource] {
        &self.children
    }

    /// Permutation of the immediate child indices
    pub fn shuffle_order(&self) -> &[usize] {
        self.shuffle_order.indices()
    }

    /// Whether children probe their duration on demand
    pub fn lazy_loading(&self) -> bool {
        self.lazy_loading
    }

    /// Insert `child` at `index` (clamped to `[0, count]`)
    ///
    /// Duplicate-id and cycle validation against the whole owning tree
    /// happens in the player before this is called; the shuffle order is
    /// repaired in place, existing children keeping their relative order.
    pub(crate) fn insert(&mut self, index: usize, child: AudioSource) {
        let index = index.min(self.children.len());
        debug!(parent = %self.id, child = %child.id(), index, "inserting source");
        self.children.insert(index, child);
        self.shuffle_order.insert(index);
    }

    /// Remove children `[start, end)`, returning them
    ///
    /// Fails with a range error and no mutation when the bounds are invalid.
    pub(crate) fn remove_range(&mut self, start: usize, end: usize) -> Result<Vec<AudioSource>> {
        if start > end || end > self.children.len() {
            return Err(PlaybackError::IndexOutOfRange {
                index: end,
                len: self.children.len(),
            });
        }
        debug!(parent = %self.id, start, end, "removing sources");
        let removed: Vec<AudioSource> = self.children.drain(start..end).collect();
        self.shuffle_order.remove_range(start, end);
        Ok(removed)
    }

    /// Relocate the child at `from` to `to`
    ///
    /// The shuffle order keeps tracking the same logical child across the
    /// renumbering.
    pub(crate) fn move_child(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.children.len();
        if from >= len {
            return Err(PlaybackError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(PlaybackError::IndexOutOfRange { index: to, len });
        }
        debug!(parent = %self.id, from, to, "moving source");
        let child = self.children.remove(from);
        self.children.insert(to, child);
        self.shuffle_order.move_entry(from, to);
        Ok(())
    }

    /// Replace the shuffle permutation
    pub fn set_shuffle_order(&mut self, indices: Vec<usize>) -> Result<()> {
        if indices.len() != self.children.len() {
            return Err(PlaybackError::InvalidShuffleOrder {
                id: self.id.clone(),
                expected: self.children.len(),
            });
        }
        match ShuffleOrder::from_indices(indices) {
            Some(order) => {
                self.shuffle_order = order;
                Ok(())
            }
            None => Err(PlaybackError::InvalidShuffleOrder {
                id: self.id.clone(),
                expected: self.children.len(),
            }),
        }
    }
}

/// A node in an audio source tree
///
/// Closed set of node kinds: two playable leaves and one composite. The
/// ids are unique within a tree; lookups by id are unambiguous on any tree
/// built through [`AudioSource::from_message`].
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// A single playable resource
    Uri(UriAudioSource),
    /// A sub-range view over one resource
    Clipping(ClippingAudioSource),
    /// An ordered list of child sources
    Concatenating(ConcatenatingAudioSource),
}

impl AudioSource {
    /// Decode a tree from its wire description
    ///
    /// Validates clip ranges, shuffle permutations, and id uniqueness across
    /// the whole described subtree before returning.
    pub fn from_message(msg: &SourceMessage) -> Result<Self> {
        msg.validate()?;
        let source = Self::decode(msg)?;
        let mut ids = Vec::new();
        source.collect_ids(&mut ids);
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id) {
                return Err(PlaybackError::DuplicateId(id.clone()));
            }
        }
        Ok(source)
    }

    fn decode(msg: &SourceMessage) -> Result<Self> {
        match msg {
            SourceMessage::Progressive { id, uri } => {
                Ok(Self::Uri(UriAudioSource::new(id.clone(), uri)))
            }
            SourceMessage::Clipping {
                id,
                child,
                start_ms,
                end_ms,
            } => {
                let SourceMessage::Progressive {
                    id: child_id,
                    uri,
                } = child.as_ref()
                else {
                    return Err(PlaybackError::Core(CoreError::invalid_message(format!(
                        "clip {id}: child must be a progressive source"
                    ))));
                };
                let clip = ClippingAudioSource::new(
                    id.clone(),
                    UriAudioSource::new(child_id.clone(), uri),
                    Duration::from_millis(start_ms.unwrap_or(0)),
                    end_ms.map(Duration::from_millis),
                )?;
                Ok(Self::Clipping(clip))
            }
            SourceMessage::Concatenating {
                id,
                children,
                shuffle_order,
                lazy_loading,
            } => {
                let children = children
                    .iter()
                    .map(Self::decode)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::Concatenating(ConcatenatingAudioSource::new(
                    id.clone(),
                    children,
                    shuffle_order.clone(),
                    *lazy_loading,
                )?))
            }
        }
    }

    /// The node's id
    pub fn id(&self) -> &SourceId {
        match self {
            Self::Uri(leaf) => &leaf.id,
            Self::Clipping(clip) => &clip.id,
            Self::Concatenating(concat) => &concat.id,
        }
    }

    /// Number of leaves in this subtree
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Uri(_) | Self::Clipping(_) => 1,
            Self::Concatenating(concat) => concat.children.iter().map(Self::leaf_count).sum(),
        }
    }

    /// Append this node's leaves to `out` in traversal order
    ///
    /// Assigns each leaf its flat index starting from `tree_index` and
    /// returns the next unused index. Never fails on a well-formed tree.
    pub fn build_sequence(&mut self, out: &mut Vec<SequenceEntry>, tree_index: usize) -> usize {
        match self {
            Self::Uri(leaf) => {
                leaf.flat_index = Some(tree_index);
                out.push(SequenceEntry {
                    flat_index: tree_index,
                    source_id: leaf.id.clone(),
                });
                tree_index + 1
            }
            Self::Clipping(clip) => {
                clip.flat_index = Some(tree_index);
                out.push(SequenceEntry {
                    flat_index: tree_index,
                    source_id: clip.id.clone(),
                });
                tree_index + 1
            }
            Self::Concatenating(concat) => {
                let mut index = tree_index;
                for child in &mut concat.children {
                    index = child.build_sequence(out, index);
                }
                index
            }
        }
    }

    /// Depth-first search for nodes with the given id
    ///
    /// Appends every match. More than one match is only possible when the
    /// unique-id invariant was violated at construction; callers must treat
    /// that as a consistency error.
    pub fn find_by_id<'a>(&'a self, id: &SourceId, matches: &mut Vec<&'a AudioSource>) {
        if self.id() == id {
            matches.push(self);
        }
        if let Self::Concatenating(concat) = self {
            for child in &concat.children {
                child.find_by_id(id, matches);
            }
        }
    }

    /// This node's flattened shuffle permutation
    ///
    /// Leaves report the trivial (empty) permutation. A concatenation
    /// reports a permutation of its subtree's flat indices, obtained by
    /// traversing children in shuffle order and splicing in each child's own
    /// recursively shuffled indices - every tree level shuffles
    /// independently.
    pub fn shuffle_indices(&self) -> Vec<usize> {
        match self {
            Self::Uri(_) | Self::Clipping(_) => Vec::new(),
            Self::Concatenating(_) => {
                let mut indices = Vec::with_capacity(self.leaf_count());
                self.append_flat_shuffle(0, &mut indices);
                indices
            }
        }
    }

    fn append_flat_shuffle(&self, base: usize, out: &mut Vec<usize>) -> usize {
        match self {
            Self::Uri(_) | Self::Clipping(_) => {
                out.push(base);
                base + 1
            }
            Self::Concatenating(concat) => {
                let mut bases = Vec::with_capacity(concat.children.len());
                let mut next = base;
                for child in &concat.children {
                    bases.push(next);
                    next += child.leaf_count();
                }
                for &child_index in concat.shuffle_order.indices() {
                    concat.children[child_index].append_flat_shuffle(bases[child_index], out);
                }
                next
            }
        }
    }

    /// Restore per-node shuffle permutations from a nested message
    pub fn decode_shuffle_order(&mut self, msg: &ShuffleOrderMessage) -> Result<()> {
        if self.id() != &msg.id {
            return Err(PlaybackError::UnknownSource(msg.id.clone()));
        }
        match self {
            Self::Uri(_) | Self::Clipping(_) => {
                if msg.shuffle_order.is_empty() {
                    Ok(())
                } else {
                    Err(PlaybackError::InvalidShuffleOrder {
                        id: msg.id.clone(),
                        expected: 0,
                    })
                }
            }
            Self::Concatenating(concat) => {
                concat.set_shuffle_order(msg.shuffle_order.clone())?;
                for child_msg in &msg.children {
                    let child = concat
                        .children
                        .iter_mut()
                        .find(|child| child.id() == &child_msg.id)
                        .ok_or_else(|| PlaybackError::UnknownSource(child_msg.id.clone()))?;
                    child.decode_shuffle_order(child_msg)?;
                }
                Ok(())
            }
        }
    }

    /// Regenerate every concatenation's permutation in this subtree
    pub fn reshuffle(&mut self) {
        if let Self::Concatenating(concat) = self {
            concat.shuffle_order.reshuffle();
            for child in &mut concat.children {
                child.reshuffle();
            }
        }
    }

    /// Collect every id in this subtree, including clip-wrapped sources
    pub fn collect_ids<'a>(&'a self, out: &mut Vec<&'a SourceId>) {
        out.push(self.id());
        match self {
            Self::Uri(_) => {}
            Self::Clipping(clip) => out.push(&clip.child.id),
            Self::Concatenating(concat) => {
                for child in &concat.children {
                    child.collect_ids(out);
                }
            }
        }
    }

    /// Collect the ids of this subtree's leaves in traversal order
    pub fn collect_leaf_ids(&self, out: &mut Vec<SourceId>) {
        match self {
            Self::Uri(leaf) => out.push(leaf.id.clone()),
            Self::Clipping(clip) => out.push(clip.id.clone()),
            Self::Concatenating(concat) => {
                for child in &concat.children {
                    child.collect_leaf_ids(out);
                }
            }
        }
    }

    /// Record the ids on the path from this node down to `target`
    ///
    /// Returns whether `target` was found; `path` then holds every ancestor
    /// id including the target itself.
    pub fn path_ids(&self, target: &SourceId, path: &mut Vec<SourceId>) -> bool {
        path.push(self.id().clone());
        if self.id() == target {
            return true;
        }
        if let Self::Concatenating(concat) = self {
            for child in &concat.children {
                if child.path_ids(target, path) {
                    return true;
                }
            }
        }
        path.pop();
        false
    }

    /// The leaf capability, when this node is a leaf
    pub fn as_indexed(&self) -> Option<&dyn IndexedSource> {
        match self {
            Self::Uri(leaf) => Some(leaf),
            Self::Clipping(clip) => Some(clip),
            Self::Concatenating(_) => None,
        }
    }

    /// Mutable leaf capability, when this node is a leaf
    pub fn as_indexed_mut(&mut self) -> Option<&mut dyn IndexedSource> {
        match self {
            Self::Uri(leaf) => Some(leaf),
            Self::Clipping(clip) => Some(clip),
            Self::Concatenating(_) => None,
        }
    }

    /// Find the leaf with the given id
    pub fn leaf_by_id(&self, id: &SourceId) -> Option<&dyn IndexedSource> {
        match self {
            Self::Uri(_) | Self::Clipping(_) => {
                if self.id() == id {
                    self.as_indexed()
                } else {
                    None
                }
            }
            Self::Concatenating(concat) => {
                concat.children.iter().find_map(|child| child.leaf_by_id(id))
            }
        }
    }

    /// Find the leaf with the given id, mutably
    pub fn leaf_by_id_mut(&mut self, id: &SourceId) -> Option<&mut dyn IndexedSource> {
        match self {
            Self::Uri(_) | Self::Clipping(_) => {
                if self.id() == id {
                    self.as_indexed_mut()
                } else {
                    None
                }
            }
            Self::Concatenating(concat) => concat
                .children
                .iter_mut()
                .find_map(|child| child.leaf_by_id_mut(id)),
        }
    }

    /// Find the concatenation with the given id
    pub fn concatenating(&self, id: &SourceId) -> Option<&ConcatenatingAudioSource> {
        match self {
            Self::Concatenating(concat) => {
                if concat.id == *id {
                    return Some(concat);
                }
                concat
                    .children
                    .iter()
                    .find_map(|child| child.concatenating(id))
            }
            _ => None,
        }
    }

    /// Find the concatenation with the given id, mutably
    pub fn concatenating_mut(&mut self, id: &SourceId) -> Option<&mut ConcatenatingAudioSource> {
        match self {
            Self::Concatenating(concat) => {
                if concat.id == *id {
                    return Some(concat);
                }
                concat
                    .children
                    .iter_mut()
                    .find_map(|child| child.concatenating_mut(id))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{PipelineCall, RecordingPipeline};

    fn uri(id: &str) -> AudioSource {
        AudioSource::Uri(UriAudioSource::new(
            SourceId::new(id),
            &format!("file:///music/{id}.mp3"),
        ))
    }

    fn concat(id: &str, children: Vec<AudioSource>, order: Vec<usize>) -> AudioSource {
        AudioSource::Concatenating(
            ConcatenatingAudioSource::new(SourceId::new(id), children, order, false).unwrap(),
        )
    }

    fn clip_5_to_15() -> ClippingAudioSource {
        ClippingAudioSource::new(
            SourceId::new("clip"),
            UriAudioSource::new(SourceId::new("clip-inner"), "file:///music/long.mp3"),
            Duration::from_secs(5),
            Some(Duration::from_secs(15)),
        )
        .unwrap()
    }

    #[test]
    fn build_sequence_flattens_depth_first() {
        let mut root = concat(
            "root",
            vec![
                uri("a"),
                concat("inner", vec![uri("b"), uri("c")], vec![0, 1]),
                uri("d"),
            ],
            vec![0, 1, 2],
        );

        let mut entries = Vec::new();
        let next = root.build_sequence(&mut entries, 0);

        assert_eq!(next, 4);
        let ids: Vec<&str> = entries.iter().map(|e| e.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        let indices: Vec<usize> = entries.iter().map(|e| e.flat_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);

        // Idempotent on an unmutated tree.
        let mut again = Vec::new();
        root.build_sequence(&mut again, 0);
        assert_eq!(entries, again);
    }

    #[test]
    fn leaf_count_counts_clips_as_one() {
        let root = concat(
            "root",
            vec![uri("a"), AudioSource::Clipping(clip_5_to_15())],
            vec![1, 0],
        );
        assert_eq!(root.leaf_count(), 2);
    }

    #[test]
    fn find_by_id_searches_all_depths() {
        let root = concat(
            "root",
            vec![uri("a"), concat("inner", vec![uri("b")], vec![0])],
            vec![0, 1],
        );

        let mut matches = Vec::new();
        root.find_by_id(&SourceId::new("b"), &mut matches);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id().as_str(), "b");

        let mut missing = Vec::new();
        root.find_by_id(&SourceId::new("nope"), &mut missing);
        assert!(missing.is_empty());
    }

    #[test]
    fn find_by_id_reports_every_duplicate() {
        // Direct construction can violate the unique-id invariant; findById
        // must then report every match so callers can detect the corruption.
        let root = concat("root", vec![uri("dup"), uri("dup")], vec![0, 1]);
        let mut matches = Vec::new();
        root.find_by_id(&SourceId::new("dup"), &mut matches);
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn uri_leaf_strips_file_scheme() {
        let leaf = UriAudioSource::new(SourceId::new("a"), "file:///music/a.mp3");
        assert_eq!(leaf.uri(), "/music/a.mp3");

        let remote = UriAudioSource::new(SourceId::new("b"), "https://host/b.mp3");
        assert_eq!(remote.uri(), "https://host/b.mp3");
    }

    #[test]
    fn clip_reports_logical_duration() {
        let mut clip = clip_5_to_15();
        // 10s window before the underlying duration is known.
        assert_eq!(clip.duration(), Some(Duration::from_secs(10)));

        clip.handle_duration_resolved(Duration::from_secs(30));
        assert_eq!(clip.duration(), Some(Duration::from_secs(10)));

        // Underlying resource shorter than the clip end.
        clip.handle_duration_resolved(Duration::from_secs(12));
        assert_eq!(clip.duration(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn clip_without_end_resolves_duration_asynchronously() {
        let mut clip = ClippingAudioSource::new(
            SourceId::new("tail"),
            UriAudioSource::new(SourceId::new("tail-inner"), "/music/long.mp3"),
            Duration::from_secs(5),
            None,
        )
        .unwrap();

        assert_eq!(clip.duration(), None);
        clip.handle_duration_resolved(Duration::from_secs(30));
        assert_eq!(clip.duration(), Some(Duration::from_secs(25)));
    }

    #[test]
    fn clip_attach_starts_at_clip_start() {
        let (mut pipeline, calls) = RecordingPipeline::new();
        let mut clip = clip_5_to_15();

        clip.attach(&mut pipeline, &LoadControl::default()).unwrap();
        assert!(clip.is_attached());

        let calls = calls.lock().unwrap();
        match &calls[0] {
            PipelineCall::Attach(item) => {
                assert_eq!(item.source_id.as_str(), "clip");
                assert_eq!(item.uri, "/music/long.mp3");
                assert_eq!(item.start_at, Duration::from_secs(5));
            }
            other => panic!("expected attach, got {other:?}"),
        }
    }

    #[test]
    fn attach_is_idempotent() {
        let (mut pipeline, calls) = RecordingPipeline::new();
        let mut clip = clip_5_to_15();

        clip.attach(&mut pipeline, &LoadControl::default()).unwrap();
        clip.attach(&mut pipeline, &LoadControl::default()).unwrap();

        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn clip_seek_translates_onto_underlying_timeline() {
        let (mut pipeline, calls) = RecordingPipeline::new();
        let mut clip = clip_5_to_15();
        clip.attach(&mut pipeline, &LoadControl::default()).unwrap();

        clip.seek(Duration::from_secs(3), SeekToken::new(1), &mut pipeline)
            .unwrap();

        let calls = calls.lock().unwrap();
        match &calls[1] {
            PipelineCall::Seek { position, .. } => {
                assert_eq!(*position, Duration::from_secs(8));
            }
            other => panic!("expected seek, got {other:?}"),
        }
    }

    #[test]
    fn clip_seek_clamps_to_duration() {
        let (mut pipeline, calls) = RecordingPipeline::new();
        let mut clip = clip_5_to_15();
        clip.attach(&mut pipeline, &LoadControl::default()).unwrap();

        clip.seek(Duration::from_secs(60), SeekToken::new(1), &mut pipeline)
            .unwrap();

        let calls = calls.lock().unwrap();
        match &calls[1] {
            // Clamped to the 10s window, i.e. raw 15s.
            PipelineCall::Seek { position, .. } => {
                assert_eq!(*position, Duration::from_secs(15));
            }
            other => panic!("expected seek, got {other:?}"),
        }
    }

    #[test]
    fn clip_progress_is_clip_relative() {
        let mut clip = clip_5_to_15();
        clip.handle_progress(Duration::from_secs(8), Duration::from_secs(12));
        assert_eq!(clip.position(), Duration::from_secs(3));
        assert_eq!(clip.buffered_position(), Duration::from_secs(7));

        // Before the clip window: floored at zero.
        clip.handle_progress(Duration::from_secs(2), Duration::from_secs(2));
        assert_eq!(clip.position(), Duration::ZERO);
    }

    #[test]
    fn clip_signals_completion_at_end_boundary() {
        let mut clip = clip_5_to_15();
        clip.handle_progress(Duration::from_secs(14), Duration::from_secs(20));
        assert!(!clip.end_boundary_reached());

        clip.handle_progress(Duration::from_secs(15), Duration::from_secs(20));
        assert!(clip.end_boundary_reached());
        assert_eq!(clip.position(), Duration::from_secs(10));
    }

    #[test]
    fn clip_start_beyond_resource_has_zero_duration() {
        let mut clip = ClippingAudioSource::new(
            SourceId::new("late"),
            UriAudioSource::new(SourceId::new("late-inner"), "/music/short.mp3"),
            Duration::from_secs(40),
            None,
        )
        .unwrap();

        clip.handle_duration_resolved(Duration::from_secs(30));
        assert_eq!(clip.duration(), Some(Duration::ZERO));
        assert!(clip.end_boundary_reached());
    }

    #[test]
    fn clip_rejects_inverted_range() {
        let result = ClippingAudioSource::new(
            SourceId::new("bad"),
            UriAudioSource::new(SourceId::new("bad-inner"), "/music/x.mp3"),
            Duration::from_secs(10),
            Some(Duration::from_secs(10)),
        );
        assert!(matches!(
            result,
            Err(PlaybackError::InvalidClipRange { .. })
        ));
    }

    #[test]
    fn transport_on_detached_leaf_is_an_error() {
        let (mut pipeline, _calls) = RecordingPipeline::new();
        let mut leaf = UriAudioSource::new(SourceId::new("a"), "/music/a.mp3");

        assert!(matches!(
            leaf.play(&mut pipeline),
            Err(PlaybackError::Detached(_))
        ));
        assert!(matches!(
            leaf.seek(Duration::ZERO, SeekToken::new(1), &mut pipeline),
            Err(PlaybackError::Detached(_))
        ));
    }

    #[test]
    fn shuffle_indices_compose_across_levels() {
        // Leaves in flat order: a1=0 a2=1 b=2 c1=3 c2=4 c3=5
        let root = concat(
            "root",
            vec![
                concat("A", vec![uri("a1"), uri("a2")], vec![1, 0]),
                uri("b"),
                concat("C", vec![uri("c1"), uri("c2"), uri("c3")], vec![2, 0, 1]),
            ],
            vec![2, 0, 1],
        );

        assert_eq!(root.shuffle_indices(), vec![5, 3, 4, 1, 0, 2]);
    }

    #[test]
    fn leaf_shuffle_indices_are_trivial() {
        assert!(uri("a").shuffle_indices().is_empty());
    }

    #[test]
    fn shuffle_indices_are_a_permutation_of_flat_indices() {
        let root = concat(
            "root",
            vec![
                concat("A", vec![uri("a1"), uri("a2"), uri("a3")], vec![]),
                concat("B", vec![uri("b1"), uri("b2")], vec![]),
            ],
            vec![],
        );

        let indices = root.shuffle_indices();
        assert_eq!(indices.len(), 5);
        assert!(crate::shuffle::is_permutation(&indices));
    }

    #[test]
    fn from_message_builds_and_validates() {
        let msg = SourceMessage::Concatenating {
            id: SourceId::new("root"),
            children: vec![
                SourceMessage::Progressive {
                    id: SourceId::new("a"),
                    uri: "file:///music/a.mp3".to_string(),
                },
                SourceMessage::Clipping {
                    id: SourceId::new("b"),
                    child: Box::new(SourceMessage::Progressive {
                        id: SourceId::new("b-inner"),
                        uri: "file:///music/b.mp3".to_string(),
                    }),
                    start_ms: Some(5_000),
                    end_ms: Some(15_000),
                },
            ],
            shuffle_order: vec![1, 0],
            lazy_loading: false,
        };

        let source = AudioSource::from_message(&msg).unwrap();
        assert_eq!(source.leaf_count(), 2);

        let AudioSource::Concatenating(concat) = &source else {
            panic!("expected concatenation");
        };
        assert_eq!(concat.shuffle_order(), &[1, 0]);
    }

    #[test]
    fn from_message_rejects_duplicate_ids() {
        let msg = SourceMessage::Concatenating {
            id: SourceId::new("root"),
            children: vec![
                SourceMessage::Progressive {
                    id: SourceId::new("same"),
                    uri: "/music/a.mp3".to_string(),
                },
                SourceMessage::Progressive {
                    id: SourceId::new("same"),
                    uri: "/music/b.mp3".to_string(),
                },
            ],
            shuffle_order: vec![0, 1],
            lazy_loading: false,
        };

        assert!(matches!(
            AudioSource::from_message(&msg),
            Err(PlaybackError::DuplicateId(_))
        ));
    }

    #[test]
    fn from_message_rejects_bad_shuffle_order() {
        let msg = SourceMessage::Concatenating {
            id: SourceId::new("root"),
            children: vec![SourceMessage::Progressive {
                id: SourceId::new("a"),
                uri: "/music/a.mp3".to_string(),
            }],
            shuffle_order: vec![3],
            lazy_loading: false,
        };

        assert!(matches!(
            AudioSource::from_message(&msg),
            Err(PlaybackError::InvalidShuffleOrder { .. })
        ));
    }

    #[test]
    fn from_message_generates_order_when_absent() {
        let msg = SourceMessage::Concatenating {
            id: SourceId::new("root"),
            children: vec![
                SourceMessage::Progressive {
                    id: SourceId::new("a"),
                    uri: "/music/a.mp3".to_string(),
                },
                SourceMessage::Progressive {
                    id: SourceId::new("b"),
                    uri: "/music/b.mp3".to_string(),
                },
            ],
            shuffle_order: vec![],
            lazy_loading: false,
        };

        let AudioSource::Concatenating(concat) = AudioSource::from_message(&msg).unwrap() else {
            panic!("expected concatenation");
        };
        assert!(crate::shuffle::is_permutation(concat.shuffle_order()));
        assert_eq!(concat.shuffle_order().len(), 2);
    }

    #[test]
    fn decode_shuffle_order_restores_nested_orders() {
        let mut root = concat(
            "root",
            vec![concat("inner", vec![uri("a"), uri("b")], vec![0, 1]), uri("c")],
            vec![0, 1],
        );

        let msg = ShuffleOrderMessage {
            id: SourceId::new("root"),
            shuffle_order: vec![1, 0],
            children: vec![ShuffleOrderMessage {
                id: SourceId::new("inner"),
                shuffle_order: vec![1, 0],
                children: vec![],
            }],
        };

        root.decode_shuffle_order(&msg).unwrap();
        // Flat leaves: a=0 b=1 c=2; root plays c first, inner plays b first.
        assert_eq!(root.shuffle_indices(), vec![2, 1, 0]);
    }

    #[test]
    fn decode_shuffle_order_rejects_wrong_id() {
        let mut root = concat("root", vec![uri("a")], vec![0]);
        let msg = ShuffleOrderMessage {
            id: SourceId::new("other"),
            shuffle_order: vec![0],
            children: vec![],
        };
        assert!(matches!(
            root.decode_shuffle_order(&msg),
            Err(PlaybackError::UnknownSource(_))
        ));
    }

    #[test]
    fn decode_shuffle_order_rejects_non_permutation() {
        let mut root = concat("root", vec![uri("a"), uri("b")], vec![0, 1]);
        let msg = ShuffleOrderMessage {
            id: SourceId::new("root"),
            shuffle_order: vec![0, 0],
            children: vec![],
        };
        assert!(matches!(
            root.decode_shuffle_order(&msg),
            Err(PlaybackError::InvalidShuffleOrder { .. })
        ));
    }

    #[test]
    fn path_ids_tracks_ancestry() {
        let root = concat(
            "root",
            vec![concat("inner", vec![uri("a")], vec![0])],
            vec![0],
        );

        let mut path = Vec::new();
        assert!(root.path_ids(&SourceId::new("inner"), &mut path));
        let path: Vec<&str> = path.iter().map(SourceId::as_str).collect();
        assert_eq!(path, vec!["root", "inner"]);

        let mut missing = Vec::new();
        assert!(!root.path_ids(&SourceId::new("nope"), &mut missing));
        assert!(missing.is_empty());
    }
}
