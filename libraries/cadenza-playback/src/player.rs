//! Audio player - core orchestration
//!
//! Owns one source tree and its flattened play sequence, drives the output
//! pipeline, and reconciles the currently playing index across structural
//! mutations. All mutation happens synchronously on the owning thread; the
//! pipeline reports asynchronous outcomes back through the `handle_*`
//! methods, and those outcomes reach the host through the pending event
//! queue ([`AudioPlayer::drain_events`]).

use crate::error::{PlaybackError, Result};
use crate::events::PlayerEvent;
use crate::pipeline::{OutputPipeline, SeekToken};
use crate::sequence::PlaySequence;
use crate::tree::{AudioSource, ConcatenatingAudioSource, IndexedSource};
use cadenza_core::{
    LoadControl, LoopMode, PlayerId, ProcessingState, ShuffleOrderMessage, SourceId, SourceMessage,
};
use std::time::Duration;
use tracing::{debug, warn};

/// A seek awaiting settlement
///
/// `external` marks host-issued seeks, which get a `SeekCompleted` event;
/// internally issued replays resolve silently.
struct PendingSeek {
    token: SeekToken,
    external: bool,
}

/// One player instance: a source tree, its play sequence, and transport state
pub struct AudioPlayer {
    id: PlayerId,
    pipeline: Box<dyn OutputPipeline>,
    load_control: LoadControl,

    // Tree and derived sequence
    root: Option<AudioSource>,
    sequence: PlaySequence,

    // Transport state
    processing_state: ProcessingState,
    loop_mode: LoopMode,
    shuffle_enabled: bool,
    playing: bool,
    current_index: Option<usize>,

    // Async seek bookkeeping
    pending_seeks: Vec<PendingSeek>,
    next_seek_token: u64,

    // Event queue for the host bridge
    pending_events: Vec<PlayerEvent>,
}

impl AudioPlayer {
    /// Create a player bound to an output pipeline
    pub fn new(id: PlayerId, pipeline: Box<dyn OutputPipeline>, load_control: LoadControl) -> Self {
        Self {
            id,
            pipeline,
            load_control,
            root: None,
            sequence: PlaySequence::empty(),
            processing_state: ProcessingState::Idle,
            loop_mode: LoopMode::Off,
            shuffle_enabled: false,
            playing: false,
            current_index: None,
            pending_seeks: Vec::new(),
            next_seek_token: 0,
            pending_events: Vec::new(),
        }
    }

    /// The player's id
    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    // ===== Loading =====

    /// Replace the source tree with the one described by `msg`
    ///
    /// Decodes and validates the whole description before touching any
    /// state, flattens it, selects the first item of the active traversal,
    /// and attaches items per the root's lazy-loading flag.
    pub fn load(&mut self, msg: &SourceMessage) -> Result<()> {
        let mut root = AudioSource::from_message(msg)?;
        self.detach_all()?;
        self.supersede_pending_seeks();

        let sequence = PlaySequence::from_tree(&mut root);
        debug!(player = %self.id, leaves = sequence.len(), "loaded source tree");
        self.root = Some(root);
        self.sequence = sequence;
        self.current_index = None;
        self.playing = false;

        self.set_processing_state(ProcessingState::Loading);
        self.emit(PlayerEvent::SequenceChanged {
            length: self.sequence.len(),
        });

        if self.sequence.is_empty() {
            self.emit_current_index();
            self.set_processing_state(ProcessingState::Completed);
            return Ok(());
        }

        self.current_index = self.sequence.first_index(self.shuffle_enabled);
        self.emit_current_index();
        self.attach_items()
    }

    // ===== Transport =====

    /// Start or resume playback of the current item
    pub fn play(&mut self) -> Result<()> {
        if self.root.is_none() {
            return Err(PlaybackError::NoSourceLoaded);
        }
        if self.processing_state == ProcessingState::Completed {
            let first = self.sequence.first_index(self.shuffle_enabled);
            if first.is_some() {
                self.switch_current(first)?;
                let token = self.issue_token();
                self.with_current_leaf(|leaf, pipeline| leaf.seek(Duration::ZERO, token, pipeline))?;
                self.pending_seeks.push(PendingSeek {
                    token,
                    external: false,
                });
                self.set_processing_state(ProcessingState::Ready);
            }
        }
        if self.playing {
            return Ok(());
        }
        self.with_current_leaf(|leaf, pipeline| leaf.play(pipeline))?;
        self.playing = true;
        Ok(())
    }

    /// Pause playback, keeping the current item attached
    pub fn pause(&mut self) -> Result<()> {
        if self.root.is_none() {
            return Err(PlaybackError::NoSourceLoaded);
        }
        if !self.playing {
            return Ok(());
        }
        self.with_current_leaf(|leaf, pipeline| leaf.pause(pipeline))?;
        self.playing = false;
        Ok(())
    }

    /// Stop playback of the current item
    pub fn stop(&mut self) -> Result<()> {
        if self.root.is_none() {
            return Err(PlaybackError::NoSourceLoaded);
        }
        if self.current_index.is_some() {
            self.with_current_leaf(|leaf, pipeline| leaf.stop(pipeline))?;
        }
        self.playing = false;
        Ok(())
    }

    /// Request a position change, optionally on another sequence index
    ///
    /// Any seek still pending is superseded first and resolves its token
    /// with `completed = false`. Returns the new seek's token; the matching
    /// `SeekCompleted` event fires when the pipeline settles it.
    pub fn seek(&mut self, position: Duration, index: Option<usize>) -> Result<SeekToken> {
        if self.root.is_none() {
            return Err(PlaybackError::NoSourceLoaded);
        }
        let target = match index {
            Some(index) => {
                if index >= self.sequence.len() {
                    return Err(PlaybackError::IndexOutOfRange {
                        index,
                        len: self.sequence.len(),
                    });
                }
                index
            }
            None => self.current_index.ok_or(PlaybackError::NoSourceLoaded)?,
        };

        self.supersede_pending_seeks();
        if Some(target) != self.current_index {
            self.switch_current(Some(target))?;
        }

        let token = self.issue_token();
        self.with_current_leaf(|leaf, pipeline| leaf.seek(position, token, pipeline))?;
        self.pending_seeks.push(PendingSeek {
            token,
            external: true,
        });
        Ok(token)
    }

    // ===== Tree mutation =====

    /// Insert the source described by `child` into a concatenation
    ///
    /// `index` is clamped to `[0, count]`. Fails atomically - before any
    /// structural change - when the description reuses an id already in the
    /// tree (`DuplicateId`), or would make the target composite or one of
    /// its ancestors reachable from itself (`Cycle`).
    pub fn insert(
        &mut self,
        parent_id: &SourceId,
        index: usize,
        child: &SourceMessage,
    ) -> Result<()> {
        let child_source = AudioSource::from_message(child)?;
        let root = self.root.as_mut().ok_or(PlaybackError::NoSourceLoaded)?;

        let mut path = Vec::new();
        if !root.path_ids(parent_id, &mut path) {
            return Err(PlaybackError::UnknownSource(parent_id.clone()));
        }

        let mut child_ids = Vec::new();
        child_source.collect_ids(&mut child_ids);
        for ancestor in &path {
            if child_ids.contains(&ancestor) {
                return Err(PlaybackError::Cycle(ancestor.clone()));
            }
        }
        let mut tree_ids = Vec::new();
        root.collect_ids(&mut tree_ids);
        for id in &child_ids {
            if tree_ids.contains(id) {
                return Err(PlaybackError::DuplicateId((*id).clone()));
            }
        }

        let concat = root
            .concatenating_mut(parent_id)
            .ok_or_else(|| PlaybackError::NotConcatenating(parent_id.clone()))?;
        concat.insert(index, child_source);
        self.rebuild_sequence()
    }

    /// Remove children `[start, end)` from a concatenation
    ///
    /// Bounds are validated before any change. Removed leaves that are
    /// attached get detached first; if the currently playing leaf is among
    /// them, playback advances to the next item per the active loop mode
    /// and shuffle state, exactly like end-of-track advancement.
    pub fn remove_range(&mut self, parent_id: &SourceId, start: usize, end: usize) -> Result<()> {
        let root = self.root.as_mut().ok_or(PlaybackError::NoSourceLoaded)?;

        let mut removed_leaf_ids = Vec::new();
        {
            let concat = require_concatenating(root, parent_id)?;
            if start > end || end > concat.count() {
                return Err(PlaybackError::IndexOutOfRange {
                    index: end,
                    len: concat.count(),
                });
            }
            for child in &concat.children()[start..end] {
                child.collect_leaf_ids(&mut removed_leaf_ids);
            }
        }

        let current_id = self
            .current_index
            .and_then(|index| self.sequence.source_id_at(index))
            .cloned();
        for id in &removed_leaf_ids {
            if let Some(leaf) = root.leaf_by_id_mut(id) {
                if leaf.is_attached() {
                    if self.playing && current_id.as_ref() == Some(id) {
                        leaf.stop(self.pipeline.as_mut())?;
                    }
                    leaf.detach(self.pipeline.as_mut())?;
                }
            }
        }

        let concat = root
            .concatenating_mut(parent_id)
            .ok_or_else(|| PlaybackError::NotConcatenating(parent_id.clone()))?;
        concat.remove_range(start, end)?;
        self.rebuild_sequence()
    }

    /// Relocate one child of a concatenation
    ///
    /// The moved child keeps its shuffle-order identity: whatever shuffle
    /// position it held before the move, it still holds after.
    pub fn move_source(&mut self, parent_id: &SourceId, from: usize, to: usize) -> Result<()> {
        let root = self.root.as_mut().ok_or(PlaybackError::NoSourceLoaded)?;
        {
            let concat = require_concatenating(root, parent_id)?;
            let len = concat.count();
            if from >= len {
                return Err(PlaybackError::IndexOutOfRange { index: from, len });
            }
            if to >= len {
                return Err(PlaybackError::IndexOutOfRange { index: to, len });
            }
        }
        let concat = root
            .concatenating_mut(parent_id)
            .ok_or_else(|| PlaybackError::NotConcatenating(parent_id.clone()))?;
        concat.move_child(from, to)?;
        self.rebuild_sequence()
    }

    // ===== Shuffle and loop control =====

    /// Set the loop mode used for advancement
    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        debug!(player = %self.id, mode = %mode, "loop mode changed");
        self.loop_mode = mode;
    }

    /// The active loop mode
    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    /// Switch between in-order and shuffled traversal
    pub fn set_shuffle_enabled(&mut self, enabled: bool) {
        debug!(player = %self.id, enabled, "shuffle mode changed");
        self.shuffle_enabled = enabled;
    }

    /// Whether shuffled traversal is active
    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle_enabled
    }

    /// Regenerate every concatenation's shuffle permutation
    pub fn reshuffle(&mut self) -> Result<()> {
        let root = self.root.as_mut().ok_or(PlaybackError::NoSourceLoaded)?;
        root.reshuffle();
        self.refresh_traversal()
    }

    /// Restore per-node shuffle permutations from a nested message
    pub fn set_shuffle_order(&mut self, msg: &ShuffleOrderMessage) -> Result<()> {
        let root = self.root.as_mut().ok_or(PlaybackError::NoSourceLoaded)?;
        root.decode_shuffle_order(msg)?;
        self.refresh_traversal()
    }

    // ===== Queries =====

    /// The flattened play sequence
    pub fn sequence(&self) -> &PlaySequence {
        &self.sequence
    }

    /// Flat index of the current item
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Id of the current item
    pub fn current_source_id(&self) -> Option<&SourceId> {
        self.current_index
            .and_then(|index| self.sequence.source_id_at(index))
    }

    /// The player's processing state
    pub fn processing_state(&self) -> ProcessingState {
        self.processing_state
    }

    /// Whether the transport is running
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Logical duration of the current item, when known
    pub fn duration(&self) -> Option<Duration> {
        self.current_leaf().and_then(|leaf| leaf.duration())
    }

    /// Logical position of the current item
    pub fn position(&self) -> Duration {
        self.current_leaf()
            .map_or(Duration::ZERO, |leaf| leaf.position())
    }

    /// Logical buffered position of the current item
    pub fn buffered_position(&self) -> Duration {
        self.current_leaf()
            .map_or(Duration::ZERO, |leaf| leaf.buffered_position())
    }

    // ===== Events =====

    /// Drain all pending events for the host
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Whether events are waiting to be drained
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    // ===== Pipeline notifications =====

    /// The pipeline resolved an item's underlying duration
    pub fn handle_duration_resolved(&mut self, source_id: &SourceId, duration: Duration) {
        let is_current = self.is_current(source_id);
        let zero_duration;
        {
            let Some(root) = self.root.as_mut() else {
                warn!(source = %source_id, "duration reported with no tree loaded");
                return;
            };
            let Some(leaf) = root.leaf_by_id_mut(source_id) else {
                warn!(source = %source_id, "duration reported for unknown source");
                return;
            };
            leaf.handle_duration_resolved(duration);
            zero_duration = leaf.duration().is_some_and(|d| d.is_zero());
        }
        if is_current {
            self.emit_position_update();
            // A clip whose start lies past the resource's actual end has
            // nothing to play and completes immediately.
            if zero_duration {
                self.advance_from_current();
            }
        }
    }

    /// The pipeline reported raw position/buffer progress for an item
    pub fn handle_progress(&mut self, source_id: &SourceId, position: Duration, buffered: Duration) {
        let is_current = self.is_current(source_id);
        let boundary_reached;
        {
            let Some(root) = self.root.as_mut() else {
                return;
            };
            let Some(leaf) = root.leaf_by_id_mut(source_id) else {
                warn!(source = %source_id, "progress reported for unknown source");
                return;
            };
            if !leaf.is_attached() {
                // Late report from an operation outstanding at detach time.
                warn!(source = %source_id, "progress reported after detach");
                return;
            }
            leaf.handle_progress(position, buffered);
            boundary_reached = leaf.end_boundary_reached();
        }
        if is_current {
            self.emit_position_update();
            if boundary_reached {
                self.advance_from_current();
            }
        }
    }

    /// The pipeline finished preparing the current item
    pub fn handle_item_ready(&mut self, source_id: &SourceId) {
        if self.is_current(source_id) {
            self.set_processing_state(ProcessingState::Ready);
        }
    }

    /// The pipeline stalled buffering the current item
    pub fn handle_item_buffering(&mut self, source_id: &SourceId) {
        if self.is_current(source_id) {
            self.set_processing_state(ProcessingState::Buffering);
        }
    }

    /// An item played to its natural end
    pub fn handle_item_completed(&mut self, source_id: &SourceId) {
        if !self.is_current(source_id) {
            warn!(source = %source_id, "completion reported for non-current source");
            return;
        }
        self.advance_from_current();
    }

    /// The pipeline settled a seek
    pub fn handle_seek_completed(&mut self, token: SeekToken) {
        let Some(position) = self
            .pending_seeks
            .iter()
            .position(|pending| pending.token == token)
        else {
            // Already superseded; its token resolved at supersede time.
            warn!(player = %self.id, %token, "stale seek completion");
            return;
        };
        let pending = self.pending_seeks.remove(position);
        if pending.external {
            self.emit(PlayerEvent::SeekCompleted {
                token: token.value(),
                completed: true,
            });
        }
    }

    /// The pipeline reported an asynchronous failure for an item
    pub fn handle_item_failed(&mut self, source_id: &SourceId, message: &str) {
        warn!(source = %source_id, message, "pipeline reported item failure");
        self.emit(PlayerEvent::PlaybackError {
            message: format!("{source_id}: {message}"),
        });
    }

    // ===== Lifecycle =====

    /// Release all pipeline resources and return to idle
    pub fn dispose(&mut self) -> Result<()> {
        self.detach_all()?;
        self.supersede_pending_seeks();
        self.root = None;
        self.sequence = PlaySequence::empty();
        self.current_index = None;
        self.playing = false;
        self.set_processing_state(ProcessingState::Idle);
        Ok(())
    }

    // ===== Internals =====

    fn is_lazy(&self) -> bool {
        matches!(self.root.as_ref(), Some(AudioSource::Concatenating(concat)) if concat.lazy_loading())
    }

    fn is_current(&self, source_id: &SourceId) -> bool {
        self.current_source_id() == Some(source_id)
    }

    fn current_leaf(&self) -> Option<&dyn IndexedSource> {
        let id = self.current_source_id()?;
        self.root.as_ref()?.leaf_by_id(id)
    }

    fn issue_token(&mut self) -> SeekToken {
        self.next_seek_token += 1;
        SeekToken::new(self.next_seek_token)
    }

    /// Run `f` against the current leaf and the pipeline
    fn with_current_leaf<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut dyn IndexedSource, &mut dyn OutputPipeline) -> Result<()>,
    {
        let index = self.current_index.ok_or(PlaybackError::NoSourceLoaded)?;
        let id = self
            .sequence
            .source_id_at(index)
            .cloned()
            .ok_or(PlaybackError::NoSourceLoaded)?;
        let root = self.root.as_mut().ok_or(PlaybackError::NoSourceLoaded)?;
        let leaf = root
            .leaf_by_id_mut(&id)
            .ok_or(PlaybackError::UnknownSource(id.clone()))?;
        f(leaf, self.pipeline.as_mut())
    }

    /// Detach every leaf of the current tree
    fn detach_all(&mut self) -> Result<()> {
        let Some(root) = self.root.as_mut() else {
            return Ok(());
        };
        let mut leaf_ids = Vec::new();
        root.collect_leaf_ids(&mut leaf_ids);
        for id in &leaf_ids {
            if let Some(leaf) = root.leaf_by_id_mut(id) {
                leaf.detach(self.pipeline.as_mut())?;
            }
        }
        Ok(())
    }

    /// Attach items per the lazy-loading policy
    ///
    /// Eager trees keep every leaf attached (idempotent for leaves already
    /// bound); lazy trees bind only the current item.
    fn attach_items(&mut self) -> Result<()> {
        if self.is_lazy() {
            return self.attach_current();
        }
        let ids: Vec<SourceId> = self
            .sequence
            .entries()
            .iter()
            .map(|entry| entry.source_id.clone())
            .collect();
        let root = self.root.as_mut().ok_or(PlaybackError::NoSourceLoaded)?;
        for id in &ids {
            if let Some(leaf) = root.leaf_by_id_mut(id) {
                leaf.attach(self.pipeline.as_mut(), &self.load_control)?;
            }
        }
        Ok(())
    }

    fn attach_current(&mut self) -> Result<()> {
        if self.current_index.is_none() {
            return Ok(());
        }
        let load_control = self.load_control.clone();
        self.with_current_leaf(|leaf, pipeline| leaf.attach(pipeline, &load_control))
    }

    /// Change the current index, managing attachment across the switch
    ///
    /// Under lazy loading the item playback moves away from is detached;
    /// under eager loading every item stays attached for gapless handoff.
    fn switch_current(&mut self, next: Option<usize>) -> Result<()> {
        if next == self.current_index {
            return Ok(());
        }
        if self.is_lazy() {
            if let Some(old) = self.current_index {
                if let Some(id) = self.sequence.source_id_at(old).cloned() {
                    if let Some(root) = self.root.as_mut() {
                        if let Some(leaf) = root.leaf_by_id_mut(&id) {
                            leaf.detach(self.pipeline.as_mut())?;
                        }
                    }
                }
            }
        }
        self.current_index = next;
        if next.is_some() {
            self.attach_current()?;
        }
        self.emit_current_index();
        Ok(())
    }

    /// Advance off the current item, as at end-of-track
    fn advance_from_current(&mut self) {
        let Some(current) = self.current_index else {
            return;
        };
        let next = self
            .sequence
            .next_index(current, self.loop_mode, self.shuffle_enabled);
        match next {
            Some(next) if next == current => self.replay_current(),
            Some(next) => {
                if let Err(err) = self.switch_current(Some(next)) {
                    self.emit_playback_error(&err);
                    return;
                }
                if self.playing {
                    if let Err(err) = self.with_current_leaf(|leaf, pipeline| leaf.play(pipeline)) {
                        self.emit_playback_error(&err);
                    }
                }
            }
            None => {
                self.playing = false;
                self.set_processing_state(ProcessingState::Completed);
            }
        }
    }

    /// Restart the current item from its logical beginning
    fn replay_current(&mut self) {
        let token = self.issue_token();
        match self.with_current_leaf(|leaf, pipeline| leaf.seek(Duration::ZERO, token, pipeline)) {
            Ok(()) => self.pending_seeks.push(PendingSeek {
                token,
                external: false,
            }),
            Err(err) => self.emit_playback_error(&err),
        }
    }

    /// Reflatten after a structural mutation and reconcile the current index
    ///
    /// The current item is tracked by identity: if it survived, playback
    /// continues on it (its flat index may shift); if it was removed, the
    /// item now occupying its traversal slot plays next, honoring loop mode
    /// at the sequence end.
    fn rebuild_sequence(&mut self) -> Result<()> {
        let previous = self.current_source_id().cloned();
        let previous_position = self
            .current_index
            .and_then(|index| self.sequence.traversal_position(index, self.shuffle_enabled));

        let root = self.root.as_mut().ok_or(PlaybackError::NoSourceLoaded)?;
        self.sequence = PlaySequence::from_tree(root);
        self.emit(PlayerEvent::SequenceChanged {
            length: self.sequence.len(),
        });

        match previous {
            Some(previous) => match self.sequence.index_of(&previous) {
                Some(new_index) => {
                    if self.current_index != Some(new_index) {
                        self.current_index = Some(new_index);
                        self.emit_current_index();
                    }
                }
                None => self.advance_after_removal(previous_position),
            },
            None => {
                // Nothing was current (the playlist was empty); adopt the
                // first item of the traversal.
                if !self.sequence.is_empty() {
                    self.current_index = self.sequence.first_index(self.shuffle_enabled);
                    self.emit_current_index();
                    if self.processing_state == ProcessingState::Completed {
                        self.set_processing_state(ProcessingState::Ready);
                    }
                }
            }
        }
        self.attach_items()
    }

    /// Rebuild only the traversal order (entries unchanged)
    fn refresh_traversal(&mut self) -> Result<()> {
        let root = self.root.as_mut().ok_or(PlaybackError::NoSourceLoaded)?;
        self.sequence = PlaySequence::from_tree(root);
        Ok(())
    }

    /// Select what plays after the current item was removed from the tree
    fn advance_after_removal(&mut self, old_position: Option<usize>) {
        self.current_index = None;
        let next = old_position.and_then(|position| {
            self.sequence
                .index_at_position(position, self.shuffle_enabled)
                .or_else(|| match self.loop_mode {
                    LoopMode::All => self.sequence.first_index(self.shuffle_enabled),
                    _ => None,
                })
        });
        match next {
            Some(next) => {
                if let Err(err) = self.switch_current(Some(next)) {
                    self.emit_playback_error(&err);
                    return;
                }
                if self.playing {
                    if let Err(err) = self.with_current_leaf(|leaf, pipeline| leaf.play(pipeline)) {
                        self.emit_playback_error(&err);
                    }
                }
            }
            None => {
                self.playing = false;
                self.emit_current_index();
                self.set_processing_state(ProcessingState::Completed);
            }
        }
    }

    /// Resolve every pending seek as superseded
    fn supersede_pending_seeks(&mut self) {
        let pending: Vec<PendingSeek> = self.pending_seeks.drain(..).collect();
        for seek in pending {
            if seek.external {
                self.emit(PlayerEvent::SeekCompleted {
                    token: seek.token.value(),
                    completed: false,
                });
            }
        }
    }

    fn set_processing_state(&mut self, state: ProcessingState) {
        if self.processing_state != state {
            self.processing_state = state;
            self.emit(PlayerEvent::ProcessingStateChanged { state });
        }
    }

    fn emit(&mut self, event: PlayerEvent) {
        self.pending_events.push(event);
    }

    fn emit_current_index(&mut self) {
        let event = PlayerEvent::CurrentIndexChanged {
            index: self.current_index,
            source_id: self.current_source_id().cloned(),
        };
        self.emit(event);
    }

    fn emit_position_update(&mut self) {
        let Some(index) = self.current_index else {
            return;
        };
        let Some(leaf) = self.current_leaf() else {
            return;
        };
        let event = PlayerEvent::PositionUpdate {
            position_ms: leaf.position().as_millis() as u64,
            buffered_position_ms: leaf.buffered_position().as_millis() as u64,
            duration_ms: leaf.duration().map(|d| d.as_millis() as u64),
            current_index: index,
        };
        self.emit(event);
    }

    fn emit_playback_error(&mut self, err: &PlaybackError) {
        warn!(player = %self.id, %err, "playback error");
        self.emit(PlayerEvent::PlaybackError {
            message: err.to_string(),
        });
    }
}

/// Resolve `id` to a concatenation, distinguishing "missing" from "wrong kind"
fn require_concatenating<'a>(
    root: &'a AudioSource,
    id: &SourceId,
) -> Result<&'a ConcatenatingAudioSource> {
    let mut matches = Vec::new();
    root.find_by_id(id, &mut matches);
    let Some(node) = matches.first() else {
        return Err(PlaybackError::UnknownSource(id.clone()));
    };
    match node {
        AudioSource::Concatenating(concat) => Ok(concat),
        _ => Err(PlaybackError::NotConcatenating(id.clone())),
    }
}
