//! Player registry
//!
//! Explicit mapping from player id to player instance with a
//! create/dispose lifecycle, replacing any notion of bridge-scoped
//! singleton state.

use crate::error::{PlaybackError, Result};
use crate::pipeline::OutputPipeline;
use crate::player::AudioPlayer;
use cadenza_core::{LoadControl, PlayerId};
use std::collections::HashMap;
use tracing::debug;

/// All live players, keyed by id
#[derive(Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, AudioPlayer>,
}

impl PlayerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a player bound to `pipeline` under `id`
    ///
    /// Fails when a player with the same id already exists; ids must be
    /// disposed before they can be reused.
    pub fn create(
        &mut self,
        id: PlayerId,
        pipeline: Box<dyn OutputPipeline>,
        load_control: LoadControl,
    ) -> Result<&mut AudioPlayer> {
        if self.players.contains_key(&id) {
            return Err(PlaybackError::PlayerExists(id));
        }
        debug!(player = %id, "creating player");
        let player = AudioPlayer::new(id.clone(), pipeline, load_control);
        Ok(self.players.entry(id).or_insert(player))
    }

    /// Look up a player
    pub fn get(&self, id: &PlayerId) -> Result<&AudioPlayer> {
        self.players
            .get(id)
            .ok_or_else(|| PlaybackError::UnknownPlayer(id.clone()))
    }

    /// Look up a player, mutably
    pub fn get_mut(&mut self, id: &PlayerId) -> Result<&mut AudioPlayer> {
        self.players
            .get_mut(id)
            .ok_or_else(|| PlaybackError::UnknownPlayer(id.clone()))
    }

    /// Tear down a player and release its id
    pub fn dispose(&mut self, id: &PlayerId) -> Result<()> {
        let mut player = self
            .players
            .remove(id)
            .ok_or_else(|| PlaybackError::UnknownPlayer(id.clone()))?;
        debug!(player = %id, "disposing player");
        player.dispose()
    }

    /// Number of live players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether no players are live
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Ids of all live players
    pub fn player_ids(&self) -> Vec<&PlayerId> {
        self.players.keys().collect()
    }
}
