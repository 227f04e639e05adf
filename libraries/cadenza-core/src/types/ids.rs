/// ID types for Cadenza entities
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Audio source identifier
///
/// Unique within a single source tree; immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Create a new source ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random source ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player identifier
///
/// Keys a player instance in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create a new player ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new random player ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_generation_creates_unique_ids() {
        let id1 = SourceId::generate();
        let id2 = SourceId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn source_id_from_string() {
        let id = SourceId::new("source-123");
        assert_eq!(id.as_str(), "source-123");
    }

    #[test]
    fn player_id_display() {
        let id = PlayerId::new("player-456");
        assert_eq!(format!("{}", id), "player-456");
    }
}
