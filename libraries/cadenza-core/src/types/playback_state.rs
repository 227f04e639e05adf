/// Playback state types shared between the engine and the host bridge
use serde::{Deserialize, Serialize};

/// Processing state of a player
///
/// Progresses `Idle -> Loading -> Buffering -> Ready`, and reaches
/// `Completed` when the whole play sequence has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    /// No source loaded
    #[default]
    Idle,
    /// A source tree is being loaded
    Loading,
    /// The current item is buffering
    Buffering,
    /// The current item is ready for playback
    Ready,
    /// The whole sequence has played to the end
    Completed,
}

impl ProcessingState {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Buffering => "buffering",
            Self::Ready => "ready",
            Self::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Loop mode for sequence advancement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Stop when the sequence ends
    #[default]
    Off,
    /// Repeat the current item
    One,
    /// Wrap around to the start of the sequence
    All,
}

impl LoopMode {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::One => "one",
            Self::All => "all",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(Self::Off),
            "one" => Some(Self::One),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoopMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_mode_round_trips_through_strings() {
        for mode in [LoopMode::Off, LoopMode::One, LoopMode::All] {
            assert_eq!(LoopMode::from_str(mode.as_str()), Some(mode));
        }
        assert_eq!(LoopMode::from_str("bogus"), None);
    }

    #[test]
    fn processing_state_serializes_lowercase() {
        let json = serde_json::to_string(&ProcessingState::Buffering).unwrap();
        assert_eq!(json, "\"buffering\"");
    }
}
