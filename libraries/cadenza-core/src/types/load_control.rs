/// Buffering preferences handed to the output pipeline
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Buffering preferences for the output pipeline
///
/// Forwarded verbatim when a leaf source is attached; the pipeline is free
/// to ignore hints it does not support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadControl {
    /// Let the pipeline delay playback start to minimize stalling
    pub automatically_waits_to_minimize_stalling: bool,

    /// Preferred amount of audio to buffer ahead of the playhead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_forward_buffer_duration: Option<Duration>,

    /// Allow network use for live-stream buffering while paused
    pub can_use_network_resources_for_live_streaming_while_paused: bool,

    /// Preferred peak bit rate in bits per second (0 = no preference)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_peak_bit_rate: Option<f64>,
}

impl Default for LoadControl {
    fn default() -> Self {
        Self {
            automatically_waits_to_minimize_stalling: true,
            preferred_forward_buffer_duration: None,
            can_use_network_resources_for_live_streaming_while_paused: false,
            preferred_peak_bit_rate: None,
        }
    }
}
