// Plugin-wide settings

use crate::engine::input::move_and_look::{DEFAULT_PAD_LOOK_PITCH_RATE, DEFAULT_PAD_LOOK_YAW_RATE};

/// Tunables shared by playable pawns and the demo binary
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSettings {
    /// Stick look yaw rate, degrees per second
    pub pad_look_yaw_rate: f32,

    /// Stick look pitch rate, degrees per second
    pub pad_look_pitch_rate: f32,

    /// Priority a pawn's default mapping context is applied at
    pub default_mapping_priority: i32,

    /// `env_logger` filter used when `RUST_LOG` is not set
    pub log_filter: String,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            pad_look_yaw_rate: DEFAULT_PAD_LOOK_YAW_RATE,
            pad_look_pitch_rate: DEFAULT_PAD_LOOK_PITCH_RATE,
            default_mapping_priority: 0,
            log_filter: "info".to_string(),
        }
    }
}
