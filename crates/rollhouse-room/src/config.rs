//! Room configuration and lifecycle state.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room a registry creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Rounds per game when the host doesn't ask for a specific number.
    pub default_max_rounds: u32,

    /// Delay between a roll being scheduled and the dice landing.
    pub roll_delay: Duration,

    /// Pause after a bust before the next round starts.
    pub bust_grace: Duration,

    /// Capacity of each room actor's command channel.
    pub channel_size: usize,
}

impl RoomConfig {
    /// Resolves the host's requested round count against the default.
    /// Zero is not a valid game length.
    pub fn max_rounds(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(n) if n >= 1 => n,
            _ => self.default_max_rounds.max(1),
        }
    }
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            default_max_rounds: 10,
            roll_delay: Duration::from_secs(5),
            bust_grace: Duration::from_secs(5),
            channel_size: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Waiting ──start_game──→ Playing ──last round ends (game_over)──→ Waiting
/// ```
///
/// A room is joinable in either state. Game over is not a state of its
/// own: the final summary goes out and the room is back to `Waiting`, so
/// the host can start another game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    Waiting,
    Playing,
}

impl RoomState {
    /// Returns `true` while rounds are running.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing)
    }
}

impl std::fmt::Display for RoomState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Playing => write!(f, "Playing"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.default_max_rounds, 10);
        assert_eq!(config.roll_delay, Duration::from_secs(5));
        assert_eq!(config.bust_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_max_rounds_prefers_request() {
        let config = RoomConfig::default();
        assert_eq!(config.max_rounds(Some(2)), 2);
        assert_eq!(config.max_rounds(None), 10);
        assert_eq!(config.max_rounds(Some(0)), 10);
    }

    #[test]
    fn test_max_rounds_never_zero() {
        let config = RoomConfig { default_max_rounds: 0, ..RoomConfig::default() };
        assert_eq!(config.max_rounds(None), 1);
    }

    #[test]
    fn test_room_state_is_playing() {
        assert!(!RoomState::Waiting.is_playing());
        assert!(RoomState::Playing.is_playing());
    }

    #[test]
    fn test_room_state_display() {
        assert_eq!(RoomState::Waiting.to_string(), "Waiting");
        assert_eq!(RoomState::Playing.to_string(), "Playing");
    }
}
