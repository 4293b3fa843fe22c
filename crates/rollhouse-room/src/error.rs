//! Error types for the room layer.
//!
//! The `Display` text of each variant is exactly what the client sees in
//! its `error` event, so keep it short and addressed to a player.

use rollhouse_protocol::{PowerupKind, RoomCode};

/// Errors that can occur during room operations. All of them are
/// recoverable and go back only to the connection that caused them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// `host_create` with a code that already exists.
    #[error("Room code already in use.")]
    CodeInUse(RoomCode),

    /// `join` with a code nobody created.
    #[error("Room not found.")]
    RoomNotFound(RoomCode),

    /// The name was empty after trimming.
    #[error("Name cannot be empty.")]
    EmptyName,

    /// Another player in the room already has this name.
    #[error("Name '{0}' is already taken.")]
    NameTaken(String),

    /// `start_game` from a connection that didn't create the room.
    #[error("Only host can start the game.")]
    NotHost,

    /// `start_game` while a game is running.
    #[error("Game already started.")]
    AlreadyStarted,

    /// `use_powerup` with an identifier that isn't one of the three kinds.
    #[error("Unknown power-up '{0}'.")]
    InvalidPowerup(String),

    /// The player already spent this power-up earlier in the game.
    #[error("You already used {0} this game.")]
    PowerupAlreadyUsed(PowerupKind),

    /// The power-up is active and hasn't resolved yet.
    #[error("{0} is already active.")]
    PowerupAlreadyActive(PowerupKind),

    /// The player's score can't cover the worst case of every power-up
    /// that would be active.
    #[error("Not enough points for {kind}: need {required}, have {score}.")]
    InsufficientCover {
        kind: PowerupKind,
        required: u64,
        score: u64,
    },

    /// The room's actor has stopped.
    #[error("Room {0} is unavailable.")]
    Unavailable(RoomCode),
}
