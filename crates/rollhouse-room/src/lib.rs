//! Rooms and the dice round engine for Rollhouse.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! players, scores, power-ups, and a single round timer.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates/destroys rooms, looks them up by code
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoundEngine`]: the synchronous game state machine a room drives
//! - [`RoomConfig`]: timing and defaults shared by every room
//! - [`DiceSource`]: where rolls come from (random or scripted)

mod config;
pub mod dice;
mod engine;
mod error;
pub mod leaderboard;
pub mod powerup;
mod registry;
mod room;
pub mod scoring;

pub use config::{RoomConfig, RoomState};
pub use dice::{DicePair, DiceSource, RandomDice, ScriptedDice};
pub use engine::{Continuation, Outbound, RoundEngine, RoundPhase, Step, TimerDirective};
pub use error::RoomError;
pub use leaderboard::Leaderboard;
pub use powerup::PowerupSlots;
pub use registry::RoomRegistry;
pub use room::{EventSender, RoomHandle, RoomInfo};
