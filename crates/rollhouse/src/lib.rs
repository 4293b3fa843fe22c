//! # Rollhouse
//!
//! Real-time server for a dice-gambling party game.
//!
//! Hosts create rooms by code, players join by name, and each room runs its
//! own timer-driven round loop: dice land every few seconds, the shared pot
//! grows or busts, and players bank their share or gamble with power-ups.
//! The server is the only authority on game state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rollhouse::prelude::*;
//!
//! # async fn demo() -> Result<(), RollhouseError> {
//! let server = RollhouseServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::RollhouseError;
pub use handler::MALFORMED_REQUEST;
pub use server::{RollhouseServer, RollhouseServerBuilder};

/// Convenient re-exports for running a server and talking to it.
pub mod prelude {
    pub use crate::{RollhouseError, RollhouseServer, RollhouseServerBuilder};
    pub use rollhouse_protocol::{
        ClientIntent, Codec, JsonCodec, Placement, PowerupKind, RankedPlayer, RoomCode,
        Scoreboard, ServerEvent,
    };
    pub use rollhouse_room::{RoomConfig, RoomError};
}
