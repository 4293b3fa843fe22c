//! Wire protocol for Rollhouse.
//!
//! - **Types** ([`ClientIntent`], [`ServerEvent`], [`RoomCode`],
//!   [`PowerupKind`], [`Scoreboard`]): what clients and server exchange.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those values become
//!   bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong in between.
//!
//! The protocol layer knows nothing about connections or rooms:
//!
//! ```text
//! Transport (bytes) → Protocol (ClientIntent / ServerEvent) → Room
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientIntent, Placement, PowerupKind, RankedPlayer, Recipient, RoomCode, RoundsHint,
    Scoreboard, ServerEvent,
};
