//! Room registry: creates, tracks, and tears down rooms by code.

use std::collections::HashMap;

use rollhouse_protocol::RoomCode;
use rollhouse_transport::ConnectionId;

use crate::dice::{DiceSource, RandomDice};
use crate::room::{EventSender, spawn_room};
use crate::{RoomConfig, RoomError, RoomHandle};

/// Every live room in the process, keyed by code.
///
/// This is the entry point for room operations from the server layer. It
/// only creates and hands out handles; all game state lives in the room
/// actors. Callers keep it behind a lock held just for create and lookup.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, RoomHandle>,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry whose rooms use `config`.
    pub fn new(config: RoomConfig) -> Self {
        Self { rooms: HashMap::new(), config }
    }

    /// Creates a room rolling real dice. `host` becomes the only
    /// connection allowed to start games, and `host_sender` is subscribed
    /// to the room's broadcasts.
    ///
    /// # Errors
    /// `CodeInUse` if a live room already has this code.
    pub fn create_room(
        &mut self,
        code: RoomCode,
        max_rounds: Option<u32>,
        host: ConnectionId,
        host_sender: EventSender,
    ) -> Result<RoomHandle, RoomError> {
        self.create_room_with_dice(code, max_rounds, host, host_sender, Box::new(RandomDice))
    }

    /// Like [`create_room`](Self::create_room) with a chosen dice source.
    pub fn create_room_with_dice(
        &mut self,
        code: RoomCode,
        max_rounds: Option<u32>,
        host: ConnectionId,
        host_sender: EventSender,
        dice: Box<dyn DiceSource>,
    ) -> Result<RoomHandle, RoomError> {
        if self.rooms.get(&code).is_some_and(|h| !h.is_closed()) {
            return Err(RoomError::CodeInUse(code));
        }

        let max_rounds = self.config.max_rounds(max_rounds);
        let handle = spawn_room(code.clone(), host, host_sender, max_rounds, &self.config, dice);
        self.rooms.insert(code.clone(), handle.clone());
        tracing::info!(room = %code, conn_id = %host, max_rounds, "room created");
        Ok(handle)
    }

    /// Returns the handle for `code`.
    pub fn lookup(&self, code: &RoomCode) -> Option<RoomHandle> {
        self.rooms.get(code).filter(|h| !h.is_closed()).cloned()
    }

    /// Shuts down a room and forgets it.
    ///
    /// # Errors
    /// `RoomNotFound` for an unknown code.
    pub async fn destroy_room(&mut self, code: &RoomCode) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(code)
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;

        let _ = handle.shutdown().await;
        tracing::info!(room = %code, "room destroyed");
        Ok(())
    }

    /// Shuts down every room.
    pub async fn shutdown_all(&mut self) {
        for (code, handle) in self.rooms.drain() {
            let _ = handle.shutdown().await;
            tracing::debug!(room = %code, "room shut down");
        }
    }

    /// Returns the number of registered rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Lists all registered room codes.
    pub fn room_codes(&self) -> Vec<RoomCode> {
        self.rooms.keys().cloned().collect()
    }
}
