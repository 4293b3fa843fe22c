//! Per-connection handler: decode intents, route them, stream events back.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The task owns an unbounded event channel; every room the connection
//! creates or joins delivers to it. The loop `select!`s between inbound
//! frames and outbound events, so rooms never wait on a socket.

use std::sync::Arc;

use rollhouse_protocol::{ClientIntent, Codec, RoomCode, RoundsHint, ServerEvent};
use rollhouse_room::{EventSender, RoomError, RoomHandle};
use rollhouse_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::mpsc;

use crate::RollhouseError;
use crate::server::ServerState;

/// Reply for frames that don't decode to a known intent shape.
pub const MALFORMED_REQUEST: &str = "Malformed request.";

/// The room a connection currently belongs to.
///
/// Dropping it leaves the room, so cleanup happens however the handler
/// exits. Since `Drop` is synchronous, the leave runs on a spawned task.
struct Membership {
    conn_id: ConnectionId,
    room: Option<RoomHandle>,
}

impl Membership {
    fn is_in(&self, code: &RoomCode) -> bool {
        self.room.as_ref().is_some_and(|h| h.code() == code)
    }

    /// Leaves the current room, if any.
    async fn leave(&mut self) {
        if let Some(room) = self.room.take() {
            if let Err(e) = room.leave(self.conn_id).await {
                tracing::debug!(conn_id = %self.conn_id, error = %e, "leave failed");
            }
        }
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        if let Some(room) = self.room.take() {
            let conn_id = self.conn_id;
            tokio::spawn(async move {
                let _ = room.leave(conn_id).await;
            });
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), RollhouseError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut membership = Membership { conn_id, room: None };

    loop {
        tokio::select! {
            inbound = conn.recv() => {
                let data = match inbound {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::info!(%conn_id, "connection closed");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                };
                handle_frame(&conn, &state, &events_tx, &mut membership, &data).await?;
            }
            Some(event) = events_rx.recv() => {
                send_event(&conn, &state.codec, &event).await?;
            }
        }
    }

    // membership drops here → leave fires.
    Ok(())
}

/// Decodes one inbound frame and acts on it.
async fn handle_frame<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    events_tx: &EventSender,
    membership: &mut Membership,
    data: &[u8],
) -> Result<(), RollhouseError> {
    let conn_id = conn.id();
    let intent: ClientIntent = match state.codec.decode(data) {
        Ok(intent) => intent,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode intent");
            return send_error(conn, &state.codec, MALFORMED_REQUEST).await;
        }
    };

    let result = match intent {
        ClientIntent::HostCreate { room, max_rounds } => {
            host_create(conn, state, events_tx, membership, room, max_rounds).await
        }
        ClientIntent::Join { room, name } => {
            join(state, events_tx, membership, room, &name).await
        }
        ClientIntent::StartGame => match &membership.room {
            Some(room) => room.start_game(conn_id).await,
            None => Ok(()),
        },
        ClientIntent::Bank => match &membership.room {
            Some(room) => room.bank(conn_id).await,
            None => Ok(()),
        },
        ClientIntent::UsePowerup { name } => match &membership.room {
            Some(room) => room.use_powerup(conn_id, name).await,
            None => Ok(()),
        },
        ClientIntent::Unknown => {
            tracing::debug!(%conn_id, "ignoring unknown intent");
            Ok(())
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            if let RoomError::Unavailable(code) = &e {
                if membership.is_in(code) {
                    membership.room = None;
                }
            }
            tracing::debug!(%conn_id, error = %e, "intent rejected");
            send_error(conn, &state.codec, &e.to_string()).await
        }
    }
}

async fn host_create<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    events_tx: &EventSender,
    membership: &mut Membership,
    code: RoomCode,
    max_rounds: Option<RoundsHint>,
) -> Result<(), RoomError> {
    let max_rounds = max_rounds.as_ref().and_then(RoundsHint::to_rounds);
    let handle = state
        .rooms
        .lock()
        .await
        .create_room(code.clone(), max_rounds, conn.id(), events_tx.clone())?;

    // Only a successful create moves the connection out of its old room.
    membership.leave().await;
    membership.room = Some(handle);

    // The new room has not broadcast anything yet, so this is its first event.
    let _ = events_tx.send(ServerEvent::RoomCreated { room: code });
    Ok(())
}

async fn join<C: Codec>(
    state: &ServerState<C>,
    events_tx: &EventSender,
    membership: &mut Membership,
    code: RoomCode,
    name: &str,
) -> Result<(), RoomError> {
    let handle = state
        .rooms
        .lock()
        .await
        .lookup(&code)
        .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;

    let name = handle.join(membership.conn_id, name, events_tx.clone()).await?;
    tracing::debug!(room = %code, player = %name, "joined via handler");

    if !membership.is_in(&code) {
        membership.leave().await;
        membership.room = Some(handle);
    }
    Ok(())
}

async fn send_event(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    event: &ServerEvent,
) -> Result<(), RollhouseError> {
    let bytes = codec.encode(event)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends an `error` event straight to this connection.
async fn send_error(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    message: &str,
) -> Result<(), RollhouseError> {
    send_event(conn, codec, &ServerEvent::Error { message: message.to_owned() }).await
}
