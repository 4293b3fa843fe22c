//! Room actor: an isolated Tokio task that owns one room.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. The actor owns the [`RoundEngine`], the room's
//! single [`RoundTimer`], and the outbound channel of every subscribed
//! connection. All mutations of a room are serialized through this task.

use std::collections::{BTreeMap, HashMap};

use rollhouse_protocol::{Recipient, RoomCode, ServerEvent};
use rollhouse_timer::RoundTimer;
use rollhouse_transport::ConnectionId;
use tokio::sync::{mpsc, oneshot};

use crate::dice::DiceSource;
use crate::engine::{Continuation, RoundEngine, Step, TimerDirective};
use crate::{RoomConfig, RoomError, RoomState};

/// Channel sender for delivering events to one connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and waits for the response on it.
pub(crate) enum RoomCommand {
    /// Add (or rename) a player.
    Join {
        conn: ConnectionId,
        name: String,
        sender: EventSender,
        reply: oneshot::Sender<Result<String, RoomError>>,
    },

    /// Drop a connection: its player entry and its subscription.
    Leave {
        conn: ConnectionId,
        reply: oneshot::Sender<()>,
    },

    StartGame {
        conn: ConnectionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Fire-and-forget: banking never fails visibly.
    Bank { conn: ConnectionId },

    UsePowerup {
        conn: ConnectionId,
        name: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    GetInfo { reply: oneshot::Sender<RoomInfo> },

    Shutdown,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub state: RoomState,
    pub player_count: usize,
    pub current_round: u32,
    pub max_rounds: u32,
    /// Current pot.
    pub round_total: u64,
    /// `true` while a roll or round advance is scheduled.
    pub timer_pending: bool,
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    /// Joins `conn` as player `name`, subscribing `sender` to the room's
    /// events. Returns the stored (trimmed) name.
    ///
    /// A connection that is already a player is renamed.
    pub async fn join(
        &self,
        conn: ConnectionId,
        name: impl Into<String>,
        sender: EventSender,
    ) -> Result<String, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join { conn, name: name.into(), sender, reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes `conn` from the room. Safe to call for connections that
    /// never joined.
    pub async fn leave(&self, conn: ConnectionId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Leave { conn, reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    pub async fn start_game(&self, conn: ConnectionId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::StartGame { conn, reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn bank(&self, conn: ConnectionId) -> Result<(), RoomError> {
        self.send(RoomCommand::Bank { conn }).await
    }

    pub async fn use_powerup(
        &self,
        conn: ConnectionId,
        name: impl Into<String>,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::UsePowerup { conn, name: name.into(), reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Stops the actor. Its pending timer is dropped with it.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    code: RoomCode,
    host: ConnectionId,
    engine: RoundEngine,
    timer: RoundTimer<Continuation>,
    dice: Box<dyn DiceSource>,
    /// Everyone who receives broadcasts: the host and every player.
    subscribers: BTreeMap<ConnectionId, EventSender>,
    /// Connections that joined as players.
    players: HashMap<ConnectionId, String>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        tracing::info!(room = %self.code, host = %self.host, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                fired = self.timer.wait() => {
                    tracing::trace!(
                        room = %self.code,
                        continuation = ?fired.kind,
                        late_by = ?fired.late_by,
                        "timer fired"
                    );
                    let step = self.engine.on_timer(fired.kind, self.dice.as_mut());
                    self.apply(step);
                }
            }
        }

        self.timer.cancel();
        tracing::info!(room = %self.code, "room actor stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join { conn, name, sender, reply } => {
                let result = self.handle_join(conn, &name, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { conn, reply } => {
                self.handle_leave(conn);
                let _ = reply.send(());
            }
            RoomCommand::StartGame { conn, reply } => {
                let result = self.handle_start(conn);
                let _ = reply.send(result);
            }
            RoomCommand::Bank { conn } => {
                if let Some(name) = self.players.get(&conn).cloned() {
                    let step = self.engine.bank(&name);
                    if !step.is_empty() {
                        tracing::debug!(room = %self.code, player = %name, "banked");
                    }
                    self.apply(step);
                }
            }
            RoomCommand::UsePowerup { conn, name, reply } => {
                let result = self.handle_powerup(conn, &name);
                let _ = reply.send(result);
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room = %self.code, "room shutting down");
                return false;
            }
        }
        true
    }

    fn handle_join(
        &mut self,
        conn: ConnectionId,
        name: &str,
        sender: EventSender,
    ) -> Result<String, RoomError> {
        // Re-joining under the current name only refreshes the channel.
        if let Some(current) = self.players.get(&conn).filter(|n| n.as_str() == name.trim()) {
            let current = current.clone();
            self.subscribers.insert(conn, sender);
            return Ok(current);
        }

        let (name, step) = self.engine.join(name)?;
        self.subscribers.insert(conn, sender);
        let previous = self.players.insert(conn, name.clone());

        tracing::info!(
            room = %self.code,
            player = %name,
            conn_id = %conn,
            players = self.engine.player_count(),
            "player joined"
        );
        self.apply(step);

        if let Some(previous) = previous {
            tracing::debug!(room = %self.code, from = %previous, to = %name, "player renamed");
            let step = self.engine.leave(&previous);
            self.apply(step);
        }
        Ok(name)
    }

    fn handle_leave(&mut self, conn: ConnectionId) {
        if let Some(name) = self.players.remove(&conn) {
            tracing::info!(
                room = %self.code,
                player = %name,
                conn_id = %conn,
                players = self.engine.player_count().saturating_sub(1),
                "player left"
            );
            let step = self.engine.leave(&name);
            self.apply(step);
        }
        self.subscribers.remove(&conn);
    }

    fn handle_start(&mut self, conn: ConnectionId) -> Result<(), RoomError> {
        if conn != self.host {
            return Err(RoomError::NotHost);
        }
        let step = self.engine.start_game()?;
        tracing::info!(
            room = %self.code,
            players = self.engine.player_count(),
            max_rounds = self.engine.max_rounds(),
            "game started"
        );
        self.apply(step);
        Ok(())
    }

    fn handle_powerup(&mut self, conn: ConnectionId, powerup: &str) -> Result<(), RoomError> {
        let Some(name) = self.players.get(&conn).cloned() else {
            return Ok(());
        };
        let step = self.engine.use_powerup(&name, powerup)?;
        tracing::debug!(room = %self.code, player = %name, powerup, "power-up activated");
        self.apply(step);
        Ok(())
    }

    /// Delivers a step's events, then carries out its timer directive.
    fn apply(&mut self, step: Step) {
        for (recipient, event) in step.events {
            self.log_event(&event);
            self.dispatch(recipient, event);
        }

        match step.timer {
            TimerDirective::Keep => {}
            TimerDirective::Cancel => {
                if let Some(cancelled) = self.timer.pending() {
                    tracing::debug!(room = %self.code, continuation = ?cancelled, "round timer cancelled");
                }
                self.timer.cancel();
            }
            TimerDirective::Schedule(continuation, delay) => {
                let fire = self.timer.schedule(continuation, delay);
                if continuation == Continuation::Roll {
                    self.dispatch(
                        Recipient::All,
                        ServerEvent::RollScheduled { roll_time: fire.epoch_ms },
                    );
                }
            }
        }
    }

    fn log_event(&self, event: &ServerEvent) {
        match event {
            ServerEvent::RoundUpdate { round, max_rounds } => {
                tracing::info!(room = %self.code, round, max_rounds, "round started");
            }
            ServerEvent::Roll { d1, d2, pot, .. } => {
                tracing::debug!(room = %self.code, d1, d2, pot, "dice rolled");
            }
            ServerEvent::GameOver { your_placement: None, .. } => {
                tracing::info!(room = %self.code, "game over");
            }
            _ => {}
        }
    }

    /// Sends `event` to whoever `recipient` resolves to.
    fn dispatch(&self, recipient: Recipient, event: ServerEvent) {
        match recipient {
            Recipient::All => {
                for conn in self.subscribers.keys() {
                    self.send_to(*conn, event.clone());
                }
            }
            Recipient::Player(name) => {
                if let Some(conn) = self.conn_of(&name) {
                    self.send_to(conn, event);
                }
            }
            Recipient::Observers => {
                for conn in self.subscribers.keys() {
                    if !self.players.contains_key(conn) {
                        self.send_to(*conn, event.clone());
                    }
                }
            }
        }
    }

    fn conn_of(&self, name: &str) -> Option<ConnectionId> {
        self.players.iter().find(|(_, n)| n.as_str() == name).map(|(c, _)| *c)
    }

    /// Delivery to a closed connection is a no-op.
    fn send_to(&self, conn: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.subscribers.get(&conn) {
            if sender.send(event).is_err() {
                tracing::debug!(room = %self.code, conn_id = %conn, "receiver gone, event dropped");
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            code: self.code.clone(),
            state: self.engine.state(),
            player_count: self.engine.player_count(),
            current_round: self.engine.current_round(),
            max_rounds: self.engine.max_rounds(),
            round_total: self.engine.round_total(),
            timer_pending: self.timer.is_pending(),
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// The host's `host_sender` is subscribed immediately so a host screen
/// that never joins as a player still sees every broadcast.
pub(crate) fn spawn_room(
    code: RoomCode,
    host: ConnectionId,
    host_sender: EventSender,
    max_rounds: u32,
    config: &RoomConfig,
    dice: Box<dyn DiceSource>,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));

    let mut subscribers = BTreeMap::new();
    subscribers.insert(host, host_sender);

    let actor = RoomActor {
        code: code.clone(),
        host,
        engine: RoundEngine::new(max_rounds, config),
        timer: RoundTimer::new(),
        dice,
        subscribers,
        players: HashMap::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
