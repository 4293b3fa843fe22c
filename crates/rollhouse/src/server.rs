//! `RollhouseServer` builder and server loop.
//!
//! This is the entry point for running a Rollhouse server. It ties the
//! layers together: transport → protocol → room registry.

use std::future::Future;
use std::sync::Arc;

use rollhouse_protocol::{Codec, JsonCodec};
use rollhouse_room::{RoomConfig, RoomRegistry};
use rollhouse_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::RollhouseError;
use crate::handler::handle_connection;

/// Shared server state passed to each connection handler task.
///
/// The registry lock is held only to create or look up a room; all game
/// traffic goes straight to the room actors through their handles.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a Rollhouse server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), rollhouse::RollhouseError> {
/// use rollhouse::prelude::*;
///
/// let server = RollhouseServer::builder()
///     .bind("0.0.0.0:8080")
///     .room_config(RoomConfig::default())
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RollhouseServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl RollhouseServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the timing and defaults every room is created with.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Binds the listener. Uses `JsonCodec` over `WebSocketTransport`.
    pub async fn build(self) -> Result<RollhouseServer<JsonCodec>, RollhouseError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            rooms: Mutex::new(RoomRegistry::new(self.room_config)),
            codec: JsonCodec,
        });

        Ok(RollhouseServer { transport, state })
    }
}

impl Default for RollhouseServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Rollhouse server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RollhouseServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl RollhouseServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> RollhouseServerBuilder {
        RollhouseServerBuilder::new()
    }
}

impl<C: Codec> RollhouseServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), RollhouseError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops every
    /// room and closes the listener.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), RollhouseError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "rollhouse server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => break,
            }
        }

        tracing::info!("shutting down");
        self.state.rooms.lock().await.shutdown_all().await;
        self.transport.shutdown().await?;
        Ok(())
    }
}
