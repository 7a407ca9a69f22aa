//! `ImpostorServer` builder and accept loop.
//!
//! This is the entry point for running the game server. It ties the
//! layers together: transport → protocol → room directory.

use std::sync::Arc;
use std::time::{Duration, Instant};

use impostor_protocol::{Codec, JsonCodec};
use impostor_room::{RoomConfig, RoomDirectory, WordList, WordSource};
use impostor_transport::{Transport, WebSocketTransport};

use crate::ImpostorError;
use crate::handler::handle_connection;

/// Per-connection limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// A connection that sends nothing (not even a heartbeat) for this
    /// long is dropped and treated as having left.
    pub idle_timeout: Duration,

    /// Larger inbound frames are rejected with a 400 error.
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(60),
            max_message_bytes: 16 * 1024,
        }
    }
}

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) directory: RoomDirectory,
    pub(crate) codec: C,
    pub(crate) config: ServerConfig,
    started: Instant,
}

impl<C: Codec> ServerState<C> {
    /// Milliseconds since the server started; used for envelope
    /// timestamps and heartbeat replies.
    pub(crate) fn uptime_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Builder for configuring and starting an impostor server.
///
/// # Example
///
/// ```rust,no_run
/// use impostor::prelude::*;
///
/// # async fn start() -> Result<(), ImpostorError> {
/// let server = ImpostorServer::builder()
///     .bind("0.0.0.0:3000")
///     .words(WordList::fallback())
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct ImpostorServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
    server_config: ServerConfig,
    words: Option<Arc<dyn WordSource>>,
}

impl ImpostorServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            room_config: RoomConfig::default(),
            server_config: ServerConfig::default(),
            words: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the settings shared by every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets where secret words come from. Defaults to
    /// [`WordList::fallback`].
    pub fn words(mut self, words: impl WordSource) -> Self {
        self.words = Some(Arc::new(words));
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.server_config.idle_timeout = timeout;
        self
    }

    pub fn max_message_bytes(mut self, max: usize) -> Self {
        self.server_config.max_message_bytes = max;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build(self) -> Result<ImpostorServer<JsonCodec>, ImpostorError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let words = self
            .words
            .unwrap_or_else(|| Arc::new(WordList::fallback()));

        let state = Arc::new(ServerState {
            directory: RoomDirectory::new(self.room_config, words),
            codec: JsonCodec,
            config: self.server_config,
            started: Instant::now(),
        });

        Ok(ImpostorServer { transport, state })
    }
}

impl Default for ImpostorServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound impostor server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct ImpostorServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
}

impl ImpostorServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> ImpostorServerBuilder {
        ImpostorServerBuilder::new()
    }
}

impl<C: Codec> ImpostorServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The room directory every connection talks to.
    pub fn directory(&self) -> &RoomDirectory {
        &self.state.directory
    }

    /// Runs the accept loop.
    ///
    /// Spawns a handler task for each accepted connection. Runs until
    /// the task is dropped or the process is terminated; a failed accept
    /// is logged and skipped.
    pub async fn run(mut self) -> Result<(), ImpostorError> {
        tracing::info!(
            addr = ?self.transport.local_addr().ok(),
            min_players = self.state.directory.config().min_players,
            "impostor server running"
        );

        loop {
            match self.transport.accept().await {
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
            }
        }
    }
}
