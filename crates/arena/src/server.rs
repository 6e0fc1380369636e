//! `RelayServer` builder and accept loop.
//!
//! Ties the layers together: transport → protocol → dispatcher → rooms.

use std::net::SocketAddr;
use std::sync::Arc;

use arena_protocol::{Codec, JsonCodec};
use arena_room::RoomRegistry;
use arena_transport::{Transport, WebSocketTransport};

use crate::handler::handle_connection;
use crate::{Dispatcher, RelayConfig, RelayError};

/// Shared server state passed to each connection handler task.
pub(crate) struct RelayState<C: Codec> {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a relay.
///
/// # Example
///
/// ```rust,no_run
/// use arena::prelude::*;
///
/// # async fn run() -> Result<(), RelayError> {
/// let server = RelayServer::builder()
///     .bind("127.0.0.1:8080")
///     .path("/ws")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RelayServerBuilder {
    config: RelayConfig,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the WebSocket endpoint path.
    pub fn path(mut self, path: &str) -> Self {
        self.config.ws_path = path.to_string();
        self
    }

    /// Binds the listener.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    ///
    /// # Errors
    /// Returns [`RelayError::Transport`] if the address cannot be bound.
    pub async fn build(self) -> Result<RelayServer<JsonCodec>, RelayError> {
        let config = self.config;
        let transport = WebSocketTransport::bind_with(
            &config.bind_addr,
            Some(config.ws_path.clone()),
            config.handshake_timeout,
        )
        .await?;

        let state = Arc::new(RelayState {
            dispatcher: Dispatcher::from_config(&config),
            codec: JsonCodec,
        });

        Ok(RelayServer { transport, state })
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound relay.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer<C: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<RelayState<C>>,
}

impl RelayServer {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }
}

impl<C: Codec> RelayServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// The room registry shared by every connection.
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        self.state.dispatcher.registry()
    }

    /// Runs the accept loop.
    ///
    /// Spawns a handler task for each connected client. Returns only if
    /// the listener stops.
    pub async fn run(mut self) -> Result<(), RelayError> {
        tracing::info!(addr = %self.local_addr(), "arena relay running");

        loop {
            let conn = match self.transport.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!(error = %e, "listener stopped");
                    return Err(e.into());
                }
            };
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(conn, state).await {
                    tracing::debug!(error = %e, "connection ended with error");
                }
            });
        }
    }
}
