//! Per-connection handler: receive loop, writer task, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Open a session whose outbound channel feeds a writer task
//!   2. Loop: receive frame → decode envelope → dispatch
//!   3. On close, release the session's room membership
//!
//! Messages are dispatched inline, one at a time, so requests from one
//! client are applied in the order they arrived.

use std::sync::Arc;

use arena_protocol::{ClientMessage, Codec, Envelope, ProtocolError, ServerMessage};
use arena_session::Session;
use arena_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;

use crate::server::RelayState;
use crate::{Dispatcher, RelayError};

/// Drop guard that runs disconnect cleanup when the handler exits.
///
/// Cleanup also runs if the receive loop panics. The dispatcher is
/// synchronous, so no task needs to be spawned from `drop`.
struct SessionGuard<'a> {
    session: Arc<Session>,
    dispatcher: &'a Dispatcher,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.dispatcher.disconnect(&self.session);
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<RelayState<C>>,
) -> Result<(), RelayError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let peer = conn.peer_addr();

    let (tx, rx) = mpsc::unbounded_channel();
    let session = state.dispatcher.open_session(tx);
    let session_id = session.id();
    tracing::info!(%conn_id, %peer, %session_id, "client connected");

    let writer = tokio::spawn(write_loop(Arc::clone(&conn), rx, Arc::clone(&state)));
    let guard = SessionGuard {
        session,
        dispatcher: &state.dispatcher,
    };

    let mut outcome = Ok(());
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%session_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                outcome = Err(RelayError::Transport(e));
                break;
            }
        };

        let decoded = state
            .codec
            .decode::<Envelope>(&data)
            .and_then(ClientMessage::try_from);
        match decoded {
            Ok(message) => state.dispatcher.handle(&guard.session, message),
            Err(e) if e.is_malformed() => {
                tracing::debug!(%session_id, error = %e, "dropping malformed message");
            }
            Err(ProtocolError::UnknownType(kind)) => {
                state.dispatcher.reject_unknown(&guard.session, &kind);
            }
            Err(e) => {
                tracing::warn!(%session_id, error = %e, "unexpected protocol error");
            }
        }
    }

    // Cleanup first, so notices caused by our departure are already queued
    // on the other members before this task returns.
    drop(guard);
    writer.abort();
    if let Err(e) = conn.close().await {
        tracing::trace!(%session_id, error = %e, "close after disconnect failed");
    }
    outcome
}

/// Drains a session's outbound channel into the connection.
///
/// Ends when every sender is gone or the peer stops accepting writes.
async fn write_loop<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
    state: Arc<RelayState<C>>,
) {
    let conn_id = conn.id();
    while let Some(message) = outbound.recv().await {
        let text = match state.codec.encode(&message) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(%conn_id, kind = %message.kind(), error = %e, "failed to encode message");
                continue;
            }
        };
        if let Err(e) = conn.send(&text).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}
