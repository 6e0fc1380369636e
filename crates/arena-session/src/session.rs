//! The session type: one connected client.
//!
//! A `Session` is shared (`Arc<Session>`) between the connection's own
//! receive loop and every room broadcast that targets it, so all mutable
//! state sits behind a lock and all methods take `&self`.

use std::sync::{Mutex, MutexGuard};

use arena_protocol::{PlayerInfo, RoomCode, ServerMessage, SessionId};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for new sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Display name every session starts with.
    ///
    /// Default: `"Player"`.
    pub default_name: String,

    /// Longest display name (in characters) a client may pick.
    ///
    /// Default: 32.
    pub max_name_len: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_name: "Player".to_string(),
            max_name_len: 32,
        }
    }
}

impl SessionConfig {
    /// Cleans up a client-supplied display name.
    ///
    /// Trims whitespace and truncates to `max_name_len` characters.
    /// Returns `None` when nothing usable is left.
    pub fn sanitize_name(&self, raw: &str) -> Option<String> {
        let name: String = raw.trim().chars().take(self.max_name_len).collect();
        let name = name.trim_end();
        (!name.is_empty()).then(|| name.to_string())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SessionState {
    name: String,
    room: Option<RoomCode>,
}

/// A connected client.
///
/// Outbound messages go into an unbounded channel whose receiving end is
/// drained by the connection's writer task. Sending is therefore a
/// synchronous enqueue that never waits on the network, and messages reach
/// the socket in the order they were sent. The channel is unbounded, so a
/// client that stops reading during a `game_state` flood grows its queue
/// until the connection drops.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    outbound: mpsc::UnboundedSender<ServerMessage>,
    state: Mutex<SessionState>,
}

impl Session {
    /// Creates a session with a fresh id, the configured default name and
    /// no room.
    pub fn new(outbound: mpsc::UnboundedSender<ServerMessage>, config: &SessionConfig) -> Self {
        Self {
            id: SessionId::random(),
            outbound,
            state: Mutex::new(SessionState {
                name: config.default_name.clone(),
                room: None,
            }),
        }
    }

    /// Creates a session together with the receiving end of its outbound
    /// channel.
    pub fn channel(config: &SessionConfig) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx, config), rx)
    }

    /// This session's identity. Never changes.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current display name.
    pub fn name(&self) -> String {
        self.state().name.clone()
    }

    /// Replaces the display name.
    pub fn set_name(&self, name: impl Into<String>) {
        self.state().name = name.into();
    }

    /// Code of the room this session is in, if any.
    pub fn room(&self) -> Option<RoomCode> {
        self.state().room.clone()
    }

    /// Records the room this session belongs to.
    pub fn set_room(&self, code: RoomCode) {
        self.state().room = Some(code);
    }

    /// Records `code` only if the session is in no room yet.
    ///
    /// On conflict returns the code of the room it is already in.
    pub fn try_set_room(&self, code: RoomCode) -> Result<(), RoomCode> {
        let mut state = self.state();
        match &state.room {
            Some(current) => Err(current.clone()),
            None => {
                state.room = Some(code);
                Ok(())
            }
        }
    }

    /// Forgets the room association, returning the old code.
    pub fn clear_room(&self) -> Option<RoomCode> {
        self.state().room.take()
    }

    /// Clears the room association only if it still points at `code`.
    ///
    /// Returns `true` if it did.
    pub fn clear_room_if(&self, code: &RoomCode) -> bool {
        let mut state = self.state();
        if state.room.as_ref() == Some(code) {
            state.room = None;
            true
        } else {
            false
        }
    }

    /// The `{ id, name }` pair clients see.
    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name(),
        }
    }

    /// Queues a message for this client.
    ///
    /// Never blocks. If the connection is already gone the message is
    /// dropped; the disconnect path cleans up membership separately.
    pub fn send(&self, message: ServerMessage) {
        if let Err(err) = self.outbound.send(message) {
            tracing::trace!(
                session_id = %self.id,
                kind = %err.0.kind(),
                "outbound channel closed, message dropped"
            );
        }
    }

    /// Returns `true` once the writer side has gone away.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // The state is two plain fields; a panic elsewhere cannot leave
        // it half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// =========================================================================
// Tests
// =========================================================================
