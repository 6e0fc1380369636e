//! The relay's message table.
//!
//! [`Dispatcher::handle`] maps one decoded [`ClientMessage`] to registry and
//! room operations, then emits the reply to the sender and any broadcast to
//! the rest of the room. Everything here is synchronous: room operations
//! are short critical sections and sends are channel enqueues.
//!
//! | Request | Needs a room | Reply to sender | Broadcast |
//! |---|---|---|---|
//! | `create_room` | no | ack | none |
//! | `join_room` | no | ack | `player_join` (others) |
//! | `leave_room` | yes | ack | `room_closed` if owner, else `player_left` |
//! | `start_game` | yes (owner) | none | `start_game` (everyone) |
//! | `end_game` | yes | none | `end_game` (everyone) |
//! | `update_room_info` | yes | room snapshot | none |
//! | `update_player_info` | no | `{ id, name }` | none |
//! | `game_state` | yes | none | payload (others) |
//!
//! Any failure becomes an `error` reply carrying the error's text.

use std::sync::Arc;

use arena_protocol::{ClientMessage, RoomCode, RoomSettings, ServerMessage};
use arena_room::{Room, RoomError, RoomRegistry};
use arena_session::{Session, SessionConfig};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{FighterLayout, RelayConfig};

/// Reason sent in `room_closed` when the owner leaves.
pub const ROOM_CLOSED_REASON: &str = "the owner has closed the room";

/// Reply text for envelope types the relay does not accept.
pub const UNKNOWN_MESSAGE_TYPE: &str = "unknown message type";

/// Applies client requests to the shared room registry.
///
/// One dispatcher is shared by every connection.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<RoomRegistry>,
    sessions: SessionConfig,
    fighters: FighterLayout,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<RoomRegistry>,
        sessions: SessionConfig,
        fighters: FighterLayout,
    ) -> Self {
        Self {
            registry,
            sessions,
            fighters,
        }
    }

    /// Builds a dispatcher with a fresh registry from `config`.
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            Arc::new(RoomRegistry::new(config.rooms.clone())),
            config.sessions.clone(),
            config.fighters.clone(),
        )
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Creates the session for a new connection.
    pub fn open_session(&self, outbound: mpsc::UnboundedSender<ServerMessage>) -> Arc<Session> {
        let session = Arc::new(Session::new(outbound, &self.sessions));
        tracing::info!(session_id = %session.id(), "session opened");
        session
    }

    /// Handles one request from `session`.
    pub fn handle(&self, session: &Arc<Session>, message: ClientMessage) {
        let kind = message.kind();
        let result = match message {
            ClientMessage::CreateRoom(settings) => self.create_room(session, settings),
            ClientMessage::JoinRoom(code) => self.join_room(session, code),
            ClientMessage::LeaveRoom => self.leave_room(session),
            ClientMessage::StartGame => self.start_game(session),
            ClientMessage::EndGame => self.end_game(session),
            ClientMessage::UpdateRoomInfo => self.update_room_info(session),
            ClientMessage::UpdatePlayerInfo { name } => {
                self.update_player_info(session, name);
                Ok(())
            }
            ClientMessage::GameState(state) => self.game_state(session, state),
        };

        if let Err(err) = result {
            tracing::debug!(
                session_id = %session.id(),
                %kind,
                error = %err,
                "request rejected"
            );
            session.send(ServerMessage::Error(err.to_string()));
        }
    }

    /// Answers an envelope whose `type` the relay does not accept.
    pub fn reject_unknown(&self, session: &Session, kind: &str) {
        tracing::debug!(session_id = %session.id(), kind, "unknown message type");
        session.send(ServerMessage::Error(UNKNOWN_MESSAGE_TYPE.to_string()));
    }

    /// Releases everything `session` holds after its connection closed.
    ///
    /// Runs `end_game` and then `leave_room` on the session's behalf. The
    /// leave closes the room if the session owned it.
    pub fn disconnect(&self, session: &Arc<Session>) {
        if session.room().is_some() {
            if let Err(err) = self.end_game(session) {
                tracing::debug!(session_id = %session.id(), error = %err, "end game on disconnect failed");
            }
            if let Err(err) = self.leave_room(session) {
                tracing::debug!(session_id = %session.id(), error = %err, "leave on disconnect failed");
            }
        }
        tracing::info!(session_id = %session.id(), "session closed");
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    fn create_room(&self, session: &Arc<Session>, settings: RoomSettings) -> Result<(), RoomError> {
        if let Some(current) = session.room() {
            return Err(RoomError::AlreadyInRoom(current));
        }
        let room = self.registry.create_room(session.id(), settings)?;
        if let Err(err) = self.registry.join_room(session, room.code()) {
            // Never leave an empty, ownerless room behind.
            let _ = self.registry.delete_room(room.code());
            return Err(err);
        }
        session.send(ServerMessage::CreateRoom);
        Ok(())
    }

    fn join_room(&self, session: &Arc<Session>, code: RoomCode) -> Result<(), RoomError> {
        let room = self.registry.join_room(session, &code)?;
        tracing::info!(
            session_id = %session.id(),
            %code,
            players = room.member_count(),
            "player joined room"
        );
        session.send(ServerMessage::JoinRoom);
        room.broadcast(&ServerMessage::PlayerJoin(session.name()), Some(session.id()));
        Ok(())
    }

    fn leave_room(&self, session: &Arc<Session>) -> Result<(), RoomError> {
        let room = self.current_room(session)?;
        let code = room.code().clone();
        self.registry.kick_from_room(session, &code)?;
        session.send(ServerMessage::LeaveRoom);

        if room.is_owner(session.id()) {
            if let Err(err) = self.registry.delete_room(&code) {
                tracing::debug!(%code, error = %err, "room already gone");
            }
            room.broadcast(
                &ServerMessage::RoomClosed(ROOM_CLOSED_REASON.to_string()),
                Some(session.id()),
            );
        } else {
            tracing::info!(session_id = %session.id(), %code, "player left room");
            room.broadcast(&ServerMessage::PlayerLeft(session.id()), None);
        }
        Ok(())
    }

    fn start_game(&self, session: &Arc<Session>) -> Result<(), RoomError> {
        let room = self.current_room(session)?;
        let participants = room.start_game(session.id())?;
        let fighters = self.fighters.assign(&participants);
        room.broadcast(&ServerMessage::StartGame(fighters), None);
        Ok(())
    }

    fn end_game(&self, session: &Arc<Session>) -> Result<(), RoomError> {
        let room = self.current_room(session)?;
        room.end_game();
        room.broadcast(&ServerMessage::EndGame, None);
        Ok(())
    }

    fn update_room_info(&self, session: &Arc<Session>) -> Result<(), RoomError> {
        let room = self.current_room(session)?;
        session.send(ServerMessage::UpdateRoomInfo(room.snapshot()));
        Ok(())
    }

    fn update_player_info(&self, session: &Arc<Session>, name: Option<String>) {
        if let Some(raw) = name {
            match self.sessions.sanitize_name(&raw) {
                Some(name) => session.set_name(name),
                None => tracing::debug!(session_id = %session.id(), "ignoring blank name"),
            }
        }
        session.send(ServerMessage::UpdatePlayerInfo(session.info()));
    }

    fn game_state(&self, session: &Arc<Session>, state: Value) -> Result<(), RoomError> {
        let room = self.current_room(session)?;
        room.broadcast(&ServerMessage::GameState(state), Some(session.id()));
        Ok(())
    }

    /// The room `session` is in.
    ///
    /// A code that no longer resolves is dropped from the session so the
    /// next request sees `NotInRoom`.
    fn current_room(&self, session: &Session) -> Result<Arc<Room>, RoomError> {
        let code = session.room().ok_or(RoomError::NotInRoom)?;
        self.registry.get_room(&code).inspect_err(|_| {
            session.clear_room_if(&code);
        })
    }
}
