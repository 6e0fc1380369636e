//! A single room: membership, status, and fan-out.
//!
//! Every mutation runs under the room's own mutex and follows
//! validate-then-mutate: an operation that fails leaves the room exactly as
//! it found it. Lock order is room, then session.

use std::sync::{Arc, Mutex, MutexGuard};

use arena_protocol::{RoomCode, RoomInfo, RoomStatus, ServerMessage, SessionId};
use arena_session::Session;
use indexmap::IndexMap;

use crate::{RoomError, RoomLimits};

#[derive(Debug)]
struct RoomInner {
    status: RoomStatus,
    /// Members in join order. Fighter slots are assigned in this order.
    members: IndexMap<SessionId, Arc<Session>>,
    /// Set once the registry has dropped the room. A closed room refuses
    /// joins so nobody ends up in a room that can no longer be found.
    closed: bool,
}

/// A bounded group of sessions playing (or about to play) one match.
#[derive(Debug)]
pub struct Room {
    code: RoomCode,
    owner_id: SessionId,
    limits: RoomLimits,
    inner: Mutex<RoomInner>,
}

impl Room {
    /// Creates an empty `Waiting` room.
    pub fn new(code: RoomCode, owner_id: SessionId, limits: RoomLimits) -> Self {
        Self {
            code,
            owner_id,
            limits,
            inner: Mutex::new(RoomInner {
                status: RoomStatus::Waiting,
                members: IndexMap::new(),
                closed: false,
            }),
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn owner_id(&self) -> SessionId {
        self.owner_id
    }

    pub fn is_owner(&self, id: SessionId) -> bool {
        self.owner_id == id
    }

    pub fn status(&self) -> RoomStatus {
        self.inner().status
    }

    pub fn member_count(&self) -> usize {
        self.inner().members.len()
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.inner().members.contains_key(&id)
    }

    /// Member ids in join order.
    pub fn member_ids(&self) -> Vec<SessionId> {
        self.inner().members.keys().copied().collect()
    }

    /// Returns `true` once the registry has deleted this room.
    pub fn is_closed(&self) -> bool {
        self.inner().closed
    }

    /// Adds a session and records this room on it.
    ///
    /// # Errors
    /// - [`RoomError::RoomNotFound`] if the room was already deleted
    /// - [`RoomError::GameInProgress`] while a match is running
    /// - [`RoomError::RoomFull`] at capacity
    /// - [`RoomError::AlreadyInRoom`] if the session belongs to any room,
    ///   this one included
    pub fn add_player(&self, session: &Arc<Session>) -> Result<(), RoomError> {
        let mut inner = self.inner();
        if inner.closed {
            return Err(RoomError::RoomNotFound(self.code.clone()));
        }
        if !inner.status.is_joinable() {
            return Err(RoomError::GameInProgress(self.code.clone()));
        }
        if inner.members.len() >= self.limits.max_players {
            return Err(RoomError::RoomFull(self.code.clone()));
        }
        // Claiming the room on the session is the last check, so a refusal
        // here needs no rollback.
        session
            .try_set_room(self.code.clone())
            .map_err(RoomError::AlreadyInRoom)?;

        inner.members.insert(session.id(), Arc::clone(session));
        inner.status = self.limits.status_for(inner.members.len());
        tracing::debug!(
            code = %self.code,
            session_id = %session.id(),
            players = inner.members.len(),
            status = %inner.status,
            "player added"
        );
        Ok(())
    }

    /// Removes a member and clears its room association.
    ///
    /// Outside a match the status is recomputed from the new member count.
    /// During a match it stays `InGame` until someone sends `end_game`.
    ///
    /// # Errors
    /// Returns [`RoomError::PlayerNotFound`] if `id` is not a member.
    pub fn remove_player(&self, id: SessionId) -> Result<Arc<Session>, RoomError> {
        let mut inner = self.inner();
        let session = inner
            .members
            .shift_remove(&id)
            .ok_or(RoomError::PlayerNotFound(id))?;
        session.clear_room_if(&self.code);

        if inner.status != RoomStatus::InGame {
            inner.status = self.limits.status_for(inner.members.len());
        }
        tracing::debug!(
            code = %self.code,
            session_id = %id,
            players = inner.members.len(),
            status = %inner.status,
            "player removed"
        );
        Ok(session)
    }

    /// Moves the room into `InGame`, whatever the member count.
    ///
    /// Returns the participants in join order.
    ///
    /// # Errors
    /// - [`RoomError::NotRoomOwner`] unless `by` created the room
    /// - [`RoomError::GameInProgress`] if a match is already running
    pub fn start_game(&self, by: SessionId) -> Result<Vec<SessionId>, RoomError> {
        if !self.is_owner(by) {
            return Err(RoomError::NotRoomOwner);
        }
        let mut inner = self.inner();
        match inner.status {
            RoomStatus::InGame => Err(RoomError::GameInProgress(self.code.clone())),
            RoomStatus::Waiting | RoomStatus::Ready => {
                inner.status = RoomStatus::InGame;
                tracing::info!(code = %self.code, players = inner.members.len(), "game started");
                Ok(inner.members.keys().copied().collect())
            }
        }
    }

    /// Ends the match (if any) and recomputes `Waiting`/`Ready`.
    pub fn end_game(&self) -> RoomStatus {
        let mut inner = self.inner();
        let was = inner.status;
        inner.status = self.limits.status_for(inner.members.len());
        if was == RoomStatus::InGame {
            tracing::info!(code = %self.code, status = %inner.status, "game ended");
        }
        inner.status
    }

    /// Queues `message` for every member except `exclude`.
    ///
    /// Sends are channel enqueues, so this never blocks on the network.
    /// Returns the number of recipients.
    pub fn broadcast(&self, message: &ServerMessage, exclude: Option<SessionId>) -> usize {
        let inner = self.inner();
        let mut sent = 0;
        for (id, session) in &inner.members {
            if Some(*id) == exclude {
                continue;
            }
            session.send(message.clone());
            sent += 1;
        }
        sent
    }

    /// A copy of the room's public state.
    pub fn snapshot(&self) -> RoomInfo {
        let inner = self.inner();
        RoomInfo {
            id: self.code.clone(),
            status: inner.status,
            owner_id: self.owner_id,
            players_count: inner.members.len(),
            max_players: self.limits.max_players,
            need_players: self.limits.need_players,
        }
    }

    /// Marks the room closed and clears every member's room association.
    ///
    /// Members stay in the list so the caller can still broadcast the
    /// closing notice. Called by the registry after unmapping the code.
    pub(crate) fn close(&self) {
        let mut inner = self.inner();
        inner.closed = true;
        for session in inner.members.values() {
            session.clear_room_if(&self.code);
        }
    }

    fn inner(&self) -> MutexGuard<'_, RoomInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
