//! Room registry: owns every live room, keyed by its short code.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use arena_protocol::{RoomCode, RoomSettings, SessionId};
use arena_session::Session;
use rand::Rng;

use crate::{RegistryConfig, Room, RoomError, RoomLimits};

/// Creates, finds, and deletes rooms.
///
/// The code→room map has one lock. Operations that also touch a room
/// look the room up, release the map, then lock the room; the two locks
/// are never held together.
///
/// ## Lifecycle
///
/// ```text
/// create_room() ──→ join_room() / kick_from_room() ──→ delete_room()
///      │                      │                              │
///      ▼                      ▼                              ▼
///  [Waiting]         [Waiting ⇄ Ready → InGame]          [closed]
/// ```
#[derive(Debug, Default)]
pub struct RoomRegistry {
    config: RegistryConfig,
    rooms: Mutex<HashMap<RoomCode, Arc<Room>>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an empty room owned by `owner_id` under a fresh code.
    ///
    /// Code sampling and insertion happen in one critical section, so two
    /// concurrent creators can never receive the same code.
    ///
    /// # Errors
    /// - [`RoomError::InvalidSettings`] if the settings do not validate
    /// - [`RoomError::CodeSpaceExhausted`] if `code_attempts` samples all
    ///   collided with live rooms
    pub fn create_room(
        &self,
        owner_id: SessionId,
        settings: RoomSettings,
    ) -> Result<Arc<Room>, RoomError> {
        let limits = RoomLimits::try_from(settings)?;

        let mut rooms = self.rooms();
        let code = self.free_code(&rooms)?;
        let room = Arc::new(Room::new(code.clone(), owner_id, limits));
        rooms.insert(code.clone(), Arc::clone(&room));
        let total = rooms.len();
        drop(rooms);

        tracing::info!(
            %code,
            %owner_id,
            max_players = limits.max_players,
            need_players = limits.need_players,
            rooms = total,
            "room created"
        );
        Ok(room)
    }

    /// Unmaps a room, marks it closed, and clears every member's room
    /// association.
    ///
    /// Returns the room so the caller can still notify its members.
    ///
    /// # Errors
    /// Returns [`RoomError::RoomNotFound`] if no room has this code.
    pub fn delete_room(&self, code: &RoomCode) -> Result<Arc<Room>, RoomError> {
        let room = self
            .rooms()
            .remove(code)
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))?;
        room.close();
        tracing::info!(%code, "room closed");
        Ok(room)
    }

    /// Adds `session` to the room with this code.
    ///
    /// On success the session's room is set to `code`.
    ///
    /// # Errors
    /// [`RoomError::RoomNotFound`], or anything [`Room::add_player`]
    /// refuses with.
    pub fn join_room(
        &self,
        session: &Arc<Session>,
        code: &RoomCode,
    ) -> Result<Arc<Room>, RoomError> {
        let room = self.get_room(code)?;
        room.add_player(session)?;
        Ok(room)
    }

    /// Removes `session` from the room with this code.
    ///
    /// On success the session's room is cleared.
    ///
    /// # Errors
    /// [`RoomError::RoomNotFound`] or [`RoomError::PlayerNotFound`].
    pub fn kick_from_room(
        &self,
        session: &Session,
        code: &RoomCode,
    ) -> Result<Arc<Room>, RoomError> {
        let room = self.get_room(code)?;
        room.remove_player(session.id())?;
        Ok(room)
    }

    /// Looks up a live room.
    ///
    /// # Errors
    /// Returns [`RoomError::RoomNotFound`] if no room has this code.
    pub fn get_room(&self, code: &RoomCode) -> Result<Arc<Room>, RoomError> {
        self.rooms()
            .get(code)
            .cloned()
            .ok_or_else(|| RoomError::RoomNotFound(code.clone()))
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms().len()
    }

    /// Samples up to `code_attempts` codes and returns the first free one.
    fn free_code(
        &self,
        rooms: &HashMap<RoomCode, Arc<Room>>,
    ) -> Result<RoomCode, RoomError> {
        let mut rng = rand::rng();
        for _ in 0..self.config.code_attempts {
            let code = random_code(&mut rng, self.config.code_len);
            if !rooms.contains_key(&code) {
                return Ok(code);
            }
        }
        tracing::warn!(
            attempts = self.config.code_attempts,
            rooms = rooms.len(),
            "room code space exhausted"
        );
        Err(RoomError::CodeSpaceExhausted {
            attempts: self.config.code_attempts,
        })
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<RoomCode, Arc<Room>>> {
        self.rooms.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A code of `len` decimal digits; leading zeros allowed.
fn random_code(rng: &mut impl Rng, len: usize) -> RoomCode {
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect::<String>()
        .into()
}
