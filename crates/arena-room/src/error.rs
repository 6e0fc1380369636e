//! Error types for the room layer.
//!
//! The `Display` text of every variant is what the client sees in an
//! `error` reply, so keep it short and human-readable.

use arena_protocol::{RoomCode, SessionId};

/// Errors that can occur during room operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    /// Room settings were rejected (non-positive or inconsistent counts).
    #[error("{0}")]
    InvalidSettings(&'static str),

    /// No live room has this code.
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    /// The room is at capacity.
    #[error("room is full")]
    RoomFull(RoomCode),

    /// The room is playing a match and not accepting joins.
    #[error("there is a game going on in the room now")]
    GameInProgress(RoomCode),

    /// The session is not a member of the room.
    #[error("player not found in room")]
    PlayerNotFound(SessionId),

    /// Every sampled code was taken.
    #[error("failed to generate unique room code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    /// The operation needs room membership and the session has none.
    #[error("player is not in any room")]
    NotInRoom,

    /// The session already belongs to a room.
    #[error("player is already in room {0}")]
    AlreadyInRoom(RoomCode),

    /// Only the owner may start the match.
    #[error("only the room owner can start the game")]
    NotRoomOwner,
}
