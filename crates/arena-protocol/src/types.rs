//! Payload types carried inside relay envelopes.
//!
//! Everything here is serialized with `snake_case` field names because
//! that is what the browser client reads and writes.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The opaque identity of one connected client.
///
/// A newtype over a random (v4) UUID. `#[serde(transparent)]` makes it
/// travel as the plain hyphenated string, e.g.
/// `"67e55044-10b1-426f-9247-bb680e5fe0c8"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh, process-unique id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A short, human-enterable room code such as `"042137"`.
///
/// Codes are strings, not numbers: leading zeros are significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps a code string.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for RoomCode {
    fn from(code: String) -> Self {
        Self(code)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Room types
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
///            members >= need
///   Waiting ───────────────→ Ready
///      ↑  ←─────────────────   │
///      │     members < need    │ start_game
///      │                       ▼
///      └──── end_game ────── InGame
///            (recomputed)
/// ```
///
/// The wire strings are the ones the browser lobby displays verbatim,
/// hence `"In game"` with a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RoomStatus {
    /// Fewer than `need_players` members.
    #[default]
    Waiting,
    /// Enough players joined; the owner may start the match.
    Ready,
    /// A match is running. Joins are refused.
    #[serde(rename = "In game")]
    InGame,
}

impl RoomStatus {
    /// Returns `true` if new players may join in this state.
    pub fn is_joinable(self) -> bool {
        !matches!(self, Self::InGame)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Ready => write!(f, "Ready"),
            Self::InGame => write!(f, "In game"),
        }
    }
}

/// Room settings as requested by a client in `create_room`.
///
/// Signed on purpose: a client can send `0` or `-1`, and the registry
/// must be able to see that and refuse it. Missing fields default to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoomSettings {
    /// Capacity of the room.
    pub max_players: i64,
    /// Members required before the room becomes `Ready`.
    pub need_players: i64,
}

/// An immutable snapshot of a room, sent in reply to `update_room_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    /// The room code.
    pub id: RoomCode,
    /// Current lifecycle state.
    pub status: RoomStatus,
    /// The session that created the room.
    pub owner_id: SessionId,
    /// Number of members right now.
    pub players_count: usize,
    /// Capacity.
    pub max_players: usize,
    /// Members required to become `Ready`.
    pub need_players: usize,
}

/// A session's public identity, sent in reply to `update_player_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: SessionId,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Match start
// ---------------------------------------------------------------------------

/// A 2D vector in game-world pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle: top-left corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Collider {
    pub pos: Vec2,
    pub size: Vec2,
}

/// One participant's server-chosen starting fighter, sent in `start_game`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FighterAssignment {
    /// The session controlling this fighter.
    pub id: SessionId,
    /// Which character sprite set the clients should load.
    pub character_name: String,
    /// Spawn rectangle.
    pub collider: Collider,
    /// Initial animation state, e.g. `"idle"`.
    pub state: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_serializes_as_plain_string() {
        let id = SessionId::random();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
    }

    #[test]
    fn test_session_id_random_is_unique() {
        let ids: std::collections::HashSet<SessionId> =
            (0..1000).map(|_| SessionId::random()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_room_code_keeps_leading_zeros() {
        let code: RoomCode = serde_json::from_str(r#""000123""#).unwrap();
        assert_eq!(code.as_str(), "000123");
        assert_eq!(serde_json::to_string(&code).unwrap(), r#""000123""#);
    }

    #[test]
    fn test_room_status_wire_strings() {
        assert_eq!(serde_json::to_string(&RoomStatus::Waiting).unwrap(), r#""Waiting""#);
        assert_eq!(serde_json::to_string(&RoomStatus::Ready).unwrap(), r#""Ready""#);
        assert_eq!(serde_json::to_string(&RoomStatus::InGame).unwrap(), r#""In game""#);
        assert_eq!(RoomStatus::InGame.to_string(), "In game");
    }

    #[test]
    fn test_room_status_is_joinable() {
        assert!(RoomStatus::Waiting.is_joinable());
        assert!(RoomStatus::Ready.is_joinable());
        assert!(!RoomStatus::InGame.is_joinable());
    }

    #[test]
    fn test_room_settings_missing_fields_default_to_zero() {
        let settings: RoomSettings =
            serde_json::from_str(r#"{"max_players": 2}"#).unwrap();
        assert_eq!(settings, RoomSettings { max_players: 2, need_players: 0 });
    }

    #[test]
    fn test_room_info_json_format() {
        let owner = SessionId::random();
        let info = RoomInfo {
            id: "123456".into(),
            status: RoomStatus::Ready,
            owner_id: owner,
            players_count: 2,
            max_players: 2,
            need_players: 2,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["id"], "123456");
        assert_eq!(json["status"], "Ready");
        assert_eq!(json["owner_id"], owner.to_string());
        assert_eq!(json["players_count"], 2);
        assert_eq!(json["max_players"], 2);
        assert_eq!(json["need_players"], 2);
    }

    #[test]
    fn test_fighter_assignment_json_format() {
        let id = SessionId::random();
        let fighter = FighterAssignment {
            id,
            character_name: "warrior".into(),
            collider: Collider {
                pos: Vec2::new(100.0, 300.0),
                size: Vec2::new(60.0, 40.0),
            },
            state: "idle".into(),
        };
        let json = serde_json::to_value(&fighter).unwrap();
        assert_eq!(json["id"], id.to_string());
        assert_eq!(json["character_name"], "warrior");
        assert_eq!(json["collider"]["pos"]["x"], 100.0);
        assert_eq!(json["collider"]["pos"]["y"], 300.0);
        assert_eq!(json["collider"]["size"]["x"], 60.0);
        assert_eq!(json["collider"]["size"]["y"], 40.0);
        assert_eq!(json["state"], "idle");
    }
}
