//! Relay messages and the envelope they travel in.
//!
//! Every frame on the wire is an [`Envelope`]:
//!
//! ```json
//! { "type": "join_room", "data": "042137" }
//! ```
//!
//! Decoding happens in two steps. First the frame is parsed as an
//! `Envelope`; if that fails the frame is garbage. Then the `type`
//! string picks the [`ClientMessage`] variant and only that variant's
//! payload is parsed. Splitting the steps lets the relay tell "garbage"
//! (log and drop) apart from "a type we don't handle" (reply with an
//! error), and gives the dispatcher an exhaustive `match`.

use std::fmt;
use std::str::FromStr;

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{
    FighterAssignment, PlayerInfo, ProtocolError, RoomCode, RoomInfo,
    RoomSettings, SessionId,
};

// ---------------------------------------------------------------------------
// MessageType
// ---------------------------------------------------------------------------

/// The `type` discriminator of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Error,
    CreateRoom,
    JoinRoom,
    LeaveRoom,
    StartGame,
    EndGame,
    UpdateRoomInfo,
    UpdatePlayerInfo,
    PlayerLeft,
    PlayerJoin,
    RoomClosed,
    GameState,
}

impl MessageType {
    /// Every message type, in wire-table order.
    pub const ALL: [MessageType; 12] = [
        Self::Error,
        Self::CreateRoom,
        Self::JoinRoom,
        Self::LeaveRoom,
        Self::StartGame,
        Self::EndGame,
        Self::UpdateRoomInfo,
        Self::UpdatePlayerInfo,
        Self::PlayerLeft,
        Self::PlayerJoin,
        Self::RoomClosed,
        Self::GameState,
    ];

    /// The exact string used in the `type` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::CreateRoom => "create_room",
            Self::JoinRoom => "join_room",
            Self::LeaveRoom => "leave_room",
            Self::StartGame => "start_game",
            Self::EndGame => "end_game",
            Self::UpdateRoomInfo => "update_room_info",
            Self::UpdatePlayerInfo => "update_player_info",
            Self::PlayerLeft => "player_left",
            Self::PlayerJoin => "player_join",
            Self::RoomClosed => "room_closed",
            Self::GameState => "game_state",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The raw wire frame: a `type` string plus an untyped payload.
///
/// `kind` stays a `String` so an unrecognised type can still be named in
/// logs and error replies. A missing `data` field reads as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    fn kind(&self) -> Result<MessageType, ProtocolError> {
        self.kind.parse()
    }
}

/// Parses an envelope payload as `T`, tagging failures with the type.
fn payload<T: DeserializeOwned>(
    kind: MessageType,
    data: Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(data)
        .map_err(|source| ProtocolError::InvalidPayload { kind, source })
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PlayerUpdate {
    #[serde(default)]
    name: Option<String>,
}

// ---------------------------------------------------------------------------
// ClientMessage: browser to relay
// ---------------------------------------------------------------------------

/// A request from a browser client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Create a room and join it as owner.
    CreateRoom(RoomSettings),
    /// Join the room with this code.
    JoinRoom(RoomCode),
    /// Leave the current room (closing it if we own it).
    LeaveRoom,
    /// Owner asks to start the match.
    StartGame,
    /// The match is over.
    EndGame,
    /// Ask for a snapshot of the current room.
    UpdateRoomInfo,
    /// Ask for our own identity, optionally renaming first.
    UpdatePlayerInfo { name: Option<String> },
    /// Per-frame state, relayed verbatim to the other members.
    GameState(Value),
}

impl ClientMessage {
    /// The `type` string this message travels under.
    pub fn kind(&self) -> MessageType {
        match self {
            Self::CreateRoom(_) => MessageType::CreateRoom,
            Self::JoinRoom(_) => MessageType::JoinRoom,
            Self::LeaveRoom => MessageType::LeaveRoom,
            Self::StartGame => MessageType::StartGame,
            Self::EndGame => MessageType::EndGame,
            Self::UpdateRoomInfo => MessageType::UpdateRoomInfo,
            Self::UpdatePlayerInfo { .. } => MessageType::UpdatePlayerInfo,
            Self::GameState(_) => MessageType::GameState,
        }
    }
}

impl TryFrom<Envelope> for ClientMessage {
    type Error = ProtocolError;

    fn try_from(env: Envelope) -> Result<Self, Self::Error> {
        let kind = env.kind()?;
        let data = env.data;
        match kind {
            MessageType::CreateRoom => {
                // A bare `null` behaves like `{}`: zero capacity, which the
                // registry then refuses with a proper error reply.
                if data.is_null() {
                    Ok(Self::CreateRoom(RoomSettings::default()))
                } else {
                    payload(kind, data).map(Self::CreateRoom)
                }
            }
            MessageType::JoinRoom => payload(kind, data).map(Self::JoinRoom),
            MessageType::LeaveRoom => Ok(Self::LeaveRoom),
            MessageType::StartGame => Ok(Self::StartGame),
            MessageType::EndGame => Ok(Self::EndGame),
            MessageType::UpdateRoomInfo => Ok(Self::UpdateRoomInfo),
            // Always answerable: a payload without a usable name is a query.
            MessageType::UpdatePlayerInfo => Ok(Self::UpdatePlayerInfo {
                name: serde_json::from_value::<PlayerUpdate>(data)
                    .ok()
                    .and_then(|u| u.name),
            }),
            MessageType::GameState => Ok(Self::GameState(data)),
            // Relay → client only.
            MessageType::Error
            | MessageType::PlayerLeft
            | MessageType::PlayerJoin
            | MessageType::RoomClosed => {
                Err(ProtocolError::UnknownType(env.kind))
            }
        }
    }
}

impl Serialize for ClientMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut env = serializer.serialize_struct("Envelope", 2)?;
        env.serialize_field("type", &self.kind())?;
        match self {
            Self::CreateRoom(settings) => env.serialize_field("data", settings)?,
            Self::JoinRoom(code) => env.serialize_field("data", code)?,
            Self::UpdatePlayerInfo { name: Some(name) } => env.serialize_field(
                "data",
                &PlayerUpdate {
                    name: Some(name.clone()),
                },
            )?,
            Self::GameState(state) => env.serialize_field("data", state)?,
            Self::LeaveRoom
            | Self::StartGame
            | Self::EndGame
            | Self::UpdateRoomInfo
            | Self::UpdatePlayerInfo { name: None } => {
                env.serialize_field("data", &())?
            }
        }
        env.end()
    }
}

impl<'de> Deserialize<'de> for ClientMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Envelope::deserialize(deserializer)?
            .try_into()
            .map_err(D::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// ServerMessage: relay to browser
// ---------------------------------------------------------------------------

/// A reply or broadcast from the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// A request failed; human-readable reason.
    Error(String),
    /// Ack: room created and joined.
    CreateRoom,
    /// Ack: room joined.
    JoinRoom,
    /// Ack: room left.
    LeaveRoom,
    /// The match starts with these fighters.
    StartGame(Vec<FighterAssignment>),
    /// The match is over.
    EndGame,
    /// Snapshot of the current room.
    UpdateRoomInfo(RoomInfo),
    /// The requester's identity.
    UpdatePlayerInfo(PlayerInfo),
    /// A member left; carries their session id.
    PlayerLeft(SessionId),
    /// A member joined; carries their display name.
    PlayerJoin(String),
    /// The owner closed the room; carries a reason.
    RoomClosed(String),
    /// Another member's per-frame state, verbatim.
    GameState(Value),
}

impl ServerMessage {
    /// The `type` string this message travels under.
    pub fn kind(&self) -> MessageType {
        match self {
            Self::Error(_) => MessageType::Error,
            Self::CreateRoom => MessageType::CreateRoom,
            Self::JoinRoom => MessageType::JoinRoom,
            Self::LeaveRoom => MessageType::LeaveRoom,
            Self::StartGame(_) => MessageType::StartGame,
            Self::EndGame => MessageType::EndGame,
            Self::UpdateRoomInfo(_) => MessageType::UpdateRoomInfo,
            Self::UpdatePlayerInfo(_) => MessageType::UpdatePlayerInfo,
            Self::PlayerLeft(_) => MessageType::PlayerLeft,
            Self::PlayerJoin(_) => MessageType::PlayerJoin,
            Self::RoomClosed(_) => MessageType::RoomClosed,
            Self::GameState(_) => MessageType::GameState,
        }
    }
}

impl TryFrom<Envelope> for ServerMessage {
    type Error = ProtocolError;

    fn try_from(env: Envelope) -> Result<Self, ProtocolError> {
        let kind = env.kind()?;
        let data = env.data;
        Ok(match kind {
            MessageType::Error => ServerMessage::Error(payload(kind, data)?),
            MessageType::CreateRoom => Self::CreateRoom,
            MessageType::JoinRoom => Self::JoinRoom,
            MessageType::LeaveRoom => Self::LeaveRoom,
            MessageType::StartGame => Self::StartGame(payload(kind, data)?),
            MessageType::EndGame => Self::EndGame,
            MessageType::UpdateRoomInfo => {
                Self::UpdateRoomInfo(payload(kind, data)?)
            }
            MessageType::UpdatePlayerInfo => {
                Self::UpdatePlayerInfo(payload(kind, data)?)
            }
            MessageType::PlayerLeft => Self::PlayerLeft(payload(kind, data)?),
            MessageType::PlayerJoin => Self::PlayerJoin(payload(kind, data)?),
            MessageType::RoomClosed => Self::RoomClosed(payload(kind, data)?),
            MessageType::GameState => Self::GameState(data),
        })
    }
}

impl Serialize for ServerMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut env = serializer.serialize_struct("Envelope", 2)?;
        env.serialize_field("type", &self.kind())?;
        match self {
            Self::Error(message) => env.serialize_field("data", message)?,
            Self::StartGame(fighters) => env.serialize_field("data", fighters)?,
            Self::UpdateRoomInfo(info) => env.serialize_field("data", info)?,
            Self::UpdatePlayerInfo(info) => env.serialize_field("data", info)?,
            Self::PlayerLeft(id) => env.serialize_field("data", id)?,
            Self::PlayerJoin(name) => env.serialize_field("data", name)?,
            Self::RoomClosed(reason) => env.serialize_field("data", reason)?,
            Self::GameState(state) => env.serialize_field("data", state)?,
            Self::CreateRoom | Self::JoinRoom | Self::LeaveRoom | Self::EndGame => {
                env.serialize_field("data", &())?
            }
        }
        env.end()
    }
}

impl<'de> Deserialize<'de> for ServerMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Envelope::deserialize(deserializer)?
            .try_into()
            .map_err(D::Error::custom)
    }
}

// =========================================================================
// Tests
// =========================================================================
