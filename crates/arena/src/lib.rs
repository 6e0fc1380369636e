//! # Arena
//!
//! A room-based WebSocket relay for two-player browser fighting games.
//!
//! Clients create a room and get a short numeric code, a friend joins with
//! that code, the owner starts the match, and from then on each client's
//! per-frame `game_state` is forwarded verbatim to the other members. The
//! relay never interprets game state; it only manages rooms and fan-out.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use arena::prelude::*;
//!
//! # async fn run() -> Result<(), RelayError> {
//! let server = RelayServer::builder()
//!     .config(RelayConfig::from_env())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! arena-transport  WebSocket accept, text frames
//! arena-protocol   { type, data } envelopes, ClientMessage / ServerMessage
//! arena-session    Session: id, name, room, outbound channel
//! arena-room       Room state machine, RoomRegistry
//! arena            Dispatcher, connection handler, server
//! ```

mod config;
mod dispatcher;
mod error;
mod fighters;
mod handler;
mod server;

pub use config::RelayConfig;
pub use dispatcher::{Dispatcher, ROOM_CLOSED_REASON, UNKNOWN_MESSAGE_TYPE};
pub use error::RelayError;
pub use fighters::FighterLayout;
pub use server::{RelayServer, RelayServerBuilder};

/// Everything needed to run a relay or talk to one.
pub mod prelude {
    pub use crate::{
        Dispatcher, FighterLayout, RelayConfig, RelayError, RelayServer,
        RelayServerBuilder,
    };
    pub use arena_protocol::{
        ClientMessage, Codec, Envelope, FighterAssignment, JsonCodec,
        MessageType, PlayerInfo, RoomCode, RoomInfo, RoomSettings,
        RoomStatus, ServerMessage, SessionId,
    };
    pub use arena_room::{RegistryConfig, RoomError, RoomRegistry};
    pub use arena_session::{Session, SessionConfig};
}
