//! Wire protocol for the Arena relay.
//!
//! This crate defines the "language" that browser clients and the relay
//! speak:
//!
//! - **Types** ([`SessionId`], [`RoomCode`], [`RoomInfo`],
//!   [`FighterAssignment`], etc.): the payload structures.
//! - **Messages** ([`Envelope`], [`ClientMessage`], [`ServerMessage`]):
//!   the `{ "type": ..., "data": ... }` frames that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames are turned
//!   into text and back.
//! - **Errors** ([`ProtocolError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and the
//! dispatcher (room operations). It knows nothing about connections or
//! rooms, only how messages look.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Dispatcher (rooms)
//! ```

mod codec;
mod error;
mod message;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use message::{ClientMessage, Envelope, MessageType, ServerMessage};
pub use types::{
    Collider, FighterAssignment, PlayerInfo, RoomCode, RoomInfo,
    RoomSettings, RoomStatus, SessionId, Vec2,
};
