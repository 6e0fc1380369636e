//! Connected-client sessions for the Arena relay.
//!
//! A [`Session`] is the relay's record of one WebSocket client: who it is
//! ([`SessionId`](arena_protocol::SessionId)), what it is called, which
//! room it is in, and where its outbound messages go.
//!
//! # How it fits in the stack
//!
//! ```text
//! Room Layer (above)  ← stores sessions as room members, broadcasts to them
//!     ↕
//! Session Layer (this crate)  ← identity, display name, room association
//!     ↕
//! Protocol Layer (below)  ← provides SessionId, RoomCode, ServerMessage
//! ```

mod session;

pub use session::{Session, SessionConfig};
