//! Rooms and the room registry for the Arena relay.
//!
//! A [`Room`] is a bounded group of sessions with a lifecycle
//! ([`RoomStatus`](arena_protocol::RoomStatus)) and an owner. The
//! [`RoomRegistry`] hands out short numeric codes and maps them to rooms.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates/deletes rooms, routes joins by code
//! - [`Room`]: membership, status transitions, broadcast, snapshots
//! - [`RoomLimits`]: validated capacity settings
//! - [`RegistryConfig`]: room-code shape and retry budget
//!
//! # Locking
//!
//! The registry map and every room have independent `std::sync::Mutex`es.
//! No code path holds the registry lock while taking a room lock, and a
//! room lock is never held across two rooms. All critical sections are
//! synchronous; nothing here awaits.

mod config;
mod error;
mod registry;
mod room;

pub use config::{RegistryConfig, RoomLimits};
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::Room;
