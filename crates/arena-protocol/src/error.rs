//! Error types for the protocol layer.
//!
//! Each crate in the relay defines its own error enum. When you see a
//! `ProtocolError`, the problem is in the shape of a message, not in
//! networking or room management.

use crate::MessageType;

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into text).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The bytes are not a well-formed envelope: not JSON, not an
    /// object, or missing the `type` field.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The envelope names a `type` this side of the protocol does not
    /// accept.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The envelope's `type` is known but its `data` has the wrong shape,
    /// e.g. a `join_room` whose code is a number.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// Returns `true` for errors that mean "the frame was garbage" rather
    /// than "the frame asked for something we don't do".
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::InvalidPayload { .. })
    }
}
