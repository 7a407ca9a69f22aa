//! Error types for the protocol layer.
//!
//! When you see a `ProtocolError`, the problem is in turning bytes into
//! messages (or back), not in networking or in the room rules.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, an unknown `"type"` tag,
    /// or a missing field.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but is not acceptable at this point,
    /// e.g. a frame that is not valid UTF-8 text.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
