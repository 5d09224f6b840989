//! Error types for the protocol layer.
//!
//! Each crate in Draftroom defines its own error enum. A `ProtocolError`
//! means something was wrong with the *shape* of data: it failed to
//! serialize, failed to parse, or parsed but broke a structural rule
//! (a lineup with `min > max`, a chunk from the wrong stream).

/// Errors that can occur in the protocol layer.
///
/// `#[derive(thiserror::Error)]` auto-generates the `std::error::Error`
/// implementation. The `#[error("...")]` attributes define the message
/// shown when the error is printed or logged.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields,
    /// wrong data types, or truncated messages.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but violates a framing rule, e.g. a chunk
    /// whose `total_chunks` disagrees with earlier chunks of the same
    /// stream.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A lineup configuration is malformed. Rooms refuse to start with
    /// one of these, so this is checked before any participant joins.
    #[error("invalid lineup: {0}")]
    InvalidLineup(String),

    /// An entity handed over by pool provisioning could not be
    /// normalized into the canonical shape.
    #[error("invalid entity: {0}")]
    InvalidEntity(String),
}
