//! Error types for the gossip layer.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors that can occur while encoding, moving or handling envelopes.
#[derive(Debug, Error)]
pub enum GossipError {
    /// Envelope could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// Datagram exceeds the maximum wire size.
    #[error("datagram of {size} bytes exceeds the {max} byte limit")]
    OversizedDatagram { size: usize, max: usize },

    /// Envelope violates a size limit.
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// No transport is listening at this address.
    #[error("unreachable address: {0}")]
    Unreachable(SocketAddr),

    /// Text rumors need text; an empty rumor is a route announcement.
    #[error("rumor text is empty")]
    EmptyRumor,

    /// Socket I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Inbound data failed structural validation.
    #[error("validation error: {0}")]
    ValidationError(#[from] murmur_core::ValidationError),

    /// A channel's other half is gone.
    #[error("channel closed")]
    ChannelClosed,
}

/// Result type for gossip operations.
pub type Result<T> = std::result::Result<T, GossipError>;
