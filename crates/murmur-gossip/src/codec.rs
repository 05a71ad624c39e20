//! CBOR encoding of envelopes.
//!
//! The codec is the decode boundary: anything that does not decode to a
//! well-formed envelope within the size limits is rejected here and never
//! reaches protocol handling.

use bytes::Bytes;

use crate::error::{GossipError, Result};
use crate::messages::{limits::MAX_DATAGRAM_SIZE, Envelope};

/// Encode an envelope into one datagram.
pub fn encode(envelope: &Envelope) -> Result<Bytes> {
    let mut buf = Vec::new();
    ciborium::into_writer(envelope, &mut buf).map_err(|e| GossipError::Codec(e.to_string()))?;

    if buf.len() > MAX_DATAGRAM_SIZE {
        return Err(GossipError::OversizedDatagram {
            size: buf.len(),
            max: MAX_DATAGRAM_SIZE,
        });
    }
    Ok(Bytes::from(buf))
}

/// Decode one datagram into an envelope.
pub fn decode(datagram: &[u8]) -> Result<Envelope> {
    if datagram.len() > MAX_DATAGRAM_SIZE {
        return Err(GossipError::OversizedDatagram {
            size: datagram.len(),
            max: MAX_DATAGRAM_SIZE,
        });
    }

    let envelope: Envelope =
        ciborium::from_reader(datagram).map_err(|e| GossipError::Codec(e.to_string()))?;
    envelope
        .validate_limits()
        .map_err(GossipError::LimitExceeded)?;
    Ok(envelope)
}
