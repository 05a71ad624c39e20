//! Simple broadcast mode: plain flooding, no clocks, no acknowledgments.

use std::net::SocketAddr;

use tracing::info;

use crate::messages::{Envelope, SimpleMessage};
use crate::protocol::Gossip;

impl Gossip {
    /// Stamp client text with our name and address and send it to every peer.
    pub fn broadcast_simple(&self, contents: impl Into<String>) -> SimpleMessage {
        let message = SimpleMessage {
            original_name: self.name().to_string(),
            relay_peer_addr: self.addr().to_string(),
            contents: contents.into(),
        };
        self.broadcast(&Envelope::Simple(message.clone()), None);
        message
    }

    /// Relay a peer's simple message to every other peer, as ourselves.
    pub fn relay_simple(&self, mut message: SimpleMessage, from: SocketAddr) -> usize {
        info!(
            origin = %message.original_name,
            relay = %message.relay_peer_addr,
            contents = %message.contents,
            "simple message"
        );
        message.relay_peer_addr = self.addr().to_string();
        self.broadcast(&Envelope::Simple(message), Some(from))
    }
}
