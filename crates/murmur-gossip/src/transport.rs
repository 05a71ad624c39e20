//! Transport abstraction for gossip datagrams.
//!
//! A transport moves whole envelopes between socket addresses with
//! datagram semantics: no ordering, no delivery guarantee, no retry.
//! Implementations decode at the boundary and silently skip anything
//! undecodable.

use std::net::SocketAddr;

use async_trait::async_trait;

use crate::error::Result;
use crate::messages::Envelope;

/// Transport trait for sending and receiving envelopes.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an envelope to an address.
    async fn send(&self, to: SocketAddr, envelope: &Envelope) -> Result<()>;

    /// Receive the next well-formed envelope.
    ///
    /// Returns the sender's address and the envelope. Only fails when the
    /// transport itself is gone.
    async fn recv(&self) -> Result<(SocketAddr, Envelope)>;

    /// The address this transport receives on.
    fn local_addr(&self) -> SocketAddr;
}

/// An in-memory transport for testing.
///
/// Envelopes go through the real codec, so tests exercise the same
/// decode boundary as UDP. Links can be blocked to simulate loss.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    use bytes::Bytes;
    use tokio::sync::{mpsc, Mutex, RwLock};
    use tracing::{trace, warn};

    use crate::codec;
    use crate::error::GossipError;

    type Datagram = (SocketAddr, Bytes);

    /// Shared state for the memory transport network.
    #[derive(Default)]
    pub struct MemoryNetwork {
        /// Inbox of each attached address.
        inboxes: RwLock<HashMap<SocketAddr, mpsc::UnboundedSender<Datagram>>>,
        /// Directed links that drop everything.
        blocked: RwLock<HashSet<(SocketAddr, SocketAddr)>>,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Create a transport receiving at `addr`.
        pub async fn create_transport(self: &Arc<Self>, addr: SocketAddr) -> MemoryTransport {
            let (tx, rx) = mpsc::unbounded_channel();
            self.inboxes.write().await.insert(addr, tx);

            MemoryTransport {
                addr,
                network: Arc::clone(self),
                receiver: Mutex::new(rx),
            }
        }

        /// Drop all traffic between `a` and `b`, both directions.
        pub async fn block(&self, a: SocketAddr, b: SocketAddr) {
            let mut blocked = self.blocked.write().await;
            blocked.insert((a, b));
            blocked.insert((b, a));
        }

        /// Restore traffic between `a` and `b`.
        pub async fn unblock(&self, a: SocketAddr, b: SocketAddr) {
            let mut blocked = self.blocked.write().await;
            blocked.remove(&(a, b));
            blocked.remove(&(b, a));
        }

        /// Inject raw bytes, as if `from` had sent them to `to`.
        pub async fn inject_raw(&self, from: SocketAddr, to: SocketAddr, datagram: Bytes) -> bool {
            match self.inboxes.read().await.get(&to) {
                Some(inbox) => inbox.send((from, datagram)).is_ok(),
                None => false,
            }
        }
    }

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        addr: SocketAddr,
        network: Arc<MemoryNetwork>,
        receiver: Mutex<mpsc::UnboundedReceiver<Datagram>>,
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(&self, to: SocketAddr, envelope: &Envelope) -> Result<()> {
            let datagram = codec::encode(envelope)?;

            if self.network.blocked.read().await.contains(&(self.addr, to)) {
                trace!(from = %self.addr, %to, "link blocked, dropping datagram");
                return Ok(());
            }

            let inboxes = self.network.inboxes.read().await;
            let inbox = inboxes.get(&to).ok_or(GossipError::Unreachable(to))?;
            inbox
                .send((self.addr, datagram))
                .map_err(|_| GossipError::TransportError("peer disconnected".into()))
        }

        async fn recv(&self) -> Result<(SocketAddr, Envelope)> {
            let mut rx = self.receiver.lock().await;
            loop {
                let (from, datagram) = rx.recv().await.ok_or(GossipError::ChannelClosed)?;
                match codec::decode(&datagram) {
                    Ok(envelope) => return Ok((from, envelope)),
                    Err(e) => warn!(%from, "dropping undecodable datagram: {}", e),
                }
            }
        }

        fn local_addr(&self) -> SocketAddr {
            self.addr
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryNetwork;
    use super::*;
    use bytes::Bytes;
    use murmur_core::Rumor;
    use std::time::Duration;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[tokio::test]
    async fn test_memory_transport_send_recv() {
        let network = MemoryNetwork::new();
        let a = network.create_transport(addr(5000)).await;
        let b = network.create_transport(addr(5001)).await;

        let env = Envelope::Rumor(Rumor::new("a", 1, "hi"));
        a.send(b.local_addr(), &env).await.unwrap();

        let (from, received) = b.recv().await.unwrap();
        assert_eq!(from, addr(5000));
        assert_eq!(received, env);
    }

    #[tokio::test]
    async fn test_send_to_unknown_address_fails() {
        let network = MemoryNetwork::new();
        let a = network.create_transport(addr(5000)).await;
        let env = Envelope::Rumor(Rumor::new("a", 1, "hi"));
        assert!(a.send(addr(6000), &env).await.is_err());
    }

    #[tokio::test]
    async fn test_blocked_link_drops_until_unblocked() {
        let network = MemoryNetwork::new();
        let a = network.create_transport(addr(5000)).await;
        let b = network.create_transport(addr(5001)).await;

        network.block(a.local_addr(), b.local_addr()).await;
        a.send(b.local_addr(), &Envelope::Rumor(Rumor::new("a", 1, "lost")))
            .await
            .unwrap();
        assert!(tokio::time::timeout(Duration::from_millis(50), b.recv())
            .await
            .is_err());

        network.unblock(a.local_addr(), b.local_addr()).await;
        let env = Envelope::Rumor(Rumor::new("a", 2, "found"));
        a.send(b.local_addr(), &env).await.unwrap();
        assert_eq!(b.recv().await.unwrap().1, env);
    }

    #[tokio::test]
    async fn test_undecodable_datagram_is_skipped() {
        let network = MemoryNetwork::new();
        let b = network.create_transport(addr(5001)).await;

        assert!(
            network
                .inject_raw(addr(5000), addr(5001), Bytes::from_static(&[0xff, 0xfe]))
                .await
        );
        let env = Envelope::Rumor(Rumor::new("a", 1, "ok"));
        let a = network.create_transport(addr(5000)).await;
        a.send(b.local_addr(), &env).await.unwrap();

        assert_eq!(b.recv().await.unwrap().1, env);
    }
}
