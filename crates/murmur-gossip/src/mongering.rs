//! Rumor mongering.
//!
//! One mongering attempt pushes one rumor towards one peer at a time and is
//! driven as a small state machine:
//!
//! ```text
//! Sent(peer) --register--> AwaitingAck(peer) --ack | timeout--> coin flip
//!     ^                                                          |
//!     +------------------ heads: new random peer ----------------+
//!                          tails / no peer / key busy --> Done
//! ```
//!
//! Each round owns exactly one session and one bounded timer, so every
//! attempt terminates without outside cancellation.

use std::net::SocketAddr;
use std::sync::Arc;

use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use murmur_core::Rumor;

use crate::messages::Envelope;
use crate::protocol::Gossip;
use crate::session::{SessionKey, SessionWaiter};

enum MongerState {
    /// Rumor queued for `peer`; no session yet.
    Sent(SocketAddr),
    /// Waiting for `peer` to report the rumor in its status.
    AwaitingAck(SocketAddr, SessionWaiter),
    Done,
}

impl Gossip {
    /// Spawn a mongering attempt of `rumor` starting at `target`.
    pub fn start_mongering(self: &Arc<Self>, rumor: Rumor, target: SocketAddr) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(self).monger(rumor, target))
    }

    /// Start mongering with a random peer other than `exclude`.
    ///
    /// Returns `false` if there is no such peer.
    pub fn monger_to_random_peer(self: &Arc<Self>, rumor: Rumor, exclude: Option<SocketAddr>) -> bool {
        match self.random_peer(exclude) {
            Some(target) => {
                self.start_mongering(rumor, target);
                true
            }
            None => false,
        }
    }

    async fn monger(self: Arc<Self>, rumor: Rumor, target: SocketAddr) {
        let mut state = MongerState::Sent(target);
        loop {
            state = match state {
                MongerState::Sent(peer) => {
                    self.enqueue_send(Envelope::Rumor(rumor.clone()), peer);
                    info!(%peer, origin = %rumor.origin, id = rumor.id, "mongering");

                    let key = SessionKey::new(peer, rumor.origin.as_str(), rumor.id + 1);
                    match self.sessions.register(key) {
                        Some(waiter) => MongerState::AwaitingAck(peer, waiter),
                        None => {
                            debug!(%peer, "session already pending, abandoning attempt");
                            MongerState::Done
                        }
                    }
                }
                MongerState::AwaitingAck(peer, waiter) => {
                    let outcome = waiter.wait(self.config.ack_timeout).await;
                    debug!(%peer, ?outcome, "mongering session ended");
                    self.next_target(peer)
                        .map(MongerState::Sent)
                        .unwrap_or(MongerState::Done)
                }
                MongerState::Done => return,
            };
        }
    }

    /// Flip the coin; on heads pick a new random peer other than `current`.
    fn next_target(&self, current: SocketAddr) -> Option<SocketAddr> {
        let p = coin_probability(self.config.continue_probability);
        if !rand::thread_rng().gen_bool(p) {
            return None;
        }
        let next = self.random_peer(Some(current))?;
        info!(peer = %next, "flipped coin, continuing");
        Some(next)
    }
}

/// A probability `gen_bool` accepts: clamped to [0, 1], NaN as a fair coin.
fn coin_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.5
    } else {
        p.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::{OutboundQueue, OutboundReceiver};
    use crate::protocol::GossipConfig;
    use murmur_core::PeerStatus;
    use std::time::Duration;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn node(peers: &[u16], continue_probability: f64) -> (Arc<Gossip>, OutboundReceiver) {
        let (queue, rx) = OutboundQueue::new();
        let config = GossipConfig {
            continue_probability,
            ..GossipConfig::default()
        };
        let gossip = Gossip::new(
            "a",
            addr(5000),
            peers.iter().map(|p| addr(*p)).collect(),
            config,
            queue,
        );
        (gossip, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ack_ends_session_without_continuation() {
        let (gossip, mut rx) = node(&[5001], 0.0);
        let rumor = Rumor::new("a", 1, "hi");
        let handle = gossip.start_mongering(rumor.clone(), addr(5001));

        let sent = rx.recv().await.unwrap();
        assert_eq!(sent.envelope, Envelope::Rumor(rumor));
        tokio::task::yield_now().await;
        let key = SessionKey::new(addr(5001), "a", 2);
        assert!(gossip.sessions().contains(&key));

        assert_eq!(
            gossip.sessions().signal(addr(5001), &[PeerStatus::new("a", 2)]),
            1
        );
        handle.await.unwrap();
        assert!(gossip.sessions().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_ends_session() {
        let (gossip, mut rx) = node(&[5001], 0.0);
        let handle = gossip.start_mongering(Rumor::new("a", 1, "hi"), addr(5001));
        rx.recv().await.unwrap();

        tokio::time::advance(Duration::from_millis(1001)).await;
        handle.await.unwrap();
        assert!(gossip.sessions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heads_continues_to_another_peer() {
        let (gossip, mut rx) = node(&[5001, 5002], 1.0);
        gossip.start_mongering(Rumor::new("a", 1, "hi"), addr(5001));

        assert_eq!(rx.recv().await.unwrap().destination, addr(5001));
        tokio::time::advance(Duration::from_millis(1001)).await;
        // The only other peer.
        assert_eq!(rx.recv().await.unwrap().destination, addr(5002));
        tokio::time::advance(Duration::from_millis(1001)).await;
        assert_eq!(rx.recv().await.unwrap().destination, addr(5001));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_key_abandons_second_attempt() {
        let (gossip, mut rx) = node(&[5001], 0.0);
        let rumor = Rumor::new("a", 1, "hi");
        let first = gossip.start_mongering(rumor.clone(), addr(5001));
        rx.recv().await.unwrap();
        tokio::task::yield_now().await;

        let second = gossip.start_mongering(rumor, addr(5001));
        // The second attempt still sends, then finds the key taken.
        rx.recv().await.unwrap();
        second.await.unwrap();
        assert_eq!(gossip.sessions().len(), 1);

        tokio::time::advance(Duration::from_millis(1001)).await;
        first.await.unwrap();
        assert!(gossip.sessions().is_empty());
    }

    #[test]
    fn test_no_peer_no_mongering() {
        let (gossip, _rx) = node(&[], 1.0);
        assert!(!gossip.monger_to_random_peer(Rumor::new("a", 1, "hi"), None));
    }

    #[test]
    fn test_coin_probability_is_always_usable() {
        assert_eq!(coin_probability(f64::NAN), 0.5);
        assert_eq!(coin_probability(1.5), 1.0);
        assert_eq!(coin_probability(-0.1), 0.0);
        assert_eq!(coin_probability(0.25), 0.25);
    }

    #[test]
    fn test_nan_continue_probability_does_not_panic() {
        let (gossip, _rx) = node(&[5001, 5002], f64::NAN);
        for _ in 0..32 {
            let next = gossip.next_target(addr(5001));
            assert!(next.is_none() || next == Some(addr(5002)));
        }
    }
}
