//! Status handling and anti-entropy.
//!
//! Two nodes converge by exchanging vector-clock snapshots. Whoever is
//! ahead on an origin pushes the rumor the other expects next; whoever is
//! behind answers with its own snapshot so the other side can do the same.
//! Anti-entropy starts such an exchange with a random peer every tick, so
//! rumors missed by mongering are eventually recovered.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, info};

use murmur_core::{ClockComparison, PeerStatus, VectorClock};

use crate::messages::{Envelope, StatusPacket};
use crate::protocol::Gossip;

impl Gossip {
    /// Handle a status packet from `from`.
    ///
    /// Algorithm:
    /// 1. Acknowledge every pending session the status matches
    /// 2. Compare the status against a snapshot of our clock
    /// 3. If they have anything we lack, send them our status
    /// 4. For each origin where we lead, monger the rumor they expect next
    pub fn on_status(self: &Arc<Self>, status: StatusPacket, from: SocketAddr) -> ClockComparison {
        // 1. Acks
        let acked = self.sessions.signal(from, &status.want);
        debug!(%from, entries = status.want.len(), acked, "status received");

        // 2. Compare
        let ours = VectorClock::from_entries(self.vector_clock());
        let comparison = ours.compare(&status.want);

        // 3. Ask
        if comparison.we_are_behind {
            self.enqueue_send(
                Envelope::Status(StatusPacket {
                    want: ours.snapshot(),
                }),
                from,
            );
        }

        // 4. Push
        for need in &comparison.they_need {
            match self.find_rumor(&need.identifier, need.next_id) {
                Some(rumor) => {
                    self.start_mongering(rumor, from);
                }
                None => debug!(
                    origin = %need.identifier,
                    id = need.next_id,
                    "rumor counted by clock but not in log"
                ),
            }
        }

        if comparison.in_sync() {
            info!(peer = %from, "in sync with peer");
        }
        comparison
    }

    /// Send our status to one random peer. Returns the chosen peer.
    pub fn anti_entropy_round(&self) -> Option<SocketAddr> {
        let peer = self.random_peer(None)?;
        debug!(%peer, "anti-entropy");
        self.enqueue_send(Envelope::Status(self.status()), peer);
        Some(peer)
    }

    /// Run [`anti_entropy_round`](Self::anti_entropy_round) forever, once
    /// per `anti_entropy_interval`.
    pub async fn run_anti_entropy(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.anti_entropy_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.anti_entropy_round();
        }
    }
}

/// True if two snapshots describe the same clock.
///
/// Entry order is irrelevant and an origin at [`murmur_core::FIRST_ID`]
/// equals an absent one.
pub fn clocks_converged(a: &[PeerStatus], b: &[PeerStatus]) -> bool {
    let a_clock = VectorClock::from_entries(a.to_vec());
    let b_clock = VectorClock::from_entries(b.to_vec());
    a_clock.compare(b).in_sync() && b_clock.compare(a).in_sync()
}
