//! The gossip context.
//!
//! [`Gossip`] owns everything the rumor protocol shares between tasks: the
//! vector clock, the message logs, the routing table and the pending
//! sessions, each behind its own lock. Handlers never hold a lock across an
//! `.await`; all network writes go through the outbound queue.
//!
//! Lock order, where two are held: clock, then message log.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::seq::IteratorRandom;
use tracing::{debug, info, warn};

use murmur_core::{validate_rumor, MessageLog, PeerStatus, Rumor, VectorClock};

use crate::error::{GossipError, Result};
use crate::messages::{Envelope, PrivateMessage, StatusPacket};
use crate::outbound::OutboundQueue;
use crate::routing::RoutingTable;
use crate::session::PendingSessions;

/// Configuration for gossip behavior.
#[derive(Debug, Clone)]
pub struct GossipConfig {
    /// How long a mongering session waits for an acknowledging status.
    pub ack_timeout: Duration,
    /// Probability of continuing to a new peer after a session ends.
    pub continue_probability: f64,
    /// Period of the anti-entropy ticker.
    pub anti_entropy_interval: Duration,
    /// Period of route announcements; `None` disables them.
    pub route_rumor_interval: Option<Duration>,
    /// Base hop limit for private messages and ledger flooding.
    pub hop_limit: u32,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(1),
            continue_probability: 0.5,
            anti_entropy_interval: Duration::from_secs(1),
            route_rumor_interval: None,
            hop_limit: 10,
        }
    }
}

/// Shared state and handlers of the rumor protocol for one node.
pub struct Gossip {
    name: String,
    addr: SocketAddr,
    peers: Vec<SocketAddr>,
    pub(crate) config: GossipConfig,
    clock: Mutex<VectorClock>,
    log: Mutex<MessageLog>,
    private_log: Mutex<Vec<PrivateMessage>>,
    routes: RoutingTable,
    pub(crate) sessions: PendingSessions,
    outbound: OutboundQueue,
}

impl Gossip {
    /// Create the context for node `name` listening on `addr`.
    ///
    /// `addr` is dropped from `peers` if present; the peer set is fixed
    /// from here on.
    pub fn new(
        name: impl Into<String>,
        addr: SocketAddr,
        peers: Vec<SocketAddr>,
        config: GossipConfig,
        outbound: OutboundQueue,
    ) -> Arc<Self> {
        let name = name.into();
        let mut unique = Vec::with_capacity(peers.len());
        for peer in peers {
            if peer != addr && !unique.contains(&peer) {
                unique.push(peer);
            }
        }

        Arc::new(Self {
            clock: Mutex::new(VectorClock::for_origin(&name)),
            name,
            addr,
            peers: unique,
            config,
            log: Mutex::new(MessageLog::new()),
            private_log: Mutex::new(Vec::new()),
            routes: RoutingTable::new(),
            sessions: PendingSessions::new(),
            outbound,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors and snapshots
    // ─────────────────────────────────────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn peers(&self) -> &[SocketAddr] {
        &self.peers
    }

    pub fn config(&self) -> &GossipConfig {
        &self.config
    }

    /// Copy of the vector clock.
    pub fn vector_clock(&self) -> Vec<PeerStatus> {
        self.clock.lock().unwrap().snapshot()
    }

    /// Our status packet: the vector clock as sent on the wire.
    pub fn status(&self) -> StatusPacket {
        StatusPacket {
            want: self.vector_clock(),
        }
    }

    /// Text rumors in admission order. Route rumors are left out.
    pub fn messages(&self) -> Vec<Rumor> {
        self.log.lock().unwrap().text_rumors()
    }

    /// Stored rumor `(origin, id)`, route rumors included.
    pub fn find_rumor(&self, origin: &str, id: u32) -> Option<Rumor> {
        self.log.lock().unwrap().find(origin, id).cloned()
    }

    /// Private messages sent by or delivered to this node.
    pub fn private_messages(&self) -> Vec<PrivateMessage> {
        self.private_log.lock().unwrap().clone()
    }

    /// Copy of the routing table.
    pub fn routes(&self) -> BTreeMap<String, SocketAddr> {
        self.routes.snapshot()
    }

    /// Next hop towards `name`.
    pub fn route_to(&self, name: &str) -> Option<SocketAddr> {
        self.routes.route_to(name)
    }

    pub fn sessions(&self) -> &PendingSessions {
        &self.sessions
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sending
    // ─────────────────────────────────────────────────────────────────────────

    /// Queue one envelope. The only way anything leaves this node.
    pub fn enqueue_send(&self, envelope: Envelope, destination: SocketAddr) {
        self.outbound.enqueue_send(envelope, destination);
    }

    /// Queue `envelope` for every peer except `except`. Returns the count.
    pub fn broadcast(&self, envelope: &Envelope, except: Option<SocketAddr>) -> usize {
        let mut sent = 0;
        for peer in self.peers.iter().filter(|p| Some(**p) != except) {
            self.enqueue_send(envelope.clone(), *peer);
            sent += 1;
        }
        sent
    }

    /// A uniformly random peer other than `exclude`.
    pub fn random_peer(&self, exclude: Option<SocketAddr>) -> Option<SocketAddr> {
        self.peers
            .iter()
            .filter(|p| Some(**p) != exclude)
            .choose(&mut rand::thread_rng())
            .copied()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Rumors
    // ─────────────────────────────────────────────────────────────────────────

    /// Admit a rumor into the clock and the log.
    ///
    /// Exactly-once: succeeds iff `rumor.id` is the id the clock expects.
    fn admit(&self, rumor: &Rumor) -> bool {
        let mut clock = self.clock.lock().unwrap();
        if !clock.update(&rumor.origin, rumor.id) {
            return false;
        }
        self.log.lock().unwrap().append(rumor.clone());
        true
    }

    /// Author a rumor under our own name with the next local id.
    pub(crate) fn author(&self, text: String) -> Result<Rumor> {
        let mut clock = self.clock.lock().unwrap();
        let id = clock.next_id(&self.name);
        let rumor = Rumor::new(self.name.as_str(), id, text);
        clock.try_update(&rumor.origin, rumor.id)?;
        self.log.lock().unwrap().append(rumor.clone());
        Ok(rumor)
    }

    /// Author a text rumor and start mongering it to a random peer.
    pub fn try_submit_rumor(self: &Arc<Self>, text: impl Into<String>) -> Result<Rumor> {
        let text = text.into();
        if text.is_empty() {
            return Err(GossipError::EmptyRumor);
        }

        let rumor = self.author(text)?;
        info!(id = rumor.id, text = %rumor.text, "authored rumor");
        self.monger_to_random_peer(rumor.clone(), None);
        Ok(rumor)
    }

    /// Boolean form of [`try_submit_rumor`](Self::try_submit_rumor).
    pub fn submit_rumor(self: &Arc<Self>, text: impl Into<String>) -> bool {
        match self.try_submit_rumor(text) {
            Ok(_) => true,
            Err(e) => {
                debug!("rumor not submitted: {}", e);
                false
            }
        }
    }

    /// Handle a rumor from a peer.
    ///
    /// A new rumor is admitted and teaches us a next hop towards its
    /// origin. Whether new or not, the sender gets our status so it can
    /// tell what we are missing. Returns whether the rumor was admitted.
    pub fn on_rumor(&self, rumor: Rumor, from: SocketAddr) -> bool {
        if let Err(e) = validate_rumor(&rumor) {
            warn!(%from, "dropping malformed rumor: {}", e);
            return false;
        }

        let admitted = self.admit(&rumor);
        if admitted {
            if rumor.origin != self.name && from != self.addr {
                self.routes.register_next_hop(&rumor.origin, from);
            }
            if !rumor.is_route_rumor() {
                info!(
                    origin = %rumor.origin,
                    id = rumor.id,
                    %from,
                    text = %rumor.text,
                    "rumor admitted"
                );
            }
        } else {
            debug!(origin = %rumor.origin, id = rumor.id, %from, "rumor not admitted");
        }

        self.enqueue_send(Envelope::Status(self.status()), from);
        admitted
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Route rumors
    // ─────────────────────────────────────────────────────────────────────────

    /// Author one route rumor and monger it to each of `targets`.
    pub fn announce_route(self: &Arc<Self>, targets: &[SocketAddr]) -> Result<Rumor> {
        let rumor = self.author(String::new())?;
        for target in targets {
            self.start_mongering(rumor.clone(), *target);
        }
        Ok(rumor)
    }

    /// Announce to every peer now, then to one random peer every `period`.
    pub async fn run_route_rumors(self: Arc<Self>, period: Duration) {
        let peers = self.peers.clone();
        if let Err(e) = self.announce_route(&peers) {
            warn!("route announcement failed: {}", e);
        }

        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(peer) = self.random_peer(None) else {
                continue;
            };
            if let Err(e) = self.announce_route(&[peer]) {
                warn!("route announcement failed: {}", e);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private messages
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a private message to `destination` via its next hop.
    ///
    /// The message is recorded locally whether or not a route exists.
    pub fn send_private(
        &self,
        destination: impl Into<String>,
        text: impl Into<String>,
        hop_limit: Option<u32>,
    ) -> PrivateMessage {
        let message = PrivateMessage {
            origin: self.name.clone(),
            id: 0,
            text: text.into(),
            destination: destination.into(),
            hop_limit: hop_limit.unwrap_or(self.config.hop_limit),
        };
        self.private_log.lock().unwrap().push(message.clone());
        self.forward_private(message.clone());
        message
    }

    /// Handle a private message from a peer: deliver or forward.
    pub fn on_private(&self, message: PrivateMessage, from: SocketAddr) {
        if message.destination == self.name {
            info!(origin = %message.origin, %from, text = %message.text, "private message delivered");
            self.private_log.lock().unwrap().push(message);
        } else {
            self.forward_private(message);
        }
    }

    /// Decrement the hop limit and pass to the next hop, if any.
    fn forward_private(&self, mut message: PrivateMessage) -> bool {
        message.hop_limit = message.hop_limit.saturating_sub(1);
        if message.hop_limit == 0 {
            debug!(destination = %message.destination, "private message hop limit reached");
            return false;
        }
        let Some(next_hop) = self.route_to(&message.destination) else {
            debug!(destination = %message.destination, "no route, dropping private message");
            return false;
        };
        self.enqueue_send(Envelope::Private(message), next_hop);
        true
    }
}
