//! Next-hop routing table.
//!
//! Learned opportunistically from rumor relay: the last peer that relayed a
//! new rumor from an origin becomes the next hop towards that origin. There
//! is no distance metric and no loop avoidance.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::RwLock;

use tracing::info;

/// `origin name -> next-hop address`, last relay wins.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: RwLock<BTreeMap<String, SocketAddr>>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the next hop for `origin`.
    pub fn register_next_hop(&self, origin: &str, via: SocketAddr) {
        let previous = self.routes.write().unwrap().insert(origin.to_string(), via);
        if previous != Some(via) {
            info!(origin, next_hop = %via, "next hop updated");
        }
    }

    /// Next hop towards `origin`, if one has been learned.
    pub fn route_to(&self, origin: &str) -> Option<SocketAddr> {
        self.routes.read().unwrap().get(origin).copied()
    }

    /// Copy of the table, ordered by origin name.
    pub fn snapshot(&self) -> BTreeMap<String, SocketAddr> {
        self.routes.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.routes.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().unwrap().is_empty()
    }
}
