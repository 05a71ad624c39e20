//! Node configuration.

use std::net::SocketAddr;

use murmur_gossip::GossipConfig;
use murmur_ledger::MiningConfig;

/// Default peer-facing address.
pub const DEFAULT_GOSSIP_ADDR: &str = "127.0.0.1:5000";

/// Default client (UI) port.
pub const DEFAULT_UI_PORT: u16 = 8080;

/// Configuration for one node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Origin name used for our rumors and private messages.
    pub name: String,
    /// Address peers reach us on.
    pub gossip_addr: SocketAddr,
    /// Address local clients reach us on, if any.
    pub client_addr: Option<SocketAddr>,
    /// Static peer set.
    pub peers: Vec<SocketAddr>,
    /// Plain flooding of simple messages only: no rumors, no ledger.
    pub simple_mode: bool,
    pub gossip: GossipConfig,
    pub mining: MiningConfig,
}

impl NodeConfig {
    /// Default configuration under `name` at `gossip_addr`, no client port.
    pub fn new(name: impl Into<String>, gossip_addr: SocketAddr) -> Self {
        Self {
            name: name.into(),
            gossip_addr,
            ..Self::default()
        }
    }

    pub fn with_peers(mut self, peers: Vec<SocketAddr>) -> Self {
        self.peers = peers;
        self
    }

    /// Hop limit for mined blocks: twice the base hop limit.
    pub fn block_hop_limit(&self) -> u32 {
        self.gossip.hop_limit.saturating_mul(2)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "murmur".to_string(),
            gossip_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            client_addr: None,
            peers: Vec::new(),
            simple_mode: false,
            gossip: GossipConfig::default(),
            mining: MiningConfig::default(),
        }
    }
}
