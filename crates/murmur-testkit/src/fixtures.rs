//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: clusters of nodes wired through
//! an in-memory network, and deterministic ledger data.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use murmur::gossip::{MemoryNetwork, Transport};
use murmur::{Node, NodeConfig, NodeHandle};
use murmur_core::{Block, BlockHash, FileRecord, Nonce, Transaction};

/// Gossip address of the `index`-th test node.
pub fn node_addr(index: usize) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000 + index as u16))
}

/// A configuration tuned for tests: short timers, mining off.
pub fn test_config(name: &str, index: usize, peers: Vec<SocketAddr>) -> NodeConfig {
    let mut config = NodeConfig::new(name, node_addr(index)).with_peers(peers);
    config.gossip.ack_timeout = Duration::from_millis(200);
    config.gossip.anti_entropy_interval = Duration::from_millis(50);
    config.mining.enabled = false;
    config
}

/// How nodes in a cluster are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Node i peers with i-1 and i+1.
    Line,
    /// Everybody peers with everybody.
    FullMesh,
}

impl Topology {
    fn peers_of(self, index: usize, count: usize) -> Vec<SocketAddr> {
        match self {
            Topology::Line => {
                let mut peers = Vec::new();
                if index > 0 {
                    peers.push(node_addr(index - 1));
                }
                if index + 1 < count {
                    peers.push(node_addr(index + 1));
                }
                peers
            }
            Topology::FullMesh => (0..count)
                .filter(|i| *i != index)
                .map(node_addr)
                .collect(),
        }
    }
}

/// Started nodes sharing one [`MemoryNetwork`].
///
/// Dropping the cluster stops every node.
pub struct TestCluster {
    pub network: Arc<MemoryNetwork>,
    pub nodes: Vec<Arc<Node>>,
    handles: Vec<Option<NodeHandle>>,
}

impl TestCluster {
    /// Start one node per name, connected by `topology`, after `tweak` has
    /// adjusted each configuration.
    pub async fn start(
        names: &[&str],
        topology: Topology,
        tweak: impl Fn(&mut NodeConfig),
    ) -> Self {
        let configs = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut config = test_config(name, i, topology.peers_of(i, names.len()));
                tweak(&mut config);
                config
            })
            .collect();
        Self::from_configs(configs).await
    }

    /// Start nodes from explicit configurations.
    pub async fn from_configs(configs: Vec<NodeConfig>) -> Self {
        let network = MemoryNetwork::new();
        let mut nodes = Vec::with_capacity(configs.len());
        let mut handles = Vec::with_capacity(configs.len());

        // Register every inbox before any node starts sending.
        let mut transports = Vec::with_capacity(configs.len());
        for config in &configs {
            let transport: Arc<dyn Transport> =
                Arc::new(network.create_transport(config.gossip_addr).await);
            transports.push(transport);
        }

        for (config, transport) in configs.into_iter().zip(transports) {
            let node = Node::new(config);
            let handle = node
                .start(transport, None)
                .expect("fresh node starts");
            nodes.push(node);
            handles.push(Some(handle));
        }

        Self {
            network,
            nodes,
            handles,
        }
    }

    pub fn node(&self, index: usize) -> &Arc<Node> {
        &self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stop one node's background tasks. Its state stays readable.
    pub fn stop(&mut self, index: usize) {
        if let Some(handle) = self.handles.get_mut(index).and_then(Option::take) {
            handle.shutdown();
        }
    }

    /// Drop traffic between nodes `a` and `b`.
    pub async fn partition(&self, a: usize, b: usize) {
        self.network.block(node_addr(a), node_addr(b)).await;
    }

    pub async fn heal(&self, a: usize, b: usize) {
        self.network.unblock(node_addr(a), node_addr(b)).await;
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A file record with a metafile hash derived from its name.
pub fn file(name: &str) -> FileRecord {
    let mut hash = vec![0u8; 32];
    for (slot, byte) in hash.iter_mut().zip(name.bytes()) {
        *slot = byte;
    }
    FileRecord::new(name, 1024, hash)
}

pub fn transaction(name: &str, hop_limit: u32) -> Transaction {
    Transaction::new(file(name), hop_limit)
}

/// Mine a block on `prev` by walking counter nonces from zero.
pub fn mine_block(prev: BlockHash, transactions: Vec<Transaction>) -> Block {
    let mut template = Block::template(prev);
    template.transactions = transactions;
    (0u64..)
        .map(|c| template.with_nonce(Nonce::from_counter(c)))
        .find(Block::has_valid_pow)
        .expect("a valid nonce exists")
}

/// Mine `count` chained blocks on `prev`, one transaction each.
pub fn mine_chain(prev: BlockHash, count: usize, label: &str) -> Vec<Block> {
    let mut chain: Vec<Block> = Vec::with_capacity(count);
    let mut tip = prev;
    for i in 0..count {
        let block = mine_block(tip, vec![transaction(&format!("{label}-{i}"), 10)]);
        tip = block.hash();
        chain.push(block);
    }
    chain
}
