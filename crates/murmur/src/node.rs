//! The Node: one context object for everything a murmur peer does.
//!
//! The node owns the gossip context and the ledger, dispatches every inbound
//! envelope to the right handler, floods ledger transactions and blocks, and
//! runs the background tasks: receive loops, the outbound sender,
//! anti-entropy, route announcements, the miner and the delayed block
//! publisher.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use murmur_core::{Block, BlockHash, FileRecord, PeerStatus, Rumor, Transaction};
use murmur_gossip::messages::limits;
use murmur_gossip::{
    run_sender, BlockPublish, Envelope, Gossip, OutboundQueue, OutboundReceiver, PrivateMessage,
    SimpleMessage, Transport,
};
use murmur_ledger::{BlockLimits, Ledger, MinedBlock, Miner, BLOCK_ENVELOPE_OVERHEAD};

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};

/// A file-exchange envelope handed to the external collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEnvelope {
    pub envelope: Envelope,
    pub from: SocketAddr,
    pub from_client: bool,
}

/// The main Node struct.
///
/// Provides:
/// - Dispatch of inbound envelopes from peers and local clients
/// - Rumor submission and private messaging
/// - Transaction publication and block flooding
/// - Read-only snapshots for a UI
pub struct Node {
    config: NodeConfig,
    gossip: Arc<Gossip>,
    /// Fork tree and mining template, under one lock.
    ledger: Arc<Mutex<Ledger>>,
    outbound_rx: Mutex<Option<OutboundReceiver>>,
    external_tx: mpsc::UnboundedSender<ExternalEnvelope>,
    external_rx: Mutex<Option<mpsc::UnboundedReceiver<ExternalEnvelope>>>,
}

impl Node {
    /// Create a node. Nothing runs until [`start`](Self::start).
    pub fn new(config: NodeConfig) -> Arc<Self> {
        let (outbound, outbound_rx) = OutboundQueue::new();
        let gossip = Gossip::new(
            config.name.clone(),
            config.gossip_addr,
            config.peers.clone(),
            config.gossip.clone(),
            outbound,
        );
        let (external_tx, external_rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            config,
            gossip,
            ledger: Arc::new(Mutex::new(Ledger::with_limits(block_limits()))),
            outbound_rx: Mutex::new(Some(outbound_rx)),
            external_tx,
            external_rx: Mutex::new(Some(external_rx)),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn gossip(&self) -> &Arc<Gossip> {
        &self.gossip
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Spawn every background task.
    ///
    /// `peers` carries all peer traffic, inbound and outbound. `client`, if
    /// given, only receives: local clients get no replies.
    pub fn start(
        self: &Arc<Self>,
        peers: Arc<dyn Transport>,
        client: Option<Arc<dyn Transport>>,
    ) -> Result<NodeHandle> {
        let outbound_rx = self
            .outbound_rx
            .lock()
            .unwrap()
            .take()
            .ok_or(NodeError::AlreadyStarted)?;

        let mut tasks = vec![
            tokio::spawn(run_sender(Arc::clone(&peers), outbound_rx)),
            tokio::spawn(Arc::clone(self).receive_loop(peers, false)),
        ];
        if let Some(client) = client {
            tasks.push(tokio::spawn(Arc::clone(self).receive_loop(client, true)));
        }

        let mut miner_stop = None;
        if !self.config.simple_mode {
            tasks.push(tokio::spawn(Arc::clone(&self.gossip).run_anti_entropy()));

            if let Some(period) = self.config.gossip.route_rumor_interval {
                tasks.push(tokio::spawn(
                    Arc::clone(&self.gossip).run_route_rumors(period),
                ));
            }

            if self.config.mining.enabled {
                let (found_tx, found_rx) = mpsc::unbounded_channel();
                let miner = Miner::new(
                    Arc::clone(&self.ledger),
                    self.config.mining.clone(),
                    found_tx,
                );
                miner_stop = Some(miner.stop_flag());
                tokio::task::spawn_blocking(move || miner.run());
                tasks.push(tokio::spawn(Arc::clone(self).run_block_publisher(found_rx)));
            }
        }

        info!(
            name = %self.config.name,
            addr = %self.config.gossip_addr,
            peers = self.gossip.peers().len(),
            simple = self.config.simple_mode,
            "node started"
        );
        Ok(NodeHandle { tasks, miner_stop })
    }

    async fn receive_loop(self: Arc<Self>, transport: Arc<dyn Transport>, from_client: bool) {
        loop {
            match transport.recv().await {
                Ok((from, envelope)) => self.on_envelope_received(envelope, from, from_client),
                Err(e) => {
                    warn!(from_client, "receive loop ending: {}", e);
                    return;
                }
            }
        }
    }

    /// Announce each mined block once its publication delay has passed.
    async fn run_block_publisher(self: Arc<Self>, mut found: mpsc::UnboundedReceiver<MinedBlock>) {
        let mut pending = JoinSet::new();
        loop {
            tokio::select! {
                Some(mined) = found.recv() => {
                    debug!(block = %mined.hash, delay = ?mined.publish_delay, "scheduling block announcement");
                    let node = Arc::clone(&self);
                    pending.spawn(async move {
                        tokio::time::sleep(mined.publish_delay).await;
                        node.announce_block(mined.block);
                    });
                }
                Some(_) = pending.join_next(), if !pending.is_empty() => {}
                else => break,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    /// Route one decoded envelope to its handler.
    pub fn on_envelope_received(&self, envelope: Envelope, from: SocketAddr, from_client: bool) {
        if envelope.is_file_exchange() {
            self.hand_off(envelope, from, from_client);
            return;
        }
        if from_client {
            self.on_client_envelope(envelope, from);
        } else {
            self.on_peer_envelope(envelope, from);
        }
    }

    fn on_client_envelope(&self, envelope: Envelope, from: SocketAddr) {
        match envelope {
            Envelope::Simple(SimpleMessage { contents, .. }) => {
                if self.config.simple_mode {
                    self.gossip.broadcast_simple(contents);
                } else {
                    self.gossip.submit_rumor(contents);
                }
            }
            Envelope::Private(PrivateMessage {
                destination,
                text,
                hop_limit,
                ..
            }) => {
                let hop_limit = (hop_limit > 0).then_some(hop_limit);
                self.gossip.send_private(destination, text, hop_limit);
            }
            Envelope::TxPublish(tx) => {
                if let Err(e) = self.publish_transaction(tx.file) {
                    debug!("client transaction not published: {}", e);
                }
            }
            other => debug!(kind = other.kind(), %from, "ignoring client envelope"),
        }
    }

    fn on_peer_envelope(&self, envelope: Envelope, from: SocketAddr) {
        if self.config.simple_mode {
            match envelope {
                Envelope::Simple(message) => {
                    self.gossip.relay_simple(message, from);
                }
                other => debug!(kind = other.kind(), %from, "ignoring envelope in simple mode"),
            }
            return;
        }

        match envelope {
            Envelope::Rumor(rumor) => {
                self.gossip.on_rumor(rumor, from);
            }
            Envelope::Status(status) => {
                self.gossip.on_status(status, from);
            }
            Envelope::Private(message) => self.gossip.on_private(message, from),
            Envelope::TxPublish(tx) => self.on_transaction(tx, from),
            Envelope::BlockPublish(publish) => self.on_block(publish, from),
            other => debug!(kind = other.kind(), %from, "ignoring peer envelope"),
        }
    }

    fn hand_off(&self, envelope: Envelope, from: SocketAddr, from_client: bool) {
        let kind = envelope.kind();
        if self
            .external_tx
            .send(ExternalEnvelope {
                envelope,
                from,
                from_client,
            })
            .is_err()
        {
            debug!(kind, %from, "no file-exchange collaborator, dropping envelope");
        }
    }

    /// The file-exchange inbox. Can be taken once.
    pub fn take_external_inbox(&self) -> Option<mpsc::UnboundedReceiver<ExternalEnvelope>> {
        self.external_rx.lock().unwrap().take()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Gossip entry points
    // ─────────────────────────────────────────────────────────────────────────

    /// Author a rumor. Returns whether it was admitted.
    pub fn submit_rumor(&self, text: impl Into<String>) -> bool {
        self.gossip.submit_rumor(text)
    }

    pub fn send_private(&self, destination: &str, text: &str) -> PrivateMessage {
        self.gossip.send_private(destination, text, None)
    }

    pub fn route_to(&self, name: &str) -> Option<SocketAddr> {
        self.gossip.route_to(name)
    }

    pub fn enqueue_send(&self, envelope: Envelope, destination: SocketAddr) {
        self.gossip.enqueue_send(envelope, destination);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger
    // ─────────────────────────────────────────────────────────────────────────

    /// Queue a file name for mining and flood it to every peer.
    pub fn publish_transaction(&self, file: FileRecord) -> Result<Transaction> {
        if self.config.simple_mode {
            return Err(NodeError::SimpleMode);
        }

        let tx = Transaction::new(file, self.config.gossip.hop_limit);
        self.ledger.lock().unwrap().admit_transaction(tx.clone())?;
        info!(name = tx.name(), "published transaction");
        self.gossip.broadcast(&Envelope::TxPublish(tx.clone()), None);
        Ok(tx)
    }

    /// Admit a peer's transaction and, if new, flood it onwards.
    pub fn on_transaction(&self, mut tx: Transaction, from: SocketAddr) {
        if let Err(e) = self.ledger.lock().unwrap().admit_transaction(tx.clone()) {
            debug!(%from, "transaction not admitted: {}", e);
            return;
        }
        tx.hop_limit = tx.hop_limit.saturating_sub(1);
        if tx.hop_limit > 0 {
            self.gossip.broadcast(&Envelope::TxPublish(tx), Some(from));
        }
    }

    /// Insert a peer's block and, if accepted, flood it onwards.
    pub fn on_block(&self, mut publish: BlockPublish, from: SocketAddr) {
        let accepted = self
            .ledger
            .lock()
            .unwrap()
            .insert_block(publish.block.clone());
        if let Err(e) = accepted {
            debug!(%from, "block not accepted: {}", e);
            return;
        }
        publish.hop_limit = publish.hop_limit.saturating_sub(1);
        if publish.hop_limit > 0 {
            self.gossip
                .broadcast(&Envelope::BlockPublish(publish), Some(from));
        }
    }

    /// Flood one of our own blocks with twice the base hop limit.
    pub fn announce_block(&self, block: Block) {
        info!(block = %block.hash(), "announcing block");
        let publish = BlockPublish {
            block,
            hop_limit: self.config.block_hop_limit(),
        };
        self.gossip.broadcast(&Envelope::BlockPublish(publish), None);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────────────────

    /// Text rumors in admission order.
    pub fn messages(&self) -> Vec<Rumor> {
        self.gossip.messages()
    }

    pub fn private_messages(&self) -> Vec<PrivateMessage> {
        self.gossip.private_messages()
    }

    pub fn peers(&self) -> Vec<SocketAddr> {
        self.gossip.peers().to_vec()
    }

    /// Origin name -> next hop.
    pub fn routes(&self) -> BTreeMap<String, SocketAddr> {
        self.gossip.routes()
    }

    pub fn vector_clock(&self) -> Vec<PeerStatus> {
        self.gossip.vector_clock()
    }

    /// The adopted fork, genesis first.
    pub fn current_fork(&self) -> Vec<Block> {
        self.ledger.lock().unwrap().current_fork().to_vec()
    }

    pub fn chain_tip(&self) -> Option<BlockHash> {
        self.ledger.lock().unwrap().tip()
    }

    /// The pending block with every queued transaction. The miner works on
    /// a bounded prefix of it.
    pub fn mining_block(&self) -> Block {
        self.ledger.lock().unwrap().mining_block().clone()
    }

    #[cfg(test)]
    pub(crate) fn take_outbound(&self) -> Option<OutboundReceiver> {
        self.outbound_rx.lock().unwrap().take()
    }
}

/// Mined blocks must fit one datagram and pass peers' block checks.
fn block_limits() -> BlockLimits {
    BlockLimits {
        max_transactions: limits::MAX_BLOCK_TRANSACTIONS,
        max_transaction_bytes: limits::MAX_DATAGRAM_SIZE - BLOCK_ENVELOPE_OVERHEAD,
    }
}

/// Handle to a started node's background tasks.
///
/// Dropping the handle stops them.
pub struct NodeHandle {
    tasks: Vec<JoinHandle<()>>,
    miner_stop: Option<Arc<AtomicBool>>,
}

impl NodeHandle {
    /// Abort every task and stop the miner after its current batch.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        if let Some(stop) = &self.miner_stop {
            stop.store(true, Ordering::Relaxed);
        }
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::Nonce;
    use murmur_gossip::{Outbound, StatusPacket};

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn node(simple_mode: bool) -> (Arc<Node>, OutboundReceiver) {
        let mut config =
            NodeConfig::new("b", addr(5001)).with_peers(vec![addr(5000), addr(5002)]);
        config.simple_mode = simple_mode;
        config.gossip.continue_probability = 0.0;
        config.mining.enabled = false;
        let node = Node::new(config);
        let rx = node.take_outbound().unwrap();
        (node, rx)
    }

    fn drain(rx: &mut OutboundReceiver) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(o) = rx.try_recv() {
            out.push(o);
        }
        out
    }

    fn file(name: &str) -> FileRecord {
        FileRecord::new(name, 42, vec![7; 32])
    }

    fn mined(prev: BlockHash, txs: Vec<Transaction>) -> Block {
        let mut template = Block::template(prev);
        template.transactions = txs;
        (0u64..)
            .map(|i| template.with_nonce(Nonce::from_counter(i)))
            .find(Block::has_valid_pow)
            .unwrap()
    }

    #[test]
    fn test_peer_transaction_is_flooded_with_decremented_hop_limit() {
        let (node, mut rx) = node(false);
        let tx = Transaction::new(file("a.txt"), 3);
        node.on_envelope_received(Envelope::TxPublish(tx.clone()), addr(5000), false);

        assert!(node.mining_block().contains_file_name("a.txt"));
        let out = drain(&mut rx);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].destination, addr(5002));
        let Envelope::TxPublish(forwarded) = &out[0].envelope else {
            panic!("expected tx");
        };
        assert_eq!(forwarded.hop_limit, 2);

        // Same name again: rejected, not forwarded.
        node.on_envelope_received(Envelope::TxPublish(tx), addr(5002), false);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_transaction_at_last_hop_is_kept_not_forwarded() {
        let (node, mut rx) = node(false);
        node.on_transaction(Transaction::new(file("b.txt"), 1), addr(5000));
        assert!(node.mining_block().contains_file_name("b.txt"));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_publish_transaction_floods_all_peers() {
        let (node, mut rx) = node(false);
        let tx = node.publish_transaction(file("c.txt")).unwrap();
        assert_eq!(tx.hop_limit, 10);
        assert_eq!(drain(&mut rx).len(), 2);
        assert!(matches!(
            node.publish_transaction(file("c.txt")),
            Err(NodeError::Ledger(_))
        ));
    }

    #[test]
    fn test_blocks_flood_once() {
        let (node, mut rx) = node(false);
        let b1 = mined(BlockHash::ZERO, vec![]);
        let publish = BlockPublish {
            block: b1.clone(),
            hop_limit: 20,
        };

        node.on_envelope_received(Envelope::BlockPublish(publish.clone()), addr(5000), false);
        assert_eq!(node.current_fork(), vec![b1.clone()]);
        assert_eq!(node.mining_block().prev_hash, b1.hash());
        let out = drain(&mut rx);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].destination, addr(5002));

        // Duplicate: no state change, no re-flood.
        node.on_envelope_received(Envelope::BlockPublish(publish), addr(5002), false);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(node.current_fork().len(), 1);
    }

    #[test]
    fn test_invalid_pow_block_is_dropped() {
        let (node, mut rx) = node(false);
        let template = Block::template(BlockHash::ZERO);
        let bad = (0u64..)
            .map(|i| template.with_nonce(Nonce::from_counter(i)))
            .find(|b| !b.has_valid_pow())
            .unwrap();
        node.on_block(BlockPublish { block: bad, hop_limit: 20 }, addr(5000));
        assert!(node.current_fork().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_announce_block_uses_double_hop_limit() {
        let (node, mut rx) = node(false);
        node.announce_block(Block::template(BlockHash::ZERO));
        let out = drain(&mut rx);
        assert_eq!(out.len(), 2);
        let Envelope::BlockPublish(publish) = &out[0].envelope else {
            panic!("expected block");
        };
        assert_eq!(publish.hop_limit, 20);
    }

    #[test]
    fn test_file_exchange_goes_to_external_inbox() {
        let (node, _rx) = node(false);
        let mut inbox = node.take_external_inbox().unwrap();
        assert!(node.take_external_inbox().is_none());

        let request = Envelope::DataRequest(murmur_gossip::DataRequest {
            origin: "a".into(),
            destination: "b".into(),
            hop_limit: 10,
            hash_value: vec![1; 32],
            file_name: "f".into(),
        });
        node.on_envelope_received(request.clone(), addr(5000), false);

        let handed = inbox.try_recv().unwrap();
        assert_eq!(handed.envelope, request);
        assert_eq!(handed.from, addr(5000));
        assert!(!handed.from_client);
    }

    #[tokio::test]
    async fn test_client_simple_becomes_rumor() {
        let (node, _rx) = node(false);
        node.on_envelope_received(
            Envelope::Simple(SimpleMessage {
                original_name: String::new(),
                relay_peer_addr: String::new(),
                contents: "hello".into(),
            }),
            addr(9000),
            true,
        );
        assert_eq!(node.messages(), vec![Rumor::new("b", 1, "hello")]);
    }

    #[test]
    fn test_simple_mode_relays_and_ignores_rumors() {
        let (node, mut rx) = node(true);
        node.on_envelope_received(Envelope::Rumor(Rumor::new("a", 1, "x")), addr(5000), false);
        node.on_envelope_received(
            Envelope::Status(StatusPacket { want: vec![] }),
            addr(5000),
            false,
        );
        assert!(node.messages().is_empty());
        assert!(drain(&mut rx).is_empty());

        node.on_envelope_received(
            Envelope::Simple(SimpleMessage {
                original_name: "a".into(),
                relay_peer_addr: addr(5000).to_string(),
                contents: "flood".into(),
            }),
            addr(5000),
            false,
        );
        let out = drain(&mut rx);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].destination, addr(5002));

        assert!(matches!(
            node.publish_transaction(file("x")),
            Err(NodeError::SimpleMode)
        ));
    }

    #[test]
    fn test_client_private_uses_default_hop_limit() {
        let (node, _rx) = node(false);
        node.on_envelope_received(
            Envelope::Private(PrivateMessage {
                origin: String::new(),
                id: 0,
                text: "hey".into(),
                destination: "a".into(),
                hop_limit: 0,
            }),
            addr(9000),
            true,
        );
        let sent = node.private_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].origin, "b");
        assert_eq!(sent[0].hop_limit, 10);
    }

    #[test]
    fn test_full_pool_still_mines_a_sendable_block() {
        let (node, _rx) = node(false);
        {
            let mut ledger = node.ledger.lock().unwrap();
            for i in 0..1500 {
                let record = FileRecord::new(format!("bulk-{i:04}.dat"), 4096, vec![0xcd; 32]);
                ledger.admit_transaction(Transaction::new(record, 10)).unwrap();
            }
        }

        let template = node.ledger.lock().unwrap().mining_template();
        assert!(template.transactions.len() < 1500);
        assert!(template.transactions.len() <= limits::MAX_BLOCK_TRANSACTIONS);
        assert_eq!(node.mining_block().transactions.len(), 1500);

        let publish = Envelope::BlockPublish(BlockPublish {
            block: template.with_nonce(Nonce::from_counter(u64::MAX)),
            hop_limit: 20,
        });
        let datagram = murmur_gossip::codec::encode(&publish).unwrap();
        assert!(murmur_gossip::codec::decode(&datagram).is_ok());
    }
}
