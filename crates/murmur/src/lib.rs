//! # Murmur
//!
//! A peer-to-peer messaging node: rumor gossip with vector clocks,
//! next-hop routing for private messages, and a proof-of-work ledger that
//! gives file names a single owner.
//!
//! ## Overview
//!
//! - **Gossip**: rumors spread by mongering and anti-entropy until every
//!   node's vector clock agrees
//! - **Routing**: next hops towards each origin are learned from relayed
//!   rumors and used for private messages
//! - **Ledger**: file-name transactions are mined into blocks; nodes adopt
//!   the longest fork they have seen
//! - **Simple mode**: plain flooding of client text, nothing else
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use murmur::{Node, NodeConfig};
//! use murmur::gossip::UdpTransport;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let addr = "127.0.0.1:5000".parse()?;
//!     let config = NodeConfig::new("alice", addr)
//!         .with_peers(vec!["127.0.0.1:5001".parse()?]);
//!
//!     let node = Node::new(config);
//!     let transport = Arc::new(UdpTransport::bind(addr).await?);
//!     let _handle = node.start(transport, None)?;
//!
//!     node.submit_rumor("hello");
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `murmur::core` - Clocks, rumors, blocks and hashing
//! - `murmur::gossip` - Wire messages, transports, the gossip engine
//! - `murmur::ledger` - Fork tree, longest-chain selection and mining

pub mod config;
pub mod error;
pub mod node;

pub use murmur_core as core;
pub use murmur_gossip as gossip;
pub use murmur_ledger as ledger;

pub use config::{NodeConfig, DEFAULT_GOSSIP_ADDR, DEFAULT_UI_PORT};
pub use error::{NodeError, Result};
pub use node::{ExternalEnvelope, Node, NodeHandle};

pub use murmur_core::{Block, BlockHash, FileRecord, PeerStatus, Rumor, Transaction};
pub use murmur_gossip::{Envelope, PrivateMessage};
