//! # Murmur Testkit
//!
//! Testing utilities for murmur.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known transaction and block hashes, including
//!   first blocks with valid proof-of-work
//! - **Generators**: Proptest strategies for rumors, clocks and envelopes
//! - **Fixtures**: Clusters of started nodes on an in-memory network
//!
//! ## Golden Vectors
//!
//! ```rust
//! use murmur_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, hex) in verify_all_vectors() {
//!     assert!(matches, "{name}: {hex}");
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use murmur_testkit::fixtures::{wait_until, TestCluster, Topology};
//!
//! async fn example() {
//!     let cluster = TestCluster::start(&["a", "b", "c"], Topology::Line, |_| {}).await;
//!     cluster.node(0).submit_rumor("hello");
//!
//!     let spread = wait_until(Duration::from_secs(5), || {
//!         cluster.nodes.iter().all(|n| n.messages().len() == 1)
//!     })
//!     .await;
//!     assert!(spread);
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{mine_block, mine_chain, node_addr, test_config, wait_until, TestCluster, Topology};
pub use vectors::{block_vectors, pow_vectors, transaction_vectors, verify_all_vectors};
