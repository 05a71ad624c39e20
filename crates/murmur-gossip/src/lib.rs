//! # Murmur Gossip
//!
//! Epidemic dissemination of rumors between murmur nodes.
//!
//! ## Overview
//!
//! A rumor is an origin-sequenced message. Each node admits a rumor exactly
//! once, gated by its vector clock, and spreads it two ways:
//!
//! - **Mongering**: push the rumor to a random peer, wait up to a second for
//!   the peer's status to acknowledge it, then flip a coin to decide whether
//!   to continue with another peer
//! - **Anti-entropy**: every second, send our vector clock to a random peer;
//!   the status exchange pushes whatever either side is missing
//!
//! Next hops towards every origin are learned as a side effect of rumor
//! relay and used to forward private messages.
//!
//! ## Key Types
//!
//! - [`Gossip`] - Per-node context: clock, logs, routes, sessions
//! - [`Envelope`] - The wire message, one per datagram
//! - [`Transport`] - Datagram transport; [`MemoryNetwork`] for tests,
//!   [`UdpTransport`] for real sockets
//! - [`OutboundQueue`] - The single serialized path to the transport
//!
//! ## Message Flow
//!
//! ```text
//! Node A                              Node B
//!   |-------- Rumor(A,1) ------------->|   admit, learn route A via A
//!   |<------- Status{A:2} -------------|   ack for session (B,A,2)
//!   |                                  |
//!   |-------- Status{A:2} ------------>|   anti-entropy: in sync
//! ```

pub mod codec;
pub mod convergence;
pub mod error;
pub mod messages;
pub mod mongering;
pub mod outbound;
pub mod protocol;
pub mod routing;
pub mod session;
pub mod simple;
pub mod transport;
pub mod udp;

pub use convergence::clocks_converged;
pub use error::{GossipError, Result};
pub use messages::{
    limits, BlockPublish, DataReply, DataRequest, Envelope, PrivateMessage, SearchReply,
    SearchRequest, SearchResult, SimpleMessage, StatusPacket,
};
pub use outbound::{run_sender, Outbound, OutboundQueue, OutboundReceiver};
pub use protocol::{Gossip, GossipConfig};
pub use routing::RoutingTable;
pub use session::{PendingSessions, SessionKey, SessionOutcome};
pub use transport::{memory::MemoryNetwork, memory::MemoryTransport, Transport};
pub use udp::UdpTransport;
