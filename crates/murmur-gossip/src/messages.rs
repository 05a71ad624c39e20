//! Wire message types.
//!
//! Every datagram carries exactly one [`Envelope`]. The rumor, status and
//! ledger variants are handled by this crate and the node; the file-exchange
//! variants (`DataRequest`, `DataReply`, `SearchRequest`, `SearchReply`) are
//! carried opaquely for an external collaborator.

use serde::{Deserialize, Serialize};

use murmur_core::{Block, PeerStatus, Rumor, Transaction};

/// Message size limits.
pub mod limits {
    /// Max bytes in one datagram.
    pub const MAX_DATAGRAM_SIZE: usize = 65_535;
    /// Max entries in a status vector.
    pub const MAX_STATUS_ENTRIES: usize = 1024;
    /// Max transactions in a published block.
    pub const MAX_BLOCK_TRANSACTIONS: usize = 1024;
    /// Max keywords in a search request.
    pub const MAX_SEARCH_KEYWORDS: usize = 64;
    /// Max results in a search reply.
    pub const MAX_SEARCH_RESULTS: usize = 256;
}

/// A message in simple broadcast mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleMessage {
    /// Name of the node that authored the message.
    pub original_name: String,
    /// Address of the node that last relayed it.
    pub relay_peer_addr: String,
    pub contents: String,
}

/// A peer's vector-clock snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPacket {
    pub want: Vec<PeerStatus>,
}

/// A point-to-point message forwarded along next hops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateMessage {
    pub origin: String,
    /// Always 0: private messages are not sequenced.
    pub id: u32,
    pub text: String,
    pub destination: String,
    pub hop_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequest {
    pub origin: String,
    pub destination: String,
    pub hop_limit: u32,
    pub hash_value: Vec<u8>,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataReply {
    pub origin: String,
    pub destination: String,
    pub hop_limit: u32,
    pub hash_value: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub origin: String,
    pub budget: u64,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub file_name: String,
    pub metafile_hash: Vec<u8>,
    pub chunk_map: Vec<u64>,
    pub chunk_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReply {
    pub origin: String,
    pub destination: String,
    pub hop_limit: u32,
    pub results: Vec<SearchResult>,
}

/// A block flooded to peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPublish {
    pub block: Block,
    pub hop_limit: u32,
}

/// The wire envelope: exactly one message per datagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Envelope {
    Simple(SimpleMessage),
    Rumor(Rumor),
    Status(StatusPacket),
    Private(PrivateMessage),
    DataRequest(DataRequest),
    DataReply(DataReply),
    SearchRequest(SearchRequest),
    SearchReply(SearchReply),
    /// A transaction; its hop limit travels inside it.
    TxPublish(Transaction),
    BlockPublish(BlockPublish),
}

impl Envelope {
    /// Short variant name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Simple(_) => "simple",
            Envelope::Rumor(_) => "rumor",
            Envelope::Status(_) => "status",
            Envelope::Private(_) => "private",
            Envelope::DataRequest(_) => "data-request",
            Envelope::DataReply(_) => "data-reply",
            Envelope::SearchRequest(_) => "search-request",
            Envelope::SearchReply(_) => "search-reply",
            Envelope::TxPublish(_) => "tx-publish",
            Envelope::BlockPublish(_) => "block-publish",
        }
    }

    /// True for the variants handed to the file-exchange collaborator.
    pub fn is_file_exchange(&self) -> bool {
        matches!(
            self,
            Envelope::DataRequest(_)
                | Envelope::DataReply(_)
                | Envelope::SearchRequest(_)
                | Envelope::SearchReply(_)
        )
    }

    /// Check if this envelope respects size limits.
    pub fn validate_limits(&self) -> Result<(), &'static str> {
        match self {
            Envelope::Status(status) => {
                if status.want.len() > limits::MAX_STATUS_ENTRIES {
                    return Err("too many status entries");
                }
            }
            Envelope::BlockPublish(publish) => {
                if publish.block.transactions.len() > limits::MAX_BLOCK_TRANSACTIONS {
                    return Err("too many block transactions");
                }
            }
            Envelope::SearchRequest(request) => {
                if request.keywords.len() > limits::MAX_SEARCH_KEYWORDS {
                    return Err("too many search keywords");
                }
            }
            Envelope::SearchReply(reply) => {
                if reply.results.len() > limits::MAX_SEARCH_RESULTS {
                    return Err("too many search results");
                }
            }
            Envelope::Simple(_)
            | Envelope::Rumor(_)
            | Envelope::Private(_)
            | Envelope::DataRequest(_)
            | Envelope::DataReply(_)
            | Envelope::TxPublish(_) => {}
        }
        Ok(())
    }
}

impl From<Rumor> for Envelope {
    fn from(rumor: Rumor) -> Self {
        Envelope::Rumor(rumor)
    }
}

impl From<StatusPacket> for Envelope {
    fn from(status: StatusPacket) -> Self {
        Envelope::Status(status)
    }
}

impl From<PrivateMessage> for Envelope {
    fn from(private: PrivateMessage) -> Self {
        Envelope::Private(private)
    }
}
