//! The outbound queue.
//!
//! Every transport write goes through one unbounded queue drained by a
//! single sender task, so writes are serialized and never block the
//! protocol code that produces them.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::messages::Envelope;
use crate::transport::Transport;

/// An envelope waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub envelope: Envelope,
    pub destination: SocketAddr,
}

/// Receiving half of the queue, consumed by [`run_sender`].
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

/// Producer handle to the outbound queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl OutboundQueue {
    /// Create a queue and its receiving half.
    pub fn new() -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue `envelope` for `destination`.
    ///
    /// Never blocks. If the sender task is gone the envelope is dropped.
    pub fn enqueue_send(&self, envelope: Envelope, destination: SocketAddr) {
        trace!(kind = envelope.kind(), %destination, "queued");
        if self
            .tx
            .send(Outbound {
                envelope,
                destination,
            })
            .is_err()
        {
            debug!(%destination, "outbound queue closed, dropping envelope");
        }
    }
}

/// Drain the queue into `transport` until every producer is gone.
///
/// Send failures are logged and dropped; there is no retry at this layer.
pub async fn run_sender(transport: Arc<dyn Transport>, mut rx: OutboundReceiver) {
    while let Some(outbound) = rx.recv().await {
        if let Err(e) = transport
            .send(outbound.destination, &outbound.envelope)
            .await
        {
            warn!(
                destination = %outbound.destination,
                kind = outbound.envelope.kind(),
                "send failed: {}",
                e
            );
        }
    }
    debug!("outbound queue drained, sender exiting");
}
