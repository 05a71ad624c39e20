//! Pending mongering sessions.
//!
//! A session waits for one peer to acknowledge one rumor. It is keyed by
//! `(peer, origin, id + 1)`: the status entry the peer reports once it has
//! the rumor. At most one session per key is live; a second registration
//! for a live key is refused.
//!
//! Each registration gets a ticket. Removal is by `(key, ticket)`, so a
//! timed-out waiter can never remove a newer session registered under the
//! same key.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

use murmur_core::PeerStatus;

/// Identity of a pending session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub peer: SocketAddr,
    pub origin: String,
    /// The `next_id` that acknowledges the rumor (rumor id + 1).
    pub expected_id: u32,
}

impl SessionKey {
    pub fn new(peer: SocketAddr, origin: impl Into<String>, expected_id: u32) -> Self {
        Self {
            peer,
            origin: origin.into(),
            expected_id,
        }
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Acked,
    TimedOut,
}

struct Entry {
    ticket: u64,
    ack: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
struct SessionTable {
    next_ticket: u64,
    sessions: HashMap<SessionKey, Entry>,
}

/// The pending-session table. Clones share the same table.
#[derive(Clone, Default)]
pub struct PendingSessions {
    inner: Arc<Mutex<SessionTable>>,
}

impl PendingSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, or `None` if one is already live for `key`.
    pub fn register(&self, key: SessionKey) -> Option<SessionWaiter> {
        let mut table = self.inner.lock().unwrap();
        if table.sessions.contains_key(&key) {
            return None;
        }

        let ticket = table.next_ticket;
        table.next_ticket += 1;
        let (tx, rx) = oneshot::channel();
        table.sessions.insert(
            key.clone(),
            Entry {
                ticket,
                ack: Some(tx),
            },
        );

        Some(SessionWaiter {
            table: self.clone(),
            key,
            ticket,
            ack: rx,
        })
    }

    /// Deliver acknowledgments for every entry of `want` that matches a
    /// session with `peer`. Returns how many sessions were signalled.
    ///
    /// Never blocks; a session whose waiter is gone is skipped.
    pub fn signal(&self, peer: SocketAddr, want: &[PeerStatus]) -> usize {
        let mut table = self.inner.lock().unwrap();
        let mut signalled = 0;
        for status in want {
            let key = SessionKey::new(peer, status.identifier.as_str(), status.next_id);
            let Some(entry) = table.sessions.get_mut(&key) else {
                continue;
            };
            if let Some(ack) = entry.ack.take() {
                if ack.send(()).is_ok() {
                    signalled += 1;
                }
            }
        }
        signalled
    }

    pub fn contains(&self, key: &SessionKey) -> bool {
        self.inner.lock().unwrap().sessions.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, key: &SessionKey, ticket: u64) {
        let mut table = self.inner.lock().unwrap();
        if table.sessions.get(key).map(|e| e.ticket) == Some(ticket) {
            table.sessions.remove(key);
        }
    }
}

/// The waiting half of a registered session.
pub struct SessionWaiter {
    table: PendingSessions,
    key: SessionKey,
    ticket: u64,
    ack: oneshot::Receiver<()>,
}

impl SessionWaiter {
    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Wait for the acknowledgment or `timeout`, then remove the session.
    pub async fn wait(self, timeout: Duration) -> SessionOutcome {
        let outcome = match tokio::time::timeout(timeout, self.ack).await {
            Ok(Ok(())) => SessionOutcome::Acked,
            _ => SessionOutcome::TimedOut,
        };
        self.table.remove(&self.key, self.ticket);
        outcome
    }
}
