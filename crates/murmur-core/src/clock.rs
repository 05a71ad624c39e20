//! Vector clocks: per-origin next-expected sequence numbers.
//!
//! The vector clock is the admission gate for rumors. A rumor `(origin, id)`
//! is accepted iff `id` is exactly the next id we expect from `origin`, so
//! each rumor is admitted at most once and always in order. There is no
//! reordering buffer: ids from the future are rejected just like stale ones.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// First sequence number of every origin.
pub const FIRST_ID: u32 = 1;

/// One line of a vector-clock snapshot, as exchanged on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerStatus {
    /// Origin name.
    pub identifier: String,
    /// Next sequence number expected from `identifier`.
    pub next_id: u32,
}

impl PeerStatus {
    pub fn new(identifier: impl Into<String>, next_id: u32) -> Self {
        Self {
            identifier: identifier.into(),
            next_id,
        }
    }
}

/// Mapping `origin -> next expected id`, kept in first-seen order.
///
/// Entries are created lazily at [`FIRST_ID`] and only ever advance by one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorClock {
    want: Vec<PeerStatus>,
}

impl VectorClock {
    /// Create an empty clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock that already tracks the local origin.
    pub fn for_origin(name: &str) -> Self {
        let mut clock = Self::new();
        clock.next_id(name);
        clock
    }

    /// Rebuild a clock from a snapshot.
    pub fn from_entries(entries: Vec<PeerStatus>) -> Self {
        Self { want: entries }
    }

    /// Next expected id for `origin`, creating the entry at 1 if absent.
    pub fn next_id(&mut self, origin: &str) -> u32 {
        if let Some(id) = self.get(origin) {
            return id;
        }
        self.want.push(PeerStatus::new(origin, FIRST_ID));
        FIRST_ID
    }

    /// Next expected id for `origin` without creating an entry.
    pub fn get(&self, origin: &str) -> Option<u32> {
        self.want
            .iter()
            .find(|s| s.identifier == origin)
            .map(|s| s.next_id)
    }

    /// Next expected id for `origin`, treating unknown origins as 1.
    pub fn get_or_first(&self, origin: &str) -> u32 {
        self.get(origin).unwrap_or(FIRST_ID)
    }

    /// Advance `origin` by one iff `id` is exactly the expected id.
    ///
    /// Returns `false` (with no mutation) for stale and future ids alike.
    pub fn update(&mut self, origin: &str, id: u32) -> bool {
        self.try_update(origin, id).is_ok()
    }

    /// Like [`update`](Self::update), reporting the expected id on failure.
    pub fn try_update(&mut self, origin: &str, id: u32) -> Result<(), ValidationError> {
        let expected = self.get_or_first(origin);
        if id != expected {
            return Err(ValidationError::InvalidSequence { expected, got: id });
        }
        match self.want.iter_mut().find(|s| s.identifier == origin) {
            Some(entry) => entry.next_id += 1,
            None => self.want.push(PeerStatus::new(origin, expected + 1)),
        }
        Ok(())
    }

    /// Deep copy of the entries, for the wire or for lock-free comparison.
    pub fn snapshot(&self) -> Vec<PeerStatus> {
        self.want.clone()
    }

    /// Iterate over entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &PeerStatus> {
        self.want.iter()
    }

    pub fn len(&self) -> usize {
        self.want.len()
    }

    pub fn is_empty(&self) -> bool {
        self.want.is_empty()
    }

    /// Compare our clock against a peer's snapshot.
    ///
    /// Unknown origins count as 1 on either side.
    pub fn compare(&self, theirs: &[PeerStatus]) -> ClockComparison {
        let we_are_behind = theirs
            .iter()
            .any(|status| self.get_or_first(&status.identifier) < status.next_id);

        let they_need = self
            .want
            .iter()
            .filter_map(|mine| {
                let their_next = theirs
                    .iter()
                    .find(|s| s.identifier == mine.identifier)
                    .map(|s| s.next_id)
                    .unwrap_or(FIRST_ID);
                (mine.next_id > their_next).then(|| PeerStatus::new(&mine.identifier, their_next))
            })
            .collect();

        ClockComparison {
            we_are_behind,
            they_need,
        }
    }
}

/// Outcome of comparing two vector clocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockComparison {
    /// The peer has seen at least one rumor we have not.
    pub we_are_behind: bool,
    /// For each origin where we are ahead: the id the peer expects next,
    /// i.e. the id of the rumor we should push.
    pub they_need: Vec<PeerStatus>,
}

impl ClockComparison {
    /// Neither side has anything the other lacks.
    pub fn in_sync(&self) -> bool {
        !self.we_are_behind && self.they_need.is_empty()
    }
}
