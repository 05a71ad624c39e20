//! Proptest generators for property-based testing.

use proptest::prelude::*;

use murmur::gossip::{Envelope, PrivateMessage, SimpleMessage, StatusPacket};
use murmur_core::{FileRecord, PeerStatus, Rumor, Transaction};

/// Generate an origin name.
pub fn origin() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,7}".prop_map(String::from)
}

/// Generate rumor text, possibly empty.
pub fn text() -> impl Strategy<Value = String> {
    "[ -~]{0,64}".prop_map(String::from)
}

/// Generate a rumor with an id in `1..=max_id`.
pub fn rumor(max_id: u32) -> impl Strategy<Value = Rumor> {
    (origin(), 1..=max_id, text()).prop_map(|(origin, id, text)| Rumor::new(origin, id, text))
}

/// Generate a vector-clock snapshot with distinct origins.
pub fn status_entries(max_len: usize) -> impl Strategy<Value = Vec<PeerStatus>> {
    prop::collection::btree_map(origin(), 1u32..1000, 0..=max_len).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(origin, next_id)| PeerStatus::new(origin, next_id))
            .collect()
    })
}

/// Generate a file record with a 32-byte metafile hash.
pub fn file_record() -> impl Strategy<Value = FileRecord> {
    (
        "[a-z0-9_.-]{1,24}",
        any::<u64>(),
        any::<[u8; 32]>(),
    )
        .prop_map(|(name, size, hash)| FileRecord::new(name, size, hash.to_vec()))
}

pub fn transaction() -> impl Strategy<Value = Transaction> {
    (file_record(), 0u32..=20).prop_map(|(file, hop)| Transaction::new(file, hop))
}

/// Generate an envelope of one of the gossip variants.
pub fn envelope() -> impl Strategy<Value = Envelope> {
    prop_oneof![
        (origin(), text()).prop_map(|(name, contents)| Envelope::Simple(SimpleMessage {
            original_name: name,
            relay_peer_addr: "127.0.0.1:5000".into(),
            contents,
        })),
        rumor(100).prop_map(Envelope::Rumor),
        status_entries(16).prop_map(|want| Envelope::Status(StatusPacket { want })),
        (origin(), text(), origin(), 0u32..=20).prop_map(|(origin, text, destination, hop)| {
            Envelope::Private(PrivateMessage {
                origin,
                id: 0,
                text,
                destination,
                hop_limit: hop,
            })
        }),
        transaction().prop_map(Envelope::TxPublish),
    ]
}

/// One origin's rumors `1..=count`, with duplicates, in arbitrary order.
pub fn delivery_schedule(max_count: u32) -> impl Strategy<Value = (u32, Vec<u32>)> {
    (1..=max_count).prop_flat_map(|count| {
        let ids = prop::collection::vec(1..=count, 0..(count as usize * 3));
        (Just(count), ids)
    })
}
