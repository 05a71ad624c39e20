//! Rumors and the append-only message log.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An origin-sequenced message subject to epidemic dissemination.
///
/// Uniquely identified by `(origin, id)`. A rumor with empty text is a
/// route rumor: it carries no content and exists so that peers learn a
/// next hop towards its origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rumor {
    pub origin: String,
    pub id: u32,
    pub text: String,
}

impl Rumor {
    pub fn new(origin: impl Into<String>, id: u32, text: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            id,
            text: text.into(),
        }
    }

    /// A rumor with no content, used only to advertise a route.
    pub fn route(origin: impl Into<String>, id: u32) -> Self {
        Self::new(origin, id, String::new())
    }

    pub fn is_route_rumor(&self) -> bool {
        self.text.is_empty()
    }

    /// The `(origin, id)` identity of this rumor.
    pub fn key(&self) -> (&str, u32) {
        (&self.origin, self.id)
    }
}

/// Append-only log of admitted rumors, in admission order.
///
/// Admission itself is gated by the vector clock; the log only records.
#[derive(Debug, Default)]
pub struct MessageLog {
    rumors: Vec<Rumor>,
    index: HashMap<(String, u32), usize>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rumor. A rumor already in the log is ignored.
    pub fn append(&mut self, rumor: Rumor) -> bool {
        let key = (rumor.origin.clone(), rumor.id);
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.rumors.len());
        self.rumors.push(rumor);
        true
    }

    /// Look up the rumor `(origin, id)`.
    pub fn find(&self, origin: &str, id: u32) -> Option<&Rumor> {
        self.index
            .get(&(origin.to_string(), id))
            .map(|&pos| &self.rumors[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rumor> {
        self.rumors.iter()
    }

    /// Rumors carrying text, excluding route rumors.
    pub fn text_rumors(&self) -> Vec<Rumor> {
        self.rumors
            .iter()
            .filter(|r| !r.is_route_rumor())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rumors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rumors.is_empty()
    }
}
