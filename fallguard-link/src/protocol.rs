//! Alert protocol messages and topics.
//!
//! Every message crossing the peer link is an [`AlertEnvelope`]: a map from a
//! topic key to opaque payload bytes. The receiver routes on the key and
//! ignores envelopes it does not recognise.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Wire key of the fall alert topic.
pub const FALL_DETECTED_KEY: &str = "fallDetected";

/// A message topic, shared by the peer link and the local event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    /// A fall was detected on the wearable.
    FallDetected,
}

impl Topic {
    /// Returns the wire key for this topic.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FallDetected => FALL_DETECTED_KEY,
        }
    }

    /// Parses a wire key. Unknown keys yield `None`.
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            FALL_DETECTED_KEY => Some(Self::FallDetected),
            _ => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A topic-keyed message exchanged with the peer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertEnvelope {
    entries: BTreeMap<String, Vec<u8>>,
}

impl AlertEnvelope {
    /// Creates an envelope carrying one payload under `topic`.
    pub fn single(topic: Topic, payload: Vec<u8>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(topic.as_str().to_string(), payload);
        Self { entries }
    }

    /// Creates an envelope from raw entries, as received from a transport.
    pub fn from_entries(entries: BTreeMap<String, Vec<u8>>) -> Self {
        Self { entries }
    }

    /// Inserts a raw entry.
    pub fn insert(&mut self, key: impl Into<String>, payload: Vec<u8>) {
        self.entries.insert(key.into(), payload);
    }

    /// Returns the payload stored under `topic`, if any.
    pub fn payload_for(&self, topic: Topic) -> Option<&[u8]> {
        self.entries.get(topic.as_str()).map(Vec::as_slice)
    }

    /// Returns the single recognised entry of a well-formed envelope.
    ///
    /// Envelopes with zero or several keys, or with an unknown key, yield
    /// `None` and are meant to be ignored.
    pub fn sole_entry(&self) -> Option<(Topic, &[u8])> {
        if self.entries.len() != 1 {
            return None;
        }
        let (key, payload) = self.entries.iter().next()?;
        Topic::parse(key).map(|topic| (topic, payload.as_slice()))
    }

    /// Returns the raw keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
