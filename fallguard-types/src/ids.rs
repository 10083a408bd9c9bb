//! Caregiver identifiers.
//!
//! UUID v7, so identifiers sort by creation time. On the wire an identifier
//! is its hyphenated string form.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a caregiver record.
///
/// Stays the same for every alert sent on behalf of the same caregiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaregiverId(Uuid);

impl CaregiverId {
    /// Creates a new caregiver ID with the current timestamp.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses the string form produced by [`Display`](fmt::Display).
    pub fn parse(s: &str) -> Result<Self> {
        Ok(Self(Uuid::parse_str(s.trim())?))
    }
}

impl Default for CaregiverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CaregiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for CaregiverId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
