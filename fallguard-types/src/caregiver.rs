//! The caregiver alert record.

use crate::{CaregiverId, Error, Result};
use serde::{Deserialize, Serialize};

/// A caregiver to be notified when the wearer falls.
///
/// Immutable once constructed. The serialized field names (`id`, `name`,
/// `phoneNumber`, `isEnabled`) are shared with the companion build and must
/// not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCaregiver")]
pub struct Caregiver {
    id: CaregiverId,
    name: String,
    phone_number: String,
    is_enabled: bool,
}

impl Caregiver {
    /// Creates a caregiver with a fresh identifier.
    ///
    /// Fails if `name` is empty or only whitespace.
    pub fn new(
        name: impl Into<String>,
        phone_number: impl Into<String>,
        is_enabled: bool,
    ) -> Result<Self> {
        Self::with_id(CaregiverId::new(), name, phone_number, is_enabled)
    }

    /// Creates a caregiver with a known identifier.
    pub fn with_id(
        id: CaregiverId,
        name: impl Into<String>,
        phone_number: impl Into<String>,
        is_enabled: bool,
    ) -> Result<Self> {
        let caregiver = Self {
            id,
            name: name.into(),
            phone_number: phone_number.into(),
            is_enabled,
        };
        caregiver.validate()?;
        Ok(caregiver)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidCaregiver("name must not be empty".into()));
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> CaregiverId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The phone number, possibly empty.
    #[must_use]
    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }
}

/// Wire shape of [`Caregiver`] before its invariants are checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCaregiver {
    id: CaregiverId,
    name: String,
    phone_number: String,
    is_enabled: bool,
}

impl TryFrom<RawCaregiver> for Caregiver {
    type Error = Error;

    fn try_from(raw: RawCaregiver) -> Result<Self> {
        Self::with_id(raw.id, raw.name, raw.phone_number, raw.is_enabled)
    }
}
