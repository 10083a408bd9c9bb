//! Link configuration.

use fallguard_types::{Caregiver, CaregiverId};
use serde::Deserialize;

/// Configuration for the alert link.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Device name for log output.
    pub device_name: String,
    /// Upper bound for a single transport send attempt (ms).
    pub send_timeout_ms: u64,
    /// Display name of the sentinel caregiver used when no caregiver is known.
    pub alert_name: String,
    /// Phone number of the sentinel caregiver.
    pub alert_phone: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_name: "FallGuard Device".to_string(),
            send_timeout_ms: 5_000,
            alert_name: "Fall Signal".to_string(),
            alert_phone: String::new(),
        }
    }
}

impl LinkConfig {
    /// Builds the sentinel caregiver record sent with every fall alert.
    ///
    /// Each call produces a fresh identifier; callers keep the record to send
    /// a stable identity.
    pub fn sentinel_caregiver(&self) -> fallguard_types::Result<Caregiver> {
        Caregiver::with_id(CaregiverId::new(), &self.alert_name, &self.alert_phone, true)
    }
}
