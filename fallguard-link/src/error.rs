//! Error types for the alert link.

use thiserror::Error;

/// Result type for link operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// Errors that can occur while producing, sending or receiving an alert.
///
/// None of these are fatal: each one ends with "no alert delivered" while the
/// local mitigation on the wearable has already happened.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The device has no peer transport. Alerting is disabled for good.
    #[error("peer transport is not supported on this device")]
    TransportUnsupported,

    /// The peer cannot accept a message right now.
    #[error("peer is not reachable")]
    PeerUnreachable,

    /// The transport accepted the call but failed to deliver.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The alert record could not be serialized.
    #[error("encode error: {0}")]
    Encode(#[source] serde_json::Error),

    /// The bytes are not a valid alert record.
    #[error("decode error: {0}")]
    Decode(String),

    /// The wearer denied motion access.
    #[error("fall detection authorization denied")]
    AuthorizationDenied,

    /// Motion access is blocked by device policy.
    #[error("fall detection authorization restricted")]
    AuthorizationRestricted,

    /// The wearer has not answered the authorization prompt yet.
    #[error("fall detection authorization not determined")]
    AuthorizationNotDetermined,

    /// The motion sensor cannot detect falls on this device.
    #[error("fall detection is not available on this device")]
    SensorUnavailable,

    /// The main context has shut down.
    #[error("main context closed")]
    ContextClosed,

    /// The configuration cannot produce a valid alert.
    #[error("invalid configuration: {0}")]
    Config(String),
}
