//! Core type definitions for FallGuard.
//!
//! This crate defines the records exchanged between the wearable and its
//! paired companion device:
//! - Caregiver identifiers (UUID v7)
//! - The caregiver alert record carried by every fall alert
//!
//! Transport, encoding and delivery live in `fallguard-link`.

mod caregiver;
mod ids;

pub use caregiver::Caregiver;
pub use ids::CaregiverId;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid caregiver: {0}")]
    InvalidCaregiver(String),
}
