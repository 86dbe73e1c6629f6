//! Identifier and sharded-path utilities.
//!
//! MediBook stores every document (identities, doctor profiles, appointments) under a sharded
//! directory derived from its record id.
//!
//! Record ids use a *canonical* UUID representation: **32 lowercase hexadecimal characters** (no
//! hyphens).
//!
//! This crate provides:
//! - [`RecordId`], a wrapper that guarantees the canonical form once constructed and derives the
//!   sharded storage directory for a record.
//! - [`BookingId`], the human-readable appointment reference (`APT` + `YYMMDD` + 4 digits).
//! - [`Sha256Hash`], the content address used for uploaded files.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, a record is stored under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `booking_data/appointments/55/0e/550e8400e29b41d4a716446655440000/`

mod service;

pub use service::{BookingId, RecordId, Sha256Hash, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
