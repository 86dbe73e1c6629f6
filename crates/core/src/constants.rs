//! Constants used throughout the MediBook core crate.
//!
//! This module contains all path and filename constants to ensure
//! consistency across the codebase and make maintenance easier.

/// Default directory for booking data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "booking_data";

/// Directory name for identity records.
pub const IDENTITIES_DIR_NAME: &str = "identities";

/// Directory name for doctor profiles.
pub const DOCTORS_DIR_NAME: &str = "doctors";

/// Directory name for appointment records.
pub const APPOINTMENTS_DIR_NAME: &str = "appointments";

/// Filename for identity documents.
pub const IDENTITY_FILENAME: &str = "identity.yaml";

/// Filename for doctor profile documents.
pub const PROFILE_FILENAME: &str = "profile.yaml";

/// Filename for appointment documents.
pub const APPOINTMENT_FILENAME: &str = "appointment.yaml";

/// Placeholder written into profile fields a doctor has not filled in yet.
pub const NOT_SET: &str = "Not set";

/// Default consultation start time.
pub const DEFAULT_HOURS_START: &str = "09:00";

/// Default consultation end time.
pub const DEFAULT_HOURS_END: &str = "17:00";

/// Default specialty applied when an admin approves an incomplete profile.
pub const DEFAULT_SPECIALTY: &str = "Cardiologist";

/// Default qualifications applied when an admin approves an incomplete profile.
pub const DEFAULT_QUALIFICATIONS: &[&str] = &["MBBS", "MD"];

/// Default years of experience applied when an admin approves an incomplete profile.
pub const DEFAULT_EXPERIENCE_YEARS: u32 = 5;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Attempts made to allocate an unused booking id or record directory.
pub const ID_ALLOCATION_ATTEMPTS: usize = 5;

/// Default bearer-token lifetime.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;
