//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Environment variables are read by the binaries only; the helpers
//! here take the raw `Option<String>` values so they can be tested without touching the process
//! environment.

use crate::constants::{
    APPOINTMENTS_DIR_NAME, DEFAULT_DATA_DIR, DEFAULT_EXPERIENCE_YEARS, DEFAULT_QUALIFICATIONS,
    DEFAULT_SPECIALTY, DOCTORS_DIR_NAME, IDENTITIES_DIR_NAME,
};
use crate::doctors::ConsultationHours;
use crate::{BookingError, BookingResult};
use medibook_files::UPLOADS_FOLDER_NAME;
use std::path::{Path, PathBuf};

/// Values used to complete a doctor's profile when an admin approves the doctor.
///
/// Any profile field still holding the `"Not set"` placeholder at approval time is replaced with
/// the matching value here.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileDefaults {
    pub specialty: String,
    pub qualifications: Vec<String>,
    pub experience_years: u32,
    pub consultation_hours: ConsultationHours,
}

impl Default for ProfileDefaults {
    fn default() -> Self {
        Self {
            specialty: DEFAULT_SPECIALTY.into(),
            qualifications: DEFAULT_QUALIFICATIONS.iter().map(|q| q.to_string()).collect(),
            experience_years: DEFAULT_EXPERIENCE_YEARS,
            consultation_hours: ConsultationHours::default(),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    profile_defaults: ProfileDefaults,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidInput`] if the defaults would not produce a complete
    /// profile (empty specialty, no qualifications or zero experience).
    pub fn new(data_dir: PathBuf, profile_defaults: ProfileDefaults) -> BookingResult<Self> {
        if profile_defaults.specialty.trim().is_empty() {
            return Err(BookingError::InvalidInput(
                "default specialty cannot be empty".into(),
            ));
        }
        if profile_defaults.qualifications.is_empty() {
            return Err(BookingError::InvalidInput(
                "default qualifications cannot be empty".into(),
            ));
        }
        if profile_defaults.experience_years == 0 {
            return Err(BookingError::InvalidInput(
                "default experience must be at least one year".into(),
            ));
        }

        Ok(Self {
            data_dir,
            profile_defaults,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn identities_dir(&self) -> PathBuf {
        self.data_dir.join(IDENTITIES_DIR_NAME)
    }

    pub fn doctors_dir(&self) -> PathBuf {
        self.data_dir.join(DOCTORS_DIR_NAME)
    }

    pub fn appointments_dir(&self) -> PathBuf {
        self.data_dir.join(APPOINTMENTS_DIR_NAME)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join(UPLOADS_FOLDER_NAME)
    }

    pub fn profile_defaults(&self) -> &ProfileDefaults {
        &self.profile_defaults
    }
}

/// Resolve the data directory from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_DATA_DIR`].
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Build [`ProfileDefaults`] from optional string values.
///
/// Missing or blank values fall back to the built-in defaults. `qualifications` is a comma
/// separated list.
///
/// # Errors
///
/// Returns [`BookingError::InvalidInput`] if `experience_years` is present but not a
/// non-negative integer.
pub fn profile_defaults_from_env_values(
    specialty: Option<String>,
    qualifications: Option<String>,
    experience_years: Option<String>,
) -> BookingResult<ProfileDefaults> {
    fn non_blank(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    let mut defaults = ProfileDefaults::default();

    if let Some(specialty) = non_blank(specialty) {
        defaults.specialty = specialty;
    }

    if let Some(qualifications) = non_blank(qualifications) {
        let list: Vec<String> = qualifications
            .split(',')
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect();
        if !list.is_empty() {
            defaults.qualifications = list;
        }
    }

    if let Some(years) = non_blank(experience_years) {
        defaults.experience_years = years.parse().map_err(|_| {
            BookingError::InvalidInput(format!("invalid default experience years: {years}"))
        })?;
    }

    Ok(defaults)
}
