//! Doctor directory: profiles, public visibility and reviews.
//!
//! Profiles are stored at `<data_dir>/doctors/<s1>/<s2>/<id>/profile.yaml` and reference their
//! owning identity by id. Each identity owns at most one profile.
//!
//! A profile is shown in the public listing only when all three hold:
//! - the owning identity has the doctor role
//! - the owning identity is approved
//! - the profile is complete (see [`DoctorProfile::is_complete`])

use crate::clock::Clock;
use crate::config::ProfileDefaults;
use crate::constants::{DEFAULT_HOURS_END, DEFAULT_HOURS_START, NOT_SET, PROFILE_FILENAME};
use crate::identity::{Identity, IdentityDirectory, Role};
use crate::store::DocumentStore;
use crate::{BookingError, BookingResult};
use chrono::{DateTime, Utc};
use medibook_uuid::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Daily consultation window, as `HH:MM` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsultationHours {
    pub start: String,
    pub end: String,
}

impl Default for ConsultationHours {
    fn default() -> Self {
        Self {
            start: DEFAULT_HOURS_START.into(),
            end: DEFAULT_HOURS_END.into(),
        }
    }
}

/// A patient review of a doctor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// Reviewing identity. Absent for imported or seeded reviews.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<RecordId>,
    pub name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// A doctor's public profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: RecordId,
    pub identity_id: RecordId,
    pub specialty: String,
    pub qualifications: Vec<String>,
    pub experience_years: u32,
    pub consultation_hours: ConsultationHours,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    /// Mean review rating, 0 when there are no reviews.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DoctorProfile {
    fn placeholder(id: RecordId, identity_id: RecordId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            identity_id,
            specialty: NOT_SET.into(),
            qualifications: vec![NOT_SET.into()],
            experience_years: 0,
            consultation_hours: ConsultationHours::default(),
            profile_image: None,
            contact_phone: None,
            location: None,
            reviews: Vec::new(),
            rating: 0.0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the doctor has filled in specialty, qualifications and experience.
    pub fn is_complete(&self) -> bool {
        self.specialty != NOT_SET
            && !(self.qualifications.len() == 1 && self.qualifications[0] == NOT_SET)
            && self.experience_years > 0
    }

    /// Recomputes `rating` and `review_count` from `reviews`.
    pub fn recompute_rating(&mut self) {
        self.review_count = self.reviews.len();
        self.rating = if self.reviews.is_empty() {
            0.0
        } else {
            let total: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
            f64::from(total) / self.reviews.len() as f64
        };
    }

    /// Replaces placeholder fields with `defaults`. Returns whether anything changed.
    pub fn apply_defaults(&mut self, defaults: &ProfileDefaults) -> bool {
        let mut changed = false;
        if self.specialty == NOT_SET || self.specialty.trim().is_empty() {
            self.specialty = defaults.specialty.clone();
            changed = true;
        }
        if self.qualifications.is_empty()
            || (self.qualifications.len() == 1 && self.qualifications[0] == NOT_SET)
        {
            self.qualifications = defaults.qualifications.clone();
            changed = true;
        }
        if self.experience_years == 0 {
            self.experience_years = defaults.experience_years;
            changed = true;
        }
        changed
    }

    fn merge(&mut self, update: ProfileUpdate) {
        if let Some(specialty) = update.specialty {
            self.specialty = specialty;
        }
        if let Some(qualifications) = update.qualifications {
            self.qualifications = qualifications;
        }
        if let Some(years) = update.experience_years {
            self.experience_years = years;
        }
        if let Some(hours) = update.consultation_hours {
            self.consultation_hours = hours;
        }
        if let Some(phone) = update.contact_phone {
            self.contact_phone = Some(phone);
        }
        if let Some(location) = update.location {
            self.location = Some(location);
        }
    }
}

/// A profile together with its owning identity, when that identity still exists.
#[derive(Debug, Clone, PartialEq)]
pub struct DoctorEntry {
    pub profile: DoctorProfile,
    pub owner: Option<Identity>,
}

/// Canonical profile changes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub specialty: Option<String>,
    pub qualifications: Option<Vec<String>>,
    pub experience_years: Option<u32>,
    pub consultation_hours: Option<ConsultationHours>,
    pub contact_phone: Option<String>,
    pub location: Option<String>,
}

/// Loosely typed profile fields as received from a form or JSON body.
///
/// - `qualifications`: list of strings or a comma separated string
/// - `experience`: number or numeric string
/// - `consultation_hours`: object or JSON-encoded string; unparseable values are dropped
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfileUpdate {
    pub specialty: Option<Value>,
    pub qualifications: Option<Value>,
    pub experience: Option<Value>,
    pub consultation_hours: Option<Value>,
    pub contact_phone: Option<Value>,
    pub location: Option<Value>,
}

impl RawProfileUpdate {
    /// Converts the raw fields into a [`ProfileUpdate`].
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidInput`] for negative or non-numeric experience, or a field
    /// of an unusable JSON type.
    pub fn normalise(self) -> BookingResult<ProfileUpdate> {
        Ok(ProfileUpdate {
            specialty: optional_text("specialty", self.specialty)?,
            qualifications: self.qualifications.map(qualifications_from).transpose()?.flatten(),
            experience_years: self.experience.map(experience_from).transpose()?.flatten(),
            consultation_hours: self.consultation_hours.and_then(hours_from),
            contact_phone: optional_text("contactPhone", self.contact_phone)?,
            location: optional_text("location", self.location)?,
        })
    }
}

fn optional_text(field: &str, value: Option<Value>) -> BookingResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(other) => Err(BookingError::InvalidInput(format!(
            "{field} must be a string, got {other}"
        ))),
    }
}

fn qualifications_from(value: Value) -> BookingResult<Option<Vec<String>>> {
    let list: Vec<String> = match value {
        Value::Null => return Ok(None),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                other => Err(BookingError::InvalidInput(format!(
                    "qualifications must be strings, got {other}"
                ))),
            })
            .collect::<BookingResult<Vec<_>>>()?
            .into_iter()
            .filter(|q| !q.is_empty())
            .collect(),
        other => {
            return Err(BookingError::InvalidInput(format!(
                "qualifications must be a list or comma separated string, got {other}"
            )))
        }
    };
    Ok((!list.is_empty()).then_some(list))
}

fn experience_from(value: Value) -> BookingResult<Option<u32>> {
    let years: i64 = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| {
                BookingError::InvalidInput(format!("experience must be whole years, got {n}"))
            })?,
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse().map_err(|_| {
            BookingError::InvalidInput(format!("experience must be a number, got '{s}'"))
        })?,
        other => {
            return Err(BookingError::InvalidInput(format!(
                "experience must be a number, got {other}"
            )))
        }
    };

    if years < 0 {
        return Err(BookingError::InvalidInput(
            "experience cannot be negative".into(),
        ));
    }
    u32::try_from(years)
        .map(Some)
        .map_err(|_| BookingError::InvalidInput("experience is out of range".into()))
}

fn hours_from(value: Value) -> Option<ConsultationHours> {
    let parsed = match value {
        Value::String(s) => serde_json::from_str::<ConsultationHours>(&s),
        other => serde_json::from_value::<ConsultationHours>(other),
    };
    match parsed {
        Ok(hours) => Some(hours),
        Err(e) => {
            tracing::debug!("dropping unparseable consultation hours: {}", e);
            None
        }
    }
}

/// Why a doctor is or is not publicly listed.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityReport {
    pub identity: Identity,
    pub profile: Option<DoctorProfile>,
    pub visible: bool,
    pub reasons: Vec<&'static str>,
}

/// Service over the doctor profile collection.
#[derive(Clone, Debug)]
pub struct DoctorDirectory {
    store: DocumentStore<DoctorProfile>,
    identities: IdentityDirectory,
    clock: Arc<dyn Clock>,
    write_lock: Arc<Mutex<()>>,
}

impl DoctorDirectory {
    pub fn new(dir: PathBuf, identities: IdentityDirectory, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: DocumentStore::new(dir, PROFILE_FILENAME),
            identities,
            clock,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn lock(&self) -> BookingResult<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| BookingError::LockPoisoned("doctor directory"))
    }

    /// Profiles visible to the public: approved doctors with complete profiles.
    pub fn public_listing(&self) -> Vec<DoctorEntry> {
        let mut entries: Vec<DoctorEntry> = self
            .store
            .list()
            .into_iter()
            .filter(DoctorProfile::is_complete)
            .filter_map(|profile| {
                let owner = self.identities.get(&profile.identity_id).ok().flatten()?;
                owner.is_approved_doctor().then(|| DoctorEntry {
                    profile,
                    owner: Some(owner),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.profile.created_at.cmp(&b.profile.created_at));
        entries
    }

    pub fn get(&self, profile_id: &RecordId) -> BookingResult<Option<DoctorProfile>> {
        self.store.load(profile_id)
    }

    /// Loads a profile or fails with [`BookingError::NotFound`].
    pub fn require(&self, profile_id: &RecordId) -> BookingResult<DoctorProfile> {
        self.get(profile_id)?
            .ok_or_else(|| BookingError::NotFound("Doctor not found".into()))
    }

    /// Any profile by id, with its owner when resolvable.
    pub fn public_profile(&self, profile_id: &RecordId) -> BookingResult<DoctorEntry> {
        let profile = self.require(profile_id)?;
        let owner = self.identities.get(&profile.identity_id)?;
        Ok(DoctorEntry { profile, owner })
    }

    pub fn find_by_identity(&self, identity_id: &RecordId) -> Option<DoctorProfile> {
        self.store
            .list()
            .into_iter()
            .find(|p| &p.identity_id == identity_id)
    }

    /// Strict form of [`DoctorDirectory::find_by_identity`] for writers that keep one profile
    /// per identity.
    fn owned_profile(&self, identity_id: &RecordId) -> BookingResult<Option<DoctorProfile>> {
        Ok(self
            .store
            .try_list()?
            .into_iter()
            .find(|p| &p.identity_id == identity_id))
    }

    /// The caller's own profile.
    pub fn own_profile(&self, identity: &Identity) -> BookingResult<DoctorEntry> {
        let profile = self.find_by_identity(&identity.id).ok_or_else(|| {
            BookingError::NotFound("No profile for this doctor. Please create one.".into())
        })?;
        Ok(DoctorEntry {
            profile,
            owner: Some(identity.clone()),
        })
    }

    /// Creates the placeholder profile written at doctor registration.
    ///
    /// Returns the existing profile if the identity already has one.
    pub fn create_placeholder(&self, identity: &Identity) -> BookingResult<DoctorProfile> {
        let _guard = self.lock()?;
        if let Some(existing) = self.owned_profile(&identity.id)? {
            return Ok(existing);
        }

        let id = self.store.allocate_id()?;
        let profile = DoctorProfile::placeholder(id.clone(), identity.id.clone(), self.clock.now());
        self.store.save(&id, &profile)?;
        Ok(profile)
    }

    /// Creates or merges the caller's profile.
    ///
    /// # Arguments
    ///
    /// * `identity` - Owning doctor identity
    /// * `update` - Normalised field changes; absent fields are left as they are
    /// * `image_ref` - Upload reference of a new profile image, if one was sent
    pub fn upsert_profile(
        &self,
        identity: &Identity,
        update: ProfileUpdate,
        image_ref: Option<String>,
    ) -> BookingResult<DoctorEntry> {
        let _guard = self.lock()?;
        let now = self.clock.now();

        let mut profile = match self.owned_profile(&identity.id)? {
            Some(profile) => profile,
            None => {
                let id = self.store.allocate_id()?;
                DoctorProfile::placeholder(id, identity.id.clone(), now)
            }
        };

        profile.merge(update);
        if let Some(image) = image_ref {
            profile.profile_image = Some(image);
        }
        profile.updated_at = now;
        self.store.save(&profile.id, &profile)?;

        tracing::info!(
            "updated profile {} (complete: {})",
            profile.id,
            profile.is_complete()
        );
        Ok(DoctorEntry {
            profile,
            owner: Some(identity.clone()),
        })
    }

    /// Adds a review from `reviewer` and refreshes the aggregate rating.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] if the profile does not exist
    /// - [`BookingError::InvalidInput`] for a rating outside 1..=5 or an empty comment
    /// - [`BookingError::Conflict`] if `reviewer` already reviewed this doctor
    pub fn add_review(
        &self,
        profile_id: &RecordId,
        reviewer: &Identity,
        rating: i64,
        comment: &str,
    ) -> BookingResult<DoctorProfile> {
        let rating = u8::try_from(rating)
            .ok()
            .filter(|r| (1..=5).contains(r))
            .ok_or_else(|| BookingError::InvalidInput("rating must be between 1 and 5".into()))?;
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(BookingError::InvalidInput("comment is required".into()));
        }

        let _guard = self.lock()?;
        let mut profile = self.require(profile_id)?;

        if profile
            .reviews
            .iter()
            .any(|r| r.reviewer_id.as_ref() == Some(&reviewer.id))
        {
            return Err(BookingError::Conflict("Doctor already reviewed".into()));
        }

        let now = self.clock.now();
        profile.reviews.push(Review {
            reviewer_id: Some(reviewer.id.clone()),
            name: reviewer.name.to_string(),
            rating,
            comment: comment.to_string(),
            created_at: now,
        });
        profile.recompute_rating();
        profile.updated_at = now;
        self.store.save(profile_id, &profile)?;

        Ok(profile)
    }

    /// Fills placeholder fields from `defaults`, creating the profile if it is missing.
    pub fn complete_with_defaults(
        &self,
        identity: &Identity,
        defaults: &ProfileDefaults,
    ) -> BookingResult<DoctorProfile> {
        let _guard = self.lock()?;
        let now = self.clock.now();

        match self.owned_profile(&identity.id)? {
            Some(mut profile) => {
                if profile.apply_defaults(defaults) {
                    profile.updated_at = now;
                    self.store.save(&profile.id, &profile)?;
                    tracing::info!("auto-completed profile {}", profile.id);
                }
                Ok(profile)
            }
            None => {
                let id = self.store.allocate_id()?;
                let mut profile = DoctorProfile::placeholder(id.clone(), identity.id.clone(), now);
                profile.apply_defaults(defaults);
                profile.consultation_hours = defaults.consultation_hours.clone();
                self.store.save(&id, &profile)?;
                tracing::info!("created missing profile {} for {}", id, identity.id);
                Ok(profile)
            }
        }
    }

    /// Writes a fully formed profile. Used by seeding.
    pub(crate) fn insert(&self, profile: &DoctorProfile) -> BookingResult<()> {
        let _guard = self.lock()?;
        self.store.save(&profile.id, profile)
    }

    pub(crate) fn allocate_id(&self) -> BookingResult<RecordId> {
        self.store.allocate_id()
    }

    /// Removes the profile owned by `identity_id`. Returns `false` if there was none.
    pub fn delete_for_identity(&self, identity_id: &RecordId) -> BookingResult<bool> {
        let _guard = self.lock()?;
        match self.find_by_identity(identity_id) {
            Some(profile) => self.store.delete(&profile.id),
            None => Ok(false),
        }
    }

    pub fn delete(&self, profile_id: &RecordId) -> BookingResult<bool> {
        let _guard = self.lock()?;
        self.store.delete(profile_id)
    }

    pub fn list_all(&self) -> Vec<DoctorProfile> {
        self.store.list()
    }

    /// Profiles whose owning identity no longer exists.
    pub fn orphaned_profiles(&self) -> Vec<DoctorProfile> {
        let known: HashSet<RecordId> = self
            .identities
            .list_all()
            .into_iter()
            .map(|i| i.id)
            .collect();
        self.store
            .list()
            .into_iter()
            .filter(|p| !known.contains(&p.identity_id))
            .collect()
    }

    /// Explains, for every doctor identity, whether it appears in the public listing.
    pub fn visibility_report(&self) -> Vec<VisibilityReport> {
        self.identities
            .list_by_role(Role::Doctor)
            .into_iter()
            .map(|identity| {
                let profile = self.find_by_identity(&identity.id);
                let mut reasons = Vec::new();
                if !identity.approved {
                    reasons.push("not approved");
                }
                match &profile {
                    None => reasons.push("no profile"),
                    Some(p) if !p.is_complete() => reasons.push("profile incomplete"),
                    Some(_) => {}
                }
                VisibilityReport {
                    visible: reasons.is_empty(),
                    identity,
                    profile,
                    reasons,
                }
            })
            .collect()
    }

    /// Removes every profile.
    pub fn clear(&self) -> BookingResult<()> {
        self.store.clear()
    }
}
