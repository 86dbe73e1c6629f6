//! Appointment ledger: booking, conflict detection and the status lifecycle.
//!
//! Appointments are stored at `<data_dir>/appointments/<s1>/<s2>/<id>/appointment.yaml` and are
//! never physically deleted by the booking flow.
//!
//! ## Slot invariant
//! For any `(doctor_profile_id, scheduled_at)` pair there is at most one appointment whose status
//! is not `Cancelled`. Creating and rescheduling both claim a slot, and both run the conflict
//! check and the write while holding the ledger's slot lock. Status changes and cancellations
//! take the same lock so they never write back a stale `scheduled_at`. The conflict check reads
//! the collection strictly: an unreadable record fails the booking instead of being skipped.
//!
//! ## Lifecycle
//! ```text
//! Pending ──► Confirmed ──► Completed
//!    │            │
//!    └────────────┴──► Cancelled
//! ```
//! `Cancelled` and `Completed` are terminal for status updates. The owning patient may cancel
//! (idempotent on an already cancelled booking) or reschedule, which puts the booking back to
//! `Pending` at the new time.

use crate::clock::Clock;
use crate::constants::{APPOINTMENT_FILENAME, ID_ALLOCATION_ATTEMPTS};
use crate::doctors::DoctorDirectory;
use crate::guard::{self, Caller};
use crate::identity::{Identity, IdentityDirectory};
use crate::notifications::{Notification, NotificationGateway};
use crate::store::DocumentStore;
use crate::{BookingError, BookingResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use medibook_types::EmailAddress;
use medibook_uuid::{BookingId, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Lifecycle status of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Cancelled => "Cancelled",
            AppointmentStatus::Completed => "Completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Cancelled | AppointmentStatus::Completed
        )
    }

    /// Whether a doctor may move an appointment from `self` to `next`.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            "completed" => Ok(AppointmentStatus::Completed),
            _ => Err(BookingError::InvalidInput(format!(
                "unknown appointment status: {}",
                s.trim()
            ))),
        }
    }
}

/// A stored appointment.
///
/// Exactly one of `patient_id` and `guest_email` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: RecordId,
    pub booking_id: BookingId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_email: Option<EmailAddress>,
    pub doctor_profile_id: RecordId,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub documents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// True when this appointment holds its slot.
    pub fn occupies_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

/// An unvalidated booking request.
#[derive(Debug, Clone, Default)]
pub struct BookingRequest {
    pub doctor_profile_id: String,
    /// RFC 3339, or `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
    pub scheduled_at: Option<String>,
    /// Contact address for bookings made without signing in. Ignored for signed-in callers.
    pub guest_email: Option<String>,
    pub notes: Option<String>,
    pub symptoms: Option<String>,
    /// Upload references of attached documents.
    pub documents: Vec<String>,
}

/// Parses a requested appointment time.
///
/// Accepts RFC 3339 timestamps and offset-less `YYYY-MM-DDTHH:MM[:SS]` (or with a space instead of
/// `T`), which are read as UTC. Sub-second precision is discarded so that two requests for the same
/// slot always compare equal.
pub fn parse_scheduled_at(raw: &str) -> Option<DateTime<Utc>> {
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    let raw = raw.trim();
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NAIVE_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|naive| Utc.from_utc_datetime(&naive))
        })?;

    parsed.with_nanosecond(0)
}

/// Validates a requested time against `now`.
fn future_instant(raw: Option<&str>, now: DateTime<Utc>) -> BookingResult<DateTime<Utc>> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty()).ok_or_else(|| {
        BookingError::InvalidInput("A date is required for an appointment.".into())
    })?;
    let at = parse_scheduled_at(raw)
        .ok_or_else(|| BookingError::InvalidInput("Invalid date format provided.".into()))?;
    if at <= now {
        return Err(BookingError::InvalidInput(
            "Appointment date must be in the future.".into(),
        ));
    }
    Ok(at)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Picks a booking id not present in `existing`.
///
/// # Errors
///
/// Returns [`BookingError::DataIntegrity`] if every candidate collides.
pub(crate) fn allocate_booking_id(
    existing: &HashSet<String>,
    created_on: NaiveDate,
    mut id_source: impl FnMut(NaiveDate) -> BookingId,
) -> BookingResult<BookingId> {
    for _attempt in 0..ID_ALLOCATION_ATTEMPTS {
        let candidate = id_source(created_on);
        if !existing.contains(candidate.as_str()) {
            return Ok(candidate);
        }
        tracing::debug!("booking id {} already taken, regenerating", candidate);
    }

    tracing::error!(
        "failed to allocate a unique booking id after {} attempts",
        ID_ALLOCATION_ATTEMPTS
    );
    Err(BookingError::DataIntegrity(
        "Could not allocate a booking reference. Please try again.".into(),
    ))
}

/// Who an appointment was booked for.
enum Booker {
    Patient(Identity),
    Guest(EmailAddress),
}

/// Service over the appointment collection.
#[derive(Clone, Debug)]
pub struct AppointmentLedger {
    store: DocumentStore<Appointment>,
    identities: IdentityDirectory,
    doctors: DoctorDirectory,
    notifications: NotificationGateway,
    clock: Arc<dyn Clock>,
    slot_lock: Arc<Mutex<()>>,
}

impl AppointmentLedger {
    pub fn new(
        dir: PathBuf,
        identities: IdentityDirectory,
        doctors: DoctorDirectory,
        notifications: NotificationGateway,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store: DocumentStore::new(dir, APPOINTMENT_FILENAME),
            identities,
            doctors,
            notifications,
            clock,
            slot_lock: Arc::new(Mutex::new(())),
        }
    }

    fn lock_slots(&self) -> BookingResult<std::sync::MutexGuard<'_, ()>> {
        self.slot_lock
            .lock()
            .map_err(|_| BookingError::LockPoisoned("appointment ledger"))
    }

    /// Fails with [`BookingError::Conflict`] if another live appointment holds the slot.
    fn ensure_slot_free(
        appointments: &[Appointment],
        doctor_profile_id: &RecordId,
        at: DateTime<Utc>,
        exclude: Option<&RecordId>,
    ) -> BookingResult<()> {
        let taken = appointments.iter().any(|a| {
            &a.doctor_profile_id == doctor_profile_id
                && a.scheduled_at == at
                && a.occupies_slot()
                && Some(&a.id) != exclude
        });
        if taken {
            return Err(BookingError::Conflict(
                "This time slot is already booked.".into(),
            ));
        }
        Ok(())
    }

    fn doctor_name(&self, doctor_profile_id: &RecordId) -> String {
        self.doctors
            .get(doctor_profile_id)
            .ok()
            .flatten()
            .and_then(|p| self.identities.get(&p.identity_id).ok().flatten())
            .map(|i| i.name.to_string())
            .unwrap_or_else(|| "your doctor".into())
    }

    /// Books an appointment.
    ///
    /// A signed-in caller books for themselves and any guest email is ignored; an anonymous
    /// caller must supply a guest email.
    ///
    /// # Errors
    ///
    /// - [`BookingError::InvalidInput`] for a missing, malformed or past time, a missing or
    ///   malformed guest email, or a malformed doctor id
    /// - [`BookingError::NotFound`] if the doctor profile does not exist
    /// - [`BookingError::DataIntegrity`] if the profile's owning identity is missing
    /// - [`BookingError::Conflict`] if the slot is already held
    pub fn create(&self, caller: &Caller, request: BookingRequest) -> BookingResult<Appointment> {
        let now = self.clock.now();
        let scheduled_at = future_instant(request.scheduled_at.as_deref(), now)?;

        let booker = match caller.identity() {
            Some(identity) => Booker::Patient(identity.clone()),
            None => {
                let raw = non_blank(request.guest_email).ok_or_else(|| {
                    BookingError::InvalidInput("Email is required for guest booking.".into())
                })?;
                let email = EmailAddress::parse(&raw).map_err(|_| {
                    BookingError::InvalidInput("Please provide a valid guest email.".into())
                })?;
                Booker::Guest(email)
            }
        };

        let doctor_profile_id = RecordId::parse(request.doctor_profile_id.trim())
            .map_err(|_| BookingError::InvalidInput("Invalid doctor id.".into()))?;
        let profile = self.doctors.require(&doctor_profile_id)?;
        let doctor = match self.identities.get(&profile.identity_id)? {
            Some(doctor) => doctor,
            None => {
                tracing::error!(
                    "data integrity issue: doctor profile {} has no associated identity {}",
                    profile.id,
                    profile.identity_id
                );
                return Err(BookingError::DataIntegrity(
                    "Could not process appointment due to a server data error.".into(),
                ));
            }
        };

        let appointment = {
            let _guard = self.lock_slots()?;
            let existing = self.store.try_list()?;
            Self::ensure_slot_free(&existing, &doctor_profile_id, scheduled_at, None)?;

            let taken: HashSet<String> = existing
                .iter()
                .map(|a| a.booking_id.as_str().to_string())
                .collect();
            let booking_id = allocate_booking_id(&taken, now.date_naive(), |date| {
                BookingId::generate(date, &mut rand::thread_rng())
            })?;

            let id = self.store.allocate_id()?;
            let (patient_id, guest_email) = match &booker {
                Booker::Patient(identity) => (Some(identity.id.clone()), None),
                Booker::Guest(email) => (None, Some(email.clone())),
            };
            let appointment = Appointment {
                id: id.clone(),
                booking_id,
                patient_id,
                guest_email,
                doctor_profile_id,
                scheduled_at,
                status: AppointmentStatus::Pending,
                documents: request.documents,
                notes: non_blank(request.notes),
                symptoms: non_blank(request.symptoms),
                created_at: now,
                updated_at: now,
            };
            self.store.save(&id, &appointment)?;
            appointment
        };

        tracing::info!(
            "booked appointment {} ({}) with doctor profile {} at {}",
            appointment.id,
            appointment.booking_id,
            appointment.doctor_profile_id,
            appointment.scheduled_at
        );

        let (patient_email, patient_name) = match booker {
            Booker::Patient(identity) => (identity.email, identity.name.to_string()),
            Booker::Guest(email) => (email, "Guest".to_string()),
        };
        self.notifications.dispatch(Notification::booking_confirmation(
            patient_email,
            &patient_name,
            doctor.name.as_str(),
            &profile.specialty,
            appointment.booking_id.as_str(),
            appointment.scheduled_at,
        ));
        self.notifications.dispatch(Notification::new_booking(
            doctor.email.clone(),
            doctor.name.as_str(),
            &patient_name,
            appointment.booking_id.as_str(),
            appointment.scheduled_at,
        ));

        Ok(appointment)
    }

    /// Loads an appointment or fails with [`BookingError::NotFound`].
    pub fn get(&self, id: &RecordId) -> BookingResult<Appointment> {
        self.store
            .load(id)?
            .ok_or_else(|| BookingError::NotFound("Appointment not found.".into()))
    }

    /// Moves an appointment to `new_status` on behalf of its doctor.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Unauthenticated`] / [`BookingError::Unauthorized`] unless the caller is
    ///   an approved doctor
    /// - [`BookingError::NotFound`] for an unknown appointment or a doctor without a profile
    /// - [`BookingError::Unauthorized`] if the appointment belongs to another doctor
    /// - [`BookingError::InvalidInput`] for an unknown status or a disallowed transition
    pub fn update_status(
        &self,
        caller: &Caller,
        id: &RecordId,
        new_status: &str,
    ) -> BookingResult<Appointment> {
        let actor = caller.require_approved_doctor()?;
        let new_status: AppointmentStatus = new_status.parse()?;

        // Read and write under the slot lock: a concurrent reschedule may move the record.
        let (appointment, previous) = {
            let _guard = self.lock_slots()?;
            let mut appointment = self.get(id)?;
            let profile = self
                .doctors
                .find_by_identity(&actor.id)
                .ok_or_else(|| BookingError::NotFound("Doctor profile not found.".into()))?;
            if !guard::doctor_owns(&profile, &appointment) {
                return Err(BookingError::Unauthorized(
                    "Not authorized to update this appointment.".into(),
                ));
            }

            if !appointment.status.can_transition_to(new_status) {
                return Err(BookingError::InvalidInput(format!(
                    "cannot change appointment status from {} to {}",
                    appointment.status, new_status
                )));
            }

            let previous = appointment.status;
            appointment.status = new_status;
            appointment.updated_at = self.clock.now();
            self.store.save(id, &appointment)?;
            (appointment, previous)
        };

        tracing::info!(
            "appointment {} status {} -> {}",
            appointment.id,
            previous,
            new_status
        );
        Ok(appointment)
    }

    /// Cancels an appointment on behalf of the patient who booked it.
    ///
    /// Cancelling an already cancelled appointment succeeds without changes or notifications.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Unauthenticated`] for anonymous callers
    /// - [`BookingError::NotFound`] for an unknown appointment
    /// - [`BookingError::Unauthorized`] if the caller did not book it (guest bookings included)
    /// - [`BookingError::InvalidInput`] if it is already completed
    pub fn cancel(&self, caller: &Caller, id: &RecordId) -> BookingResult<Appointment> {
        let actor = caller.require_identity()?;

        let appointment = {
            let _guard = self.lock_slots()?;
            let mut appointment = self.get(id)?;

            if !guard::owns_appointment(actor, &appointment) {
                return Err(BookingError::Unauthorized(
                    "Not authorized to cancel this appointment.".into(),
                ));
            }

            match appointment.status {
                AppointmentStatus::Cancelled => return Ok(appointment),
                AppointmentStatus::Completed => {
                    return Err(BookingError::InvalidInput(
                        "A completed appointment cannot be cancelled.".into(),
                    ))
                }
                AppointmentStatus::Pending | AppointmentStatus::Confirmed => {}
            }

            appointment.status = AppointmentStatus::Cancelled;
            appointment.updated_at = self.clock.now();
            self.store.save(id, &appointment)?;
            appointment
        };
        tracing::info!("appointment {} cancelled by patient", appointment.id);

        self.notifications.dispatch(Notification::cancellation(
            actor.email.clone(),
            actor.name.as_str(),
            &self.doctor_name(&appointment.doctor_profile_id),
            appointment.booking_id.as_str(),
            appointment.scheduled_at,
        ));

        Ok(appointment)
    }

    /// Moves an appointment to a new time on behalf of the patient who booked it.
    ///
    /// The new slot is checked exactly like a new booking; the appointment's own current slot
    /// does not count as a conflict. The status returns to `Pending`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Unauthenticated`] for anonymous callers
    /// - [`BookingError::NotFound`] for an unknown appointment
    /// - [`BookingError::Unauthorized`] if the caller did not book it
    /// - [`BookingError::InvalidInput`] for a completed appointment or a missing, malformed or
    ///   past time
    /// - [`BookingError::Conflict`] if the new slot is held by another appointment
    pub fn reschedule(
        &self,
        caller: &Caller,
        id: &RecordId,
        new_scheduled_at: Option<&str>,
    ) -> BookingResult<Appointment> {
        let actor = caller.require_identity()?;
        let appointment = self.get(id)?;

        if !guard::owns_appointment(actor, &appointment) {
            return Err(BookingError::Unauthorized(
                "Not authorized to reschedule this appointment.".into(),
            ));
        }
        if appointment.status == AppointmentStatus::Completed {
            return Err(BookingError::InvalidInput(
                "A completed appointment cannot be rescheduled.".into(),
            ));
        }

        let now = self.clock.now();
        let scheduled_at = future_instant(new_scheduled_at, now)?;

        let appointment = {
            let _guard = self.lock_slots()?;
            let existing = self.store.try_list()?;
            let mut appointment = existing
                .iter()
                .find(|a| &a.id == id)
                .cloned()
                .ok_or_else(|| BookingError::NotFound("Appointment not found.".into()))?;
            Self::ensure_slot_free(
                &existing,
                &appointment.doctor_profile_id,
                scheduled_at,
                Some(id),
            )?;

            appointment.scheduled_at = scheduled_at;
            appointment.status = AppointmentStatus::Pending;
            appointment.updated_at = now;
            self.store.save(id, &appointment)?;
            appointment
        };

        tracing::info!(
            "appointment {} rescheduled to {}",
            appointment.id,
            appointment.scheduled_at
        );

        self.notifications.dispatch(Notification::rescheduled(
            actor.email.clone(),
            actor.name.as_str(),
            &self.doctor_name(&appointment.doctor_profile_id),
            appointment.booking_id.as_str(),
            appointment.scheduled_at,
        ));

        Ok(appointment)
    }

    /// The caller's own appointments, latest time first.
    pub fn list_for_patient(&self, identity: &Identity) -> Vec<Appointment> {
        let mut mine: Vec<Appointment> = self
            .store
            .list()
            .into_iter()
            .filter(|a| guard::owns_appointment(identity, a))
            .collect();
        mine.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        mine
    }

    /// Appointments booked with the doctor's profile, earliest time first.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::NotFound`] if the doctor has no profile.
    pub fn list_for_doctor(&self, doctor: &Identity) -> BookingResult<Vec<Appointment>> {
        let profile = self
            .doctors
            .find_by_identity(&doctor.id)
            .ok_or_else(|| BookingError::NotFound("Doctor profile not found.".into()))?;

        let mut booked: Vec<Appointment> = self
            .store
            .list()
            .into_iter()
            .filter(|a| guard::doctor_owns(&profile, a))
            .collect();
        booked.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at));
        Ok(booked)
    }

    /// Every appointment, latest time first.
    pub fn list_all(&self) -> Vec<Appointment> {
        let mut all = self.store.list();
        all.sort_by(|a, b| b.scheduled_at.cmp(&a.scheduled_at));
        all
    }

    /// Removes every appointment.
    pub fn clear(&self) -> BookingResult<()> {
        self.store.clear()
    }
}
