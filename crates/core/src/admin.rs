//! Administrative oversight: doctor approval, removal and read-only views.
//!
//! Every operation takes the request's [`Caller`] and requires an admin.

use crate::config::ProfileDefaults;
use crate::doctors::{DoctorDirectory, DoctorEntry};
use crate::guard::Caller;
use crate::identity::{Identity, IdentityDirectory, Role};
use crate::ledger::{Appointment, AppointmentLedger};
use crate::notifications::{Notification, NotificationGateway};
use crate::{BookingError, BookingResult};
use medibook_uuid::RecordId;

/// What [`AdminOversight::delete_doctor`] removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoctorRemoval {
    /// Profile and identity were removed.
    ProfileAndIdentity,
    /// The identity had no profile; only the identity was removed.
    IdentityOnly,
}

impl DoctorRemoval {
    pub fn message(&self) -> &'static str {
        match self {
            DoctorRemoval::ProfileAndIdentity => "Doctor removed",
            DoctorRemoval::IdentityOnly => "Doctor user account removed",
        }
    }
}

#[derive(Clone, Debug)]
pub struct AdminOversight {
    identities: IdentityDirectory,
    doctors: DoctorDirectory,
    ledger: AppointmentLedger,
    notifications: NotificationGateway,
    defaults: ProfileDefaults,
}

impl AdminOversight {
    pub fn new(
        identities: IdentityDirectory,
        doctors: DoctorDirectory,
        ledger: AppointmentLedger,
        notifications: NotificationGateway,
        defaults: ProfileDefaults,
    ) -> Self {
        Self {
            identities,
            doctors,
            ledger,
            notifications,
            defaults,
        }
    }

    /// Approves a doctor and completes their profile from the configured defaults.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Unauthenticated`] / [`BookingError::Unauthorized`] unless the caller is
    ///   an admin
    /// - [`BookingError::NotFound`] if the target does not exist or is not a doctor
    pub fn approve_doctor(&self, caller: &Caller, target: &RecordId) -> BookingResult<Identity> {
        caller.require_admin()?;

        let not_found =
            || BookingError::NotFound("Doctor not found or user is not a doctor".into());
        let identity = self.identities.get(target)?.ok_or_else(not_found)?;
        if identity.role != Role::Doctor {
            return Err(not_found());
        }

        let identity = self.identities.set_approved(target, true)?;
        let profile = self
            .doctors
            .complete_with_defaults(&identity, &self.defaults)?;
        tracing::info!(
            "approved doctor {} (profile {})",
            identity.id,
            profile.id
        );

        self.notifications.dispatch(Notification::doctor_approved(
            identity.email.clone(),
            identity.name.as_str(),
        ));
        Ok(identity)
    }

    /// Removes a doctor's profile and identity.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Unauthenticated`] / [`BookingError::Unauthorized`] unless the caller is
    ///   an admin
    /// - [`BookingError::NotFound`] if neither a doctor identity nor a profile exists
    pub fn delete_doctor(
        &self,
        caller: &Caller,
        target: &RecordId,
    ) -> BookingResult<DoctorRemoval> {
        caller.require_admin()?;

        let identity = self.identities.get(target)?;
        if let Some(identity) = &identity {
            if identity.role != Role::Doctor {
                return Err(BookingError::NotFound("Doctor not found".into()));
            }
        }

        let had_profile = self.doctors.delete_for_identity(target)?;
        let had_identity = identity.is_some() && self.identities.delete(target)?;

        match (had_profile, had_identity) {
            (false, false) => Err(BookingError::NotFound("Doctor not found".into())),
            (false, true) => {
                tracing::info!("removed doctor identity {} (no profile)", target);
                Ok(DoctorRemoval::IdentityOnly)
            }
            (true, _) => {
                tracing::info!("removed doctor {} and profile", target);
                Ok(DoctorRemoval::ProfileAndIdentity)
            }
        }
    }

    pub fn list_unapproved_doctors(&self, caller: &Caller) -> BookingResult<Vec<Identity>> {
        caller.require_admin()?;
        Ok(self.identities.list_unapproved_doctors())
    }

    pub fn list_users(&self, caller: &Caller) -> BookingResult<Vec<Identity>> {
        caller.require_admin()?;
        Ok(self.identities.list_all())
    }

    /// Every profile with its owner, including unapproved and incomplete ones.
    pub fn list_doctors(&self, caller: &Caller) -> BookingResult<Vec<DoctorEntry>> {
        caller.require_admin()?;
        Ok(self
            .doctors
            .list_all()
            .into_iter()
            .map(|profile| {
                let owner = self.identities.get(&profile.identity_id).ok().flatten();
                DoctorEntry { profile, owner }
            })
            .collect())
    }

    pub fn list_appointments(&self, caller: &Caller) -> BookingResult<Vec<Appointment>> {
        caller.require_admin()?;
        Ok(self.ledger.list_all())
    }
}
