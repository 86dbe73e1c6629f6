//! Per-request authorization.
//!
//! Every service call that depends on who is asking receives a [`Caller`]. The HTTP layer builds
//! one per request from the bearer token; nothing about the caller is stored globally.

use crate::doctors::DoctorProfile;
use crate::identity::{Identity, Role};
use crate::ledger::Appointment;
use crate::{BookingError, BookingResult};

/// Who is making the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated(Identity),
}

impl Caller {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated(identity) => Some(identity),
        }
    }

    /// # Errors
    ///
    /// [`BookingError::Unauthenticated`] for anonymous callers.
    pub fn require_identity(&self) -> BookingResult<&Identity> {
        self.identity()
            .ok_or_else(|| BookingError::Unauthenticated("Not authorized, no token".into()))
    }

    /// # Errors
    ///
    /// [`BookingError::Unauthenticated`] for anonymous callers, [`BookingError::Unauthorized`]
    /// for anyone but an admin.
    pub fn require_admin(&self) -> BookingResult<&Identity> {
        let identity = self.require_identity()?;
        if identity.role != Role::Admin {
            return Err(BookingError::Unauthorized(
                "Not authorized as an admin".into(),
            ));
        }
        Ok(identity)
    }

    /// # Errors
    ///
    /// [`BookingError::Unauthenticated`] for anonymous callers, [`BookingError::Unauthorized`]
    /// unless the caller is a doctor who has been approved.
    pub fn require_approved_doctor(&self) -> BookingResult<&Identity> {
        let identity = self.require_identity()?;
        if !identity.is_approved_doctor() {
            return Err(BookingError::Unauthorized(
                "Not authorized as an approved doctor".into(),
            ));
        }
        Ok(identity)
    }
}

/// True when `identity` booked `appointment`. Guest bookings have no owner.
pub fn owns_appointment(identity: &Identity, appointment: &Appointment) -> bool {
    appointment.patient_id.as_ref() == Some(&identity.id)
}

/// True when `appointment` was booked with `profile`.
pub fn doctor_owns(profile: &DoctorProfile, appointment: &Appointment) -> bool {
    appointment.doctor_profile_id == profile.id
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use medibook_types::{EmailAddress, NonEmptyText};
    use medibook_uuid::RecordId;

    fn identity(role: Role, approved: bool) -> Identity {
        Identity {
            id: RecordId::new(),
            name: NonEmptyText::new("Test").expect("name"),
            email: EmailAddress::parse("t@example.com").expect("email"),
            credential: String::new(),
            role,
            approved,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn anonymous_is_unauthenticated_everywhere() {
        let caller = Caller::Anonymous;
        assert!(matches!(
            caller.require_identity(),
            Err(BookingError::Unauthenticated(_))
        ));
        assert!(matches!(
            caller.require_admin(),
            Err(BookingError::Unauthenticated(_))
        ));
        assert!(matches!(
            caller.require_approved_doctor(),
            Err(BookingError::Unauthenticated(_))
        ));
    }

    #[test]
    fn role_checks() {
        let admin = Caller::Authenticated(identity(Role::Admin, true));
        let patient = Caller::Authenticated(identity(Role::Patient, true));
        let pending_doctor = Caller::Authenticated(identity(Role::Doctor, false));
        let doctor = Caller::Authenticated(identity(Role::Doctor, true));

        assert!(admin.require_admin().is_ok());
        assert!(matches!(
            patient.require_admin(),
            Err(BookingError::Unauthorized(_))
        ));
        assert!(matches!(
            pending_doctor.require_approved_doctor(),
            Err(BookingError::Unauthorized(_))
        ));
        assert!(matches!(
            admin.require_approved_doctor(),
            Err(BookingError::Unauthorized(_))
        ));
        assert!(doctor.require_approved_doctor().is_ok());
    }
}
