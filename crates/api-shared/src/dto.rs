//! JSON request and response bodies.
//!
//! Field names are camelCase on the wire. Timestamps are RFC 3339 strings.

use medibook_core::{
    Appointment, ConsultationHours, DoctorEntry, DoctorProfile, Identity, Review,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every error response and of simple acknowledgements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

impl MessageRes {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterReq {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `patient` (default) or `doctor`.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRes {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub approved: bool,
    pub created_at: String,
}

impl From<&Identity> for UserRes {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id.to_string(),
            name: identity.name.to_string(),
            email: identity.email.as_str().to_string(),
            role: identity.role.as_str().to_string(),
            approved: identity.approved,
            created_at: identity.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRes {
    pub message: String,
    pub user: UserRes,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRes {
    pub token: String,
    pub role: String,
    pub approved: bool,
    pub user: UserRes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConsultationHoursDto {
    pub start: String,
    pub end: String,
}

impl From<&ConsultationHours> for ConsultationHoursDto {
    fn from(hours: &ConsultationHours) -> Self {
        Self {
            start: hours.start.clone(),
            end: hours.end.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRes {
    pub name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: String,
}

impl From<&Review> for ReviewRes {
    fn from(review: &Review) -> Self {
        Self {
            name: review.name.clone(),
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: review.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewReq {
    pub rating: i64,
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorRes {
    pub id: String,
    /// Owning account; absent when the account no longer exists.
    pub user: Option<UserRes>,
    pub specialty: String,
    pub qualifications: Vec<String>,
    pub experience: u32,
    pub consultation_hours: ConsultationHoursDto,
    pub profile_image_url: Option<String>,
    pub contact_phone: Option<String>,
    pub location: Option<String>,
    pub rating: f64,
    pub num_reviews: usize,
    pub reviews: Vec<ReviewRes>,
    pub created_at: String,
    pub updated_at: String,
}

impl DoctorRes {
    pub fn new(profile: &DoctorProfile, owner: Option<&Identity>) -> Self {
        Self {
            id: profile.id.to_string(),
            user: owner.map(UserRes::from),
            specialty: profile.specialty.clone(),
            qualifications: profile.qualifications.clone(),
            experience: profile.experience_years,
            consultation_hours: (&profile.consultation_hours).into(),
            profile_image_url: profile.profile_image.clone(),
            contact_phone: profile.contact_phone.clone(),
            location: profile.location.clone(),
            rating: profile.rating,
            num_reviews: profile.review_count,
            reviews: profile.reviews.iter().map(ReviewRes::from).collect(),
            created_at: profile.created_at.to_rfc3339(),
            updated_at: profile.updated_at.to_rfc3339(),
        }
    }
}

impl From<&DoctorEntry> for DoctorRes {
    fn from(entry: &DoctorEntry) -> Self {
        Self::new(&entry.profile, entry.owner.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRes {
    pub id: String,
    pub booking_id: String,
    pub patient_id: Option<String>,
    pub guest_email: Option<String>,
    pub doctor_id: String,
    pub appointment_date: String,
    pub status: String,
    pub documents: Vec<String>,
    pub notes: Option<String>,
    pub symptoms: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Appointment> for AppointmentRes {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id.to_string(),
            booking_id: appointment.booking_id.to_string(),
            patient_id: appointment.patient_id.as_ref().map(|id| id.to_string()),
            guest_email: appointment
                .guest_email
                .as_ref()
                .map(|e| e.as_str().to_string()),
            doctor_id: appointment.doctor_profile_id.to_string(),
            appointment_date: appointment.scheduled_at.to_rfc3339(),
            status: appointment.status.as_str().to_string(),
            documents: appointment.documents.clone(),
            notes: appointment.notes.clone(),
            symptoms: appointment.symptoms.clone(),
            created_at: appointment.created_at.to_rfc3339(),
            updated_at: appointment.updated_at.to_rfc3339(),
        }
    }
}

/// Acknowledgement of a cancel or reschedule, with the updated appointment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AppointmentActionRes {
    pub message: String,
    pub appointment: AppointmentRes,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdateReq {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RescheduleReq {
    /// New appointment time, RFC 3339 or `YYYY-MM-DDTHH:MM[:SS]` (UTC).
    #[serde(default)]
    pub date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use medibook_core::{AppointmentStatus, BookingId, EmailAddress, RecordId};

    #[test]
    fn appointment_res_uses_camel_case_and_rfc3339() {
        let at = Utc
            .with_ymd_and_hms(2030, 6, 1, 10, 0, 0)
            .single()
            .expect("valid instant");
        let appointment = Appointment {
            id: RecordId::new(),
            booking_id: BookingId::parse("APT3006010042").expect("booking id"),
            patient_id: None,
            guest_email: Some(EmailAddress::parse("guest@example.com").expect("email")),
            doctor_profile_id: RecordId::new(),
            scheduled_at: at,
            status: AppointmentStatus::Pending,
            documents: vec!["/uploads/abc".into()],
            notes: None,
            symptoms: Some("cough".into()),
            created_at: at,
            updated_at: at,
        };

        let json = serde_json::to_value(AppointmentRes::from(&appointment)).expect("serialise");

        assert_eq!(json["bookingId"], "APT3006010042");
        assert_eq!(json["guestEmail"], "guest@example.com");
        assert_eq!(json["appointmentDate"], "2030-06-01T10:00:00+00:00");
        assert_eq!(json["status"], "Pending");
        assert!(json["patientId"].is_null());
    }

    #[test]
    fn reschedule_req_accepts_missing_date() {
        let req: RescheduleReq = serde_json::from_str("{}").expect("parse");
        assert!(req.date.is_none());

        let req: RescheduleReq =
            serde_json::from_str(r#"{"date":"2030-06-01T10:00"}"#).expect("parse");
        assert_eq!(req.date.as_deref(), Some("2030-06-01T10:00"));
    }
}
