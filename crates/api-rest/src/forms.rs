//! Multipart form bodies.

use crate::error::{ApiError, ApiResult};
use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use medibook_core::{BookingRequest, RawProfileUpdate};
use serde_json::Value;
use utoipa::ToSchema;

/// A file part of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub filename: String,
    pub bytes: Bytes,
}

/// `POST /api/appointments/book` form.
#[derive(Debug, Default, ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct BookingForm {
    pub doctor_id: String,
    /// RFC 3339, or `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
    pub date: Option<String>,
    /// Required when booking without signing in.
    pub guest_email: Option<String>,
    pub notes: Option<String>,
    pub symptoms: Option<String>,
    #[schema(value_type = Vec<String>, format = Binary)]
    pub documents: Vec<UploadPart>,
}

impl BookingForm {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "documents" => {
                    if let Some(upload) = read_upload(field).await? {
                        form.documents.push(upload);
                    }
                }
                "doctorId" => form.doctor_id = read_text(field).await?,
                "date" => form.date = Some(read_text(field).await?),
                "guestEmail" => form.guest_email = Some(read_text(field).await?),
                "notes" => form.notes = Some(read_text(field).await?),
                "symptoms" => form.symptoms = Some(read_text(field).await?),
                other => tracing::debug!("ignoring booking form field {}", other),
            }
        }
        Ok(form)
    }

    /// Builds the booking request, attaching the references of the already stored documents.
    pub fn into_request(self, documents: Vec<String>) -> BookingRequest {
        BookingRequest {
            doctor_profile_id: self.doctor_id,
            scheduled_at: self.date,
            guest_email: self.guest_email,
            notes: self.notes,
            symptoms: self.symptoms,
            documents,
        }
    }
}

/// `PUT /api/doctors/profile` form.
#[derive(Debug, Default, ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct ProfileForm {
    pub specialty: Option<String>,
    /// Comma separated.
    pub qualifications: Option<String>,
    pub experience: Option<String>,
    /// JSON object such as `{"start":"09:00","end":"17:00"}`.
    pub consultation_hours: Option<String>,
    pub contact_phone: Option<String>,
    pub location: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub profile_image: Option<UploadPart>,
}

impl ProfileForm {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "profileImage" => form.profile_image = read_upload(field).await?,
                "specialty" => form.specialty = Some(read_text(field).await?),
                "qualifications" => form.qualifications = Some(read_text(field).await?),
                "experience" => form.experience = Some(read_text(field).await?),
                "consultationHours" => form.consultation_hours = Some(read_text(field).await?),
                "contactPhone" => form.contact_phone = Some(read_text(field).await?),
                "location" => form.location = Some(read_text(field).await?),
                other => tracing::debug!("ignoring profile form field {}", other),
            }
        }
        Ok(form)
    }

    /// Splits the form into raw profile fields and the optional image.
    pub fn into_parts(self) -> (RawProfileUpdate, Option<UploadPart>) {
        let raw = RawProfileUpdate {
            specialty: self.specialty.map(Value::String),
            qualifications: self.qualifications.map(Value::String),
            experience: self.experience.map(Value::String),
            consultation_hours: self.consultation_hours.map(Value::String),
            contact_phone: self.contact_phone.map(Value::String),
            location: self.location.map(Value::String),
        };
        (raw, self.profile_image)
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}

async fn read_text(field: Field<'_>) -> ApiResult<String> {
    field.text().await.map_err(multipart_error)
}

/// Reads a file part. Empty parts (a form submitted without choosing a file) are skipped.
async fn read_upload(field: Field<'_>) -> ApiResult<Option<UploadPart>> {
    let filename = field.file_name().unwrap_or("upload").to_string();
    let bytes = field.bytes().await.map_err(multipart_error)?;
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(UploadPart { filename, bytes }))
}
