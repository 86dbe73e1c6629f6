use super::path_id;
use crate::error::ApiResult;
use crate::forms::BookingForm;
use crate::session::{OptionalSession, Session};
use crate::AppState;
use api_shared::dto::{
    AppointmentActionRes, AppointmentRes, MessageRes, RescheduleReq, StatusUpdateReq,
};
use axum::{
    extract::{Multipart, Path as AxumPath, State},
    http::StatusCode,
    response::Json,
};

const NOT_FOUND: &str = "Appointment not found.";

#[utoipa::path(
    post,
    path = "/api/appointments/book",
    request_body(content = BookingForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Appointment booked", body = AppointmentRes),
        (status = 400, description = "Invalid date, email or doctor id", body = MessageRes),
        (status = 404, description = "Doctor not found", body = MessageRes),
        (status = 409, description = "Slot already booked", body = MessageRes)
    )
)]
/// Books an appointment as the signed-in patient, or as a guest identified by `guestEmail`.
///
/// Documents are stored before the booking is written, so a saved appointment never references
/// a missing upload. Uploads of a rejected booking stay in the content store.
#[axum::debug_handler]
pub async fn book(
    State(state): State<AppState>,
    OptionalSession(caller): OptionalSession,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<AppointmentRes>)> {
    let form = BookingForm::read(multipart).await?;

    let mut documents = Vec::with_capacity(form.documents.len());
    for upload in &form.documents {
        let stored = state.services.files.store(&upload.bytes, &upload.filename)?;
        documents.push(stored.reference);
    }

    let appointment = state
        .services
        .ledger
        .create(&caller, form.into_request(documents))?;
    tracing::debug!(
        "booking {} carries {} document(s)",
        appointment.booking_id,
        appointment.documents.len()
    );

    Ok((StatusCode::CREATED, Json(AppointmentRes::from(&appointment))))
}

#[utoipa::path(
    get,
    path = "/api/appointments/my-appointments",
    responses(
        (status = 200, description = "The caller's bookings, newest first", body = [AppointmentRes]),
        (status = 401, description = "Not signed in", body = MessageRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn my_appointments(
    State(state): State<AppState>,
    Session(caller): Session,
) -> ApiResult<Json<Vec<AppointmentRes>>> {
    let identity = caller.require_identity()?;
    let appointments = state.services.ledger.list_for_patient(identity);
    Ok(Json(appointments.iter().map(AppointmentRes::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/appointments/doctor-appointments",
    responses(
        (status = 200, description = "Appointments with the caller, earliest first", body = [AppointmentRes]),
        (status = 401, description = "Not signed in", body = MessageRes),
        (status = 403, description = "Not an approved doctor", body = MessageRes),
        (status = 404, description = "No doctor profile", body = MessageRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn doctor_appointments(
    State(state): State<AppState>,
    Session(caller): Session,
) -> ApiResult<Json<Vec<AppointmentRes>>> {
    let doctor = caller.require_approved_doctor()?;
    let appointments = state.services.ledger.list_for_doctor(doctor)?;
    Ok(Json(appointments.iter().map(AppointmentRes::from).collect()))
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}/status",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = StatusUpdateReq,
    responses(
        (status = 200, description = "Status changed", body = AppointmentRes),
        (status = 400, description = "Unknown status or disallowed transition", body = MessageRes),
        (status = 403, description = "Not the appointment's doctor", body = MessageRes),
        (status = 404, description = "Appointment not found", body = MessageRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn update_status(
    State(state): State<AppState>,
    Session(caller): Session,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<StatusUpdateReq>,
) -> ApiResult<Json<AppointmentRes>> {
    caller.require_approved_doctor()?;
    let id = path_id(&id, NOT_FOUND)?;
    let appointment = state
        .services
        .ledger
        .update_status(&caller, &id, &req.status)?;
    Ok(Json(AppointmentRes::from(&appointment)))
}

#[utoipa::path(
    delete,
    path = "/api/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment cancelled", body = AppointmentActionRes),
        (status = 400, description = "Appointment already completed", body = MessageRes),
        (status = 403, description = "Not the booking patient", body = MessageRes),
        (status = 404, description = "Appointment not found", body = MessageRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn cancel(
    State(state): State<AppState>,
    Session(caller): Session,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<AppointmentActionRes>> {
    caller.require_identity()?;
    let id = path_id(&id, NOT_FOUND)?;
    let appointment = state.services.ledger.cancel(&caller, &id)?;
    Ok(Json(AppointmentActionRes {
        message: "Appointment cancelled".into(),
        appointment: AppointmentRes::from(&appointment),
    }))
}

#[utoipa::path(
    put,
    path = "/api/appointments/{id}/reschedule",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = RescheduleReq,
    responses(
        (status = 200, description = "Appointment moved and set back to Pending", body = AppointmentActionRes),
        (status = 400, description = "Invalid date or completed appointment", body = MessageRes),
        (status = 403, description = "Not the booking patient", body = MessageRes),
        (status = 404, description = "Appointment not found", body = MessageRes),
        (status = 409, description = "Slot already booked", body = MessageRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn reschedule(
    State(state): State<AppState>,
    Session(caller): Session,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<RescheduleReq>,
) -> ApiResult<Json<AppointmentActionRes>> {
    caller.require_identity()?;
    let id = path_id(&id, NOT_FOUND)?;
    let appointment = state
        .services
        .ledger
        .reschedule(&caller, &id, req.date.as_deref())?;
    Ok(Json(AppointmentActionRes {
        message: "Appointment rescheduled".into(),
        appointment: AppointmentRes::from(&appointment),
    }))
}
