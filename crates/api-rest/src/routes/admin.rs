use super::path_id;
use crate::error::ApiResult;
use crate::session::Session;
use crate::AppState;
use api_shared::dto::{AppointmentRes, DoctorRes, MessageRes, UserRes};
use axum::{
    extract::{Path as AxumPath, State},
    response::Json,
};

#[utoipa::path(
    get,
    path = "/api/admin/unapproved-doctors",
    responses(
        (status = 200, description = "Doctor accounts awaiting approval", body = [UserRes]),
        (status = 403, description = "Not an admin", body = MessageRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn unapproved_doctors(
    State(state): State<AppState>,
    Session(caller): Session,
) -> ApiResult<Json<Vec<UserRes>>> {
    let identities = state.services.admin.list_unapproved_doctors(&caller)?;
    Ok(Json(identities.iter().map(UserRes::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "Every account", body = [UserRes]),
        (status = 403, description = "Not an admin", body = MessageRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn users(
    State(state): State<AppState>,
    Session(caller): Session,
) -> ApiResult<Json<Vec<UserRes>>> {
    let identities = state.services.admin.list_users(&caller)?;
    Ok(Json(identities.iter().map(UserRes::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/admin/doctors",
    responses(
        (status = 200, description = "Every doctor profile, listed or not", body = [DoctorRes]),
        (status = 403, description = "Not an admin", body = MessageRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn doctors(
    State(state): State<AppState>,
    Session(caller): Session,
) -> ApiResult<Json<Vec<DoctorRes>>> {
    let entries = state.services.admin.list_doctors(&caller)?;
    Ok(Json(entries.iter().map(DoctorRes::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/admin/appointments",
    responses(
        (status = 200, description = "Every appointment, newest first", body = [AppointmentRes]),
        (status = 403, description = "Not an admin", body = MessageRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn appointments(
    State(state): State<AppState>,
    Session(caller): Session,
) -> ApiResult<Json<Vec<AppointmentRes>>> {
    let appointments = state.services.admin.list_appointments(&caller)?;
    Ok(Json(appointments.iter().map(AppointmentRes::from).collect()))
}

#[utoipa::path(
    put,
    path = "/api/admin/approve-doctor/{id}",
    params(("id" = String, Path, description = "Doctor account id")),
    responses(
        (status = 200, description = "Doctor approved", body = MessageRes),
        (status = 403, description = "Not an admin", body = MessageRes),
        (status = 404, description = "Not a doctor account", body = MessageRes)
    ),
    security(("bearer" = []))
)]
/// Approves a doctor account, filling any placeholder profile fields with the configured defaults.
#[axum::debug_handler]
pub async fn approve_doctor(
    State(state): State<AppState>,
    Session(caller): Session,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<MessageRes>> {
    caller.require_admin()?;
    let id = path_id(&id, "Doctor not found or user is not a doctor")?;
    state.services.admin.approve_doctor(&caller, &id)?;

    Ok(Json(MessageRes::new(
        "Doctor approved successfully, profile auto-completed if needed, and notification sent.",
    )))
}

#[utoipa::path(
    delete,
    path = "/api/admin/doctor/{id}",
    params(("id" = String, Path, description = "Doctor account id")),
    responses(
        (status = 200, description = "Doctor removed", body = MessageRes),
        (status = 403, description = "Not an admin", body = MessageRes),
        (status = 404, description = "Doctor not found", body = MessageRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<AppState>,
    Session(caller): Session,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<MessageRes>> {
    caller.require_admin()?;
    let id = path_id(&id, "Doctor not found")?;
    let removal = state.services.admin.delete_doctor(&caller, &id)?;
    Ok(Json(MessageRes::new(removal.message())))
}
