use super::path_id;
use crate::error::ApiResult;
use crate::forms::ProfileForm;
use crate::session::Session;
use crate::AppState;
use api_shared::dto::{DoctorRes, MessageRes, ReviewReq};
use axum::{
    extract::{Multipart, Path as AxumPath, State},
    http::StatusCode,
    response::Json,
};

#[utoipa::path(
    get,
    path = "/api/doctors",
    responses(
        (status = 200, description = "Approved doctors with complete profiles", body = [DoctorRes])
    )
)]
#[axum::debug_handler]
pub async fn list_doctors(State(state): State<AppState>) -> Json<Vec<DoctorRes>> {
    let doctors = state.services.doctors.public_listing();
    Json(doctors.iter().map(DoctorRes::from).collect())
}

#[utoipa::path(
    get,
    path = "/api/doctors/{id}",
    params(("id" = String, Path, description = "Doctor profile id")),
    responses(
        (status = 200, description = "Doctor profile", body = DoctorRes),
        (status = 404, description = "Doctor not found", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<Json<DoctorRes>> {
    let id = path_id(&id, "Doctor not found")?;
    let entry = state.services.doctors.public_profile(&id)?;
    Ok(Json(DoctorRes::from(&entry)))
}

#[utoipa::path(
    get,
    path = "/api/doctors/profile",
    responses(
        (status = 200, description = "The signed-in doctor's profile", body = DoctorRes),
        (status = 401, description = "Not signed in", body = MessageRes),
        (status = 403, description = "Not an approved doctor", body = MessageRes),
        (status = 404, description = "No profile yet", body = MessageRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn own_profile(
    State(state): State<AppState>,
    Session(caller): Session,
) -> ApiResult<Json<DoctorRes>> {
    let doctor = caller.require_approved_doctor()?;
    let entry = state.services.doctors.own_profile(doctor)?;
    Ok(Json(DoctorRes::from(&entry)))
}

#[utoipa::path(
    put,
    path = "/api/doctors/profile",
    request_body(content = ProfileForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Profile created or updated", body = DoctorRes),
        (status = 400, description = "Invalid field value", body = MessageRes),
        (status = 401, description = "Not signed in", body = MessageRes),
        (status = 403, description = "Not an approved doctor", body = MessageRes)
    ),
    security(("bearer" = []))
)]
/// Creates or updates the signed-in doctor's profile.
///
/// Fields are validated before the profile image is stored, so a rejected update leaves no
/// upload behind.
#[axum::debug_handler]
pub async fn upsert_profile(
    State(state): State<AppState>,
    Session(caller): Session,
    multipart: Multipart,
) -> ApiResult<Json<DoctorRes>> {
    let doctor = caller.require_approved_doctor()?;
    let (raw, image) = ProfileForm::read(multipart).await?.into_parts();
    let update = raw.normalise()?;

    let image_ref = match image {
        Some(upload) => Some(
            state
                .services
                .files
                .store(&upload.bytes, &upload.filename)?
                .reference,
        ),
        None => None,
    };

    let entry = state
        .services
        .doctors
        .upsert_profile(doctor, update, image_ref)?;
    Ok(Json(DoctorRes::from(&entry)))
}

#[utoipa::path(
    post,
    path = "/api/doctors/{id}/reviews",
    params(("id" = String, Path, description = "Doctor profile id")),
    request_body = ReviewReq,
    responses(
        (status = 201, description = "Review added", body = MessageRes),
        (status = 400, description = "Invalid rating or comment", body = MessageRes),
        (status = 401, description = "Not signed in", body = MessageRes),
        (status = 404, description = "Doctor not found", body = MessageRes),
        (status = 409, description = "Already reviewed", body = MessageRes)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub async fn add_review(
    State(state): State<AppState>,
    Session(caller): Session,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<ReviewReq>,
) -> ApiResult<(StatusCode, Json<MessageRes>)> {
    let reviewer = caller.require_identity()?;
    let id = path_id(&id, "Doctor not found")?;
    state
        .services
        .doctors
        .add_review(&id, reviewer, req.rating, &req.comment)?;

    Ok((StatusCode::CREATED, Json(MessageRes::new("Review added"))))
}
