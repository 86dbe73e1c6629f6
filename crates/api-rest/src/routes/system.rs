use crate::error::ApiResult;
use crate::AppState;
use api_shared::{dto::HealthRes, HealthService};
use axum::{
    extract::{Path as AxumPath, State},
    http::header,
    response::{IntoResponse, Json},
};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
pub async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    get,
    path = "/api/ping",
    responses(
        (status = 200, description = "Liveness check", body = String)
    )
)]
pub async fn ping() -> &'static str {
    "pong"
}

#[utoipa::path(
    get,
    path = "/uploads/{hash}",
    params(("hash" = String, Path, description = "SHA-256 of the upload")),
    responses(
        (status = 200, description = "Stored file"),
        (status = 404, description = "No such upload")
    )
)]
/// Serves a stored upload with its detected media type.
pub async fn read_upload(
    State(state): State<AppState>,
    AxumPath(hash): AxumPath<String>,
) -> ApiResult<impl IntoResponse> {
    let bytes = state.services.files.read(&hash)?;
    let media_type = state
        .services
        .files
        .metadata(&hash)
        .ok()
        .and_then(|m| m.media_type)
        .unwrap_or_else(|| "application/octet-stream".into());

    Ok(([(header::CONTENT_TYPE, media_type)], bytes))
}
