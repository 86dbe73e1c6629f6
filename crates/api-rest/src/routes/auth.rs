use crate::error::{ApiError, ApiResult};
use crate::AppState;
use api_shared::dto::{LoginReq, LoginRes, MessageRes, RegisterReq, RegisterRes, UserRes};
use axum::{extract::State, http::StatusCode, response::Json};
use medibook_core::Registration;

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Account created", body = RegisterRes),
        (status = 400, description = "Validation failed", body = MessageRes),
        (status = 409, description = "Email already registered", body = MessageRes)
    )
)]
/// Registers a patient or doctor account.
///
/// Doctor accounts start unapproved with a placeholder profile and cannot sign in until an admin
/// approves them.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterReq>,
) -> ApiResult<(StatusCode, Json<RegisterRes>)> {
    let identity = state.services.register_account(Registration {
        name: req.name,
        email: req.email,
        password: req.password,
        role: req.role,
    })?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterRes {
            message: "User registered successfully!".into(),
            user: UserRes::from(&identity),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Signed in", body = LoginRes),
        (status = 401, description = "Invalid credentials", body = MessageRes),
        (status = 403, description = "Awaiting approval", body = MessageRes)
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> ApiResult<Json<LoginRes>> {
    let identity = state
        .services
        .identities
        .authenticate(&req.email, &req.password)?;

    let token = state
        .tokens
        .issue(&identity, state.clock.now())
        .map_err(|e| {
            tracing::error!("failed to issue token: {}", e);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
        })?;
    tracing::info!("identity {} signed in", identity.id);

    Ok(Json(LoginRes {
        token,
        role: identity.role.as_str().to_string(),
        approved: identity.approved,
        user: UserRes::from(&identity),
    }))
}
