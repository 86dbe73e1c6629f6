//! # API REST
//!
//! REST API for MediBook.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - Bearer-token sessions and multipart uploads
//! - OpenAPI/Swagger documentation
//!
//! Uses `api-shared` for DTOs and tokens; every decision about bookings lives in
//! `medibook-core`.

#![warn(rust_2018_idioms)]

mod error;
mod forms;
mod routes;
mod session;

pub use error::{ApiError, ApiResult};

use api_shared::{dto, TokenService};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use medibook_core::{
    config::{data_dir_from_env_value, profile_defaults_from_env_values},
    Clock, CoreConfig, LogNotifier, Services, Sha256CredentialHasher, SystemClock,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// Largest request body accepted, which bounds the size of uploaded documents.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub tokens: TokenService,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Builds the production state from environment variables.
    ///
    /// # Environment Variables
    /// - `MEDIBOOK_DATA_DIR`: Data directory (default: `booking_data`)
    /// - `AUTH_SECRET`: Token signing secret (required)
    /// - `TOKEN_TTL_HOURS`: Token lifetime in hours (default: 24)
    /// - `DEFAULT_SPECIALTY`, `DEFAULT_QUALIFICATIONS`, `DEFAULT_EXPERIENCE_YEARS`: Values used
    ///   to complete a doctor's profile on approval
    ///
    /// # Errors
    /// Returns an error if a value is invalid or the data directory cannot be prepared.
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = data_dir_from_env_value(std::env::var("MEDIBOOK_DATA_DIR").ok());
        let defaults = profile_defaults_from_env_values(
            std::env::var("DEFAULT_SPECIALTY").ok(),
            std::env::var("DEFAULT_QUALIFICATIONS").ok(),
            std::env::var("DEFAULT_EXPERIENCE_YEARS").ok(),
        )?;
        let tokens = TokenService::from_env_values(
            std::env::var("AUTH_SECRET").ok(),
            std::env::var("TOKEN_TTL_HOURS").ok(),
        )?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let services = Services::new(
            Arc::new(CoreConfig::new(data_dir, defaults)?),
            Arc::new(LogNotifier),
            clock.clone(),
            Arc::new(Sha256CredentialHasher),
        )?;

        Ok(Self {
            services,
            tokens,
            clock,
        })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::system::health,
        routes::system::ping,
        routes::system::read_upload,
        routes::auth::register,
        routes::auth::login,
        routes::doctors::list_doctors,
        routes::doctors::get_doctor,
        routes::doctors::own_profile,
        routes::doctors::upsert_profile,
        routes::doctors::add_review,
        routes::appointments::book,
        routes::appointments::my_appointments,
        routes::appointments::doctor_appointments,
        routes::appointments::update_status,
        routes::appointments::cancel,
        routes::appointments::reschedule,
        routes::admin::unapproved_doctors,
        routes::admin::users,
        routes::admin::doctors,
        routes::admin::appointments,
        routes::admin::approve_doctor,
        routes::admin::delete_doctor,
    ),
    components(schemas(
        dto::HealthRes,
        dto::MessageRes,
        dto::RegisterReq,
        dto::RegisterRes,
        dto::LoginReq,
        dto::LoginRes,
        dto::UserRes,
        dto::ConsultationHoursDto,
        dto::ReviewRes,
        dto::ReviewReq,
        dto::DoctorRes,
        dto::AppointmentRes,
        dto::AppointmentActionRes,
        dto::StatusUpdateReq,
        dto::RescheduleReq,
        forms::BookingForm,
        forms::ProfileForm,
    )),
    modifiers(&BearerAuth)
)]
struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// Builds the full HTTP surface for `state`.
pub fn router(state: AppState) -> Router {
    use routes::{admin, appointments, auth, doctors, system};

    let api = Router::new()
        .route("/ping", get(system::ping))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/doctors", get(doctors::list_doctors))
        .route(
            "/doctors/profile",
            get(doctors::own_profile).put(doctors::upsert_profile),
        )
        .route("/doctors/:id", get(doctors::get_doctor))
        .route("/doctors/:id/reviews", post(doctors::add_review))
        .route("/appointments/book", post(appointments::book))
        .route(
            "/appointments/my-appointments",
            get(appointments::my_appointments),
        )
        .route(
            "/appointments/doctor-appointments",
            get(appointments::doctor_appointments),
        )
        .route("/appointments/:id", delete(appointments::cancel))
        .route("/appointments/:id/status", put(appointments::update_status))
        .route(
            "/appointments/:id/reschedule",
            put(appointments::reschedule),
        )
        .route("/admin/unapproved-doctors", get(admin::unapproved_doctors))
        .route("/admin/users", get(admin::users))
        .route("/admin/doctors", get(admin::doctors))
        .route("/admin/appointments", get(admin::appointments))
        .route("/admin/approve-doctor/:id", put(admin::approve_doctor))
        .route("/admin/doctor/:id", delete(admin::delete_doctor));

    Router::new()
        .route("/health", get(system::health))
        .route("/uploads/:hash", get(system::read_upload))
        .nest("/api", api)
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Duration;
    use http_body_util::BodyExt;
    use medibook_core::notifications::RecordingNotifier;
    use medibook_core::{ProfileDefaults, SeedData};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "medibook-test-boundary";
    const FUTURE_SLOT: &str = "2099-06-01T10:00:00Z";

    struct TestApp {
        _temp: TempDir,
        router: Router,
    }

    fn app() -> TestApp {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let config = CoreConfig::new(temp.path().to_path_buf(), ProfileDefaults::default())
            .expect("valid config");
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let services = Services::new(
            Arc::new(config),
            Arc::new(RecordingNotifier::new()),
            clock.clone(),
            Arc::new(Sha256CredentialHasher),
        )
        .expect("services");
        services
            .seeder
            .seed(&SeedData::bundled().expect("bundled seed"))
            .expect("seed");

        let state = AppState {
            services,
            tokens: TokenService::new("test-secret", Duration::hours(1)),
            clock,
        };
        TestApp {
            _temp: temp,
            router: router(state),
        }
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, filename, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("response body")
            .to_bytes();
        (status, bytes.to_vec())
    }

    async fn send_json(
        app: &TestApp,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let (status, bytes) = send(app, request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn book(app: &TestApp, token: Option<&str>, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/appointments/book")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder
            .body(Body::from(multipart_body(parts)))
            .expect("request");
        let (status, bytes) = send(app, request).await;
        (
            status,
            serde_json::from_slice(&bytes).expect("json response"),
        )
    }

    async fn login(app: &TestApp, email: &str, password: &str) -> String {
        let (status, body) = send_json(
            app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().expect("token").to_string()
    }

    async fn register_patient(app: &TestApp, email: &str) -> String {
        let (status, _) = send_json(
            app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Pat Lee", "email": email, "password": "secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        login(app, email, "secret123").await
    }

    async fn first_doctor_id(app: &TestApp) -> String {
        let (status, body) = send_json(app, "GET", "/api/doctors", None, None).await;
        assert_eq!(status, StatusCode::OK);
        body[0]["id"].as_str().expect("doctor id").to_string()
    }

    async fn doctor_id_for(app: &TestApp, email: &str) -> String {
        let (_, body) = send_json(app, "GET", "/api/doctors", None, None).await;
        body.as_array()
            .expect("doctor list")
            .iter()
            .find(|d| d["user"]["email"] == email)
            .and_then(|d| d["id"].as_str())
            .expect("seeded doctor")
            .to_string()
    }

    #[tokio::test]
    async fn health_and_ping_respond() {
        let app = app();

        let (status, body) = send_json(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let request = Request::get("/api/ping").body(Body::empty()).expect("request");
        let (status, bytes) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"pong");
    }

    #[tokio::test]
    async fn register_and_login() {
        let app = app();

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Pat Lee",
                "email": "Pat@Example.com",
                "password": "secret123"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User registered successfully!");
        assert_eq!(body["user"]["email"], "pat@example.com");
        assert_eq!(body["user"]["role"], "patient");

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Pat Again",
                "email": "pat@example.com",
                "password": "secret123"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "{body}");

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "pat@example.com", "password": "secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["role"], "patient");
        assert_eq!(body["approved"], true);
        assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

        let (status, body) = send_json(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "pat@example.com", "password": "wrong-password" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn unapproved_doctor_cannot_sign_in() {
        let app = app();

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Ada Jones",
                "email": "ada@example.com",
                "password": "secret123",
                "role": "doctor"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "secret123" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn guest_booking_stores_documents_after_acceptance() {
        let app = app();
        let doctor_id = first_doctor_id(&app).await;
        let document = b"%PDF-1.4 referral letter";

        let (status, body) = book(
            &app,
            None,
            &[
                Part::Text("doctorId", &doctor_id),
                Part::Text("date", FUTURE_SLOT),
                Part::Text("guestEmail", "guest@example.com"),
                Part::Text("symptoms", "cough"),
                Part::File("documents", "referral.pdf", document),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["status"], "Pending");
        assert_eq!(body["guestEmail"], "guest@example.com");
        assert!(body["patientId"].is_null());
        assert!(body["bookingId"].as_str().is_some_and(|b| b.starts_with("APT")));

        let reference = body["documents"][0].as_str().expect("document reference");
        let request = Request::get(reference).body(Body::empty()).expect("request");
        let (status, bytes) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, document);
    }

    #[tokio::test]
    async fn failed_upload_leaves_the_slot_free() {
        let app = app();
        let doctor_id = first_doctor_id(&app).await;
        let uploads = app._temp.path().join("uploads");
        std::fs::create_dir_all(&uploads).expect("uploads dir");
        std::fs::write(uploads.join("sha256"), b"not a directory").expect("block shard root");

        let (status, _) = book(
            &app,
            None,
            &[
                Part::Text("doctorId", &doctor_id),
                Part::Text("date", FUTURE_SLOT),
                Part::Text("guestEmail", "guest@example.com"),
                Part::File("documents", "referral.pdf", b"%PDF-1.4 referral"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, body) = book(
            &app,
            None,
            &[
                Part::Text("doctorId", &doctor_id),
                Part::Text("date", FUTURE_SLOT),
                Part::Text("guestEmail", "guest@example.com"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["documents"], json!([]));
    }

    #[tokio::test]
    async fn same_slot_cannot_be_booked_twice() {
        let app = app();
        let doctor_id = first_doctor_id(&app).await;
        let parts = [
            Part::Text("doctorId", &doctor_id),
            Part::Text("date", FUTURE_SLOT),
            Part::Text("guestEmail", "guest@example.com"),
        ];

        let (status, _) = book(&app, None, &parts).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = book(&app, None, &parts).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "This time slot is already booked.");
    }

    #[tokio::test]
    async fn invalid_token_books_as_guest() {
        let app = app();
        let doctor_id = first_doctor_id(&app).await;

        let (status, body) = book(
            &app,
            Some("not-a-token"),
            &[
                Part::Text("doctorId", &doctor_id),
                Part::Text("date", FUTURE_SLOT),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email is required for guest booking.");

        let (status, body) = book(
            &app,
            Some("not-a-token"),
            &[
                Part::Text("doctorId", &doctor_id),
                Part::Text("date", FUTURE_SLOT),
                Part::Text("guestEmail", "guest@example.com"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["guestEmail"], "guest@example.com");
    }

    #[tokio::test]
    async fn protected_routes_report_token_problems() {
        let app = app();

        let (status, body) =
            send_json(&app, "GET", "/api/appointments/my-appointments", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authorized, no token");

        let (status, body) = send_json(
            &app,
            "GET",
            "/api/appointments/my-appointments",
            Some("garbage"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Not authorized, token failed");

        let patient = register_patient(&app, "pat@example.com").await;
        let (status, _) = send_json(&app, "GET", "/api/admin/users", Some(&patient), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn patient_and_doctor_manage_an_appointment() {
        let app = app();
        let doctor_id = doctor_id_for(&app, "priya.sharma@example.com").await;
        let patient = register_patient(&app, "pat@example.com").await;

        let (status, booked) = book(
            &app,
            Some(&patient),
            &[
                Part::Text("doctorId", &doctor_id),
                Part::Text("date", FUTURE_SLOT),
                Part::Text("guestEmail", "ignored@example.com"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{booked}");
        assert!(booked["guestEmail"].is_null());
        let id = booked["id"].as_str().expect("appointment id").to_string();

        let (_, mine) =
            send_json(&app, "GET", "/api/appointments/my-appointments", Some(&patient), None).await;
        assert_eq!(mine.as_array().map(Vec::len), Some(1));

        let doctor = login(&app, "priya.sharma@example.com", "password").await;
        let (status, listed) = send_json(
            &app,
            "GET",
            "/api/appointments/doctor-appointments",
            Some(&doctor),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed[0]["id"], id.as_str());

        let (status, body) = send_json(
            &app,
            "PUT",
            &format!("/api/appointments/{id}/status"),
            Some(&doctor),
            Some(json!({ "status": "Confirmed" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Confirmed");

        let (status, body) = send_json(
            &app,
            "PUT",
            &format!("/api/appointments/{id}/reschedule"),
            Some(&patient),
            Some(json!({ "date": "2099-06-02T11:00:00Z" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Appointment rescheduled");
        assert_eq!(body["appointment"]["status"], "Pending");

        let (status, body) = send_json(
            &app,
            "DELETE",
            &format!("/api/appointments/{id}"),
            Some(&doctor),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{body}");

        let (status, body) = send_json(
            &app,
            "DELETE",
            &format!("/api/appointments/{id}"),
            Some(&patient),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["appointment"]["status"], "Cancelled");
    }

    #[tokio::test]
    async fn malformed_ids_are_not_found() {
        let app = app();

        let (status, body) = send_json(&app, "GET", "/api/doctors/not-an-id", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Doctor not found");
    }

    #[tokio::test]
    async fn admin_approval_lists_the_doctor() {
        let app = app();
        let (_, before) = send_json(&app, "GET", "/api/doctors", None, None).await;
        let before = before.as_array().map(Vec::len).expect("doctor list");

        let (status, _) = send_json(
            &app,
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Ada Jones",
                "email": "ada@example.com",
                "password": "secret123",
                "role": "doctor"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let admin = login(&app, "admin@example.com", "adminpassword").await;
        let (status, pending) = send_json(
            &app,
            "GET",
            "/api/admin/unapproved-doctors",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let ada = pending
            .as_array()
            .expect("pending list")
            .iter()
            .find(|u| u["email"] == "ada@example.com")
            .and_then(|u| u["id"].as_str())
            .expect("pending doctor")
            .to_string();

        let (status, _) = send_json(
            &app,
            "PUT",
            &format!("/api/admin/approve-doctor/{ada}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, after) = send_json(&app, "GET", "/api/doctors", None, None).await;
        assert_eq!(after.as_array().map(Vec::len), Some(before + 1));

        let doctor = login(&app, "ada@example.com", "secret123").await;
        let (status, profile) =
            send_json(&app, "GET", "/api/doctors/profile", Some(&doctor), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["specialty"], "Cardiologist");

        let (status, body) = send_json(
            &app,
            "DELETE",
            &format!("/api/admin/doctor/{ada}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Doctor removed");
    }

    #[tokio::test]
    async fn reviews_update_the_doctor_rating() {
        let app = app();
        let doctor_id = doctor_id_for(&app, "ramesh.patel@example.com").await;
        let patient = register_patient(&app, "pat@example.com").await;
        let uri = format!("/api/doctors/{doctor_id}/reviews");

        let (status, body) = send_json(
            &app,
            "POST",
            &uri,
            Some(&patient),
            Some(json!({ "rating": 6, "comment": "great" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

        let (status, body) = send_json(
            &app,
            "POST",
            &uri,
            Some(&patient),
            Some(json!({ "rating": 1, "comment": "late" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Review added");

        let (status, _) = send_json(
            &app,
            "POST",
            &uri,
            Some(&patient),
            Some(json!({ "rating": 5, "comment": "again" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let doctor_uri = format!("/api/doctors/{doctor_id}");
        let (_, doctor) = send_json(&app, "GET", &doctor_uri, None, None).await;
        let reviews = doctor["numReviews"].as_u64().expect("review count");
        assert!(reviews >= 1);
        assert!(doctor["reviews"]
            .as_array()
            .expect("reviews")
            .iter()
            .any(|r| r["comment"] == "late"));
    }
}
