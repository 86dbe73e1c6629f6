//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the MediBook REST API with OpenAPI/Swagger UI.
//!
//! ## Intended use
//! Useful for development when only the HTTP server is wanted. The workspace's `medibook-run`
//! binary serves the same router.

use anyhow::Context;
use api_rest::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the MediBook REST API server
///
/// # Environment Variables
/// - `MEDIBOOK_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `MEDIBOOK_DATA_DIR`: Data directory (default: `booking_data`)
/// - `AUTH_SECRET`: Token signing secret (required)
/// - `TOKEN_TTL_HOURS`: Token lifetime in hours (default: 24)
/// - `DEFAULT_SPECIALTY`, `DEFAULT_QUALIFICATIONS`, `DEFAULT_EXPERIENCE_YEARS`: Values used to
///   complete a doctor's profile on approval
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - configuration values are invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("medibook_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("MEDIBOOK_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let state = AppState::from_env()?;

    tracing::info!("-- Starting MediBook REST API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, api_rest::router(state)).await?;

    Ok(())
}
