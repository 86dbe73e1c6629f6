use api_rest::AppState;
use api_shared::HealthService;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for MediBook
///
/// Serves the REST API and Swagger UI until interrupted.
///
/// # Environment Variables
/// - `MEDIBOOK_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `MEDIBOOK_DATA_DIR`: Directory for booking data (default: "booking_data")
/// - `AUTH_SECRET`: Secret used to sign bearer tokens
/// - `TOKEN_TTL_HOURS`: Bearer token lifetime (default: 24)
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, startup or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medibook_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("medibook_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("MEDIBOOK_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let state = AppState::from_env()?;

    tracing::info!(
        "data directory: {}",
        state.services.config.data_dir().display()
    );
    tracing::info!("++ {}", HealthService::check_health().message);
    tracing::info!("++ Starting MediBook REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, api_rest::router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("-- Shutting down");
        })
        .await?;

    Ok(())
}
