//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Development and debugging. The workspace's main `haccare-run` binary serves the same router.

use api_rest::{router, AppState, DEFAULT_REST_ADDR, REST_ADDR_ENV};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the hacCare REST API server.
///
/// # Environment Variables
/// - `HACCARE_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - see [`AppState::from_env`] for the rest
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the policy or lab catalogue files cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("haccare_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var(REST_ADDR_ENV).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());
    tracing::info!("-- Starting hacCare REST API on {}", addr);

    let app = router(AppState::from_env()?);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
