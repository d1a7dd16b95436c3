use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, DEFAULT_REST_ADDR, REST_ADDR_ENV, router};

/// Main entry point for the hacCare application
///
/// Serves the REST API (with Swagger UI at `/swagger-ui`) on `HACCARE_REST_ADDR`.
///
/// # Environment Variables
/// - `HACCARE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `HACCARE_POLICY_FILE`: dosing policy overrides (optional)
/// - `HACCARE_LAB_CATALOGUE`: lab reference range catalogue (optional)
/// - `API_KEY`: API key for REST authentication (optional)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("haccare=info".parse()?)
                .add_directive("haccare_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var(REST_ADDR_ENV).unwrap_or_else(|_| DEFAULT_REST_ADDR.into());
    let state = AppState::from_env()?;
    tracing::info!(
        lab_tests = state.cfg.catalogue().len(),
        "++ Starting hacCare REST on {}",
        rest_addr
    );

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
