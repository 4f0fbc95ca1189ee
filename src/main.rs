use std::net::SocketAddr;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zerobait_backend_core::{app, initialize_app_state, CONFIG};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&CONFIG.rust_log)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting ZeroBait backend ({} environment)",
        CONFIG.environment
    );

    let state = initialize_app_state()
        .await
        .map_err(|e| anyhow::anyhow!("initialization failed: {e}"))?;
    let app = app::router(state);

    let address = CONFIG.server_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening on {address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
