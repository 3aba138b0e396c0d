//! Serves the gateway handler over HTTP. Each request opens and closes its own database connection.

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use video_gateway::{common_routes, gateway_routes, AppState, PgDatabase, Settings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("video_gateway=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let db = PgDatabase::from_url(&settings.database_url)?;
    let state = AppState::new(Arc::new(db));

    let app = Router::new()
        .merge(common_routes(state.clone()))
        .merge(gateway_routes(state, settings.body_limit_bytes));

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
