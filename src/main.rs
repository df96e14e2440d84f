mod admission;
mod api;
mod auth;
mod config;
mod error;
mod fleet;
mod lifecycle;
mod models;
mod observability;
mod state;
mod store;
mod tracking;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::admission::redis::RedisCounterStore;
use crate::admission::CounterStore;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let shared_counters: Option<Arc<dyn CounterStore>> = match &config.redis_url {
        Some(url) => match RedisCounterStore::connect(url).await {
            Ok(store) => Some(Arc::new(store)),
            Err(err) => {
                tracing::warn!(error = %err, "rate gate starting on local counters only");
                None
            }
        },
        None => {
            tracing::info!("no REDIS_URL configured, rate gate uses local counters");
            None
        }
    };

    let shared_state = Arc::new(state::AppState::with_counter_store(
        config.clone(),
        shared_counters,
    ));
    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
