pub mod fleet;
pub mod orders;
pub mod tracking;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::admission::layer::admit;
use crate::admission::policy::RatePolicy;
use crate::auth::require_actor;
use crate::error::AppError;
use crate::models::order::OrderFilter;
use crate::state::AppState;

/// Gates run before actor resolution; health and metrics sit outside both.
pub fn router(state: Arc<AppState>) -> Router {
    let admission = |policy: RatePolicy| {
        middleware::from_fn_with_state((state.clone(), policy), admit)
    };

    let order_writes = orders::write_router()
        .layer(middleware::from_fn(require_actor))
        .layer(admission(state.config.rate_orders.clone()));
    let ping_writes = tracking::ping_router()
        .layer(middleware::from_fn(require_actor))
        .layer(admission(state.config.rate_tracking.clone()));
    let general = orders::read_router()
        .merge(tracking::query_router())
        .merge(fleet::router())
        .route("/ws", get(ws::ws_handler))
        .layer(middleware::from_fn(require_actor))
        .layer(admission(state.config.rate_general.clone()));

    Router::new()
        .merge(order_writes)
        .merge(ping_writes)
        .merge(general)
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    orders: usize,
    drivers: usize,
    vehicles: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    Ok(Json(HealthResponse {
        status: "ok",
        orders: state.orders.list(&OrderFilter::default()).await?.len(),
        drivers: state.fleet.list_drivers().await?.len(),
        vehicles: state.fleet.list_vehicles().await?.len(),
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
