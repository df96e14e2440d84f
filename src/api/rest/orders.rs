use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::lifecycle::intake::OrderDraft;
use crate::lifecycle::policy::{self, Authority};
use crate::models::order::{Order, OrderFilter, OrderStatus};
use crate::state::AppState;

pub fn write_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", put(update_order))
        .route("/internal-orders", post(create_internal_order))
}

pub fn read_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id", get(get_order))
}

#[derive(Deserialize)]
pub struct InternalOrderRequest {
    pub upstream_ref: String,
    #[serde(flatten)]
    pub draft: OrderDraft,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
}

/// Exactly one action per request: a status transition, an assignment
/// (driver_id + vehicle_id), a notes update, or an unassign.
#[derive(Deserialize)]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
    #[serde(default)]
    pub vehicle_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub unassign: bool,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(draft): Json<OrderDraft>,
) -> Result<Json<Order>, AppError> {
    if !policy::may_create_direct(&actor) {
        warn!(actor_id = %actor.id, role = actor.role.as_str(), "direct order denied");
        return Err(AppError::Forbidden);
    }
    let order = state.intake.create_direct(actor.id, draft).await?;
    Ok(Json(order))
}

async fn create_internal_order(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<InternalOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if !policy::may_ingest_internal(&actor) {
        warn!(actor_id = %actor.id, role = actor.role.as_str(), "internal ingestion denied");
        return Err(AppError::Forbidden);
    }
    let (order, _created) = state
        .intake
        .create_internal(&payload.upstream_ref, payload.draft)
        .await?;
    Ok(Json(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    let filter = policy::scope_filter(
        &actor,
        OrderFilter {
            status: query.status,
            ..OrderFilter::default()
        },
    );
    let orders = state.orders.list(&filter).await?;
    Ok(Json(orders))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state.orders.get(id).await?;
    if !policy::may_view(&actor, &order) {
        warn!(order_id = %id, actor_id = %actor.id, "order view denied");
        return Err(AppError::Forbidden);
    }
    Ok(Json(order))
}

async fn update_order(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    let authority = Authority::Actor(actor);
    let has_assignment = payload.driver_id.is_some() || payload.vehicle_id.is_some();

    let order = match (payload.unassign, has_assignment, payload.status, payload.notes) {
        (true, false, None, None) => state.assignment.release(id, &authority).await?,
        (false, true, None, None) => {
            let (Some(driver_id), Some(vehicle_id)) = (payload.driver_id, payload.vehicle_id)
            else {
                return Err(AppError::Validation(
                    "assignment requires driver_id and vehicle_id".to_string(),
                ));
            };
            state
                .assignment
                .assign(id, driver_id, vehicle_id, &authority)
                .await?
        }
        (false, false, Some(target), None) => {
            state.lifecycle.transition(id, target, &authority).await?
        }
        (false, false, None, Some(notes)) => {
            state.lifecycle.update_notes(id, notes, &actor).await?
        }
        _ => {
            return Err(AppError::Validation(
                "provide exactly one of: status, driver_id and vehicle_id, notes, unassign"
                    .to_string(),
            ))
        }
    };

    Ok(Json(order))
}
