use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::lifecycle::policy;
use crate::models::fleet::VehicleKind;
use crate::models::location::LocationPing;
use crate::models::order::OrderStatus;
use crate::state::AppState;
use crate::tracking::PingDraft;

const TRAIL_LIMIT: usize = 20;

pub fn ping_router() -> Router<Arc<AppState>> {
    Router::new().route("/location/track", post(record_ping))
}

pub fn query_router() -> Router<Arc<AppState>> {
    Router::new().route("/location/order/:id", get(order_location))
}

#[derive(Serialize)]
pub struct OrderLocationResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub latest: Option<LocationPing>,
    pub trail: Vec<LocationPing>,
    pub driver: Option<DriverSummary>,
    pub vehicle: Option<VehicleSummary>,
}

#[derive(Serialize)]
pub struct DriverSummary {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

#[derive(Serialize)]
pub struct VehicleSummary {
    pub id: Uuid,
    pub plate: String,
    pub kind: VehicleKind,
}

async fn record_ping(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(draft): Json<PingDraft>,
) -> Result<Json<LocationPing>, AppError> {
    if !policy::may_record_ping(&actor) {
        warn!(actor_id = %actor.id, role = actor.role.as_str(), "ping from non-driver actor");
        return Err(AppError::Forbidden);
    }
    let ping = state.tracker.record_ping(actor.id, draft).await?;
    Ok(Json(ping))
}

async fn order_location(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderLocationResponse>, AppError> {
    let order = state.orders.get(id).await?;
    if !policy::may_view_location(&actor, &order) {
        warn!(order_id = %id, actor_id = %actor.id, "location view denied");
        return Err(AppError::Forbidden);
    }

    let latest = state.tracker.latest(order.id).await?;
    let trail = state.tracker.trail(order.id, TRAIL_LIMIT).await?;
    let driver = match order.driver_id {
        Some(driver_id) => state.fleet.get_driver(driver_id).await.ok().map(|driver| {
            DriverSummary {
                id: driver.id,
                name: driver.name,
                phone: driver.phone,
            }
        }),
        None => None,
    };
    let vehicle = match order.vehicle_id {
        Some(vehicle_id) => state.fleet.get_vehicle(vehicle_id).await.ok().map(|vehicle| {
            VehicleSummary {
                id: vehicle.id,
                plate: vehicle.plate,
                kind: vehicle.kind,
            }
        }),
        None => None,
    };

    Ok(Json(OrderLocationResponse {
        order_id: order.id,
        status: order.status,
        latest,
        trail,
        driver,
        vehicle,
    }))
}
