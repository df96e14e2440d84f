use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{patch, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::lifecycle::policy;
use crate::models::fleet::{Driver, DriverStatus, Vehicle, VehicleKind, VehicleStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/fleet/drivers", post(register_driver).get(list_drivers))
        .route("/fleet/drivers/:id/status", patch(update_driver_status))
        .route("/fleet/vehicles", post(register_vehicle).get(list_vehicles))
        .route("/fleet/vehicles/:id/status", patch(update_vehicle_status))
}

#[derive(Deserialize)]
pub struct RegisterDriverRequest {
    pub name: String,
    pub phone: String,
}

#[derive(Deserialize)]
pub struct RegisterVehicleRequest {
    pub plate: String,
    pub kind: VehicleKind,
    pub max_load_kg: f64,
}

#[derive(Deserialize)]
pub struct UpdateDriverStatusRequest {
    pub status: DriverStatus,
}

#[derive(Deserialize)]
pub struct UpdateVehicleStatusRequest {
    pub status: VehicleStatus,
}

fn require_operator(actor: &Actor) -> Result<(), AppError> {
    if policy::may_manage_fleet(actor) {
        Ok(())
    } else {
        warn!(actor_id = %actor.id, role = actor.role.as_str(), "fleet operation denied");
        Err(AppError::Forbidden)
    }
}

async fn register_driver(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<RegisterDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    require_operator(&actor)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if payload.phone.trim().is_empty() {
        return Err(AppError::Validation("phone cannot be empty".to_string()));
    }

    let now = Utc::now();
    let driver = Driver {
        id: Uuid::new_v4(),
        name: payload.name,
        phone: payload.phone,
        status: DriverStatus::Available,
        active_order: None,
        registered_at: now,
        updated_at: now,
    };

    let driver = state.fleet.add_driver(driver).await?;
    Ok(Json(driver))
}

async fn list_drivers(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Driver>>, AppError> {
    require_operator(&actor)?;
    let drivers = state.fleet.list_drivers().await?;
    Ok(Json(drivers))
}

async fn update_driver_status(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDriverStatusRequest>,
) -> Result<Json<Driver>, AppError> {
    require_operator(&actor)?;
    let driver = state.fleet.set_driver_status(id, payload.status).await?;
    Ok(Json(driver))
}

async fn register_vehicle(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<RegisterVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    require_operator(&actor)?;

    if payload.plate.trim().is_empty() {
        return Err(AppError::Validation("plate cannot be empty".to_string()));
    }
    if !(payload.max_load_kg > 0.0) {
        return Err(AppError::Validation(
            "max_load_kg must be positive".to_string(),
        ));
    }

    let now = Utc::now();
    let vehicle = Vehicle {
        id: Uuid::new_v4(),
        plate: payload.plate,
        kind: payload.kind,
        max_load_kg: payload.max_load_kg,
        status: VehicleStatus::Available,
        active_order: None,
        registered_at: now,
        updated_at: now,
    };

    let vehicle = state.fleet.add_vehicle(vehicle).await?;
    Ok(Json(vehicle))
}

async fn list_vehicles(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Vehicle>>, AppError> {
    require_operator(&actor)?;
    let vehicles = state.fleet.list_vehicles().await?;
    Ok(Json(vehicles))
}

async fn update_vehicle_status(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVehicleStatusRequest>,
) -> Result<Json<Vehicle>, AppError> {
    require_operator(&actor)?;
    let vehicle = state.fleet.set_vehicle_status(id, payload.status).await?;
    Ok(Json(vehicle))
}
