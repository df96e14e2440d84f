use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::fleet::{Driver, DriverStatus, Vehicle, VehicleStatus};

/// Binds are atomic per id; the flag is false when the bind was already
/// held for the same order.
#[async_trait]
pub trait FleetRegistry: Send + Sync {
    async fn add_driver(&self, driver: Driver) -> Result<Driver, AppError>;
    async fn add_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, AppError>;
    async fn get_driver(&self, id: Uuid) -> Result<Driver, AppError>;
    async fn get_vehicle(&self, id: Uuid) -> Result<Vehicle, AppError>;
    async fn list_drivers(&self) -> Result<Vec<Driver>, AppError>;
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, AppError>;

    /// Duty toggling only; `on_delivery`/`in_use` are owned by the
    /// bind/release pair.
    async fn set_driver_status(&self, id: Uuid, status: DriverStatus)
        -> Result<Driver, AppError>;
    async fn set_vehicle_status(
        &self,
        id: Uuid,
        status: VehicleStatus,
    ) -> Result<Vehicle, AppError>;

    async fn bind_driver(&self, id: Uuid, order_id: Uuid)
        -> Result<(Driver, bool), AppError>;
    async fn bind_vehicle(&self, id: Uuid, order_id: Uuid)
        -> Result<(Vehicle, bool), AppError>;

    /// Clears the bind if (and only if) it still points at `order_id`.
    async fn release_driver(&self, id: Uuid, order_id: Uuid) -> Result<(), AppError>;
    async fn release_vehicle(&self, id: Uuid, order_id: Uuid) -> Result<(), AppError>;
}

#[derive(Default)]
pub struct MemoryFleet {
    drivers: DashMap<Uuid, Driver>,
    vehicles: DashMap<Uuid, Vehicle>,
}

impl MemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FleetRegistry for MemoryFleet {
    async fn add_driver(&self, driver: Driver) -> Result<Driver, AppError> {
        self.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    async fn add_vehicle(&self, vehicle: Vehicle) -> Result<Vehicle, AppError> {
        self.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn get_driver(&self, id: Uuid) -> Result<Driver, AppError> {
        self.drivers
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))
    }

    async fn get_vehicle(&self, id: Uuid) -> Result<Vehicle, AppError> {
        self.vehicles
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("vehicle {id} not found")))
    }

    async fn list_drivers(&self) -> Result<Vec<Driver>, AppError> {
        Ok(self
            .drivers
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn list_vehicles(&self) -> Result<Vec<Vehicle>, AppError> {
        Ok(self
            .vehicles
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn set_driver_status(
        &self,
        id: Uuid,
        status: DriverStatus,
    ) -> Result<Driver, AppError> {
        if status == DriverStatus::OnDelivery {
            return Err(AppError::Validation(
                "on_delivery is set by assignment, not directly".to_string(),
            ));
        }

        let mut driver = self
            .drivers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

        if driver.active_order.is_some() {
            return Err(AppError::Conflict(format!(
                "driver {id} is on an active delivery"
            )));
        }

        driver.status = status;
        driver.updated_at = Utc::now();
        Ok(driver.clone())
    }

    async fn set_vehicle_status(
        &self,
        id: Uuid,
        status: VehicleStatus,
    ) -> Result<Vehicle, AppError> {
        if status == VehicleStatus::InUse {
            return Err(AppError::Validation(
                "in_use is set by assignment, not directly".to_string(),
            ));
        }

        let mut vehicle = self
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("vehicle {id} not found")))?;

        if vehicle.active_order.is_some() {
            return Err(AppError::Conflict(format!(
                "vehicle {id} is on an active delivery"
            )));
        }

        vehicle.status = status;
        vehicle.updated_at = Utc::now();
        Ok(vehicle.clone())
    }

    async fn bind_driver(
        &self,
        id: Uuid,
        order_id: Uuid,
    ) -> Result<(Driver, bool), AppError> {
        // get_mut holds the shard lock, so check-and-bind is single-writer
        let mut driver = self
            .drivers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("driver {id} not found")))?;

        if driver.status == DriverStatus::OffDuty {
            return Err(AppError::Conflict(format!("driver {id} is off duty")));
        }

        match driver.active_order {
            Some(bound) if bound == order_id => Ok((driver.clone(), false)),
            Some(_) => Err(AppError::Conflict(format!(
                "driver {id} is already bound to another order"
            ))),
            None => {
                driver.active_order = Some(order_id);
                driver.status = DriverStatus::OnDelivery;
                driver.updated_at = Utc::now();
                Ok((driver.clone(), true))
            }
        }
    }

    async fn bind_vehicle(
        &self,
        id: Uuid,
        order_id: Uuid,
    ) -> Result<(Vehicle, bool), AppError> {
        let mut vehicle = self
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("vehicle {id} not found")))?;

        if vehicle.status == VehicleStatus::Maintenance {
            return Err(AppError::Conflict(format!("vehicle {id} is in maintenance")));
        }

        match vehicle.active_order {
            Some(bound) if bound == order_id => Ok((vehicle.clone(), false)),
            Some(_) => Err(AppError::Conflict(format!(
                "vehicle {id} is already bound to another order"
            ))),
            None => {
                vehicle.active_order = Some(order_id);
                vehicle.status = VehicleStatus::InUse;
                vehicle.updated_at = Utc::now();
                Ok((vehicle.clone(), true))
            }
        }
    }

    async fn release_driver(&self, id: Uuid, order_id: Uuid) -> Result<(), AppError> {
        if let Some(mut driver) = self.drivers.get_mut(&id) {
            if driver.active_order == Some(order_id) {
                driver.active_order = None;
                driver.status = DriverStatus::Available;
                driver.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn release_vehicle(&self, id: Uuid, order_id: Uuid) -> Result<(), AppError> {
        if let Some(mut vehicle) = self.vehicles.get_mut(&id) {
            if vehicle.active_order == Some(order_id) {
                vehicle.active_order = None;
                vehicle.status = VehicleStatus::Available;
                vehicle.updated_at = Utc::now();
            }
        }
        Ok(())
    }
}
