use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::fleet::FleetRegistry;
use crate::lifecycle::policy::{self, Authority};
use crate::models::events::TrackingEvent;
use crate::models::order::{Order, OrderPatch, OrderStatus};
use crate::observability::metrics::Metrics;
use crate::store::OrderRepository;

pub struct AssignmentService {
    orders: Arc<dyn OrderRepository>,
    fleet: Arc<dyn FleetRegistry>,
    metrics: Metrics,
    events: broadcast::Sender<TrackingEvent>,
}

impl AssignmentService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        fleet: Arc<dyn FleetRegistry>,
        metrics: Metrics,
        events: broadcast::Sender<TrackingEvent>,
    ) -> Self {
        Self {
            orders,
            fleet,
            metrics,
            events,
        }
    }

    pub async fn assign(
        &self,
        order_id: Uuid,
        driver_id: Uuid,
        vehicle_id: Uuid,
        authority: &Authority,
    ) -> Result<Order, AppError> {
        if !policy::may_assign(authority) {
            warn!(
                order_id = %order_id,
                authority = %authority.describe(),
                "assignment denied"
            );
            return Err(AppError::Forbidden);
        }

        let order = self.orders.get(order_id).await?;
        match order.status {
            OrderStatus::Pending | OrderStatus::Assigned => {}
            status => {
                self.count("rejected");
                return Err(AppError::InvalidState(format!(
                    "assignment requires a pending or assigned order, found {status}"
                )));
            }
        }

        let vehicle = self.fleet.get_vehicle(vehicle_id).await?;
        if vehicle.max_load_kg < order.total_weight_kg {
            self.count("rejected");
            return Err(AppError::Validation(format!(
                "vehicle {} carries at most {} kg, order weighs {} kg",
                vehicle.plate, vehicle.max_load_kg, order.total_weight_kg
            )));
        }

        let driver_fresh = match self.fleet.bind_driver(driver_id, order_id).await {
            Ok((_, fresh)) => fresh,
            Err(err) => {
                if matches!(err, AppError::Conflict(_)) {
                    self.count("conflict");
                }
                return Err(err);
            }
        };
        let vehicle_fresh = match self.fleet.bind_vehicle(vehicle_id, order_id).await {
            Ok((_, fresh)) => fresh,
            Err(err) => {
                // undo only what this call bound
                self.unbind(order_id, driver_fresh.then_some(driver_id), None)
                    .await;
                if matches!(err, AppError::Conflict(_)) {
                    self.count("conflict");
                }
                return Err(err);
            }
        };

        let patch = OrderPatch {
            status: (order.status == OrderStatus::Pending).then_some(OrderStatus::Assigned),
            driver_id: Some(Some(driver_id)),
            vehicle_id: Some(Some(vehicle_id)),
            ..OrderPatch::default()
        };
        let updated = match self
            .orders
            .update_guarded(order_id, order.guard(), &patch)
            .await
        {
            Ok(updated) => updated,
            Err(err) => {
                self.unbind(
                    order_id,
                    driver_fresh.then_some(driver_id),
                    vehicle_fresh.then_some(vehicle_id),
                )
                .await;
                self.count("conflict");
                return Err(err);
            }
        };

        // a swap frees the old pair last so the order never points at an
        // unbound driver
        self.unbind(
            order_id,
            order.driver_id.filter(|old| *old != driver_id),
            order.vehicle_id.filter(|old| *old != vehicle_id),
        )
        .await;

        if order.status == OrderStatus::Pending {
            self.metrics.active_deliveries.inc();
            self.metrics
                .status_transitions_total
                .with_label_values(&[OrderStatus::Assigned.as_str()])
                .inc();
            let _ = self.events.send(TrackingEvent::StatusChanged {
                order_id,
                from: OrderStatus::Pending,
                to: OrderStatus::Assigned,
            });
        }
        self.count("success");
        let _ = self.events.send(TrackingEvent::OrderAssigned {
            order_id,
            driver_id,
            vehicle_id,
        });
        info!(
            order_id = %order_id,
            driver_id = %driver_id,
            vehicle_id = %vehicle_id,
            "order assigned"
        );

        Ok(updated)
    }

    /// Frees the crew; the order keeps its place in the status graph.
    pub async fn release(&self, order_id: Uuid, authority: &Authority) -> Result<Order, AppError> {
        if !policy::may_assign(authority) {
            warn!(
                order_id = %order_id,
                authority = %authority.describe(),
                "unassign denied"
            );
            return Err(AppError::Forbidden);
        }

        let order = self.orders.get(order_id).await?;
        if order.status != OrderStatus::Assigned {
            return Err(AppError::InvalidState(format!(
                "unassign requires an assigned order, found {}",
                order.status
            )));
        }

        let patch = OrderPatch {
            driver_id: Some(None),
            vehicle_id: Some(None),
            ..OrderPatch::default()
        };
        let updated = self
            .orders
            .update_guarded(order_id, order.guard(), &patch)
            .await?;

        self.unbind(order_id, order.driver_id, order.vehicle_id).await;

        self.count("released");
        info!(order_id = %order_id, "order unassigned");

        Ok(updated)
    }

    async fn unbind(&self, order_id: Uuid, driver_id: Option<Uuid>, vehicle_id: Option<Uuid>) {
        if let Some(driver_id) = driver_id {
            if let Err(err) = self.fleet.release_driver(driver_id, order_id).await {
                warn!(
                    order_id = %order_id,
                    driver_id = %driver_id,
                    error = %err,
                    "driver release failed"
                );
            }
        }
        if let Some(vehicle_id) = vehicle_id {
            if let Err(err) = self.fleet.release_vehicle(vehicle_id, order_id).await {
                warn!(
                    order_id = %order_id,
                    vehicle_id = %vehicle_id,
                    error = %err,
                    "vehicle release failed"
                );
            }
        }
    }

    fn count(&self, outcome: &str) {
        self.metrics
            .assignment_attempts_total
            .with_label_values(&[outcome])
            .inc();
    }
}
