use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Actor;
use crate::error::AppError;
use crate::fleet::FleetRegistry;
use crate::lifecycle::machine;
use crate::lifecycle::policy::{self, Authority};
use crate::models::events::TrackingEvent;
use crate::models::order::{Order, OrderPatch, OrderStatus};
use crate::observability::metrics::Metrics;
use crate::store::OrderRepository;

pub struct OrderLifecycle {
    orders: Arc<dyn OrderRepository>,
    fleet: Arc<dyn FleetRegistry>,
    metrics: Metrics,
    events: broadcast::Sender<TrackingEvent>,
}

impl OrderLifecycle {
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

    pub async fn transition(
        &self,
        order_id: Uuid,
        to: OrderStatus,
        authority: &Authority,
    ) -> Result<Order, AppError> {
        let order = self.orders.get(order_id).await?;

        // outsiders learn nothing about the order, not even its legal edges
        if !policy::has_standing(authority, &order) {
            warn!(
                order_id = %order_id,
                authority = %authority.describe(),
                "status change denied"
            );
            return Err(AppError::Forbidden);
        }

        let from = order.status;
        machine::ensure_edge(from, to)?;

        // `assigned` is only reachable through check-and-bind.
        if to == OrderStatus::Assigned {
            return Err(AppError::Validation(
                "assignment requires driver_id and vehicle_id".to_string(),
            ));
        }

        if !policy::may_transition(authority, &order, to) {
            warn!(
                order_id = %order_id,
                from = %from,
                to = %to,
                authority = %authority.describe(),
                "status change denied"
            );
            return Err(AppError::Forbidden);
        }

        let now = Utc::now();
        let mut patch = OrderPatch {
            status: Some(to),
            ..OrderPatch::default()
        };
        match to {
            OrderStatus::PickedUp => patch.actual_pickup_at = Some(now),
            OrderStatus::Delivered => patch.actual_delivery_at = Some(now),
            OrderStatus::Cancelled | OrderStatus::Failed => {
                patch.driver_id = Some(None);
                patch.vehicle_id = Some(None);
            }
            _ => {}
        }

        let updated = self
            .orders
            .update_guarded(order_id, order.guard(), &patch)
            .await?;

        if to.is_terminal() {
            self.release_bindings(&order).await;
            if from.accepts_tracking() {
                self.metrics.active_deliveries.dec();
            }
        }
        self.metrics
            .status_transitions_total
            .with_label_values(&[to.as_str()])
            .inc();
        let _ = self.events.send(TrackingEvent::StatusChanged { order_id, from, to });
        info!(order_id = %order_id, from = %from, to = %to, "order status changed");

        Ok(updated)
    }

    pub async fn update_notes(
        &self,
        order_id: Uuid,
        notes: String,
        actor: &Actor,
    ) -> Result<Order, AppError> {
        if !policy::may_edit_notes(actor) {
            warn!(order_id = %order_id, actor_id = %actor.id, "notes update denied");
            return Err(AppError::Forbidden);
        }
        let order = self.orders.get(order_id).await?;
        let patch = OrderPatch {
            notes: Some(notes),
            ..OrderPatch::default()
        };
        let updated = self
            .orders
            .update_guarded(order_id, order.guard(), &patch)
            .await?;
        info!(order_id = %order_id, "order notes updated");
        Ok(updated)
    }

    /// A failed release is logged and left for reconciliation; the order's
    /// status is already final.
    async fn release_bindings(&self, order: &Order) {
        if let Some(driver_id) = order.driver_id {
            if let Err(err) = self.fleet.release_driver(driver_id, order.id).await {
                warn!(
                    order_id = %order.id,
                    driver_id = %driver_id,
                    error = %err,
                    "driver release failed"
                );
            }
        }
        if let Some(vehicle_id) = order.vehicle_id {
            if let Err(err) = self.fleet.release_vehicle(vehicle_id, order.id).await {
                warn!(
                    order_id = %order.id,
                    vehicle_id = %vehicle_id,
                    error = %err,
                    "vehicle release failed"
                );
            }
        }
    }
}
