use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::events::TrackingEvent;
use crate::models::order::{Address, Order, OrderItem, OrderKind, Schedule};
use crate::observability::metrics::Metrics;
use crate::store::OrderRepository;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderDraft {
    pub pickup_address: Address,
    pub delivery_address: Address,
    pub schedule: Schedule,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub struct OrderIntake {
    orders: Arc<dyn OrderRepository>,
    metrics: Metrics,
    events: broadcast::Sender<TrackingEvent>,
}

impl OrderIntake {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        metrics: Metrics,
        events: broadcast::Sender<TrackingEvent>,
    ) -> Self {
        Self {
            orders,
            metrics,
            events,
        }
    }

    pub async fn create_direct(
        &self,
        customer_id: Uuid,
        draft: OrderDraft,
    ) -> Result<Order, AppError> {
        validate_draft(&draft)?;
        let order = Order::new(
            OrderKind::Direct,
            Some(customer_id),
            None,
            draft.pickup_address,
            draft.delivery_address,
            draft.schedule,
            draft.items,
            draft.notes,
        );
        let stored = self.orders.insert(order).await?;
        self.record_created(&stored);
        Ok(stored)
    }

    /// Replays of an already-seen `upstream_ref` return the first order
    /// untouched, flagged `false`.
    pub async fn create_internal(
        &self,
        upstream_ref: &str,
        draft: OrderDraft,
    ) -> Result<(Order, bool), AppError> {
        let upstream_ref = upstream_ref.trim();
        if upstream_ref.is_empty() {
            return Err(AppError::Validation(
                "upstream_ref must not be empty".to_string(),
            ));
        }
        validate_draft(&draft)?;

        if let Some(existing) = self.orders.find_by_upstream_ref(upstream_ref).await? {
            info!(
                order_id = %existing.id,
                upstream_ref = %upstream_ref,
                "replayed ingestion, returning existing order"
            );
            return Ok((existing, false));
        }

        let order = Order::new(
            OrderKind::Internal,
            None,
            Some(upstream_ref.to_string()),
            draft.pickup_address,
            draft.delivery_address,
            draft.schedule,
            draft.items,
            draft.notes,
        );
        let (stored, created) = self.orders.find_or_insert_by_upstream_ref(order).await?;
        if created {
            self.record_created(&stored);
        } else {
            info!(
                order_id = %stored.id,
                upstream_ref = %upstream_ref,
                "lost ingestion race, returning existing order"
            );
        }
        Ok((stored, created))
    }

    fn record_created(&self, order: &Order) {
        let kind = match order.kind {
            OrderKind::Direct => "direct",
            OrderKind::Internal => "internal",
        };
        self.metrics
            .orders_created_total
            .with_label_values(&[kind])
            .inc();
        let _ = self.events.send(TrackingEvent::OrderCreated {
            order_id: order.id,
            kind: order.kind,
        });
        info!(
            order_id = %order.id,
            kind = kind,
            weight_kg = order.total_weight_kg,
            "order created"
        );
    }
}

fn validate_draft(draft: &OrderDraft) -> Result<(), AppError> {
    if draft.items.is_empty() {
        return Err(AppError::Validation(
            "order must contain at least one item".to_string(),
        ));
    }
    for (idx, item) in draft.items.iter().enumerate() {
        if item.quantity == 0 {
            return Err(AppError::Validation(format!(
                "item {idx}: quantity must be positive"
            )));
        }
        // NaN fails this form too
        if !(item.unit_weight_kg > 0.0) {
            return Err(AppError::Validation(format!(
                "item {idx}: unit weight must be positive"
            )));
        }
        if let Some(volume) = item.unit_volume_m3 {
            if !(volume > 0.0) {
                return Err(AppError::Validation(format!(
                    "item {idx}: unit volume must be positive"
                )));
            }
        }
    }
    validate_address(&draft.pickup_address, "pickup address")?;
    validate_address(&draft.delivery_address, "delivery address")?;
    if draft.schedule.delivery_at <= draft.schedule.pickup_at {
        return Err(AppError::Validation(
            "scheduled delivery must be after scheduled pickup".to_string(),
        ));
    }
    Ok(())
}

fn validate_address(address: &Address, field: &str) -> Result<(), AppError> {
    if address.street.trim().is_empty() || address.city.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "{field}: street and city are required"
        )));
    }
    Ok(())
}
