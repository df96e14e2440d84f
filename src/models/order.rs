use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Direct,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Failed)
    }

    pub fn accepts_tracking(self) -> bool {
        matches!(self, Self::Assigned | Self::PickedUp | Self::InTransit)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::PickedUp => "picked_up",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialCategory {
    Cement,
    Sand,
    Gravel,
    Bricks,
    Timber,
    Steel,
    Insulation,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_note: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Schedule {
    pub pickup_at: DateTime<Utc>,
    pub delivery_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub category: MaterialCategory,
    pub description: String,
    pub quantity: u32,
    pub unit: String,
    pub unit_weight_kg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_volume_m3: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handling_note: Option<String>,
}

impl OrderItem {
    pub fn line_weight_kg(&self) -> f64 {
        self.unit_weight_kg * f64::from(self.quantity)
    }

    pub fn line_volume_m3(&self) -> f64 {
        self.unit_volume_m3.unwrap_or(0.0) * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub kind: OrderKind,
    pub status: OrderStatus,
    pub customer_id: Option<Uuid>,
    pub upstream_ref: Option<String>,
    pub pickup_address: Address,
    pub delivery_address: Address,
    pub schedule: Schedule,
    pub actual_pickup_at: Option<DateTime<Utc>>,
    pub actual_delivery_at: Option<DateTime<Utc>>,
    pub total_weight_kg: f64,
    pub total_volume_m3: f64,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: OrderKind,
        customer_id: Option<Uuid>,
        upstream_ref: Option<String>,
        pickup_address: Address,
        delivery_address: Address,
        schedule: Schedule,
        items: Vec<OrderItem>,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        let total_weight_kg = items.iter().map(OrderItem::line_weight_kg).sum();
        let total_volume_m3 = items.iter().map(OrderItem::line_volume_m3).sum();

        Self {
            id: Uuid::new_v4(),
            kind,
            status: OrderStatus::Pending,
            customer_id,
            upstream_ref,
            pickup_address,
            delivery_address,
            schedule,
            actual_pickup_at: None,
            actual_delivery_at: None,
            total_weight_kg,
            total_volume_m3,
            driver_id: None,
            vehicle_id: None,
            notes,
            items,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn guard(&self) -> OrderGuard {
        OrderGuard {
            status: self.status,
            driver_id: self.driver_id,
            vehicle_id: self.vehicle_id,
        }
    }
}

/// A rival write to any of these fields turns a guarded update into a
/// conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderGuard {
    pub status: OrderStatus,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
}

/// `driver_id` and `vehicle_id` distinguish "leave alone" (None) from
/// "set/clear" (Some(None) clears).
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub driver_id: Option<Option<Uuid>>,
    pub vehicle_id: Option<Option<Uuid>>,
    pub actual_pickup_at: Option<DateTime<Utc>>,
    pub actual_delivery_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl OrderPatch {
    pub fn apply(&self, order: &mut Order, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(driver_id) = self.driver_id {
            order.driver_id = driver_id;
        }
        if let Some(vehicle_id) = self.vehicle_id {
            order.vehicle_id = vehicle_id;
        }
        if let Some(at) = self.actual_pickup_at {
            order.actual_pickup_at = Some(at);
        }
        if let Some(at) = self.actual_delivery_at {
            order.actual_delivery_at = Some(at);
        }
        if let Some(notes) = &self.notes {
            order.notes = Some(notes.clone());
        }
        order.updated_at = now;
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub customer_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_weight_multiplies_by_quantity() {
        let item = OrderItem {
            category: MaterialCategory::Cement,
            description: "portland cement".to_string(),
            quantity: 20,
            unit: "bags".to_string(),
            unit_weight_kg: 50.0,
            unit_volume_m3: Some(0.033),
            handling_note: None,
        };

        assert_eq!(item.line_weight_kg(), 1000.0);
        assert!((item.line_volume_m3() - 0.66).abs() < 1e-9);
    }

    #[test]
    fn status_wire_names_are_snake_case() {
        let json = serde_json::to_string(&OrderStatus::PickedUp).unwrap();
        assert_eq!(json, "\"picked_up\"");
        assert_eq!(OrderStatus::InTransit.to_string(), "in_transit");
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(!OrderStatus::InTransit.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn tracking_window_covers_assigned_through_transit() {
        assert!(OrderStatus::Assigned.accepts_tracking());
        assert!(OrderStatus::PickedUp.accepts_tracking());
        assert!(OrderStatus::InTransit.accepts_tracking());
        assert!(!OrderStatus::Pending.accepts_tracking());
        assert!(!OrderStatus::Delivered.accepts_tracking());
    }
}
