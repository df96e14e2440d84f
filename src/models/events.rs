use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::location::GeoPoint;
use crate::models::order::{OrderKind, OrderStatus};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingEvent {
    OrderCreated {
        order_id: Uuid,
        kind: OrderKind,
    },
    OrderAssigned {
        order_id: Uuid,
        driver_id: Uuid,
        vehicle_id: Uuid,
    },
    StatusChanged {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
    PingRecorded {
        order_id: Uuid,
        driver_id: Uuid,
        position: GeoPoint,
        captured_at: DateTime<Utc>,
    },
}
