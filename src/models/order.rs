//! Order and order item models
//!
//! An order groups up to five tickets into one purchase. It is created
//! pending, confirmed only by successful settlement, and cancelled either
//! explicitly or by the expiration sweep. Confirmed orders may later move to
//! completed/refunded through post-sale flows outside this engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Completed,
    Cancelled,
    Refunded,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Confirmed => write!(f, "confirmed"),
            OrderStatus::Processing => write!(f, "processing"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl OrderStatus {
    /// Transitions the engine itself performs. Later post-sale moves
    /// (confirmed -> completed/refunded) belong to flows outside this core.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!((self, next), (Pending, Confirmed) | (Pending, Cancelled))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub reference: Uuid,
    pub user_id: i64,
    pub event_id: i64,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub delivery_name: Option<String>,
    pub delivery_email: Option<String>,
    pub delivery_phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub ticket_id: i64,
    /// Ticket price at order time. Never recomputed.
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// An order together with its price-snapshotted items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub ticket_ids: Vec<i64>,
    pub contact: DeliveryContact,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOrderRequest {
    pub status: Option<OrderStatus>,
    pub delivery_name: Option<String>,
    pub delivery_email: Option<String>,
    pub delivery_phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_the_only_mutable_engine_state() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));

        assert!(!Confirmed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Refunded.can_transition_to(Pending));
    }
}
