//! Ticket model and state machine
//!
//! A ticket moves `available -> reserved -> sold`, with `reserved ->
//! available` when a hold is released by cancellation or sweep expiry.
//! `sold` and `cancelled` are terminal for the engine; transfers and refunds
//! are post-sale flows handled elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Available,
    Reserved,
    Sold,
    Cancelled,
    Transferred,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Available => write!(f, "available"),
            TicketStatus::Reserved => write!(f, "reserved"),
            TicketStatus::Sold => write!(f, "sold"),
            TicketStatus::Cancelled => write!(f, "cancelled"),
            TicketStatus::Transferred => write!(f, "transferred"),
        }
    }
}

impl TicketStatus {
    /// Legal transitions within the reservation engine.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Available, Reserved) | (Reserved, Sold) | (Reserved, Available)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub event_id: i64,
    pub ticket_type: String,
    pub price_cents: i64,
    pub status: TicketStatus,
    pub reserved_until: Option<DateTime<Utc>>,
    pub order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicketsRequest {
    pub event_id: i64,
    pub ticket_type: String,
    pub price_cents: i64,
    pub quantity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_transitions_are_the_only_legal_ones() {
        use TicketStatus::*;
        assert!(Available.can_transition_to(Reserved));
        assert!(Reserved.can_transition_to(Sold));
        assert!(Reserved.can_transition_to(Available));

        assert!(!Available.can_transition_to(Sold));
        assert!(!Sold.can_transition_to(Available));
        assert!(!Sold.can_transition_to(Reserved));
        assert!(!Cancelled.can_transition_to(Reserved));
        assert!(!Transferred.can_transition_to(Available));
    }
}
