//! Ticket repository implementation
//!
//! Read-side and inventory-creation queries. Status transitions that contend
//! with concurrent purchases live inside the reservation engine's
//! transactions, not here.

use sqlx::PgPool;
use chrono::Utc;
use crate::models::ticket::{CreateTicketsRequest, Ticket};
use crate::utils::errors::TicketDeskError;

#[derive(Debug, Clone)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a batch of identical tickets for an event
    pub async fn create_batch(&self, request: CreateTicketsRequest) -> Result<Vec<Ticket>, TicketDeskError> {
        let tickets = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (event_id, ticket_type, price_cents, created_at, updated_at)
            SELECT $1, $2, $3, $4, $4 FROM generate_series(1, $5)
            RETURNING id, event_id, ticket_type, price_cents, status, reserved_until, order_id, created_at, updated_at
            "#
        )
        .bind(request.event_id)
        .bind(request.ticket_type)
        .bind(request.price_cents)
        .bind(Utc::now())
        .bind(request.quantity as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// Find ticket by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Ticket>, TicketDeskError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            "SELECT id, event_id, ticket_type, price_cents, status, reserved_until, order_id, created_at, updated_at FROM tickets WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ticket)
    }

    /// List tickets for an event
    pub async fn list_by_event(&self, event_id: i64) -> Result<Vec<Ticket>, TicketDeskError> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT id, event_id, ticket_type, price_cents, status, reserved_until, order_id, created_at, updated_at FROM tickets WHERE event_id = $1 ORDER BY id ASC"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// List tickets currently owned by an order
    pub async fn list_by_order(&self, order_id: i64) -> Result<Vec<Ticket>, TicketDeskError> {
        let tickets = sqlx::query_as::<_, Ticket>(
            "SELECT id, event_id, ticket_type, price_cents, status, reserved_until, order_id, created_at, updated_at FROM tickets WHERE order_id = $1 ORDER BY id ASC"
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    /// Count available tickets for an event
    pub async fn count_available(&self, event_id: i64) -> Result<i64, TicketDeskError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND status = 'available'"
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count.0)
    }
}
