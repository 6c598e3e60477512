//! Event repository implementation

use sqlx::PgPool;
use chrono::Utc;
use crate::models::event::{CreateEventRequest, Event, EventStatus};
use crate::utils::errors::TicketDeskError;

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event in draft status
    pub async fn create(&self, request: CreateEventRequest) -> Result<Event, TicketDeskError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (organizer_id, title, starts_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, organizer_id, title, status, starts_at, created_at, updated_at
            "#
        )
        .bind(request.organizer_id)
        .bind(request.title)
        .bind(request.starts_at)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, TicketDeskError> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, organizer_id, title, status, starts_at, created_at, updated_at FROM events WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// Move an event through its lifecycle (draft/published/cancelled/completed)
    pub async fn set_status(&self, id: i64, status: EventStatus) -> Result<Event, TicketDeskError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET status = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, organizer_id, title, status, starts_at, created_at, updated_at
            "#
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Get upcoming published events
    pub async fn list_upcoming_published(&self, limit: Option<i64>) -> Result<Vec<Event>, TicketDeskError> {
        let limit = limit.unwrap_or(50);
        let events = sqlx::query_as::<_, Event>(
            "SELECT id, organizer_id, title, status, starts_at, created_at, updated_at FROM events WHERE status = 'published' AND starts_at > NOW() ORDER BY starts_at ASC LIMIT $1"
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}
