//! Database service layer
//!
//! This module provides a high-level interface to database operations

use crate::database::{
    DatabasePool, EventRepository, OrderRepository, PaymentRepository, SubscriptionRepository,
    TicketRepository, UserRepository,
};
use crate::models::*;
use crate::utils::errors::TicketDeskError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub users: UserRepository,
    pub events: EventRepository,
    pub tickets: TicketRepository,
    pub orders: OrderRepository,
    pub payments: PaymentRepository,
    pub subscriptions: SubscriptionRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            tickets: TicketRepository::new(pool.clone()),
            orders: OrderRepository::new(pool.clone()),
            payments: PaymentRepository::new(pool.clone()),
            subscriptions: SubscriptionRepository::new(pool),
        }
    }

    /// Create an event and its initial ticket inventory in one call.
    /// Tickets may only be added while the event is still a draft.
    pub async fn create_event_with_tickets(
        &self,
        event: CreateEventRequest,
        ticket_type: String,
        price_cents: i64,
        quantity: u32,
    ) -> Result<(Event, Vec<Ticket>), TicketDeskError> {
        let event = self.events.create(event).await?;
        let tickets = self
            .tickets
            .create_batch(CreateTicketsRequest {
                event_id: event.id,
                ticket_type,
                price_cents,
                quantity,
            })
            .await?;

        Ok((event, tickets))
    }

    /// Publish a draft event, opening its tickets for purchase
    pub async fn publish_event(&self, event_id: i64) -> Result<Event, TicketDeskError> {
        let event = self
            .events
            .find_by_id(event_id)
            .await?
            .ok_or(TicketDeskError::InvalidInput(format!("event {event_id} not found")))?;

        if event.status != EventStatus::Draft {
            return Err(TicketDeskError::InvalidTransition {
                from: event.status.to_string(),
                to: EventStatus::Published.to_string(),
            });
        }

        self.events.set_status(event_id, EventStatus::Published).await
    }
}
