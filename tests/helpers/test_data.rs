//! Seed data builders for integration tests

use TicketDesk::database::DatabaseService;
use TicketDesk::models::event::{Event, EventStatus};
use TicketDesk::models::order::{CreateOrderRequest, DeliveryContact};
use TicketDesk::models::ticket::Ticket;
use TicketDesk::models::user::{Actor, CreateUserRequest, User, UserRole};

pub async fn create_user(db: &DatabaseService, email: &str, role: UserRole) -> User {
    db.users
        .create(CreateUserRequest {
            email: email.to_string(),
            full_name: Some("Test User".to_string()),
            role: Some(role),
            provider_customer_id: None,
        })
        .await
        .expect("failed to create user")
}

pub async fn create_user_with_customer(
    db: &DatabaseService,
    email: &str,
    customer_id: &str,
) -> User {
    let user = create_user(db, email, UserRole::User).await;
    db.users
        .set_customer_reference(user.id, customer_id)
        .await
        .expect("failed to set customer reference")
}

pub fn actor_for(user: &User) -> Actor {
    Actor::new(user.id, user.role)
}

/// Seed a published event with an on-sale ticket batch
pub async fn create_published_event(
    db: &DatabaseService,
    organizer_id: i64,
    price_cents: i64,
    quantity: u32,
) -> (Event, Vec<Ticket>) {
    let (event, tickets) = db
        .create_event_with_tickets(
            TicketDesk::models::event::CreateEventRequest {
                organizer_id,
                title: "Test Concert".to_string(),
                starts_at: chrono::Utc::now() + chrono::Duration::days(7),
            },
            "general".to_string(),
            price_cents,
            quantity,
        )
        .await
        .expect("failed to seed event");

    let event = db
        .publish_event(event.id)
        .await
        .expect("failed to publish event");

    (event, tickets)
}

/// Seed a draft event with tickets, left unpublished
pub async fn create_draft_event(
    db: &DatabaseService,
    organizer_id: i64,
    price_cents: i64,
    quantity: u32,
) -> (Event, Vec<Ticket>) {
    db.create_event_with_tickets(
        TicketDesk::models::event::CreateEventRequest {
            organizer_id,
            title: "Unannounced Show".to_string(),
            starts_at: chrono::Utc::now() + chrono::Duration::days(7),
        },
        "general".to_string(),
        price_cents,
        quantity,
    )
    .await
    .expect("failed to seed event")
}

/// Seed a published event whose start time is already in the past
pub async fn create_past_event(
    db: &DatabaseService,
    organizer_id: i64,
    price_cents: i64,
    quantity: u32,
) -> (Event, Vec<Ticket>) {
    let (event, tickets) = db
        .create_event_with_tickets(
            TicketDesk::models::event::CreateEventRequest {
                organizer_id,
                title: "Last Night's Show".to_string(),
                starts_at: chrono::Utc::now() - chrono::Duration::hours(3),
            },
            "general".to_string(),
            price_cents,
            quantity,
        )
        .await
        .expect("failed to seed event");

    let event = db
        .events
        .set_status(event.id, EventStatus::Published)
        .await
        .expect("failed to publish event");

    (event, tickets)
}

pub fn order_request(ticket_ids: Vec<i64>) -> CreateOrderRequest {
    CreateOrderRequest {
        ticket_ids,
        contact: DeliveryContact {
            name: Some("Ada Buyer".to_string()),
            email: Some("ada@example.com".to_string()),
            phone: None,
        },
    }
}
