//! Database module
//!
//! Connection management, repositories and the aggregate database service.

pub mod connection;
pub mod repositories;
pub mod service;

pub use connection::{create_pool, health_check, run_migrations, DatabaseConfig, DatabasePool};
pub use repositories::{
    EventRepository, OrderRepository, PaymentRepository, SubscriptionRepository, TicketRepository,
    UserRepository,
};
pub use service::DatabaseService;
