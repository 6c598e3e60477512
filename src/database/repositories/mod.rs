//! Repository implementations for database operations

pub mod event;
pub mod order;
pub mod payment;
pub mod subscription;
pub mod ticket;
pub mod user;

pub use event::EventRepository;
pub use order::OrderRepository;
pub use payment::PaymentRepository;
pub use subscription::SubscriptionRepository;
pub use ticket::TicketRepository;
pub use user::UserRepository;
