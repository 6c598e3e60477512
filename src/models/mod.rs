//! Data models for TicketDesk

pub mod event;
pub mod order;
pub mod payment;
pub mod subscription;
pub mod ticket;
pub mod user;

pub use event::*;
pub use order::*;
pub use payment::*;
pub use subscription::*;
pub use ticket::*;
pub use user::*;
