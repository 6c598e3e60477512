//! TicketDesk reservation and settlement engine
//!
//! Core engine for a ticket marketplace: atomic reservation of seat-level
//! inventory with expiring holds, order settlement reconciled against an
//! external payment provider, and subscription-driven organizer roles.
//! Transport layers (HTTP, queues) live outside this crate.

#![allow(non_snake_case)]

pub mod config;
pub mod database;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{Result, TicketDeskError};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::{OrderService, ServiceFactory, SettlementService, SweeperService};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
