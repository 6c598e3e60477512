//! Error handling for TicketDesk
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use thiserror::Error;

use crate::models::order::OrderStatus;

/// Main error type for TicketDesk application
#[derive(Error, Debug)]
pub enum TicketDeskError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payment provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: i64 },

    #[error("Requested {requested} tickets, found {found}")]
    TicketsNotFound { requested: usize, found: usize },

    #[error("Ticket {ticket_id} is not available")]
    TicketUnavailable { ticket_id: i64 },

    #[error("Event {event_id} is not published")]
    EventNotPublished { event_id: i64 },

    #[error("Event {event_id} has already occurred")]
    EventAlreadyOccurred { event_id: i64 },

    #[error("Order {order_id} is not pending (status: {status})")]
    OrderNotPending { order_id: i64, status: OrderStatus },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Charge intent {intent_id} is not completed (status: {status})")]
    PaymentNotCompleted { intent_id: String, status: String },

    #[error("Notification signature verification failed")]
    InvalidNotificationSignature,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Payment provider capability errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    RequestFailed(String),

    #[error("Provider request timed out")]
    Timeout,

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Invalid notification signature")]
    InvalidSignature,

    #[error("Provider service unavailable")]
    ServiceUnavailable,
}

/// Result type alias for TicketDesk operations
pub type Result<T> = std::result::Result<T, TicketDeskError>;

/// Result type alias for payment provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl TicketDeskError {
    /// Business-rule failures surface to callers with their specific reason;
    /// everything else is reported as a generic internal failure.
    pub fn is_user_facing(&self) -> bool {
        match self {
            TicketDeskError::OrderNotFound { .. }
            | TicketDeskError::TicketsNotFound { .. }
            | TicketDeskError::TicketUnavailable { .. }
            | TicketDeskError::EventNotPublished { .. }
            | TicketDeskError::EventAlreadyOccurred { .. }
            | TicketDeskError::OrderNotPending { .. }
            | TicketDeskError::Forbidden(_)
            | TicketDeskError::InvalidTransition { .. }
            | TicketDeskError::PaymentNotCompleted { .. }
            | TicketDeskError::InvalidNotificationSignature
            | TicketDeskError::InvalidInput(_) => true,
            _ => false,
        }
    }

    /// Storage-connectivity faults are the one class the sweeper lets
    /// propagate out of an iteration.
    pub fn is_storage_unavailable(&self) -> bool {
        match self {
            TicketDeskError::Database(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TicketDeskError::Database(_) => ErrorSeverity::Critical,
            TicketDeskError::Migration(_) => ErrorSeverity::Critical,
            TicketDeskError::Config(_) => ErrorSeverity::Critical,
            TicketDeskError::Redis(_) => ErrorSeverity::Warning,
            TicketDeskError::Provider(_) => ErrorSeverity::Warning,
            TicketDeskError::Forbidden(_) => ErrorSeverity::Warning,
            TicketDeskError::InvalidNotificationSignature => ErrorSeverity::Warning,
            TicketDeskError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rule_errors_are_user_facing() {
        assert!(TicketDeskError::TicketUnavailable { ticket_id: 7 }.is_user_facing());
        assert!(TicketDeskError::Forbidden("not your order".to_string()).is_user_facing());
        assert!(TicketDeskError::InvalidNotificationSignature.is_user_facing());
        assert!(!TicketDeskError::Database(sqlx::Error::PoolClosed).is_user_facing());
    }

    #[test]
    fn connectivity_faults_are_storage_unavailable() {
        assert!(TicketDeskError::Database(sqlx::Error::PoolTimedOut).is_storage_unavailable());
        assert!(TicketDeskError::Database(sqlx::Error::PoolClosed).is_storage_unavailable());
        assert!(!TicketDeskError::Database(sqlx::Error::RowNotFound).is_storage_unavailable());
        assert!(!TicketDeskError::InvalidNotificationSignature.is_storage_unavailable());
    }

    #[test]
    fn severity_classification() {
        assert_eq!(
            TicketDeskError::Database(sqlx::Error::PoolClosed).severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(
            TicketDeskError::InvalidInput("bad".to_string()).severity(),
            ErrorSeverity::Info
        );
        assert_eq!(
            TicketDeskError::OrderNotFound { order_id: 1 }.severity(),
            ErrorSeverity::Error
        );
    }
}
