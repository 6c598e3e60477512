//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the TicketDesk engine.

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Keeps the file appender flushing for the life of the process
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initialize logging based on configuration. The returned guard must be
/// held until shutdown or buffered file output is lost.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "ticketdesk.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(LogGuard { _guard: guard })
}

/// Log admin actions
pub fn log_admin_action(admin_id: i64, action: &str, target: Option<&str>) {
    warn!(
        admin_id = admin_id,
        action = action,
        target = target,
        "Admin action performed"
    );
}
