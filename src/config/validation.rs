//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::Settings;
use crate::utils::errors::{Result, TicketDeskError};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_redis_config(&settings.redis)?;
    validate_sweeper_config(&settings.sweeper)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(TicketDeskError::Config(
            "Database URL is required".to_string(),
        ));
    }

    if config.max_connections == 0 {
        return Err(TicketDeskError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(TicketDeskError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(TicketDeskError::Config("Redis URL is required".to_string()));
    }

    Ok(())
}

/// Validate hold and sweep timing
fn validate_sweeper_config(config: &super::SweeperConfig) -> Result<()> {
    if config.hold_minutes <= 0 {
        return Err(TicketDeskError::Config(
            "Hold duration must be greater than 0 minutes".to_string(),
        ));
    }

    if config.interval_minutes == 0 {
        return Err(TicketDeskError::Config(
            "Sweep interval must be greater than 0 minutes".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(TicketDeskError::Config(format!(
            "Invalid log level: {}. Must be one of: {}",
            config.level,
            valid_levels.join(", ")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_validate() {
        assert!(validate_settings(&Settings::default()).is_ok());
    }

    #[test]
    fn zero_hold_duration_rejected() {
        let mut settings = Settings::default();
        settings.sweeper.hold_minutes = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn invalid_log_level_rejected() {
        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        assert!(validate_settings(&settings).is_err());
    }
}
